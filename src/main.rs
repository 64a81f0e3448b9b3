use log::{error, info, warn};
use rule_bridge::app::until_signal;
use rule_bridge::error::InitProcessError;
use rule_bridge::setup_logger::setup_logger;
use rule_bridge::{Bridge, Configuration, Ruleset};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Configuration::from_env_and_args(std::env::args()) {
        Ok(config) => config,
        Err(e @ InitProcessError::Usage(_)) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("設定の読み込みに失敗しました: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = setup_logger(config.log_file.as_deref()) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    // 読み込みに失敗した場合は空のルールセット (全て許可) で続行する
    let ruleset = Ruleset::load(&config.ruleset_path);
    let bridge = Bridge::new(config, ruleset);

    let result = match until_signal(bridge.run(), tokio::signal::ctrl_c()).await {
        Some(result) => result,
        None => {
            info!("終了シグナルを受信しました");
            // ブロッキング中のリレースレッドはランタイムの終了を待たせるため、ここでプロセスを終了する
            std::process::exit(0);
        }
    };

    match result {
        Ok(report) => {
            for (direction, outcome) in [("A->B", &report.a_to_b), ("B->A", &report.b_to_a)] {
                match outcome {
                    Ok(summary) => info!("{} 終了 - {}", direction, summary),
                    Err(e) => warn!("{} 異常終了: {}", direction, e),
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("ブリッジの起動に失敗しました: {}", e);
            ExitCode::FAILURE
        }
    }
}
