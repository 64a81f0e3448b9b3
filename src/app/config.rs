use crate::error::InitProcessError;
use std::path::PathBuf;

pub const DEFAULT_INTERFACE_A: &str = "8";
pub const DEFAULT_INTERFACE_B: &str = "9";
pub const DEFAULT_BUFFER_SIZE: usize = 65536;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub ruleset_path: PathBuf,
    pub interface_a: String,
    pub interface_b: String,
    pub buffer_size: usize,
    pub log_file: Option<PathBuf>,
}

impl Configuration {
    /// コマンドライン引数と環境変数 (.env を含む) から設定を構築する
    pub fn from_env_and_args(args: impl IntoIterator<Item = String>) -> Result<Self, InitProcessError> {
        dotenv::dotenv().ok();
        Self::from_args(args, |key| std::env::var(key).ok())
    }

    /// `<program> <ruleset-path> [interface-A] [interface-B]`
    pub fn from_args(
        args: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, InitProcessError> {
        let mut args = args.into_iter();
        let program = args.next().unwrap_or_else(|| "rule-bridge".to_string());

        let ruleset_path = args.next().map(PathBuf::from).ok_or_else(|| {
            InitProcessError::Usage(format!("{} <ruleset-path> [interface-A] [interface-B]", program))
        })?;

        let interface_a = args
            .next()
            .or_else(|| env("BRIDGE_INTERFACE_A"))
            .unwrap_or_else(|| DEFAULT_INTERFACE_A.to_string());
        let interface_b = args
            .next()
            .or_else(|| env("BRIDGE_INTERFACE_B"))
            .unwrap_or_else(|| DEFAULT_INTERFACE_B.to_string());

        let buffer_size = match env("BRIDGE_BUFFER_SIZE") {
            Some(value) => value
                .parse::<usize>()
                .map_err(|e| InitProcessError::EnvVarParseError(format!("BRIDGE_BUFFER_SIZE=\"{}\": {}", value, e)))?,
            None => DEFAULT_BUFFER_SIZE,
        };

        Ok(Configuration {
            ruleset_path,
            interface_a,
            interface_b,
            buffer_size,
            log_file: env("BRIDGE_LOG_FILE").map(PathBuf::from),
        })
    }
}
