use crate::app::config::Configuration;
use crate::error::{RelayError, Result};
use crate::firewall::Ruleset;
use crate::network::{open_channel, resolve_interface};
use crate::relay::{FrameReceiver, FrameSender, Relay, RelaySummary};
use log::info;
use std::sync::Arc;
use tokio::task::{self, JoinError, JoinHandle};

/// 両方向の終了結果
///
/// 方向ごとに独立している。片方のタスクが異常終了しても、もう片方の結果は失われない。
#[derive(Debug)]
pub struct BridgeReport {
    pub a_to_b: Result<RelaySummary>,
    pub b_to_a: Result<RelaySummary>,
}

/// 2つのインターフェース間のブリッジ
pub struct Bridge {
    config: Configuration,
    ruleset: Arc<Ruleset>,
}

impl Bridge {
    pub fn new(config: Configuration, ruleset: Ruleset) -> Self {
        Self {
            config,
            ruleset: Arc::new(ruleset),
        }
    }

    pub async fn run(&self) -> Result<BridgeReport> {
        let interface_a = resolve_interface(&self.config.interface_a)?;
        let interface_b = resolve_interface(&self.config.interface_b)?;

        let (tx_a, rx_a) = open_channel(&interface_a, self.config.buffer_size)?;
        let (tx_b, rx_b) = open_channel(&interface_b, self.config.buffer_size)?;

        info!("ブリッジを開始します: {} <-> {}", interface_a.name, interface_b.name);

        let a_to_b = Relay::new(format!("{}->{}", interface_a.name, interface_b.name), Arc::clone(&self.ruleset));
        let b_to_a = Relay::new(format!("{}->{}", interface_b.name, interface_a.name), Arc::clone(&self.ruleset));

        Ok(run_pair((a_to_b, rx_a, tx_b), (b_to_a, rx_b, tx_a)).await)
    }
}

/// 1方向のリレーをブロッキングスレッドで実行する
pub fn spawn_relay<R, S>(
    relay: Relay,
    mut inbound: R,
    mut outbound: S,
) -> JoinHandle<std::result::Result<RelaySummary, RelayError>>
where
    R: FrameReceiver + 'static,
    S: FrameSender + 'static,
{
    task::spawn_blocking(move || {
        info!("[{}] リレーを開始します", relay.name());
        relay.run(&mut inbound, &mut outbound)
    })
}

/// 両方向のリレーを並行に実行し、両方が終了するまで待つ
///
/// 片方向が致命的なエラーで止まっても、もう片方はそのまま動き続ける。
pub async fn run_pair<R1, S1, R2, S2>(forward: (Relay, R1, S1), backward: (Relay, R2, S2)) -> BridgeReport
where
    R1: FrameReceiver + 'static,
    S1: FrameSender + 'static,
    R2: FrameReceiver + 'static,
    S2: FrameSender + 'static,
{
    let (relay, inbound, outbound) = forward;
    let forward_task = spawn_relay(relay, inbound, outbound);
    let (relay, inbound, outbound) = backward;
    let backward_task = spawn_relay(relay, inbound, outbound);

    let (a_to_b, b_to_a) = tokio::join!(forward_task, backward_task);

    BridgeReport {
        a_to_b: outcome(a_to_b),
        b_to_a: outcome(b_to_a),
    }
}

/// タスクの異常終了 (パニック等) とリレーのエラーを1つの結果にまとめる
fn outcome(
    joined: std::result::Result<std::result::Result<RelaySummary, RelayError>, JoinError>,
) -> Result<RelaySummary> {
    Ok(joined??)
}
