use crate::error::RelayError;
use crate::firewall::Decision;
use crate::network::packet::FrameView;
use crate::relay::RelaySummary;
use log::{debug, error, info, trace};

/// リレーのイベント通知先
///
/// 判定処理そのものはI/Oを持たず、ログなどの出力はここに集約する。
pub trait RelayObserver: Send + Sync {
    fn decided(&self, _relay: &str, _frame: &[u8], _view: &FrameView, _decision: Decision) {}

    fn closed(&self, _relay: &str, _summary: &RelaySummary) {}

    fn failed(&self, _relay: &str, _error: &RelayError, _summary: &RelaySummary) {}
}

/// 何もしない通知先
pub struct NullObserver;

impl RelayObserver for NullObserver {}

/// `log` に出力する通知先
pub struct LogObserver;

fn describe(view: &FrameView) -> String {
    match (&view.ether_type, &view.ipv4) {
        (_, Some(ip)) => match ip.ports {
            Some(ports) => format!(
                "{}:{} -> {}:{} (proto {})",
                ip.source, ports.source, ip.destination, ports.destination, ip.protocol.0
            ),
            None => format!("{} -> {} (proto {})", ip.source, ip.destination, ip.protocol.0),
        },
        (Some(ether_type), None) => format!("ethertype 0x{:04x}", ether_type.0),
        (None, None) => "不完全なフレーム".to_string(),
    }
}

fn reason(decision: Decision) -> String {
    match decision {
        Decision::Rule { index, .. } => format!("ルール#{}", index),
        Decision::Default(_) => "デフォルト".to_string(),
    }
}

impl RelayObserver for LogObserver {
    fn decided(&self, relay: &str, frame: &[u8], view: &FrameView, decision: Decision) {
        if decision.forwards() {
            trace!("[{}] 転送: {} {} bytes ({})", relay, describe(view), frame.len(), reason(decision));
        } else {
            debug!("[{}] 破棄: {} {} bytes ({})", relay, describe(view), frame.len(), reason(decision));
        }
    }

    fn closed(&self, relay: &str, summary: &RelaySummary) {
        info!("[{}] トランスポートが閉じられました - {}", relay, summary);
    }

    fn failed(&self, relay: &str, error: &RelayError, summary: &RelaySummary) {
        error!("[{}] リレーを停止します: {} - {}", relay, error, summary);
    }
}
