pub mod observer;
pub mod transport;

pub use observer::{LogObserver, NullObserver, RelayObserver};
pub use transport::{FrameReceiver, FrameSender};

use crate::error::RelayError;
use crate::firewall::Ruleset;
use crate::network::packet::FrameView;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct RelayStats {
    received: AtomicU64,
    forwarded: AtomicU64,
    dropped: AtomicU64,
}

impl RelayStats {
    pub fn summary(&self) -> RelaySummary {
        RelaySummary {
            received: self.received.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RelaySummary {
    pub received: u64,
    pub forwarded: u64,
    pub dropped: u64,
}

impl fmt::Display for RelaySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "受信: {}, 転送: {}, 破棄: {}",
            self.received, self.forwarded, self.dropped
        )
    }
}

/// 片方向のリレー
///
/// 受信したフレームをルールセットで判定し、許可されたものだけを同じバイト列のまま送信する。
/// ルールセットは読み取り専用で、逆方向のリレーと共有される。
pub struct Relay {
    name: String,
    ruleset: Arc<Ruleset>,
    observer: Arc<dyn RelayObserver>,
    stats: RelayStats,
}

impl Relay {
    pub fn new(name: impl Into<String>, ruleset: Arc<Ruleset>) -> Self {
        Self {
            name: name.into(),
            ruleset,
            observer: Arc::new(LogObserver),
            stats: RelayStats::default(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RelayObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// トランスポートが閉じられるか、致命的なエラーが起きるまでフレームを中継する
    ///
    /// 割り込み (`Interrupted`) 以外の読み書きエラーは再試行せず、このリレーだけを終了する。
    pub fn run<R, S>(&self, inbound: &mut R, outbound: &mut S) -> Result<RelaySummary, RelayError>
    where
        R: FrameReceiver + ?Sized,
        S: FrameSender + ?Sized,
    {
        loop {
            let frame = match inbound.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    let summary = self.stats.summary();
                    self.observer.closed(&self.name, &summary);
                    return Ok(summary);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.fail(RelayError::Read(e))),
            };

            self.stats.received.fetch_add(1, Ordering::Relaxed);

            let view = FrameView::parse(frame);
            let decision = self.ruleset.decide(&view);
            self.observer.decided(&self.name, frame, &view, decision);

            if !decision.forwards() {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                continue;
            }

            if let Err(e) = outbound.send_frame(frame) {
                return Err(self.fail(RelayError::Write(e)));
            }
            self.stats.forwarded.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn fail(&self, error: RelayError) -> RelayError {
        let summary = self.stats.summary();
        self.observer.failed(&self.name, &error, &summary);
        error
    }
}
