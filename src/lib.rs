pub mod app;
pub mod error;
pub mod firewall;
pub mod network;
pub mod relay;
pub mod setup_logger;

pub use crate::app::{Bridge, BridgeReport, Configuration};
pub use crate::error::{AppError, InitProcessError, RelayError, RulesetError};
pub use crate::firewall::{Rule, RuleAction, Ruleset};
pub use crate::relay::Relay;
