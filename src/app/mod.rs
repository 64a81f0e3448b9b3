pub mod bridge;
pub mod config;
pub mod shutdown;

pub use bridge::{Bridge, BridgeReport};
pub use config::Configuration;
pub use shutdown::until_signal;
