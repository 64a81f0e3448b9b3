pub mod interface;
pub mod packet;

pub use interface::{open_channel, resolve_interface};
pub use packet::FrameView;
