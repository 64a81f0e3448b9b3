use pnet::datalink::{DataLinkReceiver, DataLinkSender};
use std::io;

/// フレーム単位の受信側
pub trait FrameReceiver: Send {
    /// 次のフレームを待つ。`Ok(None)` はトランスポートが閉じられたことを表す
    fn next_frame(&mut self) -> io::Result<Option<&[u8]>>;
}

/// フレーム単位の送信側
pub trait FrameSender: Send {
    fn send_frame(&mut self, frame: &[u8]) -> io::Result<()>;
}

impl FrameReceiver for Box<dyn DataLinkReceiver> {
    fn next_frame(&mut self) -> io::Result<Option<&[u8]>> {
        self.next().map(Some)
    }
}

impl FrameSender for Box<dyn DataLinkSender> {
    fn send_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        match self.send_to(frame, None) {
            Some(result) => result,
            None => Err(io::Error::new(
                io::ErrorKind::Other,
                "送信バッファを確保できませんでした",
            )),
        }
    }
}
