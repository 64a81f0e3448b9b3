pub const TCP_HEADER_MIN_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TCPHeader {
    pub source_port: u16,
    pub destination_port: u16,
}

impl TCPHeader {
    /// オプションを除いた20バイトが揃っていなければ `None`
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < TCP_HEADER_MIN_LEN {
            return None;
        }

        Some(Self {
            source_port: u16::from_be_bytes([data[0], data[1]]),
            destination_port: u16::from_be_bytes([data[2], data[3]]),
        })
    }
}
