use pnet::packet::ip::IpNextHeaderProtocol;
use std::net::Ipv4Addr;

pub const IPV4_HEADER_MIN_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IPv4Header {
    pub protocol: IpNextHeaderProtocol,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
}

impl IPv4Header {
    /// IPv4ヘッダーを解析し、ヘッダーとペイロードを返す
    ///
    /// IHLが不正 (5未満) またはバッファを超える場合、ペイロードは空スライスになる。
    /// その場合でもアドレスとプロトコルは有効なので、ヘッダー自体は返す。
    pub fn parse(data: &[u8]) -> Option<(Self, &[u8])> {
        if data.len() < IPV4_HEADER_MIN_LEN {
            return None;
        }

        let ihl = data[0] & 0xf;
        let protocol = IpNextHeaderProtocol(data[9]);
        // ネットワークバイトオーダーのままオクテット列として保持する
        let source = Ipv4Addr::new(data[12], data[13], data[14], data[15]);
        let destination = Ipv4Addr::new(data[16], data[17], data[18], data[19]);

        let header_len = ihl as usize * 4;
        let payload = if header_len >= IPV4_HEADER_MIN_LEN && header_len <= data.len() {
            &data[header_len..]
        } else {
            &data[data.len()..]
        };

        Some((
            Self {
                protocol,
                source,
                destination,
            },
            payload
        ))
    }
}
