use pnet::packet::ethernet::EtherType;

pub const ETHERNET_HEADER_LEN: usize = 14;

/// 宛先・送信元MACは転送判定に使わないため、EtherTypeのみ保持する
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    pub ethertype: EtherType,
}

impl EthernetHeader {
    pub fn parse(data: &[u8]) -> Option<(Self, &[u8])> {
        if data.len() < ETHERNET_HEADER_LEN {
            return None;
        }

        let ethertype = EtherType(u16::from_be_bytes([data[12], data[13]]));

        Some((Self { ethertype }, &data[ETHERNET_HEADER_LEN..]))
    }
}
