pub mod ethernet;
pub mod ipv4;
pub mod tcp;
pub mod udp;

use crate::network::packet::ethernet::EthernetHeader;
use crate::network::packet::ipv4::IPv4Header;
use crate::network::packet::tcp::TCPHeader;
use crate::network::packet::udp::UDPHeader;
use pnet::packet::ethernet::{EtherType, EtherTypes};
use pnet::packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};
use std::net::Ipv4Addr;

/// 1フレーム分の解析結果
///
/// 読み込んだバッファを借用して解析するだけで、ペイロードはコピーしない。
/// ヘッダーが途中で切れている場合はエラーにせず、その層以降を `None` にする。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameView {
    /// イーサネットヘッダーが揃っていない場合は `None`
    pub ether_type: Option<EtherType>,
    pub ipv4: Option<Ipv4View>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4View {
    pub protocol: IpNextHeaderProtocol,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    /// TCP/UDPかつヘッダーが揃っている場合のみ
    pub ports: Option<Ports>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ports {
    pub source: u16,
    pub destination: u16,
}

impl FrameView {
    pub fn parse(data: &[u8]) -> Self {
        let (ethernet, remainder) = match EthernetHeader::parse(data) {
            Some(parsed) => parsed,
            None => return Self::default(),
        };

        let ipv4 = if ethernet.ethertype == EtherTypes::Ipv4 {
            IPv4Header::parse(remainder).map(|(ip, payload)| Ipv4View {
                protocol: ip.protocol,
                source: ip.source,
                destination: ip.destination,
                ports: parse_ports(ip.protocol, payload),
            })
        } else {
            None
        };

        Self {
            ether_type: Some(ethernet.ethertype),
            ipv4,
        }
    }
}

fn parse_ports(protocol: IpNextHeaderProtocol, payload: &[u8]) -> Option<Ports> {
    if protocol == IpNextHeaderProtocols::Tcp {
        TCPHeader::parse(payload).map(|tcp| Ports {
            source: tcp.source_port,
            destination: tcp.destination_port,
        })
    } else if protocol == IpNextHeaderProtocols::Udp {
        UDPHeader::parse(payload).map(|udp| Ports {
            source: udp.source_port,
            destination: udp.destination_port,
        })
    } else {
        None
    }
}
