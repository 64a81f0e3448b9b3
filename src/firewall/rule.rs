use crate::network::packet::FrameView;
use pnet::packet::ip::IpNextHeaderProtocols;
use std::fmt;
use std::net::Ipv4Addr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleAction {
    #[default]
    Allow,
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    /// 設定ファイル上の表記 ("TCP" / "UDP") のみを受け付ける
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "TCP" => Some(Protocol::Tcp),
            "UDP" => Some(Protocol::Udp),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "TCP"),
            Protocol::Udp => write!(f, "UDP"),
        }
    }
}

/// ルール1件の判定結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// このルールは対象外 (次のルールへ)
    Undecided,
    Allow,
    Block,
}

/// 1件のフィルタルール
///
/// `None` のフィールドはワイルドカード。全て `None` なら全てのIPv4フレームに一致する。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rule {
    pub action: RuleAction,
    pub src_ip: Option<Ipv4Addr>,
    pub dst_ip: Option<Ipv4Addr>,
    pub src_port: Option<u16>,
    pub dst_port: Option<u16>,
    pub protocol: Option<Protocol>,
}

impl Rule {
    pub fn new(action: RuleAction) -> Self {
        Self {
            action,
            ..Default::default()
        }
    }

    pub fn allow() -> Self {
        Self::new(RuleAction::Allow)
    }

    pub fn block() -> Self {
        Self::new(RuleAction::Block)
    }

    pub fn src_ip(mut self, ip: Ipv4Addr) -> Self {
        self.src_ip = Some(ip);
        self
    }

    pub fn dst_ip(mut self, ip: Ipv4Addr) -> Self {
        self.dst_ip = Some(ip);
        self
    }

    pub fn src_port(mut self, port: u16) -> Self {
        self.src_port = Some(port);
        self
    }

    pub fn dst_port(mut self, port: u16) -> Self {
        self.dst_port = Some(port);
        self
    }

    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    fn has_port(&self) -> bool {
        self.src_port.is_some() || self.dst_port.is_some()
    }

    pub fn verdict(&self, frame: &FrameView) -> Verdict {
        // IPv4以外 (ARPなど) はIPベースのルールの対象外
        let ip = match &frame.ipv4 {
            Some(ip) => ip,
            None => return Verdict::Undecided,
        };

        if self.src_ip.is_some_and(|addr| addr != ip.source) {
            return Verdict::Undecided;
        }

        if self.dst_ip.is_some_and(|addr| addr != ip.destination) {
            return Verdict::Undecided;
        }

        let frame_protocol = if ip.protocol == IpNextHeaderProtocols::Icmp {
            // ICMPはポートもプロトコルも指定されていないルールにのみ一致する
            if self.has_port() || self.protocol.is_some() {
                return Verdict::Undecided;
            }
            None
        } else if ip.protocol == IpNextHeaderProtocols::Tcp {
            Some(Protocol::Tcp)
        } else if ip.protocol == IpNextHeaderProtocols::Udp {
            Some(Protocol::Udp)
        } else {
            if self.protocol.is_some() {
                return Verdict::Undecided;
            }
            None
        };

        if let Some(frame_protocol) = frame_protocol {
            if self.protocol.is_some_and(|p| p != frame_protocol) {
                return Verdict::Undecided;
            }

            if self.has_port() {
                // トランスポートヘッダーが欠けている場合、ポート条件は確認できない
                let ports = match ip.ports {
                    Some(ports) => ports,
                    None => return Verdict::Undecided,
                };

                if self.src_port.is_some_and(|port| port != ports.source) {
                    return Verdict::Undecided;
                }

                if self.dst_port.is_some_and(|port| port != ports.destination) {
                    return Verdict::Undecided;
                }
            }
        }

        match self.action {
            RuleAction::Allow => Verdict::Allow,
            RuleAction::Block => Verdict::Block,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action {
            RuleAction::Allow => write!(f, "allow")?,
            RuleAction::Block => write!(f, "block")?,
        }
        if let Some(ip) = self.src_ip {
            write!(f, " src_ip={}", ip)?;
        }
        if let Some(ip) = self.dst_ip {
            write!(f, " dst_ip={}", ip)?;
        }
        if let Some(port) = self.src_port {
            write!(f, " src_port={}", port)?;
        }
        if let Some(port) = self.dst_port {
            write!(f, " dst_port={}", port)?;
        }
        if let Some(protocol) = self.protocol {
            write!(f, " protocol={}", protocol)?;
        }
        Ok(())
    }
}
