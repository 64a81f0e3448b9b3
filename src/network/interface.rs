use crate::error::InitProcessError;
use log::{error, info};
use pnet::datalink::{self, Channel, DataLinkReceiver, DataLinkSender, NetworkInterface};

/// 名前またはインターフェース番号で検索する
pub fn find_interface(interfaces: &[NetworkInterface], identifier: &str) -> Option<NetworkInterface> {
    let found = match identifier.parse::<u32>() {
        Ok(index) => interfaces.iter().find(|interface| interface.index == index),
        Err(_) => interfaces.iter().find(|interface| interface.name == identifier),
    };
    found.cloned()
}

pub fn resolve_interface(identifier: &str) -> Result<NetworkInterface, InitProcessError> {
    let interfaces = datalink::interfaces();

    match find_interface(&interfaces, identifier) {
        Some(interface) => {
            info!("インターフェースを選択しました: {} (index {})", interface.name, interface.index);
            Ok(interface)
        }
        None => {
            error!("インターフェース \"{}\" が見つかりません。利用可能なデバイス:", identifier);
            for interface in &interfaces {
                error!("  {}. {}", interface.index, interface.name);
            }
            Err(InitProcessError::InterfaceNotFound(identifier.to_string()))
        }
    }
}

/// イーサネットチャネル (raw socket) を開く。権限が必要
pub fn open_channel(
    interface: &NetworkInterface,
    buffer_size: usize,
) -> Result<(Box<dyn DataLinkSender>, Box<dyn DataLinkReceiver>), InitProcessError> {
    let config = datalink::Config {
        read_buffer_size: buffer_size,
        write_buffer_size: buffer_size,
        ..Default::default()
    };

    match datalink::channel(interface, config) {
        Ok(Channel::Ethernet(tx, rx)) => Ok((tx, rx)),
        Ok(_) => Err(InitProcessError::UnsupportedChannel(interface.name.clone())),
        Err(e) => Err(InitProcessError::ChannelError(format!("{}: {}", interface.name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interface(name: &str, index: u32) -> NetworkInterface {
        NetworkInterface {
            name: name.to_string(),
            description: String::new(),
            index,
            mac: None,
            ips: Vec::new(),
            flags: 0,
        }
    }

    #[test]
    fn finds_by_name_or_index() {
        let interfaces = vec![interface("lo", 1), interface("eth0", 8), interface("eth1", 9)];

        assert_eq!(find_interface(&interfaces, "eth1").map(|i| i.index), Some(9));
        assert_eq!(find_interface(&interfaces, "8").map(|i| i.name), Some("eth0".to_string()));
        assert!(find_interface(&interfaces, "wlan0").is_none());
        assert!(find_interface(&interfaces, "3").is_none());
    }
}
