use crate::error::RulesetError;
use crate::firewall::rule::{Protocol, Rule, RuleAction, Verdict};
use crate::firewall::source::{source_for_path, RuleEntry, RuleSource};
use crate::network::packet::FrameView;
use log::{debug, error, info, warn};
use std::fmt;
use std::net::Ipv4Addr;
use std::path::Path;

/// 順序付きルールリストとデフォルト動作
///
/// 構築後は変更しない。複数のリレーから `Arc` でロックなしに共有される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ruleset {
    rules: Vec<Rule>,
    default_action: bool,
}

/// どのルールがフレームの扱いを決めたか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Rule { index: usize, action: RuleAction },
    Default(bool),
}

impl Decision {
    pub fn forwards(self) -> bool {
        match self {
            Decision::Rule { action, .. } => action == RuleAction::Allow,
            Decision::Default(allow) => allow,
        }
    }
}

/// 設定の不備 (いずれも許可側に倒して読み込みを続ける)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    UnknownTag { index: usize, tag: String },
    MalformedEntry { index: usize, value: String },
    UnknownProtocol { index: usize, value: String },
    InvalidAddress { index: usize, attribute: &'static str, value: String },
    InvalidPort { index: usize, attribute: &'static str, value: String },
    UnknownAttribute { index: usize, attribute: String },
    UnknownDefault { value: String },
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigIssue::UnknownTag { index, tag } => write!(
                f,
                "ルール#{}: 不明なルール \"{}\"。\"allow\" または \"block\" のみ使用できます (allowとして扱います)",
                index, tag
            ),
            ConfigIssue::MalformedEntry { index, value } => write!(
                f,
                "ルール#{}: {} はルールとして解釈できません (allowとして扱います)",
                index, value
            ),
            ConfigIssue::UnknownProtocol { index, value } => write!(
                f,
                "ルール#{}: プロトコル \"{}\" は未対応です。\"TCP\" と \"UDP\" のみ認識します (条件を無視します)",
                index, value
            ),
            ConfigIssue::InvalidAddress { index, attribute, value } => write!(
                f,
                "ルール#{}: {} の値 \"{}\" はIPv4アドレスではありません (条件を無視します)",
                index, attribute, value
            ),
            ConfigIssue::InvalidPort { index, attribute, value } => write!(
                f,
                "ルール#{}: {} の値 \"{}\" はポート番号ではありません (条件を無視します)",
                index, attribute, value
            ),
            ConfigIssue::UnknownAttribute { index, attribute } => {
                write!(f, "ルール#{}: 不明な属性 \"{}\" を無視します", index, attribute)
            }
            ConfigIssue::UnknownDefault { value } => write!(
                f,
                "デフォルト動作 \"{}\" は不明です。allowとして扱います",
                value
            ),
        }
    }
}

/// `Ruleset::import` の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub ruleset: Ruleset,
    pub issues: Vec<ConfigIssue>,
}

const KNOWN_ATTRIBUTES: [&str; 5] = ["src_ip", "dst_ip", "src_port", "dst_port", "protocol"];

impl Default for Ruleset {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            default_action: true,
        }
    }
}

impl Ruleset {
    pub fn new(rules: Vec<Rule>, default_action: bool) -> Self {
        Self {
            rules,
            default_action,
        }
    }

    /// 先頭から順に評価し、最初に決定したルールの結果を返す
    pub fn decide(&self, frame: &FrameView) -> Decision {
        for (index, rule) in self.rules.iter().enumerate() {
            match rule.verdict(frame) {
                Verdict::Allow => {
                    return Decision::Rule {
                        index,
                        action: RuleAction::Allow,
                    }
                }
                Verdict::Block => {
                    return Decision::Rule {
                        index,
                        action: RuleAction::Block,
                    }
                }
                Verdict::Undecided => {}
            }
        }

        Decision::Default(self.default_action)
    }

    /// フレームを転送してよければ `true`
    pub fn evaluate(&self, frame: &[u8]) -> bool {
        self.decide(&FrameView::parse(frame)).forwards()
    }

    /// 設定ソースからルールセットを構築する
    ///
    /// エントリ単位の不備ではエラーにしない。不明なタグは許可ルール、
    /// 不明なプロトコルや解析できないアドレス・ポートはワイルドカードとして扱い、
    /// 不備の内容を `issues` として返す。設定ミスで全通信が遮断されることはない。
    pub fn import(source: &dyn RuleSource) -> Result<Import, RulesetError> {
        let document = source.read()?;
        let mut issues = Vec::new();

        let default_action = match document.default.as_deref() {
            None | Some("allow") => true,
            Some("block") => false,
            Some(other) => {
                issues.push(ConfigIssue::UnknownDefault {
                    value: other.to_string(),
                });
                true
            }
        };

        let rules = document
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| rule_from_entry(index, entry, &mut issues))
            .collect();

        Ok(Import {
            ruleset: Ruleset::new(rules, default_action),
            issues,
        })
    }

    /// ファイルからルールセットを読み込む
    ///
    /// ファイルが存在しない、またはルールセットではない場合はエラーを出力し、
    /// 空のルールセット (全て許可) で続行する。
    pub fn load(path: &Path) -> Ruleset {
        let imported = source_for_path(path).and_then(|source| Ruleset::import(source.as_ref()));

        match imported {
            Ok(Import { ruleset, issues }) => {
                for issue in &issues {
                    warn!("{}: {}", path.display(), issue);
                }
                info!(
                    "ルールセットを読み込みました: {} ({}件, デフォルト: {})",
                    path.display(),
                    ruleset.rules.len(),
                    if ruleset.default_action { "allow" } else { "block" }
                );
                for (index, rule) in ruleset.rules.iter().enumerate() {
                    debug!("ルール#{}: {}", index, rule);
                }
                ruleset
            }
            Err(e) => {
                error!(
                    "ファイル \"{}\" は存在しないか、ルールセットではありません: {}。空のルールセット (全て許可) で続行します",
                    path.display(),
                    e
                );
                Ruleset::default()
            }
        }
    }
}

fn rule_from_entry(index: usize, entry: &RuleEntry, issues: &mut Vec<ConfigIssue>) -> Rule {
    if let Some(value) = &entry.malformed {
        issues.push(ConfigIssue::MalformedEntry {
            index,
            value: value.clone(),
        });
        return Rule::allow();
    }

    let action = match entry.tag.as_str() {
        "allow" => RuleAction::Allow,
        "block" => RuleAction::Block,
        other => {
            issues.push(ConfigIssue::UnknownTag {
                index,
                tag: other.to_string(),
            });
            RuleAction::Allow
        }
    };

    for name in entry.attributes.keys() {
        if !KNOWN_ATTRIBUTES.contains(&name.as_str()) {
            issues.push(ConfigIssue::UnknownAttribute {
                index,
                attribute: name.clone(),
            });
        }
    }

    Rule {
        action,
        src_ip: address(index, entry, "src_ip", issues),
        dst_ip: address(index, entry, "dst_ip", issues),
        src_port: port(index, entry, "src_port", issues),
        dst_port: port(index, entry, "dst_port", issues),
        protocol: protocol(index, entry, issues),
    }
}

fn address(
    index: usize,
    entry: &RuleEntry,
    attribute: &'static str,
    issues: &mut Vec<ConfigIssue>,
) -> Option<Ipv4Addr> {
    let value = entry.attribute(attribute)?;
    match value.parse::<Ipv4Addr>() {
        Ok(addr) => Some(addr),
        Err(_) => {
            issues.push(ConfigIssue::InvalidAddress {
                index,
                attribute,
                value: value.to_string(),
            });
            None
        }
    }
}

fn port(index: usize, entry: &RuleEntry, attribute: &'static str, issues: &mut Vec<ConfigIssue>) -> Option<u16> {
    let value = entry.attribute(attribute)?;
    match value.parse::<u16>() {
        Ok(port) => Some(port),
        Err(_) => {
            issues.push(ConfigIssue::InvalidPort {
                index,
                attribute,
                value: value.to_string(),
            });
            None
        }
    }
}

fn protocol(index: usize, entry: &RuleEntry, issues: &mut Vec<ConfigIssue>) -> Option<Protocol> {
    let value = entry.attribute("protocol")?;
    let protocol = Protocol::from_name(value);
    if protocol.is_none() {
        issues.push(ConfigIssue::UnknownProtocol {
            index,
            value: value.to_string(),
        });
    }
    protocol
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firewall::source::{JsonRuleSource, XmlRuleSource};
    use crate::network::packet::testing::*;
    use proptest::prelude::*;
    use std::io::Write;

    fn addr(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    fn import_xml(xml: &str) -> Import {
        Ruleset::import(&XmlRuleSource::new(xml)).unwrap()
    }

    #[test]
    fn first_decisive_rule_wins() {
        let ruleset = Ruleset::new(
            vec![
                Rule::block().dst_port(80).protocol(Protocol::Tcp),
                Rule::allow().dst_port(80).protocol(Protocol::Tcp),
            ],
            true,
        );

        let frame = tcp_frame(addr("1.1.1.1"), addr("2.2.2.2"), 1234, 80);
        assert!(!ruleset.evaluate(&frame));
        assert_eq!(
            ruleset.decide(&FrameView::parse(&frame)),
            Decision::Rule { index: 0, action: RuleAction::Block }
        );
    }

    #[test]
    fn allowed_source_is_forwarded_before_catch_all_block() {
        let ruleset = Ruleset::new(vec![Rule::allow().src_ip(addr("10.0.0.5")), Rule::block()], true);

        assert!(ruleset.evaluate(&tcp_frame(addr("10.0.0.5"), addr("8.8.8.8"), 1, 2)));
        assert!(ruleset.evaluate(&icmp_frame(addr("10.0.0.5"), addr("9.9.9.9"))));
        assert!(!ruleset.evaluate(&tcp_frame(addr("10.0.0.6"), addr("8.8.8.8"), 1, 2)));
    }

    #[test]
    fn blocks_only_the_listed_port() {
        let ruleset = Ruleset::new(vec![Rule::block().dst_port(80).protocol(Protocol::Tcp)], true);

        assert!(!ruleset.evaluate(&tcp_frame(addr("1.1.1.1"), addr("2.2.2.2"), 5000, 80)));
        assert!(ruleset.evaluate(&tcp_frame(addr("1.1.1.1"), addr("2.2.2.2"), 5000, 81)));
        assert!(ruleset.evaluate(&udp_frame(addr("1.1.1.1"), addr("2.2.2.2"), 5000, 80)));
    }

    #[test]
    fn empty_ruleset_uses_default_action() {
        let frames = [
            tcp_frame(addr("1.1.1.1"), addr("2.2.2.2"), 1, 2),
            icmp_frame(addr("1.1.1.1"), addr("2.2.2.2")),
            arp_frame(),
            vec![0u8; 3],
        ];

        for frame in &frames {
            assert!(Ruleset::default().evaluate(frame));
            assert!(!Ruleset::new(Vec::new(), false).evaluate(frame));
        }
    }

    #[test]
    fn non_ipv4_frames_fall_through_to_default() {
        let rules = vec![Rule::block(), Rule::allow().src_ip(addr("1.1.1.1"))];
        let arp = arp_frame();

        assert!(Ruleset::new(rules.clone(), true).evaluate(&arp));
        assert!(!Ruleset::new(rules, false).evaluate(&arp));
    }

    #[test]
    fn tcp_rule_never_decides_icmp() {
        let ruleset = Ruleset::new(vec![Rule::block().protocol(Protocol::Tcp)], true);
        let frame = icmp_frame(addr("1.1.1.1"), addr("2.2.2.2"));
        assert_eq!(ruleset.decide(&FrameView::parse(&frame)), Decision::Default(true));
    }

    #[test]
    fn truncated_frame_falls_through_to_default() {
        let ruleset = Ruleset::new(vec![Rule::block().src_ip(addr("1.1.1.1"))], true);
        let frame = tcp_frame(addr("1.1.1.1"), addr("2.2.2.2"), 1, 2);

        assert!(!ruleset.evaluate(&frame));
        assert!(ruleset.evaluate(&frame[..20]));
    }

    #[test]
    fn imports_rules_in_document_order() {
        let import = import_xml(
            r#"<rules>
                <allow src_ip="10.0.0.5"/>
                <block dst_ip="192.168.1.10" dst_port="80" protocol="TCP"/>
                <block src_port="53" protocol="UDP"/>
            </rules>"#,
        );

        assert!(import.issues.is_empty());
        assert!(import.ruleset.default_action);
        assert_eq!(
            import.ruleset.rules,
            [
                Rule::allow().src_ip(addr("10.0.0.5")),
                Rule::block().dst_ip(addr("192.168.1.10")).dst_port(80).protocol(Protocol::Tcp),
                Rule::block().src_port(53).protocol(Protocol::Udp),
            ]
        );
    }

    #[test]
    fn address_round_trips_through_import() {
        let import = import_xml(r#"<rules><block src_ip="192.168.1.10"/></rules>"#);
        let stored = import.ruleset.rules[0].src_ip.unwrap();

        assert_eq!(stored.to_string(), "192.168.1.10");
        assert_eq!(stored.octets(), [192, 168, 1, 10]);

        // ヘッダー上のバイト列と一致すること
        let frame = udp_frame(addr("192.168.1.10"), addr("1.1.1.1"), 1, 2);
        assert_eq!(&frame[26..30], &stored.octets());
        assert!(!import.ruleset.evaluate(&frame));
    }

    #[test]
    fn unknown_tag_is_reported_and_allows() {
        let import = import_xml(r#"<rules><deny dst_port="22" protocol="TCP"/></rules>"#);

        assert_eq!(
            import.issues,
            vec![ConfigIssue::UnknownTag { index: 0, tag: "deny".to_string() }]
        );
        assert_eq!(import.ruleset.rules[0], Rule::allow().dst_port(22).protocol(Protocol::Tcp));
    }

    #[test]
    fn unknown_protocol_is_reported_and_dropped() {
        let import = import_xml(r#"<rules><block dst_port="80" protocol="tcp"/></rules>"#);

        assert_eq!(
            import.issues,
            vec![ConfigIssue::UnknownProtocol { index: 0, value: "tcp".to_string() }]
        );
        assert_eq!(import.ruleset.rules[0], Rule::block().dst_port(80));
    }

    #[test]
    fn unparsable_address_and_port_become_wildcards() {
        let import = import_xml(r#"<rules><block src_ip="10.0.0" dst_port="70000" src_port="http"/></rules>"#);

        assert_eq!(import.ruleset.rules[0], Rule::block());
        assert_eq!(import.issues.len(), 3);
        assert!(import.issues.contains(&ConfigIssue::InvalidAddress {
            index: 0,
            attribute: "src_ip",
            value: "10.0.0".to_string()
        }));
        assert!(import.issues.contains(&ConfigIssue::InvalidPort {
            index: 0,
            attribute: "dst_port",
            value: "70000".to_string()
        }));
    }

    #[test]
    fn unknown_attribute_is_reported() {
        let import = import_xml(r#"<rules><allow ttl="100"/></rules>"#);
        assert_eq!(
            import.issues,
            vec![ConfigIssue::UnknownAttribute { index: 0, attribute: "ttl".to_string() }]
        );
        assert_eq!(import.ruleset.rules[0], Rule::allow());
    }

    #[test]
    fn root_default_attribute_selects_default_action() {
        assert!(!import_xml(r#"<rules default="block"/>"#).ruleset.default_action);
        assert!(import_xml(r#"<rules default="allow"/>"#).ruleset.default_action);

        let import = import_xml(r#"<rules default="drop"/>"#);
        assert!(import.ruleset.default_action);
        assert_eq!(import.issues, vec![ConfigIssue::UnknownDefault { value: "drop".to_string() }]);
    }

    #[test]
    fn non_object_json_entry_is_reported_and_allows() {
        let source = JsonRuleSource::new(r#"{"default":"block","rules":["oops",{"action":"block"}]}"#);
        let import = Ruleset::import(&source).unwrap();

        assert_eq!(
            import.issues,
            vec![ConfigIssue::MalformedEntry { index: 0, value: "\"oops\"".to_string() }]
        );
        assert_eq!(import.ruleset, Ruleset::new(vec![Rule::allow(), Rule::block()], false));

        // 先頭の不正な要素は全て許可するルールになる
        assert!(import.ruleset.evaluate(&tcp_frame(addr("1.1.1.1"), addr("2.2.2.2"), 1, 2)));
        assert!(!import.ruleset.evaluate(&arp_frame()));
    }

    #[test]
    fn json_rules_object_fails_import() {
        let result = Ruleset::import(&JsonRuleSource::new(r#"{"rules": {}}"#));
        assert!(matches!(result, Err(RulesetError::Json(_))));
    }

    #[test]
    fn load_reads_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"default": "block", "rules": [{{"action": "allow", "dst_port": 53, "protocol": "UDP"}}]}}"#).unwrap();

        let ruleset = Ruleset::load(file.path());
        assert_eq!(ruleset, Ruleset::new(vec![Rule::allow().dst_port(53).protocol(Protocol::Udp)], false));
    }

    #[test]
    fn load_falls_back_to_allow_all_when_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let ruleset = Ruleset::load(&dir.path().join("missing.xml"));
        assert_eq!(ruleset, Ruleset::default());
        assert!(ruleset.evaluate(&arp_frame()));
    }

    #[test]
    fn load_falls_back_when_root_is_absent() {
        let mut file = tempfile::Builder::new().suffix(".xml").tempfile().unwrap();
        write!(file, "<policy><block/></policy>").unwrap();
        assert_eq!(Ruleset::load(file.path()), Ruleset::default());
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::Builder::new().suffix(".xml").tempfile().unwrap();
        write!(file, r#"<rules><block dst_port="80" protocol="TCP"/></rules>"#).unwrap();

        let ruleset = Ruleset::load(file.path());
        assert_eq!(ruleset.rules, [Rule::block().dst_port(80).protocol(Protocol::Tcp)]);
    }

    fn arb_rule() -> impl Strategy<Value = Rule> {
        (
            any::<bool>(),
            proptest::option::of(any::<[u8; 4]>()),
            proptest::option::of(any::<[u8; 4]>()),
            proptest::option::of(0u16..4),
            proptest::option::of(0u16..4),
            proptest::option::of(prop_oneof![Just(Protocol::Tcp), Just(Protocol::Udp)]),
        )
            .prop_map(|(allow, src, dst, sport, dport, protocol)| Rule {
                action: if allow { RuleAction::Allow } else { RuleAction::Block },
                src_ip: src.map(Ipv4Addr::from),
                dst_ip: dst.map(Ipv4Addr::from),
                src_port: sport,
                dst_port: dport,
                protocol,
            })
    }

    proptest! {
        #[test]
        fn evaluation_is_deterministic(
            rules in proptest::collection::vec(arb_rule(), 0..6),
            default_action in any::<bool>(),
            frame in proptest::collection::vec(any::<u8>(), 0..80),
        ) {
            let ruleset = Ruleset::new(rules, default_action);
            prop_assert_eq!(ruleset.evaluate(&frame), ruleset.evaluate(&frame));
        }

        #[test]
        fn catch_all_rule_decides_every_ipv4_frame(
            allow in any::<bool>(),
            protocol in prop_oneof![Just(ICMP), Just(TCP), Just(UDP), Just(47u8)],
            src in any::<[u8; 4]>(),
            dst in any::<[u8; 4]>(),
        ) {
            let action = if allow { RuleAction::Allow } else { RuleAction::Block };
            let ruleset = Ruleset::new(vec![Rule::new(action)], !allow);
            let frame = ipv4_frame(protocol, Ipv4Addr::from(src), Ipv4Addr::from(dst), Some((1, 2)));
            prop_assert_eq!(ruleset.evaluate(&frame), allow);
        }

        #[test]
        fn decision_matches_first_decisive_verdict(
            rules in proptest::collection::vec(arb_rule(), 0..6),
            sport in 0u16..4,
            dport in 0u16..4,
        ) {
            let frame = tcp_frame(Ipv4Addr::new(1, 1, 1, 1), Ipv4Addr::new(2, 2, 2, 2), sport, dport);
            let view = FrameView::parse(&frame);
            let ruleset = Ruleset::new(rules.clone(), true);

            let expected = rules
                .iter()
                .map(|rule| rule.verdict(&view))
                .find(|verdict| *verdict != Verdict::Undecided)
                .map(|verdict| verdict == Verdict::Allow)
                .unwrap_or(true);
            prop_assert_eq!(ruleset.evaluate(&frame), expected);
        }
    }
}
