use crate::error::RulesetError;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const ROOT_TAG: &str = "rules";

/// ルールセットファイルの1エントリ
///
/// タグ (`allow` / `block`) と属性の文字列をそのまま保持する。値の解釈は `Ruleset::import` が行う。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleEntry {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    /// ルールとして読めなかった要素 (JSONのオブジェクト以外の値) の表記
    pub malformed: Option<String>,
}

impl RuleEntry {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleDocument {
    /// ルートコンテナの `default` 属性
    pub default: Option<String>,
    pub entries: Vec<RuleEntry>,
}

pub trait RuleSource {
    fn read(&self) -> Result<RuleDocument, RulesetError>;
}

fn read_file(path: &Path) -> Result<String, RulesetError> {
    fs::read_to_string(path).map_err(|source| RulesetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// 拡張子でソースを選ぶ。`.json` 以外はXMLとして扱う
pub fn source_for_path(path: &Path) -> Result<Box<dyn RuleSource>, RulesetError> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        Ok(Box::new(JsonRuleSource::from_path(path)?))
    } else {
        Ok(Box::new(XmlRuleSource::from_path(path)?))
    }
}

/// `<rules><allow .../><block .../></rules>` 形式
pub struct XmlRuleSource {
    text: String,
}

impl XmlRuleSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn from_path(path: &Path) -> Result<Self, RulesetError> {
        Ok(Self::new(read_file(path)?))
    }
}

impl RuleSource for XmlRuleSource {
    fn read(&self) -> Result<RuleDocument, RulesetError> {
        let doc = roxmltree::Document::parse(&self.text)?;
        let root = doc.root_element();
        if !root.has_tag_name(ROOT_TAG) {
            return Err(RulesetError::MissingRoot(ROOT_TAG));
        }

        let entries = root
            .children()
            .filter(|node| node.is_element())
            .map(|node| RuleEntry {
                tag: node.tag_name().name().to_string(),
                attributes: node
                    .attributes()
                    .map(|attr| (attr.name().to_string(), attr.value().to_string()))
                    .collect(),
                malformed: None,
            })
            .collect();

        Ok(RuleDocument {
            default: root.attribute("default").map(str::to_string),
            entries,
        })
    }
}

/// `{"default": "allow", "rules": [{"action": "block", "dst_port": 80}]}` 形式
///
/// `action` がXMLのタグに相当する。数値の属性は文字列に変換して渡す。
pub struct JsonRuleSource {
    text: String,
}

impl JsonRuleSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn from_path(path: &Path) -> Result<Self, RulesetError> {
        Ok(Self::new(read_file(path)?))
    }
}

/// JSONルールセットの文書構造
///
/// `rules` の要素は1件ずつ解釈する。オブジェクト以外の要素があってもファイル全体は失敗させない。
#[derive(Deserialize)]
struct JsonDocument {
    #[serde(default)]
    default: Option<Value>,
    rules: Option<Vec<Value>>,
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn entry_from_object(object: &Map<String, Value>) -> RuleEntry {
    let mut entry = RuleEntry::default();
    for (name, value) in object {
        if name == "action" {
            entry.tag = value_to_string(value);
        } else {
            entry.attributes.insert(name.clone(), value_to_string(value));
        }
    }
    entry
}

impl RuleSource for JsonRuleSource {
    fn read(&self) -> Result<RuleDocument, RulesetError> {
        let doc: JsonDocument = serde_json::from_str(&self.text)?;
        let rules = doc.rules.ok_or(RulesetError::MissingRoot(ROOT_TAG))?;

        let entries = rules
            .iter()
            .map(|rule| match rule.as_object() {
                Some(object) => entry_from_object(object),
                None => RuleEntry {
                    malformed: Some(rule.to_string()),
                    ..RuleEntry::default()
                },
            })
            .collect();

        Ok(RuleDocument {
            default: doc.default.as_ref().map(value_to_string),
            entries,
        })
    }
}
