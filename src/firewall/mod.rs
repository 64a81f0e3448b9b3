pub mod rule;
pub mod ruleset;
pub mod source;

pub use rule::{Protocol, Rule, RuleAction, Verdict};
pub use ruleset::{ConfigIssue, Decision, Import, Ruleset};
pub use source::{JsonRuleSource, RuleDocument, RuleEntry, RuleSource, XmlRuleSource};
