use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub account_type: String,
}

/// A ledger entry as seen by the rule evaluator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Transaction {
    pub id: Option<i64>,
    pub account_id: Option<i64>,
    pub date: String,
    pub description: String,
    pub amount: f64,
    pub payee_id: Option<String>,
    pub merchant_id: Option<String>,
    pub location_id: Option<String>,
    pub category_id: Option<String>,
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub txn_type: Option<String>,
    pub balance_effect: Option<String>,
    pub tag_ids: Vec<String>,
    pub metadata: BTreeMap<String, String>,
    pub rule_id: Option<i64>,
}

// ---------------------------------------------------------------------------
// Rule conditions
// ---------------------------------------------------------------------------

/// How a condition combines with the sibling that follows it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Logic {
    #[default]
    And,
    Or,
}

impl Logic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionField {
    Description,
    Amount,
    AccountId,
    PayeeId,
    MerchantId,
    LocationId,
    Metadata,
}

impl ConditionField {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::Amount => "amount",
            Self::AccountId => "accountId",
            Self::PayeeId => "payeeId",
            Self::MerchantId => "merchantId",
            Self::LocationId => "locationId",
            Self::Metadata => "metadata",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Contains,
    DoesNotContain,
    StartsWith,
    EndsWith,
    Equals,
    RegexMatch,
    Exists,
    GreaterThan,
    LessThan,
}

impl ConditionOperator {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::DoesNotContain => "does_not_contain",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::Equals => "equals",
            Self::RegexMatch => "regex_match",
            Self::Exists => "exists",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicCondition {
    pub field: ConditionField,
    pub operator: ConditionOperator,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_key: Option<String>,
    #[serde(default)]
    pub next_logic: Logic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupCondition {
    #[serde(default)]
    pub conditions: Vec<RuleCondition>,
    #[serde(default)]
    pub next_logic: Logic,
}

/// A node in a condition tree: a leaf predicate or a nested sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RuleCondition {
    Basic(BasicCondition),
    Group(GroupCondition),
}

impl RuleCondition {
    pub fn next_logic(&self) -> Logic {
        match self {
            Self::Basic(c) => c.next_logic,
            Self::Group(g) => g.next_logic,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReconciliationRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub rule_category: String,
    /// Higher priorities are tried first.
    pub priority: i64,
    pub conditions: Vec<RuleCondition>,
    pub set_category_id: Option<String>,
    pub set_payee_id: Option<String>,
    pub set_merchant_id: Option<String>,
    pub set_location_id: Option<String>,
    pub set_user_id: Option<String>,
    pub set_type: Option<String>,
    pub set_balance_effect: Option<String>,
    pub assign_tag_ids: Vec<String>,
    pub skip_import: bool,
}

// ---------------------------------------------------------------------------
// Revenue report records
// ---------------------------------------------------------------------------

/// Which Amazon Associates report a file most likely came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceHint {
    CreatorConnections,
    Onsite,
    Auto,
}

impl SourceHint {
    pub fn key(&self) -> &'static str {
        match self {
            Self::CreatorConnections => "creator_connections",
            Self::Onsite => "onsite",
            Self::Auto => "auto",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "creator_connections" => Some(Self::CreatorConnections),
            "onsite" => Some(Self::Onsite),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AmazonMetric {
    pub id: Option<i64>,
    pub date: String,
    pub asin: String,
    pub title: String,
    pub revenue: f64,
    pub clicks: i64,
    pub ordered: i64,
    pub shipped: i64,
    pub tracking_id: Option<String>,
    pub category: Option<String>,
    pub campaign_title: Option<String>,
    pub source: SourceHint,
    pub channel: Option<String>,
    pub report_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct YouTubeMetric {
    pub id: Option<i64>,
    pub video_id: String,
    pub title: String,
    pub publish_date: String,
    pub views: i64,
    pub watch_hours: f64,
    pub subscribers: i64,
    pub impressions: i64,
    pub ctr: f64,
    pub revenue: f64,
    pub channel: Option<String>,
    pub report_year: Option<i32>,
}

/// Output of the CSV tokenizer: a header row plus data rows of trimmed cells.
#[derive(Debug, Clone, Default)]
pub struct ParsedCsv {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_tree_from_json() {
        let json = r#"[
            {"type": "basic", "field": "description", "operator": "contains", "value": "Netflix", "nextLogic": "OR"},
            {"type": "group", "nextLogic": "AND", "conditions": [
                {"type": "basic", "field": "metadata", "metadataKey": "memo", "operator": "exists"}
            ]}
        ]"#;
        let conditions: Vec<RuleCondition> = serde_json::from_str(json).unwrap();
        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].next_logic(), Logic::Or);
        match &conditions[1] {
            RuleCondition::Group(g) => match &g.conditions[0] {
                RuleCondition::Basic(b) => {
                    assert_eq!(b.field, ConditionField::Metadata);
                    assert_eq!(b.metadata_key.as_deref(), Some("memo"));
                    assert_eq!(b.next_logic, Logic::And);
                    assert!(b.value.is_empty());
                }
                other => panic!("expected basic condition, got {other:?}"),
            },
            other => panic!("expected group, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_operator_is_rejected() {
        let json = r#"{"type": "basic", "field": "description", "operator": "sounds_like", "value": "x"}"#;
        assert!(serde_json::from_str::<RuleCondition>(json).is_err());
    }

    #[test]
    fn test_rule_defaults() {
        let rule: ReconciliationRule = serde_json::from_str(r#"{"name": "Catch all"}"#).unwrap();
        assert!(rule.conditions.is_empty());
        assert!(!rule.skip_import);
        assert_eq!(rule.priority, 0);
        assert!(rule.id.is_none());
    }

    #[test]
    fn test_source_hint_keys() {
        for hint in [SourceHint::CreatorConnections, SourceHint::Onsite, SourceHint::Auto] {
            assert_eq!(SourceHint::from_key(hint.key()), Some(hint));
        }
        assert_eq!(SourceHint::from_key("bogus"), None);
    }
}
