use regex::Regex;
use rusqlite::Connection;

use crate::error::{Result, RevlensError};
use crate::ledger;
use crate::models::{
    Account, BasicCondition, ConditionField, ConditionOperator, Logic, ReconciliationRule,
    RuleCondition, Transaction,
};

// ---------------------------------------------------------------------------
// Field extraction
// ---------------------------------------------------------------------------

/// Raw value a basic condition compares against.
#[derive(Debug, Clone, Copy, PartialEq)]
enum FieldValue<'a> {
    Text(Option<&'a str>),
    Amount(f64),
    Account(Option<i64>),
}

type Extractor = for<'a> fn(&'a Transaction, &'a BasicCondition) -> FieldValue<'a>;

fn description<'a>(t: &'a Transaction, _: &'a BasicCondition) -> FieldValue<'a> {
    FieldValue::Text(Some(t.description.as_str()))
}

fn amount<'a>(t: &'a Transaction, _: &'a BasicCondition) -> FieldValue<'a> {
    FieldValue::Amount(t.amount)
}

fn account_id<'a>(t: &'a Transaction, _: &'a BasicCondition) -> FieldValue<'a> {
    FieldValue::Account(t.account_id)
}

fn payee_id<'a>(t: &'a Transaction, _: &'a BasicCondition) -> FieldValue<'a> {
    FieldValue::Text(t.payee_id.as_deref())
}

fn merchant_id<'a>(t: &'a Transaction, _: &'a BasicCondition) -> FieldValue<'a> {
    FieldValue::Text(t.merchant_id.as_deref())
}

fn location_id<'a>(t: &'a Transaction, _: &'a BasicCondition) -> FieldValue<'a> {
    FieldValue::Text(t.location_id.as_deref())
}

fn metadata<'a>(t: &'a Transaction, c: &'a BasicCondition) -> FieldValue<'a> {
    let value = c
        .metadata_key
        .as_deref()
        .and_then(|key| t.metadata.get(key))
        .map(String::as_str);
    FieldValue::Text(value)
}

const FIELD_EXTRACTORS: &[(ConditionField, Extractor)] = &[
    (ConditionField::Description, description),
    (ConditionField::Amount, amount),
    (ConditionField::AccountId, account_id),
    (ConditionField::PayeeId, payee_id),
    (ConditionField::MerchantId, merchant_id),
    (ConditionField::LocationId, location_id),
    (ConditionField::Metadata, metadata),
];

fn extract<'a>(record: &'a Transaction, condition: &'a BasicCondition) -> FieldValue<'a> {
    FIELD_EXTRACTORS
        .iter()
        .find(|(field, _)| *field == condition.field)
        .map_or(FieldValue::Text(None), |(_, extractor)| {
            extractor(record, condition)
        })
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

fn regex_matches(pattern: &str, haystack: &str) -> bool {
    match Regex::new(pattern) {
        Ok(re) => re.is_match(haystack),
        Err(e) => {
            tracing::debug!(pattern, error = %e, "invalid regex in rule condition");
            false
        }
    }
}

/// Case-sensitive string comparison. A missing value reads as "".
fn match_text(value: Option<&str>, operator: ConditionOperator, expected: &str) -> bool {
    if operator == ConditionOperator::Exists {
        return value.is_some_and(|v| !v.is_empty());
    }
    let value = value.unwrap_or("");
    match operator {
        ConditionOperator::Contains => value.contains(expected),
        ConditionOperator::DoesNotContain => !value.contains(expected),
        ConditionOperator::StartsWith => value.starts_with(expected),
        ConditionOperator::EndsWith => value.ends_with(expected),
        ConditionOperator::Equals => value == expected,
        ConditionOperator::RegexMatch => regex_matches(expected, value),
        _ => false,
    }
}

fn match_amount(amount: f64, operator: ConditionOperator, expected: &str) -> bool {
    let Ok(target) = expected.trim().parse::<f64>() else {
        return false;
    };
    match operator {
        ConditionOperator::Equals => amount == target,
        ConditionOperator::GreaterThan => amount > target,
        ConditionOperator::LessThan => amount < target,
        _ => false,
    }
}

fn match_account(
    account_id: Option<i64>,
    operator: ConditionOperator,
    expected: &str,
    accounts: &[Account],
) -> bool {
    let Some(id) = account_id else {
        return false;
    };
    match operator {
        ConditionOperator::Equals => id.to_string() == expected.trim(),
        ConditionOperator::Contains => accounts
            .iter()
            .find(|a| a.id == id)
            .is_some_and(|a| a.name.contains(expected)),
        _ => false,
    }
}

fn evaluate_basic(record: &Transaction, condition: &BasicCondition, accounts: &[Account]) -> bool {
    let expected = condition.value.as_str();
    match extract(record, condition) {
        FieldValue::Text(value) => match_text(value, condition.operator, expected),
        FieldValue::Amount(amount) => match_amount(amount, condition.operator, expected),
        FieldValue::Account(id) => match_account(id, condition.operator, expected, accounts),
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

pub fn evaluate_node(record: &Transaction, condition: &RuleCondition, accounts: &[Account]) -> bool {
    match condition {
        RuleCondition::Group(group) => evaluate(record, &group.conditions, accounts),
        RuleCondition::Basic(basic) => evaluate_basic(record, basic, accounts),
    }
}

/// Fold a sibling sequence left to right. Each result is joined to the
/// running value with the *previous* sibling's `next_logic`; there is no
/// AND-over-OR precedence, so `[a OR, b AND, c]` is `(a || b) && c`.
/// An empty sequence is true.
pub fn evaluate(record: &Transaction, conditions: &[RuleCondition], accounts: &[Account]) -> bool {
    let mut result = true;
    let mut joiner: Option<Logic> = None;
    for condition in conditions {
        let matched = evaluate_node(record, condition, accounts);
        result = match joiner {
            None => matched,
            Some(Logic::And) => result && matched,
            Some(Logic::Or) => result || matched,
        };
        joiner = Some(condition.next_logic());
    }
    result
}

/// One-line human description of a condition sequence, e.g.
/// `description contains "Netflix" OR (amount greater_than "10")`.
pub fn describe(conditions: &[RuleCondition]) -> String {
    if conditions.is_empty() {
        return "(always)".to_string();
    }
    let mut out = String::new();
    for (i, condition) in conditions.iter().enumerate() {
        if i > 0 {
            out.push(' ');
            out.push_str(conditions[i - 1].next_logic().as_str());
            out.push(' ');
        }
        match condition {
            RuleCondition::Group(g) => {
                out.push('(');
                out.push_str(&describe(&g.conditions));
                out.push(')');
            }
            RuleCondition::Basic(b) => {
                let field = match (&b.field, &b.metadata_key) {
                    (ConditionField::Metadata, Some(key)) => format!("metadata.{key}"),
                    (field, _) => field.key().to_string(),
                };
                if b.operator == ConditionOperator::Exists {
                    out.push_str(&format!("{field} exists"));
                } else {
                    out.push_str(&format!("{field} {} {:?}", b.operator.key(), b.value));
                }
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Rule application
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    Unmatched,
    /// Matched a rule that drops the record from import.
    Skip { rule_id: Option<i64> },
    Enriched(Transaction),
}

pub fn first_match<'r>(
    record: &Transaction,
    rules: &'r [ReconciliationRule],
    accounts: &[Account],
) -> Option<&'r ReconciliationRule> {
    rules
        .iter()
        .find(|rule| evaluate(record, &rule.conditions, accounts))
}

/// Copy of `record` with the rule's set-fields and tags applied.
pub fn enrich(record: &Transaction, rule: &ReconciliationRule) -> Transaction {
    let mut next = record.clone();
    let sets = [
        (&rule.set_category_id, &mut next.category_id),
        (&rule.set_payee_id, &mut next.payee_id),
        (&rule.set_merchant_id, &mut next.merchant_id),
        (&rule.set_location_id, &mut next.location_id),
        (&rule.set_user_id, &mut next.user_id),
        (&rule.set_type, &mut next.txn_type),
        (&rule.set_balance_effect, &mut next.balance_effect),
    ];
    for (value, slot) in sets {
        if let Some(v) = value {
            *slot = Some(v.clone());
        }
    }
    for tag in &rule.assign_tag_ids {
        if !next.tag_ids.contains(tag) {
            next.tag_ids.push(tag.clone());
        }
    }
    next.rule_id = rule.id;
    next
}

/// Rules are tried in the given order; the first match decides.
pub fn apply_rules(
    record: &Transaction,
    rules: &[ReconciliationRule],
    accounts: &[Account],
) -> RuleOutcome {
    match first_match(record, rules, accounts) {
        None => RuleOutcome::Unmatched,
        Some(rule) if rule.skip_import => RuleOutcome::Skip { rule_id: rule.id },
        Some(rule) => RuleOutcome::Enriched(enrich(record, rule)),
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

pub fn insert_rule(conn: &Connection, rule: &ReconciliationRule) -> Result<i64> {
    let mut stored = rule.clone();
    stored.id = None;
    let definition = serde_json::to_string(&stored)?;
    conn.execute(
        "INSERT INTO rules (name, rule_category, priority, definition) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![rule.name, rule.rule_category, rule.priority, definition],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Active rules in evaluation order: priority first, then creation order.
pub fn load_rules(conn: &Connection) -> Result<Vec<ReconciliationRule>> {
    let mut stmt = conn.prepare(
        "SELECT id, definition FROM rules WHERE is_active = 1 ORDER BY priority DESC, id ASC",
    )?;
    let rows: Vec<(i64, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let mut rules = Vec::with_capacity(rows.len());
    for (id, definition) in rows {
        match serde_json::from_str::<ReconciliationRule>(&definition) {
            Ok(mut rule) => {
                rule.id = Some(id);
                rules.push(rule);
            }
            Err(e) => tracing::warn!(rule_id = id, error = %e, "skipping unreadable rule"),
        }
    }
    Ok(rules)
}

pub fn hit_counts(conn: &Connection) -> Result<Vec<(i64, i64)>> {
    let mut stmt = conn.prepare("SELECT id, hit_count FROM rules WHERE is_active = 1")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn record_hit(conn: &Connection, rule_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE rules SET hit_count = hit_count + 1 WHERE id = ?1",
        [rule_id],
    )?;
    Ok(())
}

pub fn deactivate_rule(conn: &Connection, id: i64) -> Result<String> {
    let row: std::result::Result<(String, i64), _> = conn.query_row(
        "SELECT name, is_active FROM rules WHERE id = ?1",
        [id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    );
    match row {
        Err(_) => Err(RevlensError::UnknownRule(id.to_string())),
        Ok((_, 0)) => Err(RevlensError::Other(format!("Rule {id} is already inactive"))),
        Ok((name, _)) => {
            conn.execute("UPDATE rules SET is_active = 0 WHERE id = ?1", [id])?;
            Ok(name)
        }
    }
}

// ---------------------------------------------------------------------------
// Retroactive classification
// ---------------------------------------------------------------------------

#[derive(Debug, Default, PartialEq)]
pub struct ClassifyResult {
    pub classified: usize,
    pub unmatched: usize,
    pub excluded: usize,
    /// Already carried the outcome this pass produced, or no longer match
    /// any rule and keep their earlier classification.
    pub unchanged: usize,
}

/// Run active rules over stored transactions. Without `all`, only
/// transactions no rule has touched yet are considered. Hit counts move
/// only when a transaction's rule actually changes, so repeated passes are
/// idempotent.
pub fn classify_ledger(conn: &Connection, all: bool) -> Result<ClassifyResult> {
    let rules = load_rules(conn)?;
    let accounts = ledger::load_accounts(conn)?;
    let transactions = ledger::load_transactions(conn, !all)?;

    let tx = conn.unchecked_transaction()?;
    let mut result = ClassifyResult::default();
    for txn in &transactions {
        let Some(txn_id) = txn.id else { continue };
        match apply_rules(txn, &rules, &accounts) {
            RuleOutcome::Unmatched if txn.rule_id.is_some() => result.unchanged += 1,
            RuleOutcome::Unmatched => result.unmatched += 1,
            RuleOutcome::Skip { rule_id } => {
                ledger::exclude_transaction(&tx, txn_id, rule_id)?;
                if let Some(id) = rule_id.filter(|_| rule_id != txn.rule_id) {
                    record_hit(&tx, id)?;
                }
                result.excluded += 1;
            }
            RuleOutcome::Enriched(enriched) if enriched.rule_id == txn.rule_id => {
                result.unchanged += 1;
            }
            RuleOutcome::Enriched(enriched) => {
                ledger::update_classification(&tx, &enriched)?;
                if let Some(id) = enriched.rule_id {
                    record_hit(&tx, id)?;
                }
                result.classified += 1;
            }
        }
    }
    tx.commit()?;
    tracing::info!(
        classified = result.classified,
        unmatched = result.unmatched,
        excluded = result.excluded,
        unchanged = result.unchanged,
        "classification pass finished"
    );
    Ok(result)
}
