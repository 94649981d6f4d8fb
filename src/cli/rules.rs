use std::collections::HashMap;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::{Result, RevlensError};
use crate::ledger;
use crate::models::{ReconciliationRule, Transaction};
use crate::rules::{self, RuleOutcome};

fn action_summary(rule: &ReconciliationRule) -> String {
    if rule.skip_import {
        return "skip import".to_string();
    }
    let sets = [
        ("category", &rule.set_category_id),
        ("payee", &rule.set_payee_id),
        ("merchant", &rule.set_merchant_id),
        ("location", &rule.set_location_id),
        ("user", &rule.set_user_id),
        ("type", &rule.set_type),
        ("balance", &rule.set_balance_effect),
    ];
    let mut parts: Vec<String> = sets
        .iter()
        .filter_map(|&(name, value)| value.as_ref().map(|v| format!("{name}={v}")))
        .collect();
    if !rule.assign_tag_ids.is_empty() {
        parts.push(format!("tags={}", rule.assign_tag_ids.join(",")));
    }
    parts.join(" ")
}

pub fn add(file: &str) -> Result<()> {
    let content = std::fs::read_to_string(file)?;
    let rule: ReconciliationRule = serde_json::from_str(&content)?;
    if rule.name.trim().is_empty() {
        return Err(RevlensError::Other("Rule needs a name".to_string()));
    }
    let conn = open_db()?;
    let id = rules::insert_rule(&conn, &rule)?;
    println!(
        "Added rule {id}: '{}' \u{2192} {}",
        rule.name,
        action_summary(&rule)
    );
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let rules = rules::load_rules(&conn)?;
    let hits: HashMap<i64, i64> = rules::hit_counts(&conn)?.into_iter().collect();

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Priority", "Conditions", "Action", "Hits"]);
    for rule in &rules {
        let id = rule.id.unwrap_or_default();
        table.add_row(vec![
            Cell::new(id),
            Cell::new(&rule.name),
            Cell::new(rule.priority),
            Cell::new(rules::describe(&rule.conditions)),
            Cell::new(action_summary(rule)),
            Cell::new(hits.get(&id).copied().unwrap_or(0)),
        ]);
    }
    println!("Rules\n{table}");
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let conn = open_db()?;
    let name = rules::deactivate_rule(&conn, id)?;
    println!("Deleted rule {id}: '{name}'");
    Ok(())
}

/// Dry run of the active rules against one record.
pub fn test(record: &str) -> Result<()> {
    let content = std::fs::read_to_string(record)?;
    let txn: Transaction = serde_json::from_str(&content)?;
    let conn = open_db()?;
    let rules = rules::load_rules(&conn)?;
    let accounts = ledger::load_accounts(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Conditions", "Matches"]);
    for rule in &rules {
        let matched = rules::evaluate(&txn, &rule.conditions, &accounts);
        table.add_row(vec![
            Cell::new(rule.id.unwrap_or_default()),
            Cell::new(&rule.name),
            Cell::new(rules::describe(&rule.conditions)),
            Cell::new(if matched { "yes".green() } else { "no".dimmed() }),
        ]);
    }
    println!("Rules\n{table}");

    match rules::apply_rules(&txn, &rules, &accounts) {
        RuleOutcome::Unmatched => println!("No rule matches."),
        RuleOutcome::Skip { rule_id } => println!(
            "{} rule {} skips this record",
            "Skip:".yellow().bold(),
            rule_id.unwrap_or_default()
        ),
        RuleOutcome::Enriched(enriched) => {
            println!("{}", "Result:".green().bold());
            println!("{}", serde_json::to_string_pretty(&enriched)?);
        }
    }
    Ok(())
}
