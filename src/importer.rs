use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::error::{Result, RevlensError};
use crate::ledger;
use crate::mapper::{self, ColumnMapping, ColumnWarning, Detection, MappingField};
use crate::metrics;
use crate::models::{ParsedCsv, Transaction};
use crate::rules::{self, RuleOutcome};
use crate::store::KeyValueStore;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Tokenize a CSV file. The header is the first row with at least two
/// non-empty cells, which skips the one-line preamble some report exports
/// carry. Fully blank rows are dropped.
pub fn read_csv(file_path: &Path) -> Result<ParsedCsv> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(std::io::BufReader::new(file));

    let mut parsed = ParsedCsv::default();
    let mut found_header = false;
    for result in rdr.records() {
        let record = result?;
        let cells: Vec<String> = record.iter().map(str::to_string).collect();
        let filled = cells.iter().filter(|c| !c.is_empty()).count();
        if !found_header {
            if filled >= 2 {
                parsed.headers = cells;
                found_header = true;
            }
            continue;
        }
        if filled > 0 {
            parsed.rows.push(cells);
        }
    }
    if !found_header {
        return Err(RevlensError::NoHeaders(file_path.display().to_string()));
    }
    Ok(parsed)
}

fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

fn file_name(file_path: &Path) -> &str {
    file_path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

fn already_imported(conn: &Connection, kind: &str, checksum: &str) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT 1 FROM imports WHERE kind = ?1 AND checksum = ?2")?;
    Ok(stmt.exists(rusqlite::params![kind, checksum])?)
}

fn record_import<'a>(
    conn: &Connection,
    file_path: &Path,
    kind: &str,
    checksum: &str,
    dates: impl Iterator<Item = &'a str>,
    record_count: usize,
) -> Result<i64> {
    let dates: Vec<&str> = dates.filter(|d| !d.is_empty()).collect();
    conn.execute(
        "INSERT INTO imports (filename, kind, record_count, date_range_start, date_range_end, checksum) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            file_name(file_path),
            kind,
            record_count as i64,
            dates.iter().min().copied(),
            dates.iter().max().copied(),
            checksum,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

// ---------------------------------------------------------------------------
// Amazon Associates
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct AmazonOptions {
    /// Manual corrections applied on top of the detected mapping.
    pub overrides: Vec<(MappingField, Option<usize>)>,
    pub channel: Option<String>,
    pub report_year: Option<i32>,
}

#[derive(Debug)]
pub struct AmazonImport {
    pub detection: Detection,
    pub mapping: ColumnMapping,
    pub headers: Vec<String>,
    pub warnings: Vec<(MappingField, ColumnWarning)>,
    pub imported: usize,
    pub duplicate_file: bool,
}

/// Detect, validate and import an Amazon Associates report. The confirmed
/// mapping is saved under the file's header signature.
pub fn import_amazon(
    conn: &Connection,
    file_path: &Path,
    store: &dyn KeyValueStore,
    options: &AmazonOptions,
) -> Result<AmazonImport> {
    let csv = read_csv(file_path)?;
    let detection = mapper::auto_detect(&csv.headers, file_name(file_path), store);
    let mapping = options
        .overrides
        .iter()
        .fold(detection.mapping, |m, (field, col)| m.assign(*field, *col));
    // a saved mapping was confirmed before, so only re-check it when edited
    let warnings = if detection.from_saved && options.overrides.is_empty() {
        Vec::new()
    } else {
        mapper::validate_mapping(&mapping, &csv.rows)
    };

    let checksum = compute_checksum(file_path)?;
    if already_imported(conn, "amazon", &checksum)? {
        return Ok(AmazonImport {
            detection,
            mapping,
            headers: csv.headers,
            warnings,
            imported: 0,
            duplicate_file: true,
        });
    }

    mapping.require_fields()?;

    let records = metrics::amazon_records(
        &mapping,
        &csv.rows,
        detection.source_hint,
        options.channel.as_deref(),
        options.report_year,
    );
    let tx = conn.unchecked_transaction()?;
    let import_id = record_import(
        &tx,
        file_path,
        "amazon",
        &checksum,
        records.iter().map(|r| r.date.as_str()),
        records.len(),
    )?;
    let imported = metrics::insert_amazon(&tx, &records, Some(import_id))?;
    tx.commit()?;
    mapper::persist(store, &mapper::header_signature(&csv.headers), &mapping)?;
    tracing::info!(
        file = file_name(file_path),
        imported,
        source = detection.source_hint.key(),
        from_saved = detection.from_saved,
        "amazon report imported"
    );

    Ok(AmazonImport {
        detection,
        mapping,
        headers: csv.headers,
        warnings,
        imported,
        duplicate_file: false,
    })
}

// ---------------------------------------------------------------------------
// YouTube Analytics
// ---------------------------------------------------------------------------

pub struct YouTubeImport {
    pub imported: usize,
    pub duplicate_file: bool,
}

pub fn import_youtube(
    conn: &Connection,
    file_path: &Path,
    channel: Option<&str>,
    report_year: Option<i32>,
) -> Result<YouTubeImport> {
    let csv = read_csv(file_path)?;
    let columns = metrics::youtube_detect(&csv.headers);
    let missing = columns.missing_required();
    if !missing.is_empty() {
        return Err(RevlensError::MissingMapping(missing.join(", ")));
    }

    let checksum = compute_checksum(file_path)?;
    if already_imported(conn, "youtube", &checksum)? {
        return Ok(YouTubeImport {
            imported: 0,
            duplicate_file: true,
        });
    }

    let records = metrics::youtube_records(&columns, &csv.rows, channel, report_year);
    let tx = conn.unchecked_transaction()?;
    let import_id = record_import(
        &tx,
        file_path,
        "youtube",
        &checksum,
        records.iter().map(|r| r.publish_date.as_str()),
        records.len(),
    )?;
    let imported = metrics::insert_youtube(&tx, &records, Some(import_id))?;
    tx.commit()?;
    tracing::info!(file = file_name(file_path), imported, "youtube report imported");

    Ok(YouTubeImport {
        imported,
        duplicate_file: false,
    })
}

// ---------------------------------------------------------------------------
// Ledger transactions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LedgerColumn {
    Date,
    Description,
    Amount,
    Account,
    Payee,
    Merchant,
    Location,
}

const LEDGER_HEADERS: &[(LedgerColumn, &[&str])] = &[
    (LedgerColumn::Date, &["date", "posted date", "transaction date"]),
    (LedgerColumn::Description, &["description", "details", "name"]),
    (LedgerColumn::Amount, &["amount"]),
    (LedgerColumn::Account, &["account", "account name"]),
    (LedgerColumn::Payee, &["payee", "payee id"]),
    (LedgerColumn::Merchant, &["merchant", "merchant id"]),
    (LedgerColumn::Location, &["location", "location id"]),
];

#[derive(Debug, Default, PartialEq)]
pub struct LedgerImport {
    pub imported: usize,
    pub classified: usize,
    pub skipped_by_rule: usize,
    pub duplicates: usize,
    pub duplicate_file: bool,
}

/// Import ledger transactions, running active rules on each row. An
/// `account` column overrides `default_account` per row. Columns other than
/// the known ones land in the transaction metadata under their header label.
pub fn import_ledger(
    conn: &Connection,
    file_path: &Path,
    default_account: Option<&str>,
) -> Result<LedgerImport> {
    let default_account_id = match default_account {
        Some(name) => Some(ledger::find_account(conn, name)?.id),
        None => None,
    };
    let csv = read_csv(file_path)?;

    let mut columns: BTreeMap<usize, LedgerColumn> = BTreeMap::new();
    for (idx, header) in csv.headers.iter().enumerate() {
        let header = mapper::normalize_header(header);
        if let Some((col, _)) = LEDGER_HEADERS
            .iter()
            .find(|(col, names)| names.contains(&header.as_str()) && !columns.values().any(|c| c == col))
        {
            columns.insert(idx, *col);
        }
    }
    let index_of = |wanted: LedgerColumn| columns.iter().find(|(_, c)| **c == wanted).map(|(i, _)| *i);
    let missing: Vec<&str> = [
        (LedgerColumn::Date, "date"),
        (LedgerColumn::Description, "description"),
        (LedgerColumn::Amount, "amount"),
    ]
    .into_iter()
    .filter(|(col, _)| index_of(*col).is_none())
    .map(|(_, name)| name)
    .collect();
    if !missing.is_empty() {
        return Err(RevlensError::MissingMapping(missing.join(", ")));
    }

    let checksum = compute_checksum(file_path)?;
    if already_imported(conn, "ledger", &checksum)? {
        return Ok(LedgerImport {
            duplicate_file: true,
            ..Default::default()
        });
    }

    let rules = rules::load_rules(conn)?;
    let accounts = ledger::load_accounts(conn)?;

    let mut parsed = Vec::with_capacity(csv.rows.len());
    for row in &csv.rows {
        let mut txn = Transaction {
            account_id: default_account_id,
            ..Default::default()
        };
        for (idx, value) in row.iter().enumerate() {
            let value = value.trim();
            let optional = || (!value.is_empty()).then(|| value.to_string());
            match columns.get(&idx) {
                Some(LedgerColumn::Date) => txn.date = metrics::normalize_date(value),
                Some(LedgerColumn::Description) => txn.description = value.to_string(),
                Some(LedgerColumn::Amount) => txn.amount = metrics::parse_number(value),
                Some(LedgerColumn::Account) if !value.is_empty() => {
                    let account = accounts
                        .iter()
                        .find(|a| a.name.eq_ignore_ascii_case(value))
                        .ok_or_else(|| RevlensError::UnknownAccount(value.to_string()))?;
                    txn.account_id = Some(account.id);
                }
                Some(LedgerColumn::Account) => {}
                Some(LedgerColumn::Payee) => txn.payee_id = optional(),
                Some(LedgerColumn::Merchant) => txn.merchant_id = optional(),
                Some(LedgerColumn::Location) => txn.location_id = optional(),
                None => {
                    if let (Some(label), false) = (csv.headers.get(idx), value.is_empty()) {
                        txn.metadata.insert(label.clone(), value.to_string());
                    }
                }
            }
        }
        if txn.date.is_empty() || txn.description.is_empty() {
            continue;
        }
        parsed.push(txn);
    }

    // checksum, rows and hit counts land together or not at all
    let tx = conn.unchecked_transaction()?;
    let import_id = record_import(
        &tx,
        file_path,
        "ledger",
        &checksum,
        parsed.iter().map(|t| t.date.as_str()),
        parsed.len(),
    )?;

    let mut result = LedgerImport::default();
    for txn in &parsed {
        if ledger::is_duplicate(&tx, txn)? {
            result.duplicates += 1;
            continue;
        }
        let to_insert = match rules::apply_rules(txn, &rules, &accounts) {
            RuleOutcome::Unmatched => txn.clone(),
            RuleOutcome::Skip { rule_id } => {
                if let Some(id) = rule_id {
                    rules::record_hit(&tx, id)?;
                }
                result.skipped_by_rule += 1;
                continue;
            }
            RuleOutcome::Enriched(enriched) => {
                if let Some(id) = enriched.rule_id {
                    rules::record_hit(&tx, id)?;
                }
                result.classified += 1;
                enriched
            }
        };
        ledger::insert_transaction(&tx, &to_insert, Some(import_id))?;
        result.imported += 1;
    }
    tx.commit()?;
    tracing::info!(
        file = file_name(file_path),
        imported = result.imported,
        classified = result.classified,
        skipped = result.skipped_by_rule,
        "ledger imported"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use crate::models::{BasicCondition, ConditionField, ConditionOperator, Logic, ReconciliationRule, RuleCondition, SourceHint};
    use crate::store::{MemoryStore, SqliteStore};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_read_csv_skips_preamble_and_blank_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "fees.csv",
            "Fee-Earnings reports from 2024-01-01 to 2024-01-31\n\
             Date,ASIN,Ad Fees\n\
             2024-01-01, B0001 ,$1.00\n\
             ,,\n\
             2024-01-02,B0002,$2.00\n",
        );
        let csv = read_csv(&path).unwrap();
        assert_eq!(csv.headers, vec!["Date", "ASIN", "Ad Fees"]);
        assert_eq!(csv.rows.len(), 2);
        assert_eq!(csv.rows[0][1], "B0001");
    }

    #[test]
    fn test_read_csv_without_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "empty.csv", "just one cell\n");
        assert!(matches!(read_csv(&path), Err(RevlensError::NoHeaders(_))));
    }

    #[test]
    fn test_import_amazon_saves_mapping_and_dedupes_file() {
        let (dir, conn) = test_db();
        let store = SqliteStore::new(&conn);
        let path = write(
            dir.path(),
            "earnings.csv",
            "Date,ASIN,Product Title,Ad Fees\n2024-01-01,B000123,Widget,$1.50\n2024-01-02,B000123,Widget,$2.50\n",
        );
        let result = import_amazon(&conn, &path, &store, &AmazonOptions::default()).unwrap();
        assert_eq!(result.imported, 2);
        assert!(!result.duplicate_file);
        assert!(!result.detection.from_saved);
        assert_eq!(result.detection.source_hint, SourceHint::Auto);
        assert!(result.warnings.is_empty());
        assert_eq!(count(&conn, "amazon_metrics"), 2);
        assert!(mapper::load_saved(&store, &result.headers).is_some());

        let again = import_amazon(&conn, &path, &store, &AmazonOptions::default()).unwrap();
        assert!(again.duplicate_file);
        assert!(again.detection.from_saved);
        assert_eq!(count(&conn, "amazon_metrics"), 2);
    }

    #[test]
    fn test_import_amazon_requires_asin_and_revenue() {
        let (dir, conn) = test_db();
        let store = MemoryStore::new();
        let path = write(dir.path(), "bad.csv", "Date,Product Title\n2024-01-01,Widget\n");
        let err = import_amazon(&conn, &path, &store, &AmazonOptions::default()).unwrap_err();
        assert!(matches!(err, RevlensError::MissingMapping(_)));
        assert_eq!(count(&conn, "imports"), 0);
    }

    #[test]
    fn test_import_amazon_with_overrides() {
        let (dir, conn) = test_db();
        let store = MemoryStore::new();
        let path = write(dir.path(), "odd.csv", "Day,Product,Payout\n2024-03-01,B0009,4.00\n");
        let options = AmazonOptions {
            overrides: vec![
                (MappingField::Asin, Some(1)),
                (MappingField::Revenue, Some(2)),
            ],
            channel: Some("Main".to_string()),
            report_year: Some(2024),
        };
        let result = import_amazon(&conn, &path, &store, &options).unwrap();
        assert_eq!(result.imported, 1);
        assert_eq!(result.mapping.date, Some(0));
        let saved = mapper::load_saved(&store, &result.headers).unwrap();
        assert_eq!(saved, result.mapping);
        let records = metrics::load_amazon(&conn, Some(2024)).unwrap();
        assert_eq!(records[0].asin, "B0009");
        assert_eq!(records[0].channel.as_deref(), Some("Main"));
    }

    #[test]
    fn test_import_youtube() {
        let (dir, conn) = test_db();
        let path = write(
            dir.path(),
            "yt.csv",
            "Content,Video title,Video publish time,Views,Estimated revenue (USD)\n\
             Total,,,3000,12.00\n\
             abc,First,\"Mar 5, 2024\",2000,8.00\n",
        );
        let result = import_youtube(&conn, &path, Some("Main"), None).unwrap();
        assert_eq!(result.imported, 1);
        assert!(import_youtube(&conn, &path, None, None).unwrap().duplicate_file);
    }

    #[test]
    fn test_import_youtube_missing_columns() {
        let (dir, conn) = test_db();
        let path = write(dir.path(), "yt.csv", "Views,Title\n10,x\n");
        assert!(matches!(
            import_youtube(&conn, &path, None, None),
            Err(RevlensError::MissingMapping(_))
        ));
    }

    #[test]
    fn test_import_ledger_applies_rules() {
        let (dir, conn) = test_db();
        ledger::add_account(&conn, "Checking", "checking").unwrap();
        let memo_rule = ReconciliationRule {
            name: "Client lunches".to_string(),
            conditions: vec![RuleCondition::Basic(BasicCondition {
                field: ConditionField::Metadata,
                operator: ConditionOperator::Contains,
                value: "client".to_string(),
                metadata_key: Some("Memo".to_string()),
                next_logic: Logic::And,
            })],
            set_category_id: Some("meals".to_string()),
            assign_tag_ids: vec!["billable".to_string()],
            ..Default::default()
        };
        let transfer_rule = ReconciliationRule {
            name: "Transfers".to_string(),
            conditions: vec![RuleCondition::Basic(BasicCondition {
                field: ConditionField::Description,
                operator: ConditionOperator::StartsWith,
                value: "Transfer".to_string(),
                metadata_key: None,
                next_logic: Logic::And,
            })],
            skip_import: true,
            ..Default::default()
        };
        rules::insert_rule(&conn, &memo_rule).unwrap();
        rules::insert_rule(&conn, &transfer_rule).unwrap();

        let path = write(
            dir.path(),
            "ledger.csv",
            "Date,Description,Amount,Memo\n\
             01/15/2024,Cafe Luna,-42.00,lunch with client\n\
             01/16/2024,Transfer to savings,-500.00,\n\
             01/17/2024,Hardware store,(19.99),\n",
        );
        let result = import_ledger(&conn, &path, Some("Checking")).unwrap();
        assert_eq!(
            result,
            LedgerImport {
                imported: 2,
                classified: 1,
                skipped_by_rule: 1,
                duplicates: 0,
                duplicate_file: false,
            }
        );
        let txns = ledger::load_transactions(&conn, false).unwrap();
        assert_eq!(txns.len(), 2);
        let lunch = txns.iter().find(|t| t.description == "Cafe Luna").unwrap();
        assert_eq!(lunch.date, "2024-01-15");
        assert_eq!(lunch.category_id.as_deref(), Some("meals"));
        assert_eq!(lunch.tag_ids, vec!["billable".to_string()]);
        let hardware = txns.iter().find(|t| t.description == "Hardware store").unwrap();
        assert_eq!(hardware.amount, -19.99);
        assert!(hardware.metadata.is_empty());
    }

    #[test]
    fn test_failed_ledger_import_can_be_retried() {
        let (dir, conn) = test_db();
        ledger::add_account(&conn, "Checking", "checking").unwrap();
        conn.execute_batch(
            "CREATE TRIGGER fail_hardware BEFORE INSERT ON transactions \
             WHEN NEW.description = 'Hardware store' \
             BEGIN SELECT RAISE(ABORT, 'simulated write failure'); END;",
        )
        .unwrap();
        let path = write(
            dir.path(),
            "ledger.csv",
            "Date,Description,Amount\n2024-01-15,Cafe Luna,-42.00\n2024-01-17,Hardware store,-19.99\n",
        );
        assert!(matches!(
            import_ledger(&conn, &path, Some("Checking")),
            Err(RevlensError::Db(_))
        ));
        assert_eq!(count(&conn, "imports"), 0);
        assert_eq!(count(&conn, "transactions"), 0);

        conn.execute_batch("DROP TRIGGER fail_hardware;").unwrap();
        let retry = import_ledger(&conn, &path, Some("Checking")).unwrap();
        assert!(!retry.duplicate_file);
        assert_eq!(retry.imported, 2);
        assert_eq!(count(&conn, "transactions"), 2);
    }

    #[test]
    fn test_failed_amazon_import_can_be_retried() {
        let (dir, conn) = test_db();
        let store = SqliteStore::new(&conn);
        conn.execute_batch(
            "CREATE TRIGGER fail_metrics BEFORE INSERT ON amazon_metrics \
             BEGIN SELECT RAISE(ABORT, 'simulated write failure'); END;",
        )
        .unwrap();
        let path = write(
            dir.path(),
            "earnings.csv",
            "Date,ASIN,Ad Fees\n2024-01-01,B000123,$1.50\n",
        );
        assert!(import_amazon(&conn, &path, &store, &AmazonOptions::default()).is_err());
        assert_eq!(count(&conn, "imports"), 0);
        assert!(mapper::load_saved(&store, &read_csv(&path).unwrap().headers).is_none());

        conn.execute_batch("DROP TRIGGER fail_metrics;").unwrap();
        let retry = import_amazon(&conn, &path, &store, &AmazonOptions::default()).unwrap();
        assert!(!retry.duplicate_file);
        assert_eq!(retry.imported, 1);
    }

    #[test]
    fn test_saved_mapping_skips_validation_unless_edited() {
        let (dir, conn) = test_db();
        let store = MemoryStore::new();
        let path = write(
            dir.path(),
            "fees.csv",
            "Date,ASIN,Ad Fees,Clicks\n2024-01-01,B0001,$1.00,lots\n",
        );
        let first = import_amazon(&conn, &path, &store, &AmazonOptions::default()).unwrap();
        assert!(first.warnings.contains(&(MappingField::Clicks, ColumnWarning::NoData)));

        let again = import_amazon(&conn, &path, &store, &AmazonOptions::default()).unwrap();
        assert!(again.detection.from_saved);
        assert!(again.warnings.is_empty());

        let edited = AmazonOptions {
            overrides: vec![(MappingField::Title, None)],
            ..Default::default()
        };
        let third = import_amazon(&conn, &path, &store, &edited).unwrap();
        assert!(third.warnings.contains(&(MappingField::Clicks, ColumnWarning::NoData)));
    }

    #[test]
    fn test_import_ledger_unknown_account() {
        let (dir, conn) = test_db();
        let path = write(dir.path(), "ledger.csv", "Date,Description,Amount\n");
        assert!(matches!(
            import_ledger(&conn, &path, Some("Ghost")),
            Err(RevlensError::UnknownAccount(_))
        ));
    }

    #[test]
    fn test_import_ledger_account_column() {
        let (dir, conn) = test_db();
        let checking = ledger::add_account(&conn, "Checking", "checking").unwrap();
        let card = ledger::add_account(&conn, "Card", "credit_card").unwrap();
        let path = write(
            dir.path(),
            "ledger.csv",
            "Date,Description,Amount,Account\n\
             2024-02-01,Coffee,-4.50,card\n\
             2024-02-02,Deposit,900.00,\n",
        );
        let result = import_ledger(&conn, &path, Some("Checking")).unwrap();
        assert_eq!(result.imported, 2);
        let txns = ledger::load_transactions(&conn, false).unwrap();
        assert_eq!(txns[0].account_id, Some(card));
        assert_eq!(txns[1].account_id, Some(checking));

        let other = write(dir.path(), "other.csv", "Date,Description,Amount,Account\n2024-02-03,Lunch,-9.00,Savings\n");
        assert!(matches!(
            import_ledger(&conn, &other, None),
            Err(RevlensError::UnknownAccount(_))
        ));
    }
}
