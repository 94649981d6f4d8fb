use std::collections::BTreeMap;

use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::{Result, RevlensError};
use crate::models::{Account, Transaction};

pub fn add_account(conn: &Connection, name: &str, account_type: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO accounts (name, account_type) VALUES (?1, ?2)",
        rusqlite::params![name, account_type],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn load_accounts(conn: &Connection) -> Result<Vec<Account>> {
    let mut stmt = conn.prepare("SELECT id, name, account_type FROM accounts ORDER BY name")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Account {
                id: row.get(0)?,
                name: row.get(1)?,
                account_type: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn find_account(conn: &Connection, name: &str) -> Result<Account> {
    conn.query_row(
        "SELECT id, name, account_type FROM accounts WHERE name = ?1",
        [name],
        |row| {
            Ok(Account {
                id: row.get(0)?,
                name: row.get(1)?,
                account_type: row.get(2)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| RevlensError::UnknownAccount(name.to_string()))
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

const TXN_COLUMNS: &str = "id, account_id, date, description, amount, payee_id, merchant_id, \
     location_id, category_id, user_id, txn_type, balance_effect, tag_ids, metadata, rule_id";

fn txn_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let tag_ids: String = row.get(12)?;
    let metadata: String = row.get(13)?;
    Ok(Transaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        date: row.get(2)?,
        description: row.get(3)?,
        amount: row.get(4)?,
        payee_id: row.get(5)?,
        merchant_id: row.get(6)?,
        location_id: row.get(7)?,
        category_id: row.get(8)?,
        user_id: row.get(9)?,
        txn_type: row.get(10)?,
        balance_effect: row.get(11)?,
        tag_ids: serde_json::from_str(&tag_ids).unwrap_or_default(),
        metadata: serde_json::from_str::<BTreeMap<String, String>>(&metadata).unwrap_or_default(),
        rule_id: row.get(14)?,
    })
}

pub fn is_duplicate(conn: &Connection, txn: &Transaction) -> Result<bool> {
    let mut stmt = conn.prepare_cached(
        "SELECT 1 FROM transactions WHERE account_id IS ?1 AND date = ?2 AND amount = ?3 AND description = ?4",
    )?;
    Ok(stmt.exists(rusqlite::params![
        txn.account_id,
        txn.date,
        txn.amount,
        txn.description
    ])?)
}

pub fn insert_transaction(conn: &Connection, txn: &Transaction, import_id: Option<i64>) -> Result<i64> {
    conn.execute(
        "INSERT INTO transactions (account_id, date, description, amount, payee_id, merchant_id, \
         location_id, category_id, user_id, txn_type, balance_effect, tag_ids, metadata, rule_id, import_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        rusqlite::params![
            txn.account_id,
            txn.date,
            txn.description,
            txn.amount,
            txn.payee_id,
            txn.merchant_id,
            txn.location_id,
            txn.category_id,
            txn.user_id,
            txn.txn_type,
            txn.balance_effect,
            serde_json::to_string(&txn.tag_ids)?,
            serde_json::to_string(&txn.metadata)?,
            txn.rule_id,
            import_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Included transactions, oldest first. `unclassified_only` limits the set
/// to those no rule has matched yet.
pub fn load_transactions(conn: &Connection, unclassified_only: bool) -> Result<Vec<Transaction>> {
    let filter = if unclassified_only {
        "WHERE is_excluded = 0 AND rule_id IS NULL"
    } else {
        "WHERE is_excluded = 0"
    };
    let sql = format!("SELECT {TXN_COLUMNS} FROM transactions {filter} ORDER BY date, id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], txn_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_classification(conn: &Connection, txn: &Transaction) -> Result<()> {
    let Some(id) = txn.id else {
        return Err(RevlensError::Other("Cannot update an unsaved transaction".to_string()));
    };
    conn.execute(
        "UPDATE transactions SET payee_id = ?1, merchant_id = ?2, location_id = ?3, category_id = ?4, \
         user_id = ?5, txn_type = ?6, balance_effect = ?7, tag_ids = ?8, rule_id = ?9 WHERE id = ?10",
        rusqlite::params![
            txn.payee_id,
            txn.merchant_id,
            txn.location_id,
            txn.category_id,
            txn.user_id,
            txn.txn_type,
            txn.balance_effect,
            serde_json::to_string(&txn.tag_ids)?,
            txn.rule_id,
            id,
        ],
    )?;
    Ok(())
}

pub fn exclude_transaction(conn: &Connection, id: i64, rule_id: Option<i64>) -> Result<()> {
    conn.execute(
        "UPDATE transactions SET is_excluded = 1, rule_id = ?1 WHERE id = ?2",
        rusqlite::params![rule_id, id],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_find_account() {
        let (_dir, conn) = test_db();
        let id = add_account(&conn, "Business Checking", "checking").unwrap();
        assert_eq!(find_account(&conn, "Business Checking").unwrap().id, id);
        assert!(matches!(
            find_account(&conn, "Nope"),
            Err(RevlensError::UnknownAccount(_))
        ));
    }

    #[test]
    fn test_transaction_round_trip() {
        let (_dir, conn) = test_db();
        let account_id = add_account(&conn, "Card", "credit_card").unwrap();
        let mut txn = Transaction {
            account_id: Some(account_id),
            date: "2024-05-02".to_string(),
            description: "Adobe".to_string(),
            amount: -54.99,
            tag_ids: vec!["software".to_string()],
            ..Default::default()
        };
        txn.metadata.insert("memo".to_string(), "annual plan".to_string());
        let id = insert_transaction(&conn, &txn, None).unwrap();

        let loaded = load_transactions(&conn, true).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, Some(id));
        assert_eq!(loaded[0].tag_ids, txn.tag_ids);
        assert_eq!(loaded[0].metadata.get("memo").map(String::as_str), Some("annual plan"));
        assert!(is_duplicate(&conn, &txn).unwrap());
    }

    #[test]
    fn test_update_and_exclude() {
        let (_dir, conn) = test_db();
        let txn = Transaction {
            date: "2024-05-02".to_string(),
            description: "Transfer".to_string(),
            amount: 100.0,
            ..Default::default()
        };
        let id = insert_transaction(&conn, &txn, None).unwrap();
        let mut loaded = load_transactions(&conn, false).unwrap().remove(0);
        loaded.category_id = Some("transfers".to_string());
        update_classification(&conn, &loaded).unwrap();
        assert_eq!(
            load_transactions(&conn, false).unwrap()[0].category_id.as_deref(),
            Some("transfers")
        );

        exclude_transaction(&conn, id, None).unwrap();
        assert!(load_transactions(&conn, false).unwrap().is_empty());
        assert!(update_classification(&conn, &txn).is_err());
    }
}
