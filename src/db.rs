use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const DB_FILE: &str = "revlens.db";

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    account_type TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    kind TEXT NOT NULL,
    import_date TEXT DEFAULT (datetime('now')),
    record_count INTEGER,
    date_range_start TEXT,
    date_range_end TEXT,
    checksum TEXT
);

CREATE TABLE IF NOT EXISTS rules (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    rule_category TEXT NOT NULL DEFAULT '',
    priority INTEGER DEFAULT 0,
    definition TEXT NOT NULL,
    hit_count INTEGER DEFAULT 0,
    is_active INTEGER DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    account_id INTEGER,
    date TEXT NOT NULL,
    description TEXT NOT NULL,
    amount REAL NOT NULL,
    payee_id TEXT,
    merchant_id TEXT,
    location_id TEXT,
    category_id TEXT,
    user_id TEXT,
    txn_type TEXT,
    balance_effect TEXT,
    tag_ids TEXT NOT NULL DEFAULT '[]',
    metadata TEXT NOT NULL DEFAULT '{}',
    rule_id INTEGER,
    is_excluded INTEGER DEFAULT 0,
    import_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (account_id) REFERENCES accounts(id),
    FOREIGN KEY (rule_id) REFERENCES rules(id),
    FOREIGN KEY (import_id) REFERENCES imports(id)
);

CREATE TABLE IF NOT EXISTS amazon_metrics (
    id INTEGER PRIMARY KEY,
    import_id INTEGER,
    date TEXT NOT NULL,
    asin TEXT NOT NULL,
    title TEXT NOT NULL DEFAULT '',
    revenue REAL NOT NULL DEFAULT 0,
    clicks INTEGER NOT NULL DEFAULT 0,
    ordered INTEGER NOT NULL DEFAULT 0,
    shipped INTEGER NOT NULL DEFAULT 0,
    tracking_id TEXT,
    category TEXT,
    campaign_title TEXT,
    source TEXT NOT NULL DEFAULT 'auto',
    channel TEXT,
    report_year INTEGER,
    FOREIGN KEY (import_id) REFERENCES imports(id)
);

CREATE TABLE IF NOT EXISTS youtube_metrics (
    id INTEGER PRIMARY KEY,
    import_id INTEGER,
    video_id TEXT NOT NULL,
    title TEXT NOT NULL DEFAULT '',
    publish_date TEXT NOT NULL DEFAULT '',
    views INTEGER NOT NULL DEFAULT 0,
    watch_hours REAL NOT NULL DEFAULT 0,
    subscribers INTEGER NOT NULL DEFAULT 0,
    impressions INTEGER NOT NULL DEFAULT 0,
    ctr REAL NOT NULL DEFAULT 0,
    revenue REAL NOT NULL DEFAULT 0,
    channel TEXT,
    report_year INTEGER,
    FOREIGN KEY (import_id) REFERENCES imports(id)
);

CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT DEFAULT (datetime('now'))
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
