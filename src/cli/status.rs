use crate::db::{get_connection, DB_FILE};
use crate::error::Result;
use crate::settings::load_settings;
use crate::store::SqliteStore;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let data_dir = std::path::PathBuf::from(&settings.data_dir);
    let db_path = data_dir.join(DB_FILE);

    println!("Data dir:   {}", data_dir.display());
    println!("Database:   {}", db_path.display());
    println!(
        "Channel:    {}",
        settings.channel().unwrap_or("(not set)")
    );

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `revlens init` to set up.");
        return Ok(());
    }

    let conn = get_connection(&db_path)?;
    let count = |sql: &str| -> Result<i64> { Ok(conn.query_row(sql, [], |r| r.get(0))?) };
    let accounts = count("SELECT count(*) FROM accounts")?;
    let transactions = count("SELECT count(*) FROM transactions WHERE is_excluded = 0")?;
    let unclassified =
        count("SELECT count(*) FROM transactions WHERE is_excluded = 0 AND rule_id IS NULL")?;
    let rules = count("SELECT count(*) FROM rules WHERE is_active = 1")?;
    let amazon = count("SELECT count(*) FROM amazon_metrics")?;
    let youtube = count("SELECT count(*) FROM youtube_metrics")?;
    let mappings = SqliteStore::new(&conn)
        .keys_with_prefix(crate::mapper::MAPPING_NAMESPACE)?
        .len();

    println!();
    println!("Accounts:        {accounts}");
    println!("Transactions:    {transactions}");
    println!("Unclassified:    {unclassified}");
    println!("Rules:           {rules}");
    println!("Amazon records:  {amazon}");
    println!("YouTube records: {youtube}");
    println!("Saved mappings:  {mappings}");
    Ok(())
}
