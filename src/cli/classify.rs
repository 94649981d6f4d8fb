use crate::cli::open_db;
use crate::error::Result;
use crate::rules::classify_ledger;

pub fn run(all: bool) -> Result<()> {
    let conn = open_db()?;
    let result = classify_ledger(&conn, all)?;
    println!(
        "{} classified, {} excluded, {} unmatched, {} unchanged",
        result.classified, result.excluded, result.unmatched, result.unchanged
    );
    Ok(())
}
