use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::ledger;

pub fn add(name: &str, account_type: &str) -> Result<()> {
    let conn = open_db()?;
    ledger::add_account(&conn, name, account_type)?;
    println!("Added account: {name}");
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let accounts = ledger::load_accounts(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Type"]);
    for account in accounts {
        table.add_row(vec![
            Cell::new(account.id),
            Cell::new(account.name),
            Cell::new(account.account_type),
        ]);
    }
    println!("Accounts\n{table}");
    Ok(())
}
