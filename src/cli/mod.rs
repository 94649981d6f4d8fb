pub mod accounts;
pub mod classify;
pub mod import;
pub mod init;
pub mod mapping;
pub mod report;
pub mod rules;
pub mod status;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::db::{get_connection, DB_FILE};
use crate::error::{Result, RevlensError};
use crate::settings::get_data_dir;

/// Open the configured database. Fails instead of creating an empty file
/// when `revlens init` has not been run.
pub(crate) fn open_db() -> Result<Connection> {
    let db_path = get_data_dir().join(DB_FILE);
    if !db_path.exists() {
        return Err(RevlensError::Other(
            "Database not found. Run `revlens init` first.".to_string(),
        ));
    }
    get_connection(&db_path)
}

#[derive(Parser)]
#[command(
    name = "revlens",
    version,
    about = "Import creator revenue reports and classify ledger transactions with rules."
)]
pub struct Cli {
    /// Show debug logging on stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for revlens data (default: ~/Documents/revlens)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Manage ledger accounts.
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Import a report or ledger CSV.
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },
    /// Inspect or forget saved Amazon column mappings.
    Mapping {
        #[command(subcommand)]
        command: MappingCommands,
    },
    /// Manage reconciliation rules.
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// Run active rules over stored ledger transactions.
    Classify {
        /// Re-run on transactions a rule already classified
        #[arg(long)]
        all: bool,
    },
    /// Print revenue and ledger reports.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Show current database and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// Add a new account.
    Add {
        /// Account name, e.g. 'Business Checking'
        name: String,
        /// Account type: checking, savings, credit_card
        #[arg(long = "type", default_value = "checking")]
        account_type: String,
    },
    /// List all accounts.
    List,
}

#[derive(Subcommand)]
pub enum ImportCommands {
    /// Amazon Associates earnings or fee report.
    Amazon {
        file: String,
        /// Override a detected column: FIELD=COLUMN where COLUMN is a
        /// zero-based index, a header name, or 'none'. Repeatable.
        #[arg(long = "map", value_name = "FIELD=COLUMN")]
        map: Vec<String>,
        #[arg(long)]
        channel: Option<String>,
        /// Report year (default: taken from each row's date)
        #[arg(long)]
        year: Option<i32>,
    },
    /// YouTube Analytics per-video export.
    Youtube {
        file: String,
        #[arg(long)]
        channel: Option<String>,
        #[arg(long)]
        year: Option<i32>,
    },
    /// Ledger transactions (date, description, amount, ...).
    Ledger {
        file: String,
        /// Account for rows without an account column
        #[arg(long)]
        account: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum MappingCommands {
    /// Show the column mapping that would be used for a report file.
    Show {
        file: String,
        /// Ignore any saved mapping and show what the header heuristics pick
        #[arg(long)]
        fresh: bool,
    },
    /// Forget the saved mapping for a report file's headers.
    Forget { file: String },
    /// List saved header signatures.
    List,
}

#[derive(Subcommand)]
pub enum RulesCommands {
    /// Add a rule from a JSON definition file.
    Add {
        /// Path to the rule JSON
        #[arg(long)]
        file: String,
    },
    /// List active rules.
    List,
    /// Delete (deactivate) a rule by ID.
    Delete {
        /// Rule ID (shown in `revlens rules list`)
        id: i64,
    },
    /// Evaluate active rules against a transaction JSON without saving.
    Test {
        /// Path to the transaction JSON
        #[arg(long)]
        record: String,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Amazon revenue by ASIN.
    Amazon {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long, default_value = "1")]
        page: usize,
    },
    /// YouTube revenue by video.
    Youtube {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long, default_value = "1")]
        page: usize,
    },
    /// Revenue per month across Amazon and YouTube.
    Monthly {
        #[arg(long)]
        year: Option<i32>,
    },
    /// Ledger transactions with their classification.
    Transactions {
        /// Only transactions no rule has matched
        #[arg(long)]
        unclassified: bool,
        #[arg(long, default_value = "1")]
        page: usize,
    },
}
