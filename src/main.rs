mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod insights;
mod ledger;
mod mapper;
mod metrics;
mod models;
mod rules;
mod settings;
mod store;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{
    AccountsCommands, Cli, Commands, ImportCommands, MappingCommands, ReportCommands,
    RulesCommands,
};

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Accounts { command } => match command {
            AccountsCommands::Add { name, account_type } => cli::accounts::add(&name, &account_type),
            AccountsCommands::List => cli::accounts::list(),
        },
        Commands::Import { command } => match command {
            ImportCommands::Amazon {
                file,
                map,
                channel,
                year,
            } => cli::import::amazon(&file, &map, channel, year),
            ImportCommands::Youtube {
                file,
                channel,
                year,
            } => cli::import::youtube(&file, channel, year),
            ImportCommands::Ledger { file, account } => cli::import::ledger(&file, account.as_deref()),
        },
        Commands::Mapping { command } => match command {
            MappingCommands::Show { file, fresh } => cli::mapping::show(&file, fresh),
            MappingCommands::Forget { file } => cli::mapping::forget(&file),
            MappingCommands::List => cli::mapping::list(),
        },
        Commands::Rules { command } => match command {
            RulesCommands::Add { file } => cli::rules::add(&file),
            RulesCommands::List => cli::rules::list(),
            RulesCommands::Delete { id } => cli::rules::delete(id),
            RulesCommands::Test { record } => cli::rules::test(&record),
        },
        Commands::Classify { all } => cli::classify::run(all),
        Commands::Report { command } => match command {
            ReportCommands::Amazon { year, page } => cli::report::amazon(year, page),
            ReportCommands::Youtube { year, page } => cli::report::youtube(year, page),
            ReportCommands::Monthly { year } => cli::report::monthly(year),
            ReportCommands::Transactions { unclassified, page } => {
                cli::report::transactions(unclassified, page)
            }
        },
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
