use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::importer::read_csv;
use crate::mapper::{self, ColumnMapping, ColumnWarning, MappingField, MAPPING_NAMESPACE};
use crate::store::{KeyValueStore, MemoryStore, SqliteStore};

pub(crate) fn mapping_table(mapping: &ColumnMapping, headers: &[String]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Field", "Column", "Header"]);
    for field in MappingField::ALL {
        let required = MappingField::REQUIRED.contains(&field);
        let label = if required {
            format!("{} *", field.label())
        } else {
            field.label().to_string()
        };
        let (column, header) = match mapping.get(field) {
            Some(idx) => (
                idx.to_string(),
                headers.get(idx).cloned().unwrap_or_default(),
            ),
            None if required => ("-".to_string(), "unmapped".red().to_string()),
            None => ("-".to_string(), String::new()),
        };
        table.add_row(vec![Cell::new(label), Cell::new(column), Cell::new(header)]);
    }
    table
}

pub(crate) fn print_warnings(warnings: &[(MappingField, ColumnWarning)]) {
    for (field, warning) in warnings {
        println!("{} {}: {warning}", "warning:".yellow().bold(), field.label());
    }
}

pub fn show(file: &str, fresh: bool) -> Result<()> {
    let file_path = PathBuf::from(file);
    let conn = open_db()?;
    let saved = SqliteStore::new(&conn);
    let empty = MemoryStore::new();
    let store: &dyn KeyValueStore = if fresh { &empty } else { &saved };
    let csv = read_csv(&file_path)?;
    let name = file_path.file_name().and_then(|n| n.to_str()).unwrap_or("");

    let detection = mapper::auto_detect(&csv.headers, name, store);
    let origin = if detection.from_saved {
        "saved mapping"
    } else {
        "detected from headers"
    };
    println!(
        "Column mapping ({origin}, source: {})\n{}",
        detection.source_hint.key(),
        mapping_table(&detection.mapping, &csv.headers)
    );
    if !detection.from_saved {
        print_warnings(&mapper::validate_mapping(&detection.mapping, &csv.rows));
    }
    let missing = detection.mapping.missing_required();
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|f| f.label()).collect();
        println!("{} {}", "Required but unmapped:".red(), names.join(", "));
    }
    Ok(())
}

pub fn forget(file: &str) -> Result<()> {
    let conn = open_db()?;
    let store = SqliteStore::new(&conn);
    let headers = read_csv(&PathBuf::from(file))?.headers;
    if mapper::load_saved(&store, &headers).is_none() {
        println!("No saved mapping for these headers.");
        return Ok(());
    }
    mapper::forget(&store, &mapper::header_signature(&headers))?;
    println!("Forgot saved mapping for {file}");
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let store = SqliteStore::new(&conn);
    let prefix = format!("{MAPPING_NAMESPACE}_");
    let keys = store.keys_with_prefix(&prefix)?;

    let mut table = Table::new();
    table.set_header(vec!["Header signature"]);
    for key in &keys {
        table.add_row(vec![Cell::new(key.strip_prefix(prefix.as_str()).unwrap_or(key.as_str()))]);
    }
    println!("Saved mappings ({})\n{table}", keys.len());
    Ok(())
}
