use std::path::PathBuf;

use colored::Colorize;

use crate::cli::mapping::{mapping_table, print_warnings};
use crate::cli::open_db;
use crate::error::{Result, RevlensError};
use crate::importer::{self, AmazonOptions};
use crate::mapper::{normalize_header, MappingField};
use crate::settings::load_settings;
use crate::store::SqliteStore;

/// Parse a `FIELD=COLUMN` override against the file's headers.
pub(crate) fn parse_override(spec: &str, headers: &[String]) -> Result<(MappingField, Option<usize>)> {
    let (field, column) = spec
        .split_once('=')
        .ok_or_else(|| RevlensError::Other(format!("Expected FIELD=COLUMN, got '{spec}'")))?;
    let field = MappingField::from_key(field.trim())
        .ok_or_else(|| RevlensError::Other(format!("Unknown mapping field '{}'", field.trim())))?;
    let column = column.trim();
    if column.eq_ignore_ascii_case("none") {
        return Ok((field, None));
    }
    let index = match column.parse::<usize>() {
        Ok(idx) if idx < headers.len() => Some(idx),
        Ok(idx) => {
            return Err(RevlensError::Other(format!(
                "Column {idx} is out of range ({} columns)",
                headers.len()
            )))
        }
        Err(_) => {
            let wanted = normalize_header(column);
            headers.iter().position(|h| normalize_header(h) == wanted)
        }
    };
    match index {
        Some(idx) => Ok((field, Some(idx))),
        None => Err(RevlensError::Other(format!("No column named '{column}'"))),
    }
}

pub fn amazon(file: &str, map: &[String], channel: Option<String>, year: Option<i32>) -> Result<()> {
    let file_path = PathBuf::from(file);
    let conn = open_db()?;
    let store = SqliteStore::new(&conn);
    let settings = load_settings();

    let overrides = if map.is_empty() {
        Vec::new()
    } else {
        let headers = importer::read_csv(&file_path)?.headers;
        map.iter()
            .map(|spec| parse_override(spec, &headers))
            .collect::<Result<Vec<_>>>()?
    };
    let options = AmazonOptions {
        overrides,
        channel: channel.or_else(|| settings.channel().map(str::to_string)),
        report_year: year,
    };

    let result = importer::import_amazon(&conn, &file_path, &store, &options)?;
    let origin = if result.detection.from_saved {
        "saved mapping"
    } else {
        "detected from headers"
    };
    println!(
        "Column mapping ({origin}, source: {})\n{}",
        result.detection.source_hint.key(),
        mapping_table(&result.mapping, &result.headers)
    );
    print_warnings(&result.warnings);

    if result.duplicate_file {
        println!("This file has already been imported (duplicate checksum).");
        return Ok(());
    }
    println!("{} {} records imported", "✓".green(), result.imported);
    Ok(())
}

pub fn youtube(file: &str, channel: Option<String>, year: Option<i32>) -> Result<()> {
    let conn = open_db()?;
    let settings = load_settings();
    let channel = channel.or_else(|| settings.channel().map(str::to_string));

    let result = importer::import_youtube(&conn, &PathBuf::from(file), channel.as_deref(), year)?;
    if result.duplicate_file {
        println!("This file has already been imported (duplicate checksum).");
        return Ok(());
    }
    println!("{} {} videos imported", "✓".green(), result.imported);
    Ok(())
}

pub fn ledger(file: &str, account: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let result = importer::import_ledger(&conn, &PathBuf::from(file), account)?;
    if result.duplicate_file {
        println!("This file has already been imported (duplicate checksum).");
        return Ok(());
    }
    println!(
        "{} imported, {} classified by rules, {} skipped by rules, {} skipped (duplicates)",
        result.imported, result.classified, result.skipped_by_rule, result.duplicates
    );
    Ok(())
}
