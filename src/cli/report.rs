use std::collections::BTreeMap;

use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::fmt::{count, money, percent};
use crate::insights::{self, Page};
use crate::ledger;
use crate::metrics;
use crate::settings::load_settings;

fn right(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

fn print_page<T>(title: &str, table: &Table, page: &Page<T>) {
    println!("{title}\n{table}");
    if page.total_pages > 1 {
        println!(
            "Page {} of {} ({} rows). Use --page to see more.",
            page.page, page.total_pages, page.total_items
        );
    }
}

pub fn amazon(year: Option<i32>, page: usize) -> Result<()> {
    let conn = open_db()?;
    let records = metrics::load_amazon(&conn, year)?;
    let totals = insights::amazon_totals(&records);
    let by_asin = insights::amazon_by_asin(&records);
    let page = insights::paginate(&by_asin, page, load_settings().page_size);

    let mut table = Table::new();
    table.set_header(vec!["ASIN", "Title", "Clicks", "Ordered", "Conv.", "Revenue"]);
    for item in &page.items {
        table.add_row(vec![
            Cell::new(&item.asin),
            Cell::new(&item.title),
            right(count(item.clicks)),
            right(count(item.ordered)),
            right(percent(item.conversion())),
            right(money(item.revenue)),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL".bold()),
        Cell::new(format!("{} records", totals.records)),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        right(money(totals.revenue)).fg(comfy_table::Color::Green),
    ]);
    print_page("Amazon revenue by ASIN", &table, &page);
    Ok(())
}

pub fn youtube(year: Option<i32>, page: usize) -> Result<()> {
    let conn = open_db()?;
    let records = metrics::load_youtube(&conn, year)?;
    let (totals, views) = insights::youtube_totals(&records);
    let by_video = insights::youtube_by_video(&records);
    let page = insights::paginate(&by_video, page, load_settings().page_size);

    let mut table = Table::new();
    table.set_header(vec!["Video", "Title", "Published", "Views", "Watch hrs", "RPM", "Revenue"]);
    for item in &page.items {
        table.add_row(vec![
            Cell::new(&item.video_id),
            Cell::new(&item.title),
            Cell::new(&item.publish_date),
            right(count(item.views)),
            right(format!("{:.1}", item.watch_hours)),
            right(money(item.rpm())),
            right(money(item.revenue)),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL".bold()),
        Cell::new(format!("{} records", totals.records)),
        Cell::new(""),
        right(count(views)),
        Cell::new(""),
        right(money(metrics::rpm(totals.revenue, views))),
        right(money(totals.revenue)).fg(comfy_table::Color::Green),
    ]);
    print_page("YouTube revenue by video", &table, &page);
    Ok(())
}

pub fn monthly(year: Option<i32>) -> Result<()> {
    let conn = open_db()?;
    let amazon = metrics::load_amazon(&conn, year)?;
    let youtube = metrics::load_youtube(&conn, year)?;

    let mut months: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    for (month, total) in insights::monthly_totals(amazon.iter().map(|r| (r.date.as_str(), r.revenue))) {
        months.entry(month).or_default().0 += total;
    }
    for (month, total) in
        insights::monthly_totals(youtube.iter().map(|r| (r.publish_date.as_str(), r.revenue)))
    {
        months.entry(month).or_default().1 += total;
    }

    let mut table = Table::new();
    table.set_header(vec!["Month", "Amazon", "YouTube", "Total"]);
    let (mut amazon_sum, mut youtube_sum) = (0.0, 0.0);
    for (month, (a, y)) in &months {
        amazon_sum += a;
        youtube_sum += y;
        table.add_row(vec![
            Cell::new(month),
            right(money(*a)),
            right(money(*y)),
            right(money(a + y)),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL".bold()),
        right(money(amazon_sum)),
        right(money(youtube_sum)),
        right(money(amazon_sum + youtube_sum)).fg(comfy_table::Color::Green),
    ]);
    println!("Monthly revenue\n{table}");
    Ok(())
}

pub fn transactions(unclassified: bool, page: usize) -> Result<()> {
    let conn = open_db()?;
    let txns = ledger::load_transactions(&conn, unclassified)?;
    let accounts: BTreeMap<i64, String> = ledger::load_accounts(&conn)?
        .into_iter()
        .map(|a| (a.id, a.name))
        .collect();
    let page = insights::paginate(&txns, page, load_settings().page_size);

    let mut table = Table::new();
    table.set_header(vec!["Date", "Account", "Description", "Amount", "Category", "Tags", "Rule"]);
    for txn in &page.items {
        let amount = if txn.amount < 0.0 {
            money(txn.amount).red()
        } else {
            money(txn.amount).green()
        };
        table.add_row(vec![
            Cell::new(&txn.date),
            Cell::new(
                txn.account_id
                    .and_then(|id| accounts.get(&id).cloned())
                    .unwrap_or_default(),
            ),
            Cell::new(&txn.description),
            Cell::new(amount).set_alignment(CellAlignment::Right),
            Cell::new(txn.category_id.as_deref().unwrap_or("")),
            Cell::new(txn.tag_ids.join(", ")),
            Cell::new(txn.rule_id.map(|id| id.to_string()).unwrap_or_default()),
        ]);
    }
    let title = if unclassified {
        "Unclassified transactions"
    } else {
        "Transactions"
    };
    print_page(title, &table, &page);
    Ok(())
}
