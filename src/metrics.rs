use chrono::{Datelike, NaiveDate};
use rusqlite::Connection;

use crate::error::Result;
use crate::mapper::{normalize_header, ColumnMapping, MappingField};
use crate::models::{AmazonMetric, SourceHint, YouTubeMetric};

// ---------------------------------------------------------------------------
// Cell helpers
// ---------------------------------------------------------------------------

/// Parse a report number: `$1,234.50`, `12%`, `(3.00)` (negative). Anything
/// unparseable is 0.
pub fn parse_number(raw: &str) -> f64 {
    let s: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | ',' | '%' | '"') && !c.is_whitespace())
        .collect();
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return -inner.parse::<f64>().unwrap_or(0.0);
    }
    s.parse().unwrap_or(0.0)
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%b %d, %Y", "%d %b %Y", "%Y/%m/%d"];

/// Normalize a report date to `YYYY-MM-DD`; unrecognized values are kept as-is.
pub fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    // "2024-01-05 00:00:00" and "2024-01-05T..." carry a time we don't need
    let candidate = match raw.get(..10) {
        Some(prefix) if raw.len() > 10 && NaiveDate::parse_from_str(prefix, "%Y-%m-%d").is_ok() => prefix,
        _ => raw,
    };
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(candidate, fmt).ok())
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn year_of(date: &str) -> Option<i32> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok().map(|d| d.year())
}

fn cell(row: &[String], column: Option<usize>) -> &str {
    column.and_then(|c| row.get(c)).map_or("", |s| s.trim())
}

fn optional_cell(row: &[String], column: Option<usize>) -> Option<String> {
    let value = cell(row, column);
    (!value.is_empty()).then(|| value.to_string())
}

/// Revenue per thousand views.
pub fn rpm(revenue: f64, views: i64) -> f64 {
    if views <= 0 {
        return 0.0;
    }
    revenue / views as f64 * 1000.0
}

// ---------------------------------------------------------------------------
// Amazon
// ---------------------------------------------------------------------------

pub fn amazon_records(
    mapping: &ColumnMapping,
    rows: &[Vec<String>],
    source: SourceHint,
    channel: Option<&str>,
    report_year: Option<i32>,
) -> Vec<AmazonMetric> {
    rows.iter()
        .filter(|row| !cell(row, mapping.get(MappingField::Asin)).is_empty())
        .map(|row| {
            let date = normalize_date(cell(row, mapping.date));
            AmazonMetric {
                id: None,
                report_year: report_year.or_else(|| year_of(&date)),
                date,
                asin: cell(row, mapping.asin).to_string(),
                title: cell(row, mapping.title).to_string(),
                revenue: parse_number(cell(row, mapping.revenue)),
                clicks: parse_number(cell(row, mapping.clicks)).round() as i64,
                ordered: parse_number(cell(row, mapping.ordered)).round() as i64,
                shipped: parse_number(cell(row, mapping.shipped)).round() as i64,
                tracking_id: optional_cell(row, mapping.tracking),
                category: optional_cell(row, mapping.category),
                campaign_title: optional_cell(row, mapping.campaign_title),
                source,
                channel: channel.map(str::to_string),
            }
        })
        .collect()
}

pub fn insert_amazon(conn: &Connection, records: &[AmazonMetric], import_id: Option<i64>) -> Result<usize> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO amazon_metrics (import_id, date, asin, title, revenue, clicks, ordered, shipped, \
         tracking_id, category, campaign_title, source, channel, report_year) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
    )?;
    for r in records {
        stmt.execute(rusqlite::params![
            import_id,
            r.date,
            r.asin,
            r.title,
            r.revenue,
            r.clicks,
            r.ordered,
            r.shipped,
            r.tracking_id,
            r.category,
            r.campaign_title,
            r.source.key(),
            r.channel,
            r.report_year,
        ])?;
    }
    Ok(records.len())
}

pub fn load_amazon(conn: &Connection, report_year: Option<i32>) -> Result<Vec<AmazonMetric>> {
    let mut stmt = conn.prepare(
        "SELECT id, date, asin, title, revenue, clicks, ordered, shipped, tracking_id, category, \
         campaign_title, source, channel, report_year FROM amazon_metrics \
         WHERE ?1 IS NULL OR report_year = ?1 ORDER BY date, id",
    )?;
    let rows = stmt
        .query_map([report_year], |row| {
            let source: String = row.get(11)?;
            Ok(AmazonMetric {
                id: row.get(0)?,
                date: row.get(1)?,
                asin: row.get(2)?,
                title: row.get(3)?,
                revenue: row.get(4)?,
                clicks: row.get(5)?,
                ordered: row.get(6)?,
                shipped: row.get(7)?,
                tracking_id: row.get(8)?,
                category: row.get(9)?,
                campaign_title: row.get(10)?,
                source: SourceHint::from_key(&source).unwrap_or(SourceHint::Auto),
                channel: row.get(12)?,
                report_year: row.get(13)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// YouTube
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct YouTubeColumns {
    pub video_id: Option<usize>,
    pub title: Option<usize>,
    pub publish_date: Option<usize>,
    pub views: Option<usize>,
    pub watch_hours: Option<usize>,
    pub subscribers: Option<usize>,
    pub impressions: Option<usize>,
    pub ctr: Option<usize>,
    pub revenue: Option<usize>,
}

impl YouTubeColumns {
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.video_id.is_none() {
            missing.push("Video ID");
        }
        if self.revenue.is_none() {
            missing.push("Revenue");
        }
        missing
    }
}

/// (exact candidates, contains candidates). Click-through rate is claimed
/// before impressions since its header contains "impressions".
const YT_CTR: (&[&str], &[&str]) = (&[], &["click-through rate", "ctr"]);
const YT_VIDEO_ID: (&[&str], &[&str]) = (&["content", "video"], &["video id"]);
const YT_TITLE: (&[&str], &[&str]) = (&["title"], &["video title"]);
const YT_PUBLISH: (&[&str], &[&str]) = (&[], &["video publish time", "publish"]);
const YT_VIEWS: (&[&str], &[&str]) = (&["views"], &["views"]);
const YT_WATCH: (&[&str], &[&str]) = (&[], &["watch time (hours)", "watch time"]);
const YT_SUBSCRIBERS: (&[&str], &[&str]) = (&["subscribers"], &["subscribers"]);
const YT_IMPRESSIONS: (&[&str], &[&str]) = (&["impressions"], &["impressions"]);
const YT_REVENUE: (&[&str], &[&str]) = (&[], &["estimated revenue", "revenue"]);

fn claim(normalized: &[String], taken: &mut Vec<usize>, (exact, fuzzy): (&[&str], &[&str])) -> Option<usize> {
    let free = |idx: &usize| !taken.contains(idx);
    let found = normalized
        .iter()
        .enumerate()
        .find(|(i, h)| free(i) && exact.iter().any(|c| h.as_str() == *c))
        .or_else(|| {
            normalized
                .iter()
                .enumerate()
                .find(|(i, h)| free(i) && fuzzy.iter().any(|c| h.contains(c)))
        })
        .map(|(i, _)| i);
    if let Some(i) = found {
        taken.push(i);
    }
    found
}

pub fn youtube_detect(headers: &[String]) -> YouTubeColumns {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    let mut taken = Vec::new();
    let ctr = claim(&normalized, &mut taken, YT_CTR);
    let video_id = claim(&normalized, &mut taken, YT_VIDEO_ID);
    let publish_date = claim(&normalized, &mut taken, YT_PUBLISH);
    let title = claim(&normalized, &mut taken, YT_TITLE);
    let views = claim(&normalized, &mut taken, YT_VIEWS);
    let watch_hours = claim(&normalized, &mut taken, YT_WATCH);
    let subscribers = claim(&normalized, &mut taken, YT_SUBSCRIBERS);
    let impressions = claim(&normalized, &mut taken, YT_IMPRESSIONS);
    let revenue = claim(&normalized, &mut taken, YT_REVENUE);
    YouTubeColumns {
        video_id,
        title,
        publish_date,
        views,
        watch_hours,
        subscribers,
        impressions,
        ctr,
        revenue,
    }
}

pub fn youtube_records(
    columns: &YouTubeColumns,
    rows: &[Vec<String>],
    channel: Option<&str>,
    report_year: Option<i32>,
) -> Vec<YouTubeMetric> {
    rows.iter()
        .filter(|row| {
            let id = cell(row, columns.video_id);
            !id.is_empty() && !id.eq_ignore_ascii_case("total")
        })
        .map(|row| {
            let publish_date = normalize_date(cell(row, columns.publish_date));
            YouTubeMetric {
                id: None,
                report_year: report_year.or_else(|| year_of(&publish_date)),
                publish_date,
                video_id: cell(row, columns.video_id).to_string(),
                title: cell(row, columns.title).to_string(),
                views: parse_number(cell(row, columns.views)).round() as i64,
                watch_hours: parse_number(cell(row, columns.watch_hours)),
                subscribers: parse_number(cell(row, columns.subscribers)).round() as i64,
                impressions: parse_number(cell(row, columns.impressions)).round() as i64,
                ctr: parse_number(cell(row, columns.ctr)),
                revenue: parse_number(cell(row, columns.revenue)),
                channel: channel.map(str::to_string),
            }
        })
        .collect()
}

pub fn insert_youtube(conn: &Connection, records: &[YouTubeMetric], import_id: Option<i64>) -> Result<usize> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO youtube_metrics (import_id, video_id, title, publish_date, views, watch_hours, \
         subscribers, impressions, ctr, revenue, channel, report_year) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    )?;
    for r in records {
        stmt.execute(rusqlite::params![
            import_id,
            r.video_id,
            r.title,
            r.publish_date,
            r.views,
            r.watch_hours,
            r.subscribers,
            r.impressions,
            r.ctr,
            r.revenue,
            r.channel,
            r.report_year,
        ])?;
    }
    Ok(records.len())
}

pub fn load_youtube(conn: &Connection, report_year: Option<i32>) -> Result<Vec<YouTubeMetric>> {
    let mut stmt = conn.prepare(
        "SELECT id, video_id, title, publish_date, views, watch_hours, subscribers, impressions, ctr, \
         revenue, channel, report_year FROM youtube_metrics \
         WHERE ?1 IS NULL OR report_year = ?1 ORDER BY publish_date, id",
    )?;
    let rows = stmt
        .query_map([report_year], |row| {
            Ok(YouTubeMetric {
                id: row.get(0)?,
                video_id: row.get(1)?,
                title: row.get(2)?,
                publish_date: row.get(3)?,
                views: row.get(4)?,
                watch_hours: row.get(5)?,
                subscribers: row.get(6)?,
                impressions: row.get(7)?,
                ctr: row.get(8)?,
                revenue: row.get(9)?,
                channel: row.get(10)?,
                report_year: row.get(11)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
