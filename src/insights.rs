use std::collections::{BTreeMap, HashMap};

use crate::metrics::rpm;
use crate::models::{AmazonMetric, YouTubeMetric};

// ---------------------------------------------------------------------------
// Amazon by ASIN
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct AsinInsight {
    pub asin: String,
    pub title: String,
    pub clicks: i64,
    pub ordered: i64,
    pub shipped: i64,
    pub revenue: f64,
}

impl AsinInsight {
    /// Orders per click, 0 when there were no clicks.
    pub fn conversion(&self) -> f64 {
        if self.clicks == 0 {
            0.0
        } else {
            self.ordered as f64 / self.clicks as f64
        }
    }
}

pub fn amazon_by_asin(records: &[AmazonMetric]) -> Vec<AsinInsight> {
    let mut order: Vec<String> = Vec::new();
    let mut by_asin: HashMap<&str, AsinInsight> = HashMap::new();
    for r in records {
        let entry = by_asin.entry(r.asin.as_str()).or_insert_with(|| {
            order.push(r.asin.clone());
            AsinInsight {
                asin: r.asin.clone(),
                title: String::new(),
                clicks: 0,
                ordered: 0,
                shipped: 0,
                revenue: 0.0,
            }
        });
        if entry.title.is_empty() && !r.title.is_empty() {
            entry.title = r.title.clone();
        }
        entry.clicks += r.clicks;
        entry.ordered += r.ordered;
        entry.shipped += r.shipped;
        entry.revenue += r.revenue;
    }
    let mut out: Vec<AsinInsight> = order
        .iter()
        .filter_map(|asin| by_asin.remove(asin.as_str()))
        .collect();
    out.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
    out
}

// ---------------------------------------------------------------------------
// YouTube by video
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct VideoInsight {
    pub video_id: String,
    pub title: String,
    pub publish_date: String,
    pub views: i64,
    pub watch_hours: f64,
    pub revenue: f64,
}

impl VideoInsight {
    pub fn rpm(&self) -> f64 {
        rpm(self.revenue, self.views)
    }
}

pub fn youtube_by_video(records: &[YouTubeMetric]) -> Vec<VideoInsight> {
    let mut grouped: BTreeMap<&str, VideoInsight> = BTreeMap::new();
    for r in records {
        let entry = grouped
            .entry(r.video_id.as_str())
            .or_insert_with(|| VideoInsight {
                video_id: r.video_id.clone(),
                title: r.title.clone(),
                publish_date: r.publish_date.clone(),
                views: 0,
                watch_hours: 0.0,
                revenue: 0.0,
            });
        entry.views += r.views;
        entry.watch_hours += r.watch_hours;
        entry.revenue += r.revenue;
    }
    let mut out: Vec<VideoInsight> = grouped.into_values().collect();
    out.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
    out
}

// ---------------------------------------------------------------------------
// Totals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    pub revenue: f64,
    pub records: usize,
}

pub fn amazon_totals(records: &[AmazonMetric]) -> Totals {
    Totals {
        revenue: records.iter().map(|r| r.revenue).sum(),
        records: records.len(),
    }
}

pub fn youtube_totals(records: &[YouTubeMetric]) -> (Totals, i64) {
    let totals = Totals {
        revenue: records.iter().map(|r| r.revenue).sum(),
        records: records.len(),
    };
    (totals, records.iter().map(|r| r.views).sum())
}

/// Sum amounts per `YYYY-MM`, ascending. Dates shorter than a month key are
/// grouped under "unknown".
pub fn monthly_totals<'a, I>(entries: I) -> Vec<(String, f64)>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut months: BTreeMap<String, f64> = BTreeMap::new();
    for (date, amount) in entries {
        let key = match date.get(..7) {
            Some(m) if m.as_bytes().get(4) == Some(&b'-') => m.to_string(),
            _ => "unknown".to_string(),
        };
        *months.entry(key).or_default() += amount;
    }
    months.into_iter().collect()
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based.
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);
    let start = (page - 1) * page_size;
    let end = (start + page_size).min(total_items);
    Page {
        items: items.get(start..end).unwrap_or_default().to_vec(),
        page,
        total_pages,
        total_items,
    }
}
