use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RevlensError};
use crate::models::SourceHint;
use crate::store::KeyValueStore;

pub const MAPPING_NAMESPACE: &str = "amazon_column_mapping";

/// Validation only looks at this many leading rows.
const SAMPLE_ROWS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingField {
    Date,
    Asin,
    Title,
    Revenue,
    Clicks,
    Ordered,
    Shipped,
    Tracking,
    Category,
    CampaignTitle,
}

impl MappingField {
    pub const ALL: [MappingField; 10] = [
        Self::Date,
        Self::Asin,
        Self::Title,
        Self::Revenue,
        Self::Clicks,
        Self::Ordered,
        Self::Shipped,
        Self::Tracking,
        Self::Category,
        Self::CampaignTitle,
    ];

    pub const REQUIRED: [MappingField; 2] = [Self::Asin, Self::Revenue];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Asin => "asin",
            Self::Title => "title",
            Self::Revenue => "revenue",
            Self::Clicks => "clicks",
            Self::Ordered => "ordered",
            Self::Shipped => "shipped",
            Self::Tracking => "tracking",
            Self::Category => "category",
            Self::CampaignTitle => "campaignTitle",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Date => "Date",
            Self::Asin => "ASIN",
            Self::Title => "Product title",
            Self::Revenue => "Revenue",
            Self::Clicks => "Clicks",
            Self::Ordered => "Items ordered",
            Self::Shipped => "Items shipped",
            Self::Tracking => "Tracking ID",
            Self::Category => "Category",
            Self::CampaignTitle => "Campaign title",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key().eq_ignore_ascii_case(key))
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Self::Date => ColumnKind::Date,
            Self::Revenue | Self::Clicks | Self::Ordered | Self::Shipped => ColumnKind::Number,
            _ => ColumnKind::String,
        }
    }
}

// ---------------------------------------------------------------------------
// ColumnMapping
// ---------------------------------------------------------------------------

/// Field -> zero-based column index for an Amazon Associates report. Saved per
/// header signature so the next file with identical headers maps the same way.
/// Serialized with `-1` for unmapped fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColumnMapping {
    #[serde(with = "column_index")]
    pub date: Option<usize>,
    #[serde(with = "column_index")]
    pub asin: Option<usize>,
    #[serde(with = "column_index")]
    pub title: Option<usize>,
    #[serde(with = "column_index")]
    pub revenue: Option<usize>,
    #[serde(with = "column_index")]
    pub clicks: Option<usize>,
    #[serde(with = "column_index")]
    pub ordered: Option<usize>,
    #[serde(with = "column_index")]
    pub shipped: Option<usize>,
    #[serde(with = "column_index")]
    pub tracking: Option<usize>,
    #[serde(with = "column_index")]
    pub category: Option<usize>,
    #[serde(with = "column_index")]
    pub campaign_title: Option<usize>,
}

mod column_index {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<usize>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match value {
            Some(idx) => serializer.serialize_i64(*idx as i64),
            None => serializer.serialize_i64(-1),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Option<usize>, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Ok(usize::try_from(raw).ok())
    }
}

impl ColumnMapping {
    pub fn get(&self, field: MappingField) -> Option<usize> {
        match field {
            MappingField::Date => self.date,
            MappingField::Asin => self.asin,
            MappingField::Title => self.title,
            MappingField::Revenue => self.revenue,
            MappingField::Clicks => self.clicks,
            MappingField::Ordered => self.ordered,
            MappingField::Shipped => self.shipped,
            MappingField::Tracking => self.tracking,
            MappingField::Category => self.category,
            MappingField::CampaignTitle => self.campaign_title,
        }
    }

    fn slot_mut(&mut self, field: MappingField) -> &mut Option<usize> {
        match field {
            MappingField::Date => &mut self.date,
            MappingField::Asin => &mut self.asin,
            MappingField::Title => &mut self.title,
            MappingField::Revenue => &mut self.revenue,
            MappingField::Clicks => &mut self.clicks,
            MappingField::Ordered => &mut self.ordered,
            MappingField::Shipped => &mut self.shipped,
            MappingField::Tracking => &mut self.tracking,
            MappingField::Category => &mut self.category,
            MappingField::CampaignTitle => &mut self.campaign_title,
        }
    }

    /// Return a copy with `field` pointed at `column`. Whichever field held
    /// `column` before is unmapped, so a column never has two owners.
    pub fn assign(&self, field: MappingField, column: Option<usize>) -> ColumnMapping {
        let mut next = *self;
        if let Some(col) = column {
            for other in MappingField::ALL {
                if next.get(other) == Some(col) {
                    *next.slot_mut(other) = None;
                }
            }
        }
        *next.slot_mut(field) = column;
        next
    }

    pub fn owner_of(&self, column: usize) -> Option<MappingField> {
        MappingField::ALL
            .into_iter()
            .find(|f| self.get(*f) == Some(column))
    }

    pub fn missing_required(&self) -> Vec<MappingField> {
        MappingField::REQUIRED
            .into_iter()
            .filter(|f| self.get(*f).is_none())
            .collect()
    }

    /// Guard run before an import is allowed to proceed.
    pub fn require_fields(&self) -> Result<()> {
        let missing = self.missing_required();
        if missing.is_empty() {
            return Ok(());
        }
        let names: Vec<&str> = missing.iter().map(|f| f.label()).collect();
        Err(RevlensError::MissingMapping(names.join(", ")))
    }
}

// ---------------------------------------------------------------------------
// Header heuristics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchStrategy {
    /// Header equals a candidate.
    Exact,
    /// Header equals or contains a candidate.
    Fuzzy,
}

impl MatchStrategy {
    fn accepts(&self, header: &str, candidate: &str) -> bool {
        match self {
            Self::Exact => header == candidate,
            Self::Fuzzy => header == candidate || header.contains(candidate),
        }
    }
}

type Matcher = (MappingField, &'static [(MatchStrategy, &'static [&'static str])]);

// Detection order. Earlier fields claim headers first, so the broad
// title candidates run last and cannot steal "campaign title".
const MATCHERS: &[Matcher] = &[
    (
        MappingField::CampaignTitle,
        &[(MatchStrategy::Exact, &["campaign title"])],
    ),
    (
        MappingField::Date,
        &[
            (MatchStrategy::Exact, &["date", "day"]),
            (MatchStrategy::Fuzzy, &["date"]),
        ],
    ),
    (MappingField::Asin, &[(MatchStrategy::Fuzzy, &["asin"])]),
    (
        MappingField::Revenue,
        &[(
            MatchStrategy::Fuzzy,
            &[
                "ad fees",
                "advertising fees",
                "commission income",
                "earnings",
                "bounties",
                "amount",
            ],
        )],
    ),
    (MappingField::Clicks, &[(MatchStrategy::Fuzzy, &["clicks"])]),
    (
        MappingField::Ordered,
        &[(MatchStrategy::Fuzzy, &["items ordered", "ordered"])],
    ),
    (
        MappingField::Shipped,
        &[(MatchStrategy::Fuzzy, &["items shipped", "shipped"])],
    ),
    (
        MappingField::Tracking,
        &[(MatchStrategy::Fuzzy, &["tracking id", "tracking"])],
    ),
    (
        MappingField::Category,
        &[(MatchStrategy::Fuzzy, &["category", "product group"])],
    ),
    (
        MappingField::Title,
        &[(
            MatchStrategy::Fuzzy,
            &["product title", "title", "item name", "name"],
        )],
    ),
];

/// Result of [`auto_detect`].
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub mapping: ColumnMapping,
    pub source_hint: SourceHint,
    /// True when the mapping came from a saved signature, not heuristics.
    pub from_saved: bool,
}

pub fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

pub fn header_signature(headers: &[String]) -> String {
    headers.join("|")
}

pub fn storage_key(signature: &str) -> String {
    format!("{MAPPING_NAMESPACE}_{signature}")
}

/// First unclaimed header accepted by any of the field's strategies, tried in order.
fn find_header(
    normalized: &[String],
    rules: &[(MatchStrategy, &[&str])],
    claimed: &ColumnMapping,
) -> Option<usize> {
    rules.iter().find_map(|(strategy, candidates)| {
        normalized.iter().enumerate().position(|(idx, header)| {
            claimed.owner_of(idx).is_none()
                && candidates.iter().any(|c| strategy.accepts(header, c))
        })
    })
}

pub fn detect_from_headers(headers: &[String]) -> ColumnMapping {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    MATCHERS
        .iter()
        .fold(ColumnMapping::default(), |mapping, (field, rules)| {
            match find_header(&normalized, rules, &mapping) {
                Some(idx) => mapping.assign(*field, Some(idx)),
                None => mapping,
            }
        })
}

pub fn source_hint(headers: &[String], file_name: &str) -> SourceHint {
    if headers.iter().any(|h| normalize_header(h) == "campaign title") {
        SourceHint::CreatorConnections
    } else if file_name.to_lowercase().contains("onsite") {
        SourceHint::Onsite
    } else {
        SourceHint::Auto
    }
}

/// Saved mapping for exactly these headers, if one exists and parses.
pub fn load_saved(store: &dyn KeyValueStore, headers: &[String]) -> Option<ColumnMapping> {
    let key = storage_key(&header_signature(headers));
    let raw = match store.get(&key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(error = %e, "could not read saved column mapping");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(mapping) => Some(mapping),
        Err(e) => {
            tracing::warn!(error = %e, key = %key, "ignoring corrupt saved column mapping");
            None
        }
    }
}

/// Propose a mapping for a report. A saved mapping for the same header
/// signature wins over heuristics and is returned as-is. Only headers are
/// read here; sample rows are checked separately by [`validate_mapping`].
pub fn auto_detect(headers: &[String], file_name: &str, store: &dyn KeyValueStore) -> Detection {
    let source_hint = source_hint(headers, file_name);
    if let Some(mapping) = load_saved(store, headers) {
        tracing::debug!("using saved column mapping");
        return Detection {
            mapping,
            source_hint,
            from_saved: true,
        };
    }
    Detection {
        mapping: detect_from_headers(headers),
        source_hint,
        from_saved: false,
    }
}

pub fn persist(store: &dyn KeyValueStore, signature: &str, mapping: &ColumnMapping) -> Result<()> {
    let json = serde_json::to_string(mapping)?;
    store.set(&storage_key(signature), &json)
}

pub fn forget(store: &dyn KeyValueStore, signature: &str) -> Result<()> {
    store.remove(&storage_key(signature))
}

// ---------------------------------------------------------------------------
// Column validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Number,
    Date,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnWarning {
    /// Every sampled value failed to parse.
    NoData,
    ManyInvalid { invalid: usize, valid: usize },
}

impl fmt::Display for ColumnWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoData => write!(f, "no data of the expected type"),
            Self::ManyInvalid { invalid, valid } => {
                write!(f, "many invalid values ({invalid} invalid, {valid} valid)")
            }
        }
    }
}

fn looks_numeric(cell: &str) -> bool {
    let cleaned: String = cell
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | ',' | '%' | '(' | ')') && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().is_ok_and(|v| v.is_finite())
}

fn looks_like_date(cell: &str) -> bool {
    cell.chars().any(|c| c.is_ascii_digit() || c == '/' || c == '-')
}

/// Advisory check that a mapped column holds what the field expects.
pub fn validate(column: Option<usize>, kind: ColumnKind, rows: &[Vec<String>]) -> Option<ColumnWarning> {
    let col = column?;
    let (mut valid, mut invalid) = (0usize, 0usize);
    for row in rows.iter().take(SAMPLE_ROWS) {
        let Some(cell) = row.get(col) else { continue };
        let cell = cell.trim();
        if cell.is_empty() {
            continue;
        }
        let ok = match kind {
            ColumnKind::Number => looks_numeric(cell),
            ColumnKind::Date => looks_like_date(cell),
            ColumnKind::String => true,
        };
        if ok {
            valid += 1;
        } else {
            invalid += 1;
        }
    }
    if valid == 0 && invalid > 0 {
        Some(ColumnWarning::NoData)
    } else if invalid > valid {
        Some(ColumnWarning::ManyInvalid { invalid, valid })
    } else {
        None
    }
}

pub fn validate_mapping(
    mapping: &ColumnMapping,
    rows: &[Vec<String>],
) -> Vec<(MappingField, ColumnWarning)> {
    MappingField::ALL
        .into_iter()
        .filter_map(|f| validate(mapping.get(f), f.kind(), rows).map(|w| (f, w)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn headers(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    fn rows(cells: &[&[&str]]) -> Vec<Vec<String>> {
        cells
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn assert_unique_columns(mapping: &ColumnMapping) {
        let mut seen = std::collections::HashSet::new();
        for field in MappingField::ALL {
            if let Some(col) = mapping.get(field) {
                assert!(seen.insert(col), "column {col} mapped twice in {mapping:?}");
            }
        }
    }

    #[test]
    fn test_basic_earnings_report() {
        let store = MemoryStore::new();
        let h = headers(&["Date", "ASIN", "Product Title", "Ad Fees"]);
        let detection = auto_detect(&h, "earnings-2024.csv", &store);
        assert_eq!(detection.mapping.date, Some(0));
        assert_eq!(detection.mapping.asin, Some(1));
        assert_eq!(detection.mapping.title, Some(2));
        assert_eq!(detection.mapping.revenue, Some(3));
        assert_eq!(detection.mapping.clicks, None);
        assert_eq!(detection.mapping.campaign_title, None);
        assert_eq!(detection.source_hint, SourceHint::Auto);
        assert!(!detection.from_saved);
    }

    #[test]
    fn test_headers_are_case_insensitive_and_trimmed() {
        let mapping = detect_from_headers(&headers(&["  ad fees($) ", "asin", "DATE"]));
        assert_eq!(mapping.revenue, Some(0));
        assert_eq!(mapping.asin, Some(1));
        assert_eq!(mapping.date, Some(2));
    }

    #[test]
    fn test_exact_date_preferred_over_fuzzy() {
        let mapping = detect_from_headers(&headers(&["Shipment Date", "Date", "ASIN"]));
        assert_eq!(mapping.date, Some(1));
    }

    #[test]
    fn test_fuzzy_date_fallback() {
        let mapping = detect_from_headers(&headers(&["ASIN", "Order Date"]));
        assert_eq!(mapping.date, Some(1));
    }

    #[test]
    fn test_creator_connections_hint_and_title_separation() {
        let h = headers(&["Campaign Title", "ASIN", "Title", "Commission Income", "Date"]);
        let detection = auto_detect(&h, "report.csv", &MemoryStore::new());
        assert_eq!(detection.source_hint, SourceHint::CreatorConnections);
        assert_eq!(detection.mapping.campaign_title, Some(0));
        assert_eq!(detection.mapping.title, Some(2));
        assert_eq!(detection.mapping.revenue, Some(3));
        assert_unique_columns(&detection.mapping);
    }

    #[test]
    fn test_onsite_hint_from_file_name() {
        let h = headers(&["Date", "ASIN", "Earnings"]);
        assert_eq!(source_hint(&h, "Fee-OnSite-2024.csv"), SourceHint::Onsite);
        assert_eq!(source_hint(&h, "fee-earnings.csv"), SourceHint::Auto);
    }

    #[test]
    fn test_full_associates_report() {
        let h = headers(&[
            "Category",
            "Name",
            "ASIN",
            "Date Shipped",
            "Items Ordered",
            "Items Shipped",
            "Clicks",
            "Tracking ID",
            "Ad Fees($)",
        ]);
        let m = detect_from_headers(&h);
        assert_eq!(m.category, Some(0));
        assert_eq!(m.title, Some(1));
        assert_eq!(m.asin, Some(2));
        assert_eq!(m.date, Some(3));
        assert_eq!(m.ordered, Some(4));
        assert_eq!(m.shipped, Some(5));
        assert_eq!(m.clicks, Some(6));
        assert_eq!(m.tracking, Some(7));
        assert_eq!(m.revenue, Some(8));
        assert_unique_columns(&m);
    }

    #[test]
    fn test_no_matches_leaves_everything_unmapped() {
        let m = detect_from_headers(&headers(&["foo", "bar"]));
        assert_eq!(m, ColumnMapping::default());
        assert_eq!(m.missing_required(), vec![MappingField::Asin, MappingField::Revenue]);
    }

    #[test]
    fn test_auto_detect_is_idempotent() {
        let store = MemoryStore::new();
        let h = headers(&["Date", "ASIN", "Name", "Clicks", "Earnings", "Campaign Title"]);
        let first = auto_detect(&h, "onsite.csv", &store);
        let second = auto_detect(&h, "onsite.csv", &store);
        assert_eq!(first, second);
    }

    #[test]
    fn test_assign_clears_previous_owner() {
        let mapping = ColumnMapping::default()
            .assign(MappingField::Asin, Some(1))
            .assign(MappingField::Title, Some(2));
        let next = mapping.assign(MappingField::Revenue, Some(1));
        assert_eq!(next.revenue, Some(1));
        assert_eq!(next.asin, None);
        assert_eq!(next.title, Some(2));
        // input untouched
        assert_eq!(mapping.asin, Some(1));
        assert_unique_columns(&next);
    }

    #[test]
    fn test_assign_sequence_keeps_columns_unique() {
        let mut mapping = ColumnMapping::default();
        let steps = [(0usize, 3usize), (1, 3), (2, 1), (3, 1), (4, 0), (5, 3), (9, 0)];
        for (field_idx, col) in steps {
            mapping = mapping.assign(MappingField::ALL[field_idx], Some(col));
            assert_unique_columns(&mapping);
        }
        assert_eq!(mapping.owner_of(3), Some(MappingField::Ordered));
        assert_eq!(mapping.owner_of(0), Some(MappingField::CampaignTitle));
    }

    #[test]
    fn test_assign_none_unmaps() {
        let mapping = ColumnMapping::default().assign(MappingField::Date, Some(0));
        assert_eq!(mapping.assign(MappingField::Date, None).date, None);
    }

    #[test]
    fn test_persist_then_detect_returns_saved_mapping() {
        let store = MemoryStore::new();
        let h = headers(&["Date", "ASIN", "Product Title", "Ad Fees"]);
        let custom = ColumnMapping::default()
            .assign(MappingField::Asin, Some(0))
            .assign(MappingField::Revenue, Some(2));
        persist(&store, &header_signature(&h), &custom).unwrap();

        let detection = auto_detect(&h, "x.csv", &store);
        assert!(detection.from_saved);
        assert_eq!(detection.mapping, custom);

        // A different header set does not reuse it.
        let other = headers(&["Date", "ASIN", "Product Title", "Ad Fees", "Clicks"]);
        assert!(!auto_detect(&other, "x.csv", &store).from_saved);
    }

    #[test]
    fn test_persisted_json_format() {
        let store = MemoryStore::new();
        let mapping = ColumnMapping::default().assign(MappingField::CampaignTitle, Some(4));
        persist(&store, "A|B", &mapping).unwrap();
        let raw = store.get("amazon_column_mapping_A|B").unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["campaignTitle"], 4);
        assert_eq!(value["asin"], -1);
    }

    #[test]
    fn test_corrupt_saved_mapping_falls_back_to_heuristics() {
        let store = MemoryStore::new();
        let h = headers(&["Date", "ASIN", "Ad Fees"]);
        store.set(&storage_key(&header_signature(&h)), "{not json").unwrap();
        let detection = auto_detect(&h, "x.csv", &store);
        assert!(!detection.from_saved);
        assert_eq!(detection.mapping.asin, Some(1));
    }

    #[test]
    fn test_forget_removes_saved_mapping() {
        let store = MemoryStore::new();
        let h = headers(&["ASIN", "Earnings"]);
        let sig = header_signature(&h);
        persist(&store, &sig, &detect_from_headers(&h)).unwrap();
        forget(&store, &sig).unwrap();
        assert!(load_saved(&store, &h).is_none());
    }

    #[test]
    fn test_require_fields_message() {
        let err = ColumnMapping::default()
            .assign(MappingField::Asin, Some(0))
            .require_fields()
            .unwrap_err();
        assert!(err.to_string().contains("Revenue"));
        assert!(!err.to_string().contains("ASIN"));
    }

    #[test]
    fn test_validate_unmapped_is_silent() {
        let data = rows(&[&["abc"], &["def"]]);
        assert_eq!(validate(None, ColumnKind::Number, &data), None);
        assert_eq!(validate(None, ColumnKind::Date, &[]), None);
    }

    #[test]
    fn test_validate_numbers() {
        let data = rows(&[&["$1.50"], &["(2.00)"], &["12%"], &["1,234.5"], &[""]]);
        assert_eq!(validate(Some(0), ColumnKind::Number, &data), None);

        let text = rows(&[&["Widget"], &["Gadget"]]);
        assert_eq!(validate(Some(0), ColumnKind::Number, &text), Some(ColumnWarning::NoData));

        let mixed = rows(&[&["Widget"], &["Gadget"], &["3.00"]]);
        assert_eq!(
            validate(Some(0), ColumnKind::Number, &mixed),
            Some(ColumnWarning::ManyInvalid { invalid: 2, valid: 1 })
        );
    }

    #[test]
    fn test_validate_rejects_non_finite_numbers() {
        let data = rows(&[&["NaN"], &["inf"], &["Infinity"]]);
        assert_eq!(validate(Some(0), ColumnKind::Number, &data), Some(ColumnWarning::NoData));
    }

    #[test]
    fn test_validate_dates_are_loose() {
        let data = rows(&[&["2024-01-01"], &["01/02/2024"], &["Jan 3"]]);
        assert_eq!(validate(Some(0), ColumnKind::Date, &data), None);
        let words = rows(&[&["yesterday"], &["today"]]);
        assert_eq!(validate(Some(0), ColumnKind::Date, &words), Some(ColumnWarning::NoData));
    }

    #[test]
    fn test_validate_blank_column_has_no_warning() {
        let data = rows(&[&["", "x"], &["  ", "y"]]);
        assert_eq!(validate(Some(0), ColumnKind::Number, &data), None);
        // short rows are skipped too
        assert_eq!(validate(Some(5), ColumnKind::Number, &data), None);
    }

    #[test]
    fn test_validate_samples_first_twenty_rows_only() {
        let mut data: Vec<Vec<String>> = (0..20).map(|i| vec![format!("{i}.00")]).collect();
        data.extend((0..50).map(|_| vec!["n/a".to_string()]));
        assert_eq!(validate(Some(0), ColumnKind::Number, &data), None);
    }

    #[test]
    fn test_validate_mapping_reports_per_field() {
        let h = headers(&["Date", "ASIN", "Ad Fees"]);
        let mapping = detect_from_headers(&h);
        let data = rows(&[&["2024-01-01", "B0001", "free"], &["2024-01-02", "B0002", "none"]]);
        let warnings = validate_mapping(&mapping, &data);
        assert_eq!(warnings, vec![(MappingField::Revenue, ColumnWarning::NoData)]);
    }

    #[test]
    fn test_field_keys_round_trip() {
        for field in MappingField::ALL {
            assert_eq!(MappingField::from_key(field.key()), Some(field));
        }
        assert_eq!(MappingField::from_key("campaigntitle"), Some(MappingField::CampaignTitle));
        assert_eq!(MappingField::from_key("nope"), None);
    }
}
