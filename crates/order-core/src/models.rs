use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

// ── TrafficSource ─────────────────────────────────────────────────────────────

/// Coarse channel label derived from the `purchase_url` token.
///
/// Variants are declared in rule order; the derived `Ord` follows that order
/// and is used as the tie-break wherever channels are sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TrafficSource {
    #[serde(rename = "AD")]
    Ad,
    #[serde(rename = "shop")]
    Shop,
    #[serde(rename = "listing")]
    Listing,
    #[serde(rename = "instagram")]
    Instagram,
    #[serde(rename = "tiktok")]
    Tiktok,
    #[serde(rename = "LINE")]
    Line,
    #[serde(rename = "DM")]
    Dm,
    #[serde(rename = "outbound")]
    Outbound,
    #[serde(rename = "mg")]
    Mg,
    #[serde(rename = "other")]
    Other,
}

/// How a classification rule compares against the purchase token.
enum Pattern {
    Prefix(&'static str),
    Exact(&'static str),
}

/// Classification rules, first match wins.
const CLASSIFICATION_RULES: &[(Pattern, TrafficSource)] = &[
    (Pattern::Prefix("ad_"), TrafficSource::Ad),
    (Pattern::Prefix("shop_"), TrafficSource::Shop),
    (Pattern::Prefix("list_"), TrafficSource::Listing),
    (Pattern::Prefix("ins_"), TrafficSource::Instagram),
    (Pattern::Prefix("tik_"), TrafficSource::Tiktok),
    (Pattern::Prefix("line"), TrafficSource::Line),
    (Pattern::Prefix("rp_dm"), TrafficSource::Dm),
    (Pattern::Prefix("rp_outb"), TrafficSource::Outbound),
    (Pattern::Exact("rp_mg"), TrafficSource::Mg),
];

impl TrafficSource {
    /// Every variant in declaration order.
    pub const ALL: [TrafficSource; 10] = [
        TrafficSource::Ad,
        TrafficSource::Shop,
        TrafficSource::Listing,
        TrafficSource::Instagram,
        TrafficSource::Tiktok,
        TrafficSource::Line,
        TrafficSource::Dm,
        TrafficSource::Outbound,
        TrafficSource::Mg,
        TrafficSource::Other,
    ];

    /// Classify a raw purchase token.
    ///
    /// Matching is literal and case-sensitive. Anything that misses every
    /// rule is [`TrafficSource::Other`], including `rp_` tokens that are not
    /// `rp_dm*`, `rp_outb*` or exactly `rp_mg`.
    pub fn classify(purchase_url: &str) -> TrafficSource {
        CLASSIFICATION_RULES
            .iter()
            .find(|(pattern, _)| match pattern {
                Pattern::Prefix(p) => purchase_url.starts_with(p),
                Pattern::Exact(e) => purchase_url == *e,
            })
            .map(|(_, source)| *source)
            .unwrap_or(TrafficSource::Other)
    }

    /// Display label, identical to the exported column value.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficSource::Ad => "AD",
            TrafficSource::Shop => "shop",
            TrafficSource::Listing => "listing",
            TrafficSource::Instagram => "instagram",
            TrafficSource::Tiktok => "tiktok",
            TrafficSource::Line => "LINE",
            TrafficSource::Dm => "DM",
            TrafficSource::Outbound => "outbound",
            TrafficSource::Mg => "mg",
            TrafficSource::Other => "other",
        }
    }
}

impl fmt::Display for TrafficSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── PriceSegment ──────────────────────────────────────────────────────────────

/// Price tier of a single order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSegment {
    Low,
    Mid,
    High,
}

impl PriceSegment {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceSegment::Low => "low",
            PriceSegment::Mid => "mid",
            PriceSegment::High => "high",
        }
    }
}

impl fmt::Display for PriceSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boundaries between the price tiers.
///
/// `amount < low` is low, `low..=high` is mid, anything above `high` is high.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceThresholds {
    pub low: f64,
    pub high: f64,
}

impl PriceThresholds {
    pub const DEFAULT_LOW: f64 = 3000.0;
    pub const DEFAULT_HIGH: f64 = 6000.0;

    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Bucket `amount` into its tier.
    pub fn segment(&self, amount: f64) -> PriceSegment {
        if amount < self.low {
            PriceSegment::Low
        } else if amount <= self.high {
            PriceSegment::Mid
        } else {
            PriceSegment::High
        }
    }
}

impl Default for PriceThresholds {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LOW, Self::DEFAULT_HIGH)
    }
}

// ── Cohort ────────────────────────────────────────────────────────────────────

/// New vs. repeat customer cohort.
///
/// The mapping from the numeric first flag is fixed: `1` is [`Cohort::New`],
/// `0` is [`Cohort::Repeat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cohort {
    New,
    Repeat,
}

impl Cohort {
    pub fn from_first_flag(first_flag: bool) -> Cohort {
        if first_flag {
            Cohort::New
        } else {
            Cohort::Repeat
        }
    }

    /// The numeric flag value this cohort corresponds to.
    pub fn first_flag(&self) -> u8 {
        match self {
            Cohort::New => 1,
            Cohort::Repeat => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Cohort::New => "new",
            Cohort::Repeat => "repeat",
        }
    }
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Order records ─────────────────────────────────────────────────────────────

/// Header names of the columns the pipeline reads.
pub mod columns {
    pub const CUSTOMER: &str = "customer_num";
    pub const ORDER_AT: &str = "order_at";
    pub const PURCHASE_URL: &str = "purchase_url";
    pub const PAID_PRICE: &str = "paid_price";

    /// Columns appended by enrichment, in export order.
    pub const DERIVED: [&str; 7] = [
        "traffic_source",
        "purchase_count",
        "first_order_date",
        "first_flag",
        "month",
        "year",
        "price_segment",
    ];
}

/// Positions of the required columns within the header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub customer: usize,
    pub order_at: usize,
    pub purchase_url: usize,
    pub paid_price: usize,
}

/// One order row as read from the input file.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    /// 0-based position in the input file (data rows only).
    pub row_index: usize,
    pub customer_num: String,
    pub order_at: NaiveDateTime,
    pub purchase_url: String,
    pub paid_price: f64,
    /// Every field of the row verbatim, aligned with [`OrderTable::headers`].
    pub fields: Vec<String>,
}

/// The raw input table.
#[derive(Debug, Clone)]
pub struct OrderTable {
    pub headers: Vec<String>,
    pub layout: ColumnLayout,
    pub rows: Vec<OrderRecord>,
}

impl OrderTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// An order row plus the analytical columns added by enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedOrder {
    pub order: OrderRecord,
    pub traffic_source: TrafficSource,
    /// 1-based running count within the customer's orders.
    pub purchase_count: u32,
    /// Earliest order timestamp of the customer.
    pub first_order_date: NaiveDateTime,
    /// Set on exactly one row per customer: its first order.
    pub first_flag: bool,
    /// `YYYY-MM`
    pub month: String,
    /// `YYYY`
    pub year: String,
    pub price_segment: PriceSegment,
}

impl EnrichedOrder {
    pub fn cohort(&self) -> Cohort {
        Cohort::from_first_flag(self.first_flag)
    }
}

/// The enriched base table, or a filtered subset of it.
#[derive(Debug, Clone)]
pub struct EnrichedTable {
    pub headers: Vec<String>,
    pub layout: ColumnLayout,
    pub rows: Vec<EnrichedOrder>,
}

impl EnrichedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// A table with the same schema and the given rows.
    pub fn with_rows(&self, rows: Vec<EnrichedOrder>) -> EnrichedTable {
        EnrichedTable {
            headers: self.headers.clone(),
            layout: self.layout,
            rows,
        }
    }
}
