//! Dashboard pipeline: one enriched base table, one report per selection.
//!
//! [`DashboardSession`] loads and enriches the order file once, then answers
//! every [`Selection`] with a [`DashboardReport`] carrying the filtered rows
//! and the chart panels of the selected mode.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Instant;

use order_core::date_range::{DateRange, MonthToken, Selection};
use order_core::error::Result;
use order_core::models::{Cohort, EnrichedTable, PriceThresholds};
use tracing::{debug, info};

use crate::aggregator::{
    ChannelRepeatRow, CohortSplit, CompositionSlice, MonthlyRepeatRow, OrderAggregator,
    TrafficShareRow,
};
use crate::enricher::Enricher;
use crate::filter::filter_by_range;
use crate::reader::load_orders;

// ── ChartPanel ────────────────────────────────────────────────────────────────

/// Outcome of building one chart: data to draw, or nothing in the window.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartPanel<T> {
    Ready { title: String, data: T },
    Empty { title: String },
}

impl<T> ChartPanel<T> {
    pub fn title(&self) -> &str {
        match self {
            ChartPanel::Ready { title, .. } | ChartPanel::Empty { title } => title,
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ChartPanel::Ready { data, .. } => Some(data),
            ChartPanel::Empty { .. } => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ChartPanel::Empty { .. })
    }
}

impl<R> ChartPanel<Vec<R>> {
    /// `Empty` when `rows` is empty.
    pub fn from_rows(title: &str, rows: Vec<R>) -> Self {
        if rows.is_empty() {
            ChartPanel::Empty {
                title: title.to_string(),
            }
        } else {
            ChartPanel::Ready {
                title: title.to_string(),
                data: rows,
            }
        }
    }
}

impl ChartPanel<CohortSplit> {
    /// `Empty` when the split counts no orders.
    pub fn from_split(title: &str, split: CohortSplit) -> Self {
        if split.total() == 0 {
            ChartPanel::Empty {
                title: title.to_string(),
            }
        } else {
            ChartPanel::Ready {
                title: title.to_string(),
                data: split,
            }
        }
    }
}

// ── Report ────────────────────────────────────────────────────────────────────

/// Charts of the month-over-month comparison mode.
#[derive(Debug, Clone)]
pub struct CompareCharts {
    pub new_flow: ChartPanel<Vec<TrafficShareRow>>,
    pub repeat_rate: ChartPanel<Vec<MonthlyRepeatRow>>,
    pub repeat_flow: ChartPanel<Vec<TrafficShareRow>>,
}

/// Charts of the single-month spot mode.
#[derive(Debug, Clone)]
pub struct SpotCharts {
    pub new_composition: ChartPanel<Vec<CompositionSlice>>,
    pub repeat_composition: ChartPanel<Vec<CompositionSlice>>,
    pub cohort_split: ChartPanel<CohortSplit>,
    pub channel_repeat: ChartPanel<Vec<ChannelRepeatRow>>,
}

#[derive(Debug, Clone)]
pub enum ReportCharts {
    Compare(CompareCharts),
    Spot(SpotCharts),
}

/// Everything one selection produces.
#[derive(Debug, Clone)]
pub struct DashboardReport {
    pub selection: Selection,
    pub range: DateRange,
    /// Rows inside `range`, in input order.
    pub filtered: EnrichedTable,
    pub charts: ReportCharts,
}

impl DashboardReport {
    /// Build the report for `selection` from `base`.
    pub fn build(base: &EnrichedTable, selection: Selection) -> Result<Self> {
        let range = selection.resolve()?;
        let filtered = filter_by_range(base, &range);
        let rows = &filtered.rows;

        let charts = match selection {
            Selection::Compare { .. } => ReportCharts::Compare(CompareCharts {
                new_flow: ChartPanel::from_rows(
                    "Monthly traffic share: new customers",
                    OrderAggregator::monthly_traffic_share(rows, Cohort::New),
                ),
                repeat_rate: ChartPanel::from_rows(
                    "Repeat orders and repeat rate by month",
                    OrderAggregator::monthly_repeat_rate(rows),
                ),
                repeat_flow: ChartPanel::from_rows(
                    "Monthly traffic share: repeat customers",
                    OrderAggregator::monthly_traffic_share(rows, Cohort::Repeat),
                ),
            }),
            Selection::Spot { .. } => ReportCharts::Spot(SpotCharts {
                new_composition: ChartPanel::from_rows(
                    "New customer traffic composition",
                    OrderAggregator::composition(rows, Some(Cohort::New)),
                ),
                repeat_composition: ChartPanel::from_rows(
                    "Repeat customer traffic composition",
                    OrderAggregator::composition(rows, Some(Cohort::Repeat)),
                ),
                cohort_split: ChartPanel::from_split(
                    "New vs repeat orders",
                    OrderAggregator::cohort_split(rows),
                ),
                channel_repeat: ChartPanel::from_rows(
                    "Orders and repeat rate by traffic source",
                    OrderAggregator::channel_repeat_rate(rows),
                ),
            }),
        };

        Ok(Self {
            selection,
            range,
            filtered,
            charts,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.filtered.is_empty()
    }
}

// ── DashboardSession ──────────────────────────────────────────────────────────

/// Read-only enriched base table plus the months it covers.
#[derive(Debug, Clone)]
pub struct DashboardSession {
    base: EnrichedTable,
    months: Vec<MonthToken>,
}

impl DashboardSession {
    pub fn new(base: EnrichedTable) -> Self {
        let months: BTreeSet<MonthToken> = base
            .rows
            .iter()
            .map(|r| MonthToken::from_date(r.order.order_at.date()))
            .collect();
        Self {
            base,
            months: months.into_iter().collect(),
        }
    }

    /// Load the CSV at `path` and enrich it with `thresholds`.
    pub fn load(path: &Path, thresholds: PriceThresholds) -> Result<Self> {
        let load_start = Instant::now();
        let table = load_orders(path)?;
        let load_time = load_start.elapsed().as_secs_f64();

        let enrich_start = Instant::now();
        let enriched = Enricher::new(thresholds).enrich(table);
        let enrich_time = enrich_start.elapsed().as_secs_f64();

        debug!(
            load_time_seconds = load_time,
            enrich_time_seconds = enrich_time,
            "order table ready"
        );

        let session = Self::new(enriched);
        info!(
            "{} orders spanning {} months",
            session.base.len(),
            session.months.len()
        );
        Ok(session)
    }

    pub fn base(&self) -> &EnrichedTable {
        &self.base
    }

    /// Distinct months present in the data, ascending.
    pub fn months(&self) -> &[MonthToken] {
        &self.months
    }

    /// Run filter and aggregation for one user selection.
    pub fn submit(&self, selection: &Selection) -> Result<DashboardReport> {
        let report = DashboardReport::build(&self.base, *selection)?;
        info!(
            "{}: {} rows in {}",
            selection,
            report.filtered.len(),
            report.range
        );
        Ok(report)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
