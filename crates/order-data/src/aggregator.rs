//! Per-chart reductions over filtered orders.
//!
//! Every function here is a pure reduction of a slice of enriched rows into the
//! small summary table one chart needs. Counts for a cohort or channel that
//! has no rows in the window are reported as zero, never omitted.

use std::collections::{BTreeMap, HashMap};

use order_core::formatting::{percentage, share};
use order_core::models::{Cohort, EnrichedOrder, TrafficSource};

use crate::filter::cohort_rows;

// ── CohortCounts ──────────────────────────────────────────────────────────────

/// New and repeat order counts for one group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CohortCounts {
    pub new: u64,
    pub repeat: u64,
}

impl CohortCounts {
    pub fn add(&mut self, cohort: Cohort) {
        match cohort {
            Cohort::New => self.new += 1,
            Cohort::Repeat => self.repeat += 1,
        }
    }

    pub fn get(&self, cohort: Cohort) -> u64 {
        match cohort {
            Cohort::New => self.new,
            Cohort::Repeat => self.repeat,
        }
    }

    pub fn total(&self) -> u64 {
        self.new + self.repeat
    }

    /// `repeat / total * 100`, one decimal; `0.0` for an empty group.
    pub fn repeat_rate(&self) -> f64 {
        percentage(self.repeat as f64, self.total() as f64, 1)
    }
}

// ── Summary rows ──────────────────────────────────────────────────────────────

/// One (month, channel) point of the monthly traffic-share chart.
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficShareRow {
    pub month: String,
    pub traffic_source: TrafficSource,
    pub count: u64,
    /// Orders of the cohort in this month, all channels.
    pub month_total: u64,
    /// `count / month_total * 100`, unrounded.
    pub share: f64,
}

/// One month of the repeat-rate chart.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyRepeatRow {
    pub month: String,
    pub counts: CohortCounts,
    pub repeat_rate: f64,
}

/// One slice of a composition (pie) chart.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionSlice {
    pub traffic_source: TrafficSource,
    pub count: u64,
    pub share: f64,
}

/// New vs. repeat totals for the whole window.
#[derive(Debug, Clone, PartialEq)]
pub struct CohortSplit {
    pub counts: CohortCounts,
    pub new_share: f64,
    pub repeat_share: f64,
}

impl CohortSplit {
    pub fn total(&self) -> u64 {
        self.counts.total()
    }
}

/// One channel of the per-channel repeat-rate chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelRepeatRow {
    pub traffic_source: TrafficSource,
    pub counts: CohortCounts,
    pub repeat_rate: f64,
}

impl ChannelRepeatRow {
    pub fn total(&self) -> u64 {
        self.counts.total()
    }
}

// ── OrderAggregator ───────────────────────────────────────────────────────────

/// Stateless helper that builds the chart summary tables.
pub struct OrderAggregator;

impl OrderAggregator {
    /// Share of each channel within each month, for one cohort.
    ///
    /// Months without rows for the cohort are absent. Shares of a month sum to
    /// 100. Rows are ordered by month, then channel declaration order.
    pub fn monthly_traffic_share(rows: &[EnrichedOrder], cohort: Cohort) -> Vec<TrafficShareRow> {
        let mut counts: BTreeMap<(&str, TrafficSource), u64> = BTreeMap::new();
        let mut totals: HashMap<&str, u64> = HashMap::new();

        for row in cohort_rows(rows, cohort) {
            *counts
                .entry((row.month.as_str(), row.traffic_source))
                .or_default() += 1;
            *totals.entry(row.month.as_str()).or_default() += 1;
        }

        counts
            .into_iter()
            .map(|((month, traffic_source), count)| {
                let month_total = totals.get(month).copied().unwrap_or(count);
                TrafficShareRow {
                    month: month.to_string(),
                    traffic_source,
                    count,
                    month_total,
                    share: share(count, month_total),
                }
            })
            .collect()
    }

    /// New and repeat counts per month with the repeat rate.
    pub fn monthly_repeat_rate(rows: &[EnrichedOrder]) -> Vec<MonthlyRepeatRow> {
        let mut months: BTreeMap<&str, CohortCounts> = BTreeMap::new();
        for row in rows {
            months
                .entry(row.month.as_str())
                .or_default()
                .add(row.cohort());
        }

        months
            .into_iter()
            .map(|(month, counts)| MonthlyRepeatRow {
                month: month.to_string(),
                counts,
                repeat_rate: counts.repeat_rate(),
            })
            .collect()
    }

    /// Channel composition of the window, optionally for one cohort only.
    ///
    /// Ordered by count descending, ties in channel declaration order.
    pub fn composition(rows: &[EnrichedOrder], cohort: Option<Cohort>) -> Vec<CompositionSlice> {
        let mut counts: BTreeMap<TrafficSource, u64> = BTreeMap::new();
        for row in rows
            .iter()
            .filter(|r| cohort.map_or(true, |c| r.cohort() == c))
        {
            *counts.entry(row.traffic_source).or_default() += 1;
        }

        let total: u64 = counts.values().sum();
        let mut slices: Vec<CompositionSlice> = counts
            .into_iter()
            .map(|(traffic_source, count)| CompositionSlice {
                traffic_source,
                count,
                share: share(count, total),
            })
            .collect();

        slices.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then(a.traffic_source.cmp(&b.traffic_source))
        });
        slices
    }

    /// New vs. repeat split of the window. Both cohorts are always present.
    pub fn cohort_split(rows: &[EnrichedOrder]) -> CohortSplit {
        let mut counts = CohortCounts::default();
        for row in rows {
            counts.add(row.cohort());
        }
        CohortSplit {
            new_share: share(counts.new, counts.total()),
            repeat_share: share(counts.repeat, counts.total()),
            counts,
        }
    }

    /// Repeat rate per channel.
    ///
    /// Only channels with at least one first order in the window are listed.
    /// Sorted by total volume descending, ties in channel declaration order.
    pub fn channel_repeat_rate(rows: &[EnrichedOrder]) -> Vec<ChannelRepeatRow> {
        let mut channels: BTreeMap<TrafficSource, CohortCounts> = BTreeMap::new();
        for row in rows {
            channels
                .entry(row.traffic_source)
                .or_default()
                .add(row.cohort());
        }

        let mut result: Vec<ChannelRepeatRow> = channels
            .into_iter()
            .filter(|(_, counts)| counts.new > 0)
            .map(|(traffic_source, counts)| ChannelRepeatRow {
                traffic_source,
                counts,
                repeat_rate: counts.repeat_rate(),
            })
            .collect();

        result.sort_by(|a, b| {
            b.total()
                .cmp(&a.total())
                .then(a.traffic_source.cmp(&b.traffic_source))
        });
        result
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
