//! Month tokens and inclusive calendar ranges.
//!
//! Resolves the `YYYY-MM` tokens chosen by the user into the
//! `[first day, last day]` windows the filter works with.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{Datelike, Days, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};

// ── Month arithmetic ──────────────────────────────────────────────────────────

/// Last calendar day of the month containing `date`.
///
/// Day 28 exists in every month and day 28 + 4 always lands in the next
/// month; stepping back from day 1 of that month gives the month end.
pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let day_28 = date - Days::new(u64::from(date.day0())) + Days::new(27);
    let next_month = day_28 + Days::new(4);
    let next_month_start = next_month - Days::new(u64::from(next_month.day0()));
    next_month_start - Days::new(1)
}

// ── MonthToken ────────────────────────────────────────────────────────────────

fn month_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})-(\d{2})$").expect("regex is valid"))
}

/// A validated `YYYY-MM` month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthToken {
    first_day: NaiveDate,
}

impl MonthToken {
    /// The month containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            first_day: date - Days::new(u64::from(date.day0())),
        }
    }

    pub fn year(&self) -> i32 {
        self.first_day.year()
    }

    pub fn month(&self) -> u32 {
        self.first_day.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    pub fn last_day(&self) -> NaiveDate {
        last_day_of_month(self.first_day)
    }

    /// The following calendar month.
    pub fn next(&self) -> MonthToken {
        MonthToken::from_date(self.last_day() + Days::new(1))
    }

    /// The preceding calendar month.
    pub fn previous(&self) -> MonthToken {
        MonthToken::from_date(self.first_day - Days::new(1))
    }
}

impl FromStr for MonthToken {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim();
        let caps = month_token_regex()
            .captures(token)
            .ok_or_else(|| AnalyticsError::MonthToken(s.to_string()))?;

        let year: i32 = caps[1]
            .parse()
            .map_err(|_| AnalyticsError::MonthToken(s.to_string()))?;
        let month: u32 = caps[2]
            .parse()
            .map_err(|_| AnalyticsError::MonthToken(s.to_string()))?;

        let first_day = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| AnalyticsError::MonthToken(s.to_string()))?;
        Ok(Self { first_day })
    }
}

impl fmt::Display for MonthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

// ── DateRange ─────────────────────────────────────────────────────────────────

/// An inclusive `[start, end]` span of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(AnalyticsError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The whole of one month.
    pub fn month(token: MonthToken) -> Self {
        Self {
            start: token.first_day(),
            end: token.last_day(),
        }
    }

    /// From the first day of `start` to the last day of `end`.
    pub fn months(start: MonthToken, end: MonthToken) -> Result<Self> {
        Self::new(start.first_day(), end.last_day())
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Inclusive on both ends.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

/// Single-month mode: `YYYY-MM` → `[first day, last day]`.
pub fn resolve_month(token: &str) -> Result<DateRange> {
    Ok(DateRange::month(token.parse()?))
}

/// Range mode: `(YYYY-MM, YYYY-MM)` → `[first day of start, last day of end]`.
pub fn resolve_range(start: &str, end: &str) -> Result<DateRange> {
    DateRange::months(start.parse()?, end.parse()?)
}

// ── Selection ─────────────────────────────────────────────────────────────────

/// Which family of charts the dashboard shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Month-by-month comparison over a range.
    Compare,
    /// Snapshot of a single month.
    Spot,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Compare => "compare",
            AnalysisMode::Spot => "spot",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mode together with the months it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Compare { start: MonthToken, end: MonthToken },
    Spot { month: MonthToken },
}

impl Selection {
    /// Parse the tokens relevant to `mode`; the others are ignored.
    pub fn from_tokens(mode: AnalysisMode, start: &str, end: &str, month: &str) -> Result<Self> {
        match mode {
            AnalysisMode::Compare => Ok(Selection::Compare {
                start: start.parse()?,
                end: end.parse()?,
            }),
            AnalysisMode::Spot => Ok(Selection::Spot {
                month: month.parse()?,
            }),
        }
    }

    pub fn mode(&self) -> AnalysisMode {
        match self {
            Selection::Compare { .. } => AnalysisMode::Compare,
            Selection::Spot { .. } => AnalysisMode::Spot,
        }
    }

    /// Resolve to the inclusive day range the filter applies.
    pub fn resolve(&self) -> Result<DateRange> {
        match *self {
            Selection::Compare { start, end } => DateRange::months(start, end),
            Selection::Spot { month } => Ok(DateRange::month(month)),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Compare { start, end } => write!(f, "compare {} .. {}", start, end),
            Selection::Spot { month } => write!(f, "spot {}", month),
        }
    }
}
