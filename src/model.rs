//! Records exchanged with the risk backend and the user-controlled filter
//!
//! Everything here is plain data. Records are produced fresh for each
//! backend call and never mutated; the filter is rebuilt from the controls
//! on every interaction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Monthly buckets the backend has data for
pub const KNOWN_PERIODS: [&str; 9] = [
    "2023-01", "2023-02", "2023-03", "2023-04", "2023-05", "2023-06", "2023-07", "2023-08",
    "2023-09",
];

pub const TOP_N_MIN: u32 = 5;
pub const TOP_N_MAX: u32 = 100;
pub const TOP_N_DEFAULT: u32 = 10;

pub const MIN_REVIEWS_MAX: u32 = 200;
pub const MIN_REVIEWS_STEP: u32 = 5;
pub const MIN_REVIEWS_DEFAULT: u32 = 20;

/// One row of the per-period risk ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingRecord {
    pub risk_rank: i64,
    pub asin: String,
    pub n_reviews: u32,
    pub n_neg: u32,
    /// Share of negative reviews, 0.0..=1.0
    pub pct_neg: f64,
}

/// Complaint category and how many reviews mention it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CauseEntry {
    pub causa: String,
    pub conteo: u32,
}

/// Review excerpt backing a complaint category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Star rating, usually 1-5
    pub overall: f64,
    #[serde(rename = "reviewText", default)]
    pub review_text: String,
}

impl EvidenceItem {
    /// Rating without a trailing `.0` for whole stars
    pub fn rating_label(&self) -> String {
        if self.overall.fract() == 0.0 {
            format!("{}", self.overall as i64)
        } else {
            format!("{:.1}", self.overall)
        }
    }
}

// ============================================================================
// Period
// ============================================================================

/// A validated period token (`YYYY-MM`) from [`KNOWN_PERIODS`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Period(&'static str);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown period '{0}' (expected one of 2023-01..2023-09)")]
pub struct ParsePeriodError(pub String);

impl Period {
    pub fn all() -> impl Iterator<Item = Period> {
        KNOWN_PERIODS.into_iter().map(Period)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl Default for Period {
    fn default() -> Self {
        Period(KNOWN_PERIODS[0])
    }
}

impl FromStr for Period {
    type Err = ParsePeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        KNOWN_PERIODS
            .into_iter()
            .find(|p| *p == s)
            .map(Period)
            .ok_or_else(|| ParsePeriodError(s.to_string()))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

// ============================================================================
// Filter
// ============================================================================

/// Control values that drive every query and the local filter/sort pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterState {
    pub periodo: Period,
    pub top_n: u32,
    pub min_reviews: u32,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            periodo: Period::default(),
            top_n: TOP_N_DEFAULT,
            min_reviews: MIN_REVIEWS_DEFAULT,
        }
    }
}

impl FilterState {
    /// Build a filter, forcing both sliders into their allowed ranges
    pub fn new(periodo: Period, top_n: u32, min_reviews: u32) -> Self {
        Self {
            periodo,
            top_n: top_n.clamp(TOP_N_MIN, TOP_N_MAX),
            min_reviews: clamp_min_reviews(min_reviews),
        }
    }
}

fn clamp_min_reviews(value: u32) -> u32 {
    let value = value.min(MIN_REVIEWS_MAX);
    value - value % MIN_REVIEWS_STEP
}
