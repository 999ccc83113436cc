//! Volume filter, two-key sort and top-N cut over a ranking snapshot
//!
//! The backend returns rows in no particular order. The dashboard keeps
//! the products with enough reviews to be meaningful, then puts the ones
//! with the most complaints first:
//!
//! 1. keep `n_reviews >= min_reviews`
//! 2. sort by `n_neg` descending, ties by `pct_neg` descending (stable)
//! 3. keep the first `top_n`
//!
//! Headline figures ([`Kpis`]) are computed over step 1 only, so they
//! describe every product above the threshold, not just the visible rows.

use crate::model::{FilterState, Period, RankingRecord};
use serde::Serialize;
use std::cmp::Ordering;

/// Filter, sort and truncate `records`
pub fn apply(records: &[RankingRecord], min_reviews: u32, top_n: u32) -> Vec<RankingRecord> {
    rank(filter_by_volume(records, min_reviews), top_n)
}

/// Sort already-filtered rows and keep the first `top_n`
fn rank(mut filtered: Vec<RankingRecord>, top_n: u32) -> Vec<RankingRecord> {
    sort_by_risk(&mut filtered);
    filtered.truncate(top_n as usize);
    filtered
}

pub fn filter_by_volume(records: &[RankingRecord], min_reviews: u32) -> Vec<RankingRecord> {
    records
        .iter()
        .filter(|r| r.n_reviews >= min_reviews)
        .cloned()
        .collect()
}

/// Stable sort, most complaints first
pub fn sort_by_risk(records: &mut [RankingRecord]) {
    records.sort_by(|a, b| {
        b.n_neg
            .cmp(&a.n_neg)
            .then_with(|| b.pct_neg.partial_cmp(&a.pct_neg).unwrap_or(Ordering::Equal))
    });
}

/// Headline figures over the volume-filtered set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub products_at_risk: usize,
    /// Mean of `pct_neg`, as a percentage
    pub avg_negative_rate: f64,
    pub total_reviews: u64,
    pub periodo: Period,
}

impl Kpis {
    pub fn from_records(filtered: &[RankingRecord], periodo: &Period) -> Self {
        let avg_negative_rate = if filtered.is_empty() {
            0.0
        } else {
            filtered.iter().map(|r| r.pct_neg).sum::<f64>() / filtered.len() as f64 * 100.0
        };

        Self {
            products_at_risk: filtered.len(),
            avg_negative_rate,
            total_reviews: filtered.iter().map(|r| r.n_reviews as u64).sum(),
            periodo: periodo.clone(),
        }
    }
}

/// Everything the ranking section displays for one filter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingView {
    pub kpis: Kpis,
    /// Rows passing the volume filter, before the top-N cut
    pub filtered_count: usize,
    /// Sorted, truncated rows; the only ASINs that can be selected
    pub visible: Vec<RankingRecord>,
}

impl RankingView {
    pub fn build(snapshot: &[RankingRecord], filter: &FilterState) -> Self {
        let filtered = filter_by_volume(snapshot, filter.min_reviews);
        let kpis = Kpis::from_records(&filtered, &filter.periodo);
        let filtered_count = filtered.len();

        Self { kpis, filtered_count, visible: rank(filtered, filter.top_n) }
    }

    /// No product reached the volume threshold
    pub fn below_threshold(&self) -> bool {
        self.filtered_count == 0
    }

    pub fn is_visible(&self, asin: &str) -> bool {
        self.visible.iter().any(|r| r.asin == asin)
    }

    pub fn asins(&self) -> impl Iterator<Item = &str> {
        self.visible.iter().map(|r| r.asin.as_str())
    }
}
