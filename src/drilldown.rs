//! Period → ASIN → principal cause → evidence
//!
//! A [`Session`] holds one pass of the dashboard as a tagged state. Each
//! stage only exists inside the one before it, so there is no way to hold
//! evidence without a cause, or a cause without a visible product:
//!
//! ```text
//! NoPeriod
//!   └─ PeriodSelected
//!        ├─ RankingLoadFailed
//!        └─ RankingLoaded ── (pick a visible ASIN)
//!             ├─ CauseStage::Empty
//!             ├─ CauseStage::Failed
//!             └─ CauseStage::Loaded ── EvidenceStage::{Loaded, Empty, Failed}
//! ```
//!
//! Changing the period or either slider drops everything downstream and
//! re-enters `PeriodSelected`.

use crate::client::{ApiClient, Backend};
use crate::model::{CauseEntry, EvidenceItem, FilterState, Period};
use crate::ranking::RankingView;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectError {
    #[error("ASIN '{0}' is not in the visible ranking")]
    NotVisible(String),
    #[error("no ranking loaded")]
    NoRanking,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EvidenceStage {
    Loaded { items: Vec<EvidenceItem> },
    Empty,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CauseStage {
    Loaded {
        /// Ascending by count, so the principal cause is last
        causes: Vec<CauseEntry>,
        principal: String,
        evidence: EvidenceStage,
    },
    Empty,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub asin: String,
    pub causes: CauseStage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Stage {
    NoPeriod,
    PeriodSelected {
        filter: FilterState,
    },
    RankingLoadFailed {
        filter: FilterState,
        api_url: String,
    },
    RankingLoaded {
        filter: FilterState,
        view: RankingView,
        selection: Option<Selection>,
        api_url: String,
    },
}

// ============================================================================
// Cause ordering
// ============================================================================

/// Count ascending; equal counts put the alphabetically first name last,
/// which makes it the principal cause
fn cause_order(a: &CauseEntry, b: &CauseEntry) -> Ordering {
    a.conteo.cmp(&b.conteo).then_with(|| b.causa.cmp(&a.causa))
}

/// Sort for display, smallest first
pub fn sort_ascending(causes: &mut [CauseEntry]) {
    causes.sort_by(cause_order);
}

/// Cause with the highest count. Ties go to the lexicographically
/// smallest `causa` so the choice does not depend on response order.
pub fn principal_cause(causes: &[CauseEntry]) -> Option<&CauseEntry> {
    causes.iter().max_by(|a, b| cause_order(a, b))
}

// ============================================================================
// Session
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    stage: Stage,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self { stage: Stage::NoPeriod }
    }

    /// One full pass: choose the filter, load the ranking, then drill into
    /// `asin` if it is visible, otherwise into the first visible row.
    pub fn evaluate<B: Backend>(
        client: &mut ApiClient<B>,
        filter: FilterState,
        asin: Option<&str>,
    ) -> Self {
        let mut session = Self::new();
        session.set_filter(filter);
        session.load_ranking(client);

        let target = match (&session.stage, asin) {
            (Stage::RankingLoaded { view, .. }, Some(wanted)) if view.is_visible(wanted) => {
                Some(wanted.to_string())
            }
            (Stage::RankingLoaded { view, .. }, requested) => {
                if let Some(wanted) = requested {
                    debug!(asin = wanted, "requested ASIN not visible, using first row");
                }
                view.asins().next().map(str::to_string)
            }
            _ => None,
        };

        if let Some(asin) = target {
            // Only visible ASINs reach this point
            let _ = session.select_asin(client, &asin);
        }
        session
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn filter(&self) -> Option<&FilterState> {
        match &self.stage {
            Stage::NoPeriod => None,
            Stage::PeriodSelected { filter }
            | Stage::RankingLoadFailed { filter, .. }
            | Stage::RankingLoaded { filter, .. } => Some(filter),
        }
    }

    pub fn view(&self) -> Option<&RankingView> {
        match &self.stage {
            Stage::RankingLoaded { view, .. } => Some(view),
            _ => None,
        }
    }

    pub fn selection(&self) -> Option<&Selection> {
        match &self.stage {
            Stage::RankingLoaded { selection, .. } => selection.as_ref(),
            _ => None,
        }
    }

    /// Set the period and sliders, discarding any ranking and selection
    pub fn set_filter(&mut self, filter: FilterState) {
        if self.filter() != Some(&filter) {
            debug!(periodo = %filter.periodo, top_n = filter.top_n, min_reviews = filter.min_reviews, "filter changed");
        }
        self.stage = Stage::PeriodSelected { filter };
    }

    /// Fetch the ranking for the current filter. An empty snapshot counts
    /// as a failed load. Does nothing outside `PeriodSelected`.
    pub fn load_ranking<B: Backend>(&mut self, client: &mut ApiClient<B>) {
        let filter = match &self.stage {
            Stage::PeriodSelected { filter } => filter.clone(),
            _ => return,
        };

        let snapshot = client.fetch_ranking(&filter.periodo);
        self.stage = if snapshot.is_empty() {
            Stage::RankingLoadFailed { filter, api_url: client.base_url().to_string() }
        } else {
            let view = RankingView::build(&snapshot, &filter);
            info!(
                periodo = %filter.periodo,
                snapshot = snapshot.len(),
                filtered = view.filtered_count,
                visible = view.visible.len(),
                "ranking evaluated"
            );
            Stage::RankingLoaded {
                filter,
                view,
                selection: None,
                api_url: client.base_url().to_string(),
            }
        };
    }

    /// Pick a visible ASIN and run the cause and evidence stages for it
    pub fn select_asin<B: Backend>(
        &mut self,
        client: &ApiClient<B>,
        asin: &str,
    ) -> Result<(), SelectError> {
        let (filter, view, selection) = match &mut self.stage {
            Stage::RankingLoaded { filter, view, selection, .. } => (filter, view, selection),
            _ => return Err(SelectError::NoRanking),
        };
        if !view.is_visible(asin) {
            return Err(SelectError::NotVisible(asin.to_string()));
        }

        *selection = Some(Selection {
            asin: asin.to_string(),
            causes: drill(client, asin, &filter.periodo),
        });
        Ok(())
    }
}

fn drill<B: Backend>(client: &ApiClient<B>, asin: &str, periodo: &Period) -> CauseStage {
    let mut causes = match client.try_fetch_cause_map(asin, periodo) {
        Ok(causes) => causes,
        Err(e) => {
            warn!(asin, %periodo, error = %e, "cause map unavailable");
            return CauseStage::Failed { message: e.to_string() };
        }
    };

    sort_ascending(&mut causes);
    let principal = match principal_cause(&causes) {
        Some(top) => top.causa.clone(),
        None => return CauseStage::Empty,
    };

    let evidence = match client.try_fetch_evidence(asin, periodo, &principal) {
        Ok(items) if items.is_empty() => EvidenceStage::Empty,
        Ok(items) => EvidenceStage::Loaded { items },
        Err(e) => {
            warn!(asin, %periodo, causa = %principal, error = %e, "evidence unavailable");
            EvidenceStage::Failed { message: e.to_string() }
        }
    };

    CauseStage::Loaded { causes, principal, evidence }
}
