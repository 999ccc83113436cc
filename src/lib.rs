//! riskmon - Return-risk dashboard for product reviews
//!
//! riskmon talks to a risk backend that scores products by how many of
//! their reviews are negative, and turns its answers into a dashboard:
//! a ranking of the riskiest products, the complaint causes behind one of
//! them, and review excerpts for the main cause.
//!
//! # Overview
//!
//! Every interaction (period, top-N, minimum review volume, product pick)
//! re-runs the whole pipeline:
//!
//! 1. **Fetch** the period's ranking snapshot (cached for ten minutes)
//! 2. **Filter** out products with too few reviews
//! 3. **Sort** by complaint count, then negative rate, and keep the top N
//! 4. **Drill down** into one visible product: cause map, principal cause,
//!    evidence
//!
//! Network trouble never aborts a pass. A failed ranking becomes a
//! "cannot connect" state; failed cause or evidence lookups become inline
//! notices.
//!
//! # Quick Start
//!
//! ```no_run
//! use riskmon::{ApiClient, Config, FilterState, Session, Stage};
//!
//! let config = Config::default();
//! let mut client = ApiClient::connect(&config).expect("valid API URL");
//! let session = Session::evaluate(&mut client, FilterState::default(), None);
//!
//! match session.stage() {
//!     Stage::RankingLoaded { view, .. } => {
//!         for r in &view.visible {
//!             println!("{} {} complaints ({:.1}%)", r.asin, r.n_neg, r.pct_neg * 100.0);
//!         }
//!     }
//!     Stage::RankingLoadFailed { api_url, .. } => eprintln!("backend down: {}", api_url),
//!     _ => {}
//! }
//! ```
//!
//! # Modules
//!
//! - [`client`]: backend transport, caching and soft failure
//! - [`ranking`]: volume filter, two-key sort, top-N and KPIs
//! - [`drilldown`]: the period → product → cause → evidence session
//! - [`report`]: HTML, JSON and CSV output
//! - [`serve`]: the interactive dashboard server

pub mod cache;
pub mod client;
pub mod config;
pub mod drilldown;
pub mod model;
pub mod ranking;
pub mod report;
pub mod serve;

pub use client::{ApiClient, Backend, ClientError, HttpBackend};
pub use config::{Config, ConfigError};
pub use drilldown::{CauseStage, EvidenceStage, SelectError, Selection, Session, Stage};
pub use model::{CauseEntry, EvidenceItem, FilterState, Period, RankingRecord};
pub use ranking::{Kpis, RankingView};

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // PUBLIC API TESTS
    // ==========================================================================
    //
    // These tests verify the public API surface is reachable from the crate
    // root.
    // ==========================================================================

    #[test]
    fn test_public_exports() {
        let _ = Config::default();
        let _ = FilterState::default();
        let session = Session::new();
        assert_eq!(*session.stage(), Stage::NoPeriod);
    }

    #[test]
    fn test_http_client_constructible_from_root() {
        let client = ApiClient::connect(&Config::default()).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:8000/api/v1");
    }
}
