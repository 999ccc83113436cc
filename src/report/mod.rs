//! Rendering of an evaluated dashboard session
//!
//! - **HTML**: the dashboard page with D3.js charts (served live by
//!   [`crate::serve`] or written as a static file)
//! - **JSON**: the full session state, machine-readable
//! - **CSV**: the visible ranking table
//!
//! # Usage
//!
//! ```ignore
//! use riskmon::report;
//!
//! // Format follows the extension
//! report::generate("risk.html", &session)?;
//! report::generate("risk.json", &session)?;
//! report::generate("risk.csv", &session)?;
//! ```

pub mod csv;
pub mod html;
pub mod json;

use crate::drilldown::Session;
use std::io;
use std::path::Path;

/// Write `session` to `path`, picking the format from the extension
pub fn generate<P: AsRef<Path>>(path: P, session: &Session) -> io::Result<()> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let mut file = std::fs::File::create(path)?;

    match ext.as_str() {
        "html" | "htm" => html::write(&mut file, session, false),
        "json" => json::write(&mut file, session),
        _ => csv::write(&mut file, session),
    }
}

// ============================================================================
// User-facing messages
// ============================================================================
//
// Failures and empty results get distinct wording. Only the ranking
// failure is a page-level banner; everything below it is inline.

pub fn connectivity_banner(api_url: &str) -> String {
    format!(
        "Could not connect to the backend at {}. Make sure the API server is running.",
        api_url
    )
}

pub fn below_threshold(min_reviews: u32) -> String {
    format!("No product has at least {} reviews.", min_reviews)
}

pub const NO_VISIBLE_PRODUCTS: &str = "No products to show.";
pub const NO_CAUSES: &str = "No specific causes detected for this product.";
pub const CAUSES_FAILED: &str = "Could not load the cause breakdown for this product.";
pub const NO_EVIDENCE: &str = "No evidence text available for this cause.";
pub const EVIDENCE_FAILED: &str = "Could not reach the evidence service.";

/// Review excerpt as shown in every output format
pub fn evidence_line(item: &crate::model::EvidenceItem) -> String {
    format!("★ ({}/5) ...{}...", item.rating_label(), item.review_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ApiClient, Backend, ClientError, Result};
    use crate::config::Config;
    use crate::model::{CauseEntry, EvidenceItem, FilterState, Period, RankingRecord};

    // ==========================================================================
    // MESSAGE TESTS
    // ==========================================================================

    #[test]
    fn test_connectivity_banner_names_url() {
        let msg = connectivity_banner("http://127.0.0.1:8000/api/v1");
        assert!(msg.contains("http://127.0.0.1:8000/api/v1"));
        assert!(msg.contains("Could not connect"));
    }

    #[test]
    fn test_empty_state_messages_are_distinct() {
        let all = [
            below_threshold(50),
            NO_VISIBLE_PRODUCTS.to_string(),
            NO_CAUSES.to_string(),
            CAUSES_FAILED.to_string(),
            NO_EVIDENCE.to_string(),
            EVIDENCE_FAILED.to_string(),
        ];
        for (i, a) in all.iter().enumerate() {
            for b in all.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
        assert!(below_threshold(50).contains("50"));
    }

    #[test]
    fn test_evidence_line_format() {
        let item = EvidenceItem { overall: 1.0, review_text: "arrived cracked".into() };
        assert_eq!(evidence_line(&item), "★ (1/5) ...arrived cracked...");
    }

    // ==========================================================================
    // FORMAT DISPATCH TESTS
    // ==========================================================================

    struct Fixed;

    impl Backend for Fixed {
        fn ranking(&self, _p: &Period, _n: u32) -> Result<Vec<RankingRecord>> {
            Ok(vec![RankingRecord {
                risk_rank: 1,
                asin: "A1".into(),
                n_reviews: 30,
                n_neg: 10,
                pct_neg: 0.33,
            }])
        }
        fn cause_map(&self, _a: &str, _p: &Period) -> Result<Vec<CauseEntry>> {
            Ok(vec![CauseEntry { causa: "broken on arrival".into(), conteo: 12 }])
        }
        fn evidence(&self, _a: &str, _p: &Period, _c: &str) -> Result<Vec<EvidenceItem>> {
            Err(ClientError::Status { url: "http://fake".into(), status: 404 })
        }
        fn base_url(&self) -> &str {
            "http://fake/api/v1"
        }
    }

    fn session() -> Session {
        let mut client = ApiClient::new(Fixed, &Config::default());
        Session::evaluate(&mut client, FilterState::new(Period::default(), 10, 20), None)
    }

    #[test]
    fn test_generate_picks_format_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let session = session();

        let html_path = dir.path().join("risk.HTML");
        generate(&html_path, &session).unwrap();
        assert!(std::fs::read_to_string(&html_path).unwrap().starts_with("<!DOCTYPE html>"));

        let json_path = dir.path().join("risk.json");
        generate(&json_path, &session).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(value["session"]["stage"]["state"], "ranking_loaded");

        let csv_path = dir.path().join("risk.csv");
        generate(&csv_path, &session).unwrap();
        assert!(std::fs::read_to_string(&csv_path).unwrap().starts_with("risk_rank,asin"));
    }
}
