//! Integration tests for the HTTP backend client against a fake risk API
//!
//! These go through the real reqwest transport, so they cover URL building,
//! query encoding, status handling and payload decoding together.

mod common;

use common::{dead_base_url, happy_route, FakeApi, TWO_CAUSES, TWO_PRODUCTS};
use riskmon::report;
use riskmon::{
    ApiClient, CauseStage, ClientError, Config, EvidenceStage, FilterState, Period, Session, Stage,
};

fn filter(min_reviews: u32) -> FilterState {
    FilterState::new("2023-01".parse().unwrap(), 10, min_reviews)
}

// ============================================================================
// RANKING
// ============================================================================

#[test]
fn test_ranking_request_shape() {
    let api = FakeApi::spawn(happy_route);
    let mut client = ApiClient::connect(&api.config()).unwrap();

    let records = client.fetch_ranking(&Period::default());
    assert_eq!(records.len(), 2);

    let hits = api.hits();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].starts_with("/api/v1/ranking/riesgo?"), "got {}", hits[0]);
    assert!(hits[0].contains("periodo=2023-01"));
    assert!(hits[0].contains("top_n=2000"), "snapshot cap is requested, not the slider");
}

#[test]
fn test_min_reviews_filter_end_to_end() {
    let api = FakeApi::spawn(happy_route);
    let mut client = ApiClient::connect(&api.config()).unwrap();

    let session = Session::evaluate(&mut client, filter(20), None);
    let view = session.view().expect("ranking loaded");
    let asins: Vec<&str> = view.asins().collect();
    assert_eq!(asins, vec!["A1"]);
    assert_eq!(view.kpis.products_at_risk, 1);
    assert_eq!(view.kpis.total_reviews, 30);
}

#[test]
fn test_ranking_is_cached_per_period() {
    let api = FakeApi::spawn(happy_route);
    let mut client = ApiClient::connect(&api.config()).unwrap();

    Session::evaluate(&mut client, filter(20), None);
    Session::evaluate(&mut client, filter(0), None);
    assert_eq!(api.hits_on("/ranking/riesgo"), 1);

    Session::evaluate(&mut client, FilterState::new("2023-02".parse().unwrap(), 10, 0), None);
    assert_eq!(api.hits_on("/ranking/riesgo"), 2);
}

#[test]
fn test_server_error_shows_connectivity_banner() {
    let api = FakeApi::spawn(|_, _| (500, r#"{"detail": "boom"}"#.to_string()));
    let mut client = ApiClient::connect(&api.config()).unwrap();

    assert!(client.fetch_ranking(&Period::default()).is_empty());

    let session = Session::evaluate(&mut client, filter(20), None);
    match session.stage() {
        Stage::RankingLoadFailed { api_url, .. } => {
            assert_eq!(api_url, &api.base_url);
            assert!(report::connectivity_banner(api_url).contains(&api.base_url));
        }
        other => panic!("expected RankingLoadFailed, got {:?}", other),
    }
    assert!(session.selection().is_none(), "no drill-down after a failed ranking");
    assert_eq!(api.hits_on("/mapa-causas"), 0);
}

#[test]
fn test_status_error_is_reported() {
    let api = FakeApi::spawn(|_, _| (503, "{}".to_string()));
    let mut client = ApiClient::connect(&api.config()).unwrap();

    match client.try_fetch_ranking(&Period::default()) {
        Err(ClientError::Status { status, url }) => {
            assert_eq!(status, 503);
            assert!(url.contains("/ranking/riesgo"));
        }
        other => panic!("expected status error, got {:?}", other.map(|r| r.len())),
    }
}

#[test]
fn test_failed_ranking_is_retried() {
    let api = FakeApi::spawn(|_, _| (500, "{}".to_string()));
    let mut client = ApiClient::connect(&api.config()).unwrap();

    client.fetch_ranking(&Period::default());
    client.fetch_ranking(&Period::default());
    assert_eq!(api.hits_on("/ranking/riesgo"), 2);
}

#[test]
fn test_malformed_payload_is_a_decode_error() {
    let api = FakeApi::spawn(|_, _| (200, r#"{"not": "a list"}"#.to_string()));
    let mut client = ApiClient::connect(&api.config()).unwrap();

    assert!(matches!(
        client.try_fetch_ranking(&Period::default()),
        Err(ClientError::Decode { .. })
    ));
    assert!(client.fetch_ranking(&Period::default()).is_empty());
}

#[test]
fn test_unreachable_backend() {
    let config = Config::default().with_api_url(&dead_base_url()).unwrap();
    let mut client = ApiClient::connect(&config).unwrap();

    assert!(matches!(
        client.try_fetch_ranking(&Period::default()),
        Err(ClientError::Transport { .. })
    ));

    let session = Session::evaluate(&mut client, filter(20), None);
    assert!(matches!(session.stage(), Stage::RankingLoadFailed { .. }));
}

// ============================================================================
// CAUSES AND EVIDENCE
// ============================================================================

#[test]
fn test_drill_down_chain() {
    let api = FakeApi::spawn(happy_route);
    let mut client = ApiClient::connect(&api.config()).unwrap();

    let session = Session::evaluate(&mut client, filter(20), None);
    let sel = session.selection().expect("first visible row is selected");
    assert_eq!(sel.asin, "A1");

    match &sel.causes {
        CauseStage::Loaded { causes, principal, evidence } => {
            assert_eq!(causes.len(), 2);
            assert_eq!(causes[0].causa, "late delivery", "ascending by count");
            assert_eq!(principal, "broken on arrival");
            match evidence {
                EvidenceStage::Loaded { items } => {
                    assert_eq!(items.len(), 1);
                    assert_eq!(items[0].review_text, "Screen arrived shattered.");
                }
                other => panic!("expected evidence, got {:?}", other),
            }
        }
        other => panic!("expected causes, got {:?}", other),
    }

    let cause_hit = api.hits().into_iter().find(|u| u.contains("/mapa-causas")).unwrap();
    assert!(cause_hit.starts_with("/api/v1/productos/A1/mapa-causas?periodo=2023-01"));
    let evidence_hit = api.hits().into_iter().find(|u| u.contains("/evidencia")).unwrap();
    assert!(evidence_hit.contains("causa=broken+on+arrival"), "got {}", evidence_hit);
}

#[test]
fn test_asin_is_percent_encoded_in_path() {
    let api = FakeApi::spawn(|_, _| (200, TWO_CAUSES.to_string()));
    let client = ApiClient::connect(&api.config()).unwrap();

    let causes = client.fetch_cause_map("B0/7 X", &Period::default());
    assert_eq!(causes.len(), 2);

    let hits = api.hits();
    assert!(hits[0].starts_with("/api/v1/productos/B0%2F7%20X/mapa-causas"), "got {}", hits[0]);
}

#[test]
fn test_missing_cause_key_is_empty() {
    let api = FakeApi::spawn(|path, _| {
        if path.ends_with("/ranking/riesgo") {
            (200, TWO_PRODUCTS.to_string())
        } else {
            (200, "{}".to_string())
        }
    });
    let mut client = ApiClient::connect(&api.config()).unwrap();

    assert!(client.try_fetch_cause_map("A1", &Period::default()).unwrap().is_empty());

    let session = Session::evaluate(&mut client, filter(20), None);
    assert_eq!(session.selection().unwrap().causes, CauseStage::Empty);
    assert_eq!(api.hits_on("/evidencia"), 0, "no evidence lookup without a cause");
}

#[test]
fn test_cause_failure_stays_inline() {
    let api = FakeApi::spawn(|path, _| {
        if path.ends_with("/ranking/riesgo") {
            (200, TWO_PRODUCTS.to_string())
        } else {
            (500, "{}".to_string())
        }
    });
    let mut client = ApiClient::connect(&api.config()).unwrap();

    let session = Session::evaluate(&mut client, filter(20), None);
    assert!(session.view().is_some(), "ranking survives a cause failure");
    assert!(matches!(session.selection().unwrap().causes, CauseStage::Failed { .. }));
}

#[test]
fn test_empty_evidence() {
    let api = FakeApi::spawn(|path, query| {
        if path.ends_with("/evidencia") {
            (200, "[]".to_string())
        } else {
            happy_route(path, query)
        }
    });
    let mut client = ApiClient::connect(&api.config()).unwrap();

    let session = Session::evaluate(&mut client, filter(20), None);
    match &session.selection().unwrap().causes {
        CauseStage::Loaded { evidence, .. } => assert_eq!(*evidence, EvidenceStage::Empty),
        other => panic!("expected causes, got {:?}", other),
    }

    let mut page = Vec::new();
    report::html::write(&mut page, &session, false).unwrap();
    assert!(String::from_utf8(page).unwrap().contains(report::NO_EVIDENCE));
}

#[test]
fn test_evidence_text_is_truncated() {
    let long = "x".repeat(400);
    let body = format!(r#"[{{"overall": 2.0, "reviewText": "{}"}}]"#, long);
    let api = FakeApi::spawn(move |_, _| (200, body.clone()));
    let client = ApiClient::connect(&api.config()).unwrap();

    let items = client.fetch_evidence("A1", &Period::default(), "late delivery");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].review_text.chars().count(), 250);
    assert_eq!(items[0].overall, 2.0);
}

#[test]
fn test_evidence_without_text_field() {
    let api = FakeApi::spawn(|_, _| (200, r#"[{"overall": 4.0}]"#.to_string()));
    let client = ApiClient::connect(&api.config()).unwrap();

    let items = client.fetch_evidence("A1", &Period::default(), "noise");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].review_text, "");
}
