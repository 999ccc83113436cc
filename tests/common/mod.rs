//! Fake risk backend on an ephemeral port
//!
//! Each test spawns its own server thread with a routing closure and can
//! inspect every URL the client requested.

#![allow(dead_code)]

use riskmon::Config;
use std::sync::{Arc, Mutex};
use std::thread;
use tiny_http::{Header, Response, Server};

pub struct FakeApi {
    pub base_url: String,
    hits: Arc<Mutex<Vec<String>>>,
}

impl FakeApi {
    /// `route(path, query)` returns the status code and body to send
    pub fn spawn<F>(route: F) -> Self
    where
        F: Fn(&str, &str) -> (u16, String) + Send + 'static,
    {
        let server = Server::http("127.0.0.1:0").expect("bind fake backend");
        let addr = server.server_addr().to_ip().expect("ip listener");
        let hits = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&hits);

        thread::spawn(move || {
            for request in server.incoming_requests() {
                let url = request.url().to_string();
                seen.lock().unwrap().push(url.clone());

                let (path, query) = url.split_once('?').unwrap_or((url.as_str(), ""));
                let (status, body) = route(path, query);
                let response = Response::from_string(body)
                    .with_status_code(status)
                    .with_header(
                        Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap(),
                    );
                let _ = request.respond(response);
            }
        });

        Self { base_url: format!("http://{}/api/v1", addr), hits }
    }

    pub fn config(&self) -> Config {
        Config::default().with_api_url(&self.base_url).unwrap()
    }

    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }

    pub fn hits_on(&self, path_fragment: &str) -> usize {
        self.hits().iter().filter(|u| u.contains(path_fragment)).count()
    }
}

/// Base URL on a port nothing listens on
pub fn dead_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/api/v1", port)
}

pub const TWO_PRODUCTS: &str = r#"[
    {"risk_rank": 1, "asin": "A1", "n_reviews": 30, "n_neg": 10, "pct_neg": 0.33},
    {"risk_rank": 2, "asin": "A2", "n_reviews": 10, "n_neg": 2, "pct_neg": 0.2}
]"#;

pub const TWO_CAUSES: &str = r#"{"mapa_causas": [
    {"causa": "late delivery", "conteo": 5},
    {"causa": "broken on arrival", "conteo": 12}
]}"#;

pub const ONE_REVIEW: &str = r#"[{"overall": 1.0, "reviewText": "Screen arrived shattered."}]"#;

/// Backend answering every endpoint with the fixtures above
pub fn happy_route(path: &str, _query: &str) -> (u16, String) {
    if path.ends_with("/ranking/riesgo") {
        (200, TWO_PRODUCTS.to_string())
    } else if path.ends_with("/mapa-causas") {
        (200, TWO_CAUSES.to_string())
    } else if path.ends_with("/evidencia") {
        (200, ONE_REVIEW.to_string())
    } else {
        (404, "{}".to_string())
    }
}
