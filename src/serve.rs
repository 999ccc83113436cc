//! HTTP server for the interactive dashboard
//!
//! `riskmon serve` → starts server, opens browser, re-evaluates the whole
//! dashboard on every request from the query string.
//!
//! Requests are handled one at a time on the calling thread. The
//! [`ApiClient`] (and its ranking cache) lives for the whole server run.

use crate::client::{ApiClient, Backend};
use crate::drilldown::Session;
use crate::model::{FilterState, Period, MIN_REVIEWS_DEFAULT, TOP_N_DEFAULT};
use crate::report;
use serde::Serialize;
use tiny_http::{Header, Method, Request, Response, Server};
use tracing::{info, warn};

#[derive(Serialize)]
struct ApiResponse<T> {
    ok: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self { ok: true, data: Some(data), error: None }
    }

    fn failure(error: String) -> Self {
        Self { ok: false, data: None, error: Some(error) }
    }
}

/// Control values as they arrive in the query string. Everything is kept
/// as text so one bad value does not discard the others.
#[derive(Serialize, Debug, Default, Clone, PartialEq)]
pub struct DashboardParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub periodo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_reviews: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asin: Option<String>,
}

impl DashboardParams {
    /// Parse a raw query string. Unknown keys are ignored and a repeated
    /// key keeps its last value.
    pub fn from_query(query: &str) -> Self {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap_or_default();

        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "periodo" => &mut params.periodo,
                "top_n" => &mut params.top_n,
                "min_reviews" => &mut params.min_reviews,
                "asin" => &mut params.asin,
                _ => continue,
            };
            *slot = Some(value);
        }
        params
    }

    /// Params that reproduce `filter` with `asin` selected
    pub fn for_view(filter: &FilterState, asin: Option<&str>) -> Self {
        Self {
            periodo: Some(filter.periodo.to_string()),
            top_n: Some(filter.top_n.to_string()),
            min_reviews: Some(filter.min_reviews.to_string()),
            asin: asin.map(str::to_string),
        }
    }

    /// Relative link to the dashboard page for these params
    pub fn to_href(&self) -> String {
        match serde_urlencoded::to_string(self) {
            Ok(q) if !q.is_empty() => format!("/?{}", q),
            _ => "/".to_string(),
        }
    }

    /// Filter for these params. Unknown periods fall back to the default
    /// period; numbers are parsed leniently and clamped.
    pub fn filter(&self) -> FilterState {
        let periodo = match self.periodo.as_deref().map(str::trim) {
            None | Some("") => Period::default(),
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                warn!(error = %e, "falling back to default period");
                Period::default()
            }),
        };
        let top_n = parse_or(self.top_n.as_deref(), TOP_N_DEFAULT);
        let min_reviews = parse_or(self.min_reviews.as_deref(), MIN_REVIEWS_DEFAULT);
        FilterState::new(periodo, top_n, min_reviews)
    }

    pub fn asin(&self) -> Option<&str> {
        self.asin.as_deref().map(str::trim).filter(|a| !a.is_empty())
    }
}

fn parse_or(raw: Option<&str>, default: u32) -> u32 {
    raw.and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}

/// Start server, open browser, serve dashboard
pub fn start<B: Backend>(port: u16, client: ApiClient<B>, open_browser: bool) -> std::io::Result<()> {
    let addr = format!("127.0.0.1:{}", port);
    let server = Server::http(&addr).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    let url = format!("http://localhost:{}", port);
    eprintln!("\n\x1b[1;32mReturn Risk Monitor\x1b[0m");
    eprintln!("   {}", url);
    eprintln!("   Backend: {}\n", client.base_url());
    info!(%addr, backend = client.base_url(), "dashboard listening");

    if open_browser {
        let _ = open::that(&url);
    }

    run(&server, client);
    Ok(())
}

/// Serve requests from `server` until it shuts down
pub fn run<B: Backend>(server: &Server, mut client: ApiClient<B>) {
    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, &mut client) {
            warn!(error = %e, "failed to answer request");
        }
    }
}

fn handle_request<B: Backend>(request: Request, client: &mut ApiClient<B>) -> std::io::Result<()> {
    let url = request.url().to_string();
    let mut parts = url.splitn(2, '?');
    let path = parts.next().unwrap_or("/");
    let query = parts.next().unwrap_or("");
    let method = request.method().clone();

    match (&method, path) {
        (&Method::Get, "/") => {
            let session = evaluate(client, query);
            let mut html = Vec::new();
            report::html::write(&mut html, &session, true)?;
            let response = Response::from_data(html).with_header(content_type("text/html; charset=utf-8")?);
            request.respond(response)
        }

        (&Method::Get, "/api/dashboard") => {
            let session = evaluate(client, query);
            let json = serde_json::to_string(&ApiResponse::success(&session))?;
            let response = Response::from_string(json).with_header(content_type("application/json")?);
            request.respond(response)
        }

        (&Method::Get, "/health") => request.respond(Response::from_string("ok")),

        (_, "/api/dashboard") | (_, "/") => {
            let json = serde_json::to_string(&ApiResponse::<()>::failure("method not allowed".into()))?;
            let response = Response::from_string(json)
                .with_status_code(405)
                .with_header(content_type("application/json")?);
            request.respond(response)
        }

        // 404
        _ => {
            let response = Response::from_string("Not found").with_status_code(404);
            request.respond(response)
        }
    }
}

fn evaluate<B: Backend>(client: &mut ApiClient<B>, query: &str) -> Session {
    let params = DashboardParams::from_query(query);
    Session::evaluate(client, params.filter(), params.asin())
}

fn content_type(value: &str) -> std::io::Result<Header> {
    Header::from_bytes(&b"Content-Type"[..], value.as_bytes()).map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("bad header value {}", value))
    })
}
