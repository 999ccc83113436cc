//! Backend client for the risk API
//!
//! Three read-only endpoints, all `GET` with query parameters:
//!
//! | Endpoint | Payload |
//! |----------|---------|
//! | `/ranking/riesgo?periodo=P&top_n=N` | `[RankingRecord]` |
//! | `/productos/{asin}/mapa-causas?periodo=P` | `{"mapa_causas": [CauseEntry]}` |
//! | `/productos/{asin}/evidencia?periodo=P&causa=C` | `[EvidenceItem]` |
//!
//! The transport sits behind the [`Backend`] trait. [`ApiClient`] wraps any
//! backend with the dashboard's policies:
//!
//! - ranking snapshots are cached per period for the configured TTL;
//! - the `fetch_*` methods never fail, a broken call is an empty result;
//! - evidence text is cut to [`EVIDENCE_TEXT_LIMIT`] characters.
//!
//! The `try_fetch_*` twins keep the error so callers can tell "failed"
//! apart from "nothing there".

use crate::cache::TtlCache;
use crate::config::Config;
use crate::model::{CauseEntry, EvidenceItem, Period, RankingRecord};
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Characters of review text kept for display
pub const EVIDENCE_TEXT_LIMIT: usize = 250;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
    #[error("invalid API URL '{0}'")]
    InvalidUrl(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Raw access to the three backend endpoints
pub trait Backend {
    fn ranking(&self, periodo: &Period, top_n: u32) -> Result<Vec<RankingRecord>>;
    fn cause_map(&self, asin: &str, periodo: &Period) -> Result<Vec<CauseEntry>>;
    fn evidence(&self, asin: &str, periodo: &Period, causa: &str) -> Result<Vec<EvidenceItem>>;

    /// Base URL shown to users when the backend is unreachable
    fn base_url(&self) -> &str;
}

// ============================================================================
// HTTP transport
// ============================================================================

#[derive(Deserialize)]
struct CauseMapResponse {
    #[serde(default)]
    mapa_causas: Vec<CauseEntry>,
}

/// [`Backend`] over blocking reqwest
pub struct HttpBackend {
    client: Client,
    base: Url,
    base_str: String,
}

impl HttpBackend {
    pub fn new(config: &Config) -> Result<Self> {
        let base = Url::parse(&config.api_url)
            .map_err(|_| ClientError::InvalidUrl(config.api_url.clone()))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(config.api_url.clone()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Transport {
                url: config.api_url.clone(),
                message: e.to_string(),
            })?;

        Ok(Self { client, base, base_str: config.api_url.clone() })
    }

    /// Base URL with `segments` appended, each percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // cannot_be_a_base was rejected in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url, query: &[(&str, &str)]) -> Result<T> {
        let started = Instant::now();
        let shown = url.to_string();
        debug!(url = %shown, ?query, "backend request");

        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|e| ClientError::Transport { url: shown.clone(), message: e.to_string() })?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(ClientError::Status { url: shown, status: status.as_u16() });
        }

        let body = resp
            .json::<T>()
            .map_err(|e| ClientError::Decode { url: shown.clone(), message: e.to_string() })?;

        debug!(url = %shown, elapsed_ms = started.elapsed().as_millis() as u64, "backend response");
        Ok(body)
    }
}

impl Backend for HttpBackend {
    fn ranking(&self, periodo: &Period, top_n: u32) -> Result<Vec<RankingRecord>> {
        let top_n = top_n.to_string();
        self.get_json(
            self.endpoint(&["ranking", "riesgo"]),
            &[("periodo", periodo.as_str()), ("top_n", &top_n)],
        )
    }

    fn cause_map(&self, asin: &str, periodo: &Period) -> Result<Vec<CauseEntry>> {
        let resp: CauseMapResponse = self.get_json(
            self.endpoint(&["productos", asin, "mapa-causas"]),
            &[("periodo", periodo.as_str())],
        )?;
        Ok(resp.mapa_causas)
    }

    fn evidence(&self, asin: &str, periodo: &Period, causa: &str) -> Result<Vec<EvidenceItem>> {
        self.get_json(
            self.endpoint(&["productos", asin, "evidencia"]),
            &[("periodo", periodo.as_str()), ("causa", causa)],
        )
    }

    fn base_url(&self) -> &str {
        &self.base_str
    }
}

// ============================================================================
// Policy layer
// ============================================================================

/// Caching, soft-failing client used by the dashboard
pub struct ApiClient<B> {
    backend: B,
    snapshot_cap: u32,
    rankings: TtlCache<Period, Vec<RankingRecord>>,
}

impl ApiClient<HttpBackend> {
    /// HTTP client configured from `config`
    pub fn connect(config: &Config) -> Result<Self> {
        Ok(Self::new(HttpBackend::new(config)?, config))
    }
}

impl<B: Backend> ApiClient<B> {
    pub fn new(backend: B, config: &Config) -> Self {
        Self {
            backend,
            snapshot_cap: config.snapshot_cap,
            rankings: TtlCache::new(config.cache_ttl),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn base_url(&self) -> &str {
        self.backend.base_url()
    }

    /// Drop every cached ranking snapshot
    pub fn invalidate(&mut self) {
        self.rankings.clear();
    }

    /// Ranking snapshot for `periodo`, served from cache while fresh.
    /// Failures are not cached.
    pub fn try_fetch_ranking(&mut self, periodo: &Period) -> Result<Vec<RankingRecord>> {
        let now = Instant::now();
        if let Some(hit) = self.rankings.get(periodo, now) {
            debug!(%periodo, rows = hit.len(), "ranking cache hit");
            return Ok(hit);
        }

        let records = self.backend.ranking(periodo, self.snapshot_cap)?;
        info!(%periodo, rows = records.len(), "ranking snapshot loaded");
        self.rankings.insert(periodo.clone(), records.clone(), now);
        Ok(records)
    }

    pub fn fetch_ranking(&mut self, periodo: &Period) -> Vec<RankingRecord> {
        self.try_fetch_ranking(periodo).unwrap_or_else(|e| {
            warn!(%periodo, error = %e, "ranking fetch failed");
            Vec::new()
        })
    }

    pub fn try_fetch_cause_map(&self, asin: &str, periodo: &Period) -> Result<Vec<CauseEntry>> {
        self.backend.cause_map(asin, periodo)
    }

    pub fn fetch_cause_map(&self, asin: &str, periodo: &Period) -> Vec<CauseEntry> {
        self.try_fetch_cause_map(asin, periodo).unwrap_or_else(|e| {
            warn!(asin, %periodo, error = %e, "cause map fetch failed");
            Vec::new()
        })
    }

    pub fn try_fetch_evidence(
        &self,
        asin: &str,
        periodo: &Period,
        causa: &str,
    ) -> Result<Vec<EvidenceItem>> {
        let items = self.backend.evidence(asin, periodo, causa)?;
        Ok(items
            .into_iter()
            .map(|item| EvidenceItem {
                review_text: truncate_chars(&item.review_text, EVIDENCE_TEXT_LIMIT),
                ..item
            })
            .collect())
    }

    pub fn fetch_evidence(&self, asin: &str, periodo: &Period, causa: &str) -> Vec<EvidenceItem> {
        self.try_fetch_evidence(asin, periodo, causa).unwrap_or_else(|e| {
            warn!(asin, %periodo, causa, error = %e, "evidence fetch failed");
            Vec::new()
        })
    }
}

/// First `max` characters of `s` (not bytes, so multi-byte text stays valid)
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
