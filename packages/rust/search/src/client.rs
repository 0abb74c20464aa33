//! HTTP client for the semantic transcript search endpoint.
//!
//! The endpoint takes one phrase per request:
//! `GET <endpoint>?term=<phrase>&limit=<n>` and answers
//! `{"results": [{"_id": "...", "transcript": "...", ...}]}`.
//! Everything about that schema is confined to this module.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use trendchat_shared::{Result, SearchConfig, SearchResult, SearchTermBatch, TrendChatError};

use crate::aggregate::merge;
use crate::sanitize::sanitize;

/// User-Agent string for search requests.
const USER_AGENT: &str = concat!("TrendChat/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Runtime search settings, resolved from config + CLI flags.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Search endpoint URL.
    pub endpoint: Url,
    /// `limit` query parameter per term.
    pub per_term_limit: u32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum terms issued per search call.
    pub max_terms: usize,
}

impl SearchOptions {
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            TrendChatError::validation(format!(
                "invalid search endpoint '{}': {e}",
                config.endpoint
            ))
        })?;

        Ok(Self {
            endpoint,
            per_term_limit: config.per_term_limit,
            timeout_secs: config.timeout_secs,
            max_terms: config.max_terms,
        })
    }
}

// ---------------------------------------------------------------------------
// TermSource
// ---------------------------------------------------------------------------

/// Something that can look up a single semantic phrase.
#[async_trait]
pub trait TermSource: Send + Sync {
    /// Fetch the sanitized hits for one phrase.
    ///
    /// Errors are reported to the caller; [`search`] turns them into an
    /// empty contribution for that phrase.
    async fn fetch_term(&self, term: &str) -> Result<Vec<SearchResult>>;
}

/// [`TermSource`] backed by the HTTP search endpoint.
#[derive(Debug, Clone)]
pub struct HttpSearchClient {
    client: Client,
    endpoint: Url,
    per_term_limit: u32,
}

impl HttpSearchClient {
    pub fn new(opts: &SearchOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| TrendChatError::network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: opts.endpoint.clone(),
            per_term_limit: opts.per_term_limit,
        })
    }
}

#[async_trait]
impl TermSource for HttpSearchClient {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn fetch_term(&self, term: &str) -> Result<Vec<SearchResult>> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("term", term.to_string()),
                ("limit", self.per_term_limit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| TrendChatError::network(format!("search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrendChatError::network(format!("search endpoint returned HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| TrendChatError::network(format!("failed to read search body: {e}")))?;

        parse_results(&body)
    }
}

// ---------------------------------------------------------------------------
// Search entry point
// ---------------------------------------------------------------------------

/// Run up to `max_terms` phrases one after another and merge the hits.
///
/// Phrases past `max_terms` are ignored. A phrase whose lookup fails
/// contributes nothing; the remaining phrases still run. The merged output
/// never repeats an id.
#[instrument(skip_all, fields(requested = terms.len(), max_terms = max_terms))]
pub async fn search<S: AsRef<str>>(
    source: &dyn TermSource,
    terms: &[S],
    max_terms: usize,
) -> Vec<SearchResult> {
    let batch = SearchTermBatch::new(terms.iter().map(|t| t.as_ref()), max_terms);
    search_batch(source, &batch).await
}

/// Run every phrase of an already-capped batch in order and merge the hits.
pub async fn search_batch(source: &dyn TermSource, batch: &SearchTermBatch) -> Vec<SearchResult> {
    let mut per_term = Vec::with_capacity(batch.len());

    for term in batch.terms() {
        match source.fetch_term(term).await {
            Ok(results) => {
                debug!(term = %term, hits = results.len(), "term searched");
                per_term.push(results);
            }
            Err(e) => {
                warn!(term = %term, error = %e, "search failed for term, treating as no results");
                per_term.push(Vec::new());
            }
        }
    }

    let merged = merge(per_term);
    info!(terms = batch.len(), results = merged.len(), "search complete");
    merged
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<serde_json::Value>,
}

/// Parse a response body into sanitized hits, dropping unusable entries.
fn parse_results(body: &str) -> Result<Vec<SearchResult>> {
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|e| TrendChatError::parse(format!("malformed search response: {e}")))?;

    let total = response.results.len();
    let hits: Vec<SearchResult> = response.results.iter().filter_map(extract_hit).collect();

    if hits.len() < total {
        debug!(dropped = total - hits.len(), "dropped entries without usable _id/transcript");
    }

    Ok(hits)
}

/// An entry counts only if `_id` and `transcript` are non-empty strings and
/// the transcript survives sanitizing.
fn extract_hit(entry: &serde_json::Value) -> Option<SearchResult> {
    let id = entry.get("_id")?.as_str()?;
    let transcript = entry.get("transcript")?.as_str()?;
    if id.is_empty() || transcript.is_empty() {
        return None;
    }

    let text = sanitize(transcript);
    if text.is_empty() {
        return None;
    }

    Some(SearchResult::new(id, text))
}
