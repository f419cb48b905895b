//! Keyed search API backend (Bocha web search).
//!
//! JSON POST with a bearer token. A non-success status or an unexpected body
//! shape is reported as "no results"; only transport failures surface as
//! upstream errors.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::SearchBackend;
use crate::error::SearchError;
use crate::search::config::SearchConfig;
use crate::search::extract::{FetchRoute, MAX_EXTRACT_CHARS};
use crate::search::http::api_client;
use crate::search::report::SelectionPolicy;
use crate::search::result::SearchResultItem;

/// Results requested per query.
const RESULT_COUNT: usize = 3;

#[derive(Deserialize)]
struct Envelope {
    data: Data,
}

#[derive(Deserialize)]
struct Data {
    #[serde(rename = "webPages")]
    web_pages: WebPages,
}

#[derive(Deserialize)]
struct WebPages {
    #[serde(default)]
    value: Vec<WebPage>,
}

#[derive(Deserialize)]
struct WebPage {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

/// Bocha web-search backend.
#[derive(Debug, Clone)]
pub struct KeyedSearch {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
    timeout_secs: u64,
}

impl KeyedSearch {
    /// Creates the backend from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Client`] if the HTTP client cannot be built.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        Ok(Self {
            client: api_client(config.search_timeout)?,
            api_key: config.bocha_api_key.clone().filter(|k| !k.is_empty()),
            endpoint: config.bocha_endpoint.clone(),
            timeout_secs: config.search_timeout.as_secs(),
        })
    }
}

#[async_trait]
impl SearchBackend for KeyedSearch {
    fn name(&self) -> &'static str {
        "Bocha"
    }

    fn policy(&self) -> SelectionPolicy {
        SelectionPolicy {
            top_n: RESULT_COUNT,
            min_content_chars: 200,
            max_content_chars: MAX_EXTRACT_CHARS,
            route: FetchRoute::Direct,
        }
    }

    async fn fetch_candidates(&self, query: &str) -> Result<Vec<SearchResultItem>, SearchError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(SearchError::MissingCredential("BOCHA_API_KEY"))?;

        let payload = json!({
            "query": query,
            "count": RESULT_COUNT,
            "summary": true,
            "freshness": "noLimit",
        });
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SearchError::from_reqwest(&e, self.timeout_secs))?;

        let status = resp.status();
        if !status.is_success() {
            warn!(%status, "keyed search returned an error status");
            return Err(SearchError::EmptyResultSet);
        }

        let envelope: Envelope = match resp.json().await {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "keyed search returned an unexpected body");
                return Err(SearchError::EmptyResultSet);
            }
        };

        let items: Vec<SearchResultItem> = envelope
            .data
            .web_pages
            .value
            .into_iter()
            .filter(|page| !page.url.is_empty())
            .map(|page| {
                let snippet = page
                    .summary
                    .filter(|s| !s.trim().is_empty())
                    .or(page.snippet)
                    .unwrap_or_default();
                SearchResultItem::new(&page.name, &page.url, &snippet)
            })
            .collect();
        debug!(count = items.len(), "keyed search candidates");
        Ok(items)
    }
}
