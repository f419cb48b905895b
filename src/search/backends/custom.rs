//! Custom search API backend (Google Custom Search JSON API).

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

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
struct Response {
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Deserialize)]
struct Item {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

/// Google Custom Search backend. Needs an API key and an engine id.
#[derive(Debug, Clone)]
pub struct CustomSearch {
    client: reqwest::Client,
    api_key: Option<String>,
    engine_id: Option<String>,
    endpoint: String,
    timeout_secs: u64,
}

impl CustomSearch {
    /// Creates the backend from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Client`] if the HTTP client cannot be built.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        Ok(Self {
            client: api_client(config.search_timeout)?,
            api_key: config.google_api_key.clone().filter(|k| !k.is_empty()),
            engine_id: config.google_cx.clone().filter(|c| !c.is_empty()),
            endpoint: config.google_endpoint.clone(),
            timeout_secs: config.search_timeout.as_secs(),
        })
    }
}

#[async_trait]
impl SearchBackend for CustomSearch {
    fn name(&self) -> &'static str {
        "Google"
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
            .ok_or(SearchError::MissingCredential("GOOGLE_API_KEY"))?;
        let engine_id = self
            .engine_id
            .as_deref()
            .ok_or(SearchError::MissingCredential("GOOGLE_CX"))?;

        let count = RESULT_COUNT.to_string();
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("key", api_key),
                ("cx", engine_id),
                ("num", count.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SearchError::from_reqwest(&e, self.timeout_secs))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SearchError::UpstreamHttp(format!("HTTP {status}")));
        }

        let body: Response = resp
            .json()
            .await
            .map_err(|e| SearchError::UpstreamHttp(format!("malformed response: {e}")))?;

        let items: Vec<SearchResultItem> = body
            .items
            .into_iter()
            .filter(|item| !item.link.is_empty())
            .map(|item| SearchResultItem::new(&item.title, &item.link, &item.snippet))
            .collect();
        debug!(count = items.len(), "custom search candidates");
        Ok(items)
    }
}
