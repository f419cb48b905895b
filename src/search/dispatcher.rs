//! Provider routing.
//!
//! [`SearchDispatcher::dispatch`] maps a provider identifier to its backend
//! and runs the shared report pipeline. It never retries and never returns
//! an error: an unknown identifier or a misconfigured backend becomes
//! report text.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use tracing::debug;

use super::backends::{CustomSearch, FilteredMetasearch, KeyedSearch, SearchBackend};
use super::config::SearchConfig;
use super::extract::{FetchRoute, PageExtractor};
use super::report::{build_report, render_error};
use crate::error::SearchError;

/// Supported search backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchProviderId {
    /// Bocha keyed search API.
    Keyed,
    /// Google Custom Search API.
    Custom,
    /// DuckDuckGo HTML metasearch with domain filtering.
    Metasearch,
}

impl SearchProviderId {
    /// Display name shown in reports and the system prompt.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Keyed => "Bocha",
            Self::Custom => "Google",
            Self::Metasearch => "DuckDuckGo",
        }
    }
}

impl fmt::Display for SearchProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for SearchProviderId {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bocha" | "keyed" | "1" => Ok(Self::Keyed),
            "google" | "custom" | "2" => Ok(Self::Custom),
            "duckduckgo" | "ddg" | "metasearch" | "3" => Ok(Self::Metasearch),
            _ => Err(SearchError::UnknownProvider(s.to_string())),
        }
    }
}

/// The search capability used by the research loop.
#[async_trait]
pub trait SearchTool: Send + Sync {
    /// Name of the active search engine.
    fn provider_name(&self) -> &str;

    /// Runs `query` and returns a report. Never empty, never an error.
    async fn search(&self, query: &str) -> String;
}

/// Routes queries to the configured backends.
#[derive(Debug, Clone)]
pub struct SearchDispatcher {
    config: SearchConfig,
    provider_name: String,
}

impl SearchDispatcher {
    /// Creates a dispatcher over `config`.
    #[must_use]
    pub fn new(config: SearchConfig) -> Self {
        let provider_name = config.provider.parse::<SearchProviderId>().map_or_else(
            |_| config.provider.clone(),
            |id| id.display_name().to_string(),
        );
        Self {
            config,
            provider_name,
        }
    }

    /// Runs `query` through the backend named by `provider_id`.
    pub async fn dispatch(&self, query: &str, provider_id: &str) -> String {
        let id = match provider_id.parse::<SearchProviderId>() {
            Ok(id) => id,
            Err(e) => return render_error("Search", &e),
        };
        debug!(provider = %id, query, "dispatching");

        let backend = match self.backend(id) {
            Ok(backend) => backend,
            Err(e) => return render_error(id.display_name(), &e),
        };
        let extractor = match backend.policy().route {
            FetchRoute::Proxy => PageExtractor::proxied(&self.config),
            FetchRoute::Direct => PageExtractor::new(&self.config),
        };
        let extractor = match extractor {
            Ok(extractor) => extractor,
            Err(e) => return render_error(id.display_name(), &e),
        };
        build_report(backend.as_ref(), &extractor, query).await
    }

    fn backend(&self, id: SearchProviderId) -> Result<Box<dyn SearchBackend>, SearchError> {
        Ok(match id {
            SearchProviderId::Keyed => Box::new(KeyedSearch::new(&self.config)?),
            SearchProviderId::Custom => Box::new(CustomSearch::new(&self.config)?),
            SearchProviderId::Metasearch => Box::new(FilteredMetasearch::new(&self.config)?),
        })
    }
}

#[async_trait]
impl SearchTool for SearchDispatcher {
    fn provider_name(&self) -> &str {
        &self.provider_name
    }

    async fn search(&self, query: &str) -> String {
        self.dispatch(query, &self.config.provider).await
    }
}
