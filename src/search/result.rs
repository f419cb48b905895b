//! Normalized search result.

use serde::{Deserialize, Serialize};

/// One search hit, normalized across providers before extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultItem {
    /// Result title.
    pub title: String,
    /// Destination URL.
    pub url: String,
    /// Provider-supplied summary, used when page extraction falls short.
    pub snippet: String,
}

impl SearchResultItem {
    /// Creates a result, trimming every field.
    #[must_use]
    pub fn new(title: &str, url: &str, snippet: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            url: url.trim().to_string(),
            snippet: snippet.trim().to_string(),
        }
    }
}
