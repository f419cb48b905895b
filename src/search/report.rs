//! Shared select → extract → fallback → format pipeline.
//!
//! Every backend produces candidates; this module turns them into the one
//! text block the model reads. Failures become report text too, so the
//! result is never empty and never an error.

use tracing::{debug, warn};

use super::backends::SearchBackend;
use super::extract::{ContentExtractor, FetchRoute};
use super::result::SearchResultItem;
use crate::error::SearchError;

/// Label prefixed to text extracted from the result page.
pub const EXTRACTED_LABEL: &str = "[Extracted page text]";
/// Label prefixed to a provider snippet used in place of page text.
pub const FALLBACK_LABEL: &str = "[Fallback snippet]";

/// Per-backend selection and extraction policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionPolicy {
    /// Results included in the report.
    pub top_n: usize,
    /// Extracted text must be longer than this to replace the snippet.
    pub min_content_chars: usize,
    /// Cap on extracted text per result.
    pub max_content_chars: usize,
    /// How result pages are fetched.
    pub route: FetchRoute,
}

/// Renders a search failure as report text.
#[must_use]
pub fn render_error(provider: &str, err: &SearchError) -> String {
    format!("{provider} search: {err}")
}

/// Runs `query` through `backend` and formats the report.
pub async fn build_report(
    backend: &dyn SearchBackend,
    extractor: &dyn ContentExtractor,
    query: &str,
) -> String {
    let name = backend.name();
    let policy = backend.policy();

    let items = match backend.fetch_candidates(query).await {
        Ok(items) if items.is_empty() => {
            return render_error(name, &SearchError::EmptyResultSet);
        }
        Ok(items) => items,
        Err(e) => {
            warn!(provider = name, error = %e, "search failed");
            return render_error(name, &e);
        }
    };

    let mut report = format!("{name} results for query '{query}':\n");
    for (idx, item) in items.iter().take(policy.top_n).enumerate() {
        let content = extractor.extract(&item.url, policy.route).await;
        let body = select_content(item, &content, &policy);
        report.push_str(&format!(
            "--- Source {}: {} ---\nURL: {}\nContent: {body}\n\n",
            idx + 1,
            item.title,
            item.url
        ));
    }
    report
}

/// Picks extracted text or the labelled snippet for one result.
fn select_content(item: &SearchResultItem, extracted: &str, policy: &SelectionPolicy) -> String {
    let extracted_chars = extracted.chars().count();
    if extracted_chars > policy.min_content_chars {
        let text: String = extracted.chars().take(policy.max_content_chars).collect();
        format!("{EXTRACTED_LABEL} {text}")
    } else {
        debug!(
            url = %item.url,
            extracted_chars,
            threshold = policy.min_content_chars,
            "using fallback snippet"
        );
        let snippet = if item.snippet.is_empty() {
            "(no snippet provided)"
        } else {
            item.snippet.as_str()
        };
        format!("{FALLBACK_LABEL} {snippet}")
    }
}
