//! Search backends.
//!
//! Each backend knows how to talk to one search service and normalize its
//! results into [`SearchResultItem`]s. Everything after that (extraction,
//! fallback, formatting) is shared in [`crate::search::report`].

pub mod custom;
pub mod keyed;
pub mod metasearch;

pub use custom::CustomSearch;
pub use keyed::KeyedSearch;
pub use metasearch::FilteredMetasearch;

use async_trait::async_trait;

use super::report::SelectionPolicy;
use super::result::SearchResultItem;
use crate::error::SearchError;

/// A search service producing normalized candidates.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Display name used in reports and the system prompt.
    fn name(&self) -> &'static str;

    /// Selection and extraction policy for this backend's results.
    fn policy(&self) -> SelectionPolicy;

    /// Queries the service.
    ///
    /// Credentials are checked before any network traffic.
    ///
    /// # Errors
    ///
    /// Returns a [`SearchError`] describing why no candidates are available.
    async fn fetch_candidates(&self, query: &str) -> Result<Vec<SearchResultItem>, SearchError>;
}
