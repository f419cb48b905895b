//! Web search and content extraction.
//!
//! Three heterogeneous search services sit behind one [`SearchBackend`]
//! trait. Their candidates flow through a shared pipeline
//! ([`build_report`]) that extracts each page's text via a
//! [`ContentExtractor`] and falls back to the provider snippet when the
//! page yields too little. [`SearchDispatcher`] routes a query to a backend
//! by provider id and is the [`SearchTool`] the research loop calls.

pub mod backends;
pub mod config;
pub mod dispatcher;
pub mod extract;
pub(crate) mod http;
pub mod report;
pub mod result;

pub use backends::{CustomSearch, FilteredMetasearch, KeyedSearch, SearchBackend};
pub use config::SearchConfig;
pub use dispatcher::{SearchDispatcher, SearchProviderId, SearchTool};
pub use extract::{ContentExtractor, FetchRoute, PageExtractor};
pub use http::BROWSER_USER_AGENT;
pub use report::{SelectionPolicy, build_report};
pub use result::SearchResultItem;
