//! HTTP client construction for search backends and page fetching.

use std::time::Duration;

use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue};

use crate::error::SearchError;

/// Desktop browser user agent sent by the metasearch backend and the
/// full-fetch extraction stage.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// User agent for API calls and the lightweight fetch stage.
const CRATE_USER_AGENT: &str = concat!("sleuth/", env!("CARGO_PKG_VERSION"));

/// Client for JSON search APIs and the lightweight fetch stage.
pub(crate) fn api_client(timeout: Duration) -> Result<reqwest::Client, SearchError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(CRATE_USER_AGENT)
        .build()
        .map_err(|e| SearchError::Client(e.to_string()))
}

/// Client presenting as a desktop browser, optionally routed through `proxy`.
///
/// TLS certificate verification is relaxed only when a proxy is set;
/// intercepting proxies commonly re-sign upstream certificates.
pub(crate) fn browser_client(
    timeout: Duration,
    proxy: Option<&str>,
) -> Result<reqwest::Client, SearchError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    let mut builder = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(BROWSER_USER_AGENT)
        .default_headers(headers);

    if let Some(proxy_url) = proxy {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|e| SearchError::Client(format!("invalid proxy `{proxy_url}`: {e}")))?;
        builder = builder.proxy(proxy).danger_accept_invalid_certs(true);
    }

    builder
        .build()
        .map_err(|e| SearchError::Client(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clients_build() {
        assert!(api_client(Duration::from_secs(5)).is_ok());
        assert!(browser_client(Duration::from_secs(5), None).is_ok());
        assert!(browser_client(Duration::from_secs(5), Some("http://127.0.0.1:8080")).is_ok());
    }

    #[test]
    fn test_invalid_proxy_is_client_error() {
        let result = browser_client(Duration::from_secs(5), Some("::not a url::"));
        assert!(matches!(result, Err(SearchError::Client(_))));
    }
}
