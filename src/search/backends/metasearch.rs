//! Metasearch backend with domain filtering (DuckDuckGo HTML endpoint).
//!
//! Pulls a larger raw pool than the API backends, drops blacklisted
//! domains, and routes both the search and every page fetch through the
//! configured proxy.

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use super::SearchBackend;
use crate::error::SearchError;
use crate::search::config::SearchConfig;
use crate::search::extract::FetchRoute;
use crate::search::http::browser_client;
use crate::search::report::SelectionPolicy;
use crate::search::result::SearchResultItem;

/// Raw candidates read from the results page.
const RAW_POOL: usize = 10;
/// Region parameter: worldwide, no locale bias.
const REGION: &str = "wt-wt";

/// DuckDuckGo HTML backend.
#[derive(Debug, Clone)]
pub struct FilteredMetasearch {
    client: reqwest::Client,
    config: SearchConfig,
    proxied: bool,
}

impl FilteredMetasearch {
    /// Creates the backend from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Client`] if the proxy URL is invalid.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let proxy = config.proxy.as_deref().filter(|p| !p.is_empty());
        Ok(Self {
            client: browser_client(config.metasearch_timeout, proxy)?,
            proxied: proxy.is_some(),
            config: config.clone(),
        })
    }
}

#[async_trait]
impl SearchBackend for FilteredMetasearch {
    fn name(&self) -> &'static str {
        "DuckDuckGo"
    }

    fn policy(&self) -> SelectionPolicy {
        SelectionPolicy {
            top_n: 3,
            min_content_chars: 500,
            max_content_chars: 3500,
            route: if self.proxied {
                FetchRoute::Proxy
            } else {
                FetchRoute::Direct
            },
        }
    }

    async fn fetch_candidates(&self, query: &str) -> Result<Vec<SearchResultItem>, SearchError> {
        let timeout_secs = self.config.metasearch_timeout.as_secs();
        let resp = self
            .client
            .post(&self.config.ddg_endpoint)
            .form(&[("q", query), ("kl", REGION)])
            .header(reqwest::header::ACCEPT, "text/html")
            .send()
            .await
            .map_err(|e| SearchError::from_reqwest(&e, timeout_secs))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SearchError::UpstreamHttp(format!("HTTP {status}")));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| SearchError::from_reqwest(&e, timeout_secs))?;

        let raw = parse_results(&body, RAW_POOL);
        if raw.is_empty() {
            return Err(SearchError::EmptyResultSet);
        }

        let raw_count = raw.len();
        let kept: Vec<SearchResultItem> = raw
            .into_iter()
            .filter(|item| !self.config.is_blacklisted(&item.url))
            .collect();
        debug!(raw = raw_count, kept = kept.len(), "metasearch candidates");
        if kept.is_empty() {
            return Err(SearchError::AllResultsFiltered);
        }
        Ok(kept)
    }
}

/// Reads up to `limit` results from a DuckDuckGo HTML results page.
#[must_use]
pub fn parse_results(html: &str, limit: usize) -> Vec<SearchResultItem> {
    let doc = Html::parse_document(html);
    let (Ok(result_sel), Ok(link_sel), Ok(snippet_sel)) = (
        Selector::parse(".result"),
        Selector::parse("a.result__a"),
        Selector::parse(".result__snippet"),
    ) else {
        return Vec::new();
    };

    doc.select(&result_sel)
        .filter_map(|result| {
            let link = result.select(&link_sel).next()?;
            let title = link.text().collect::<String>();
            let url = unwrap_redirect(link.value().attr("href")?);
            if title.trim().is_empty() || !url.starts_with("http") {
                return None;
            }
            let snippet = result
                .select(&snippet_sel)
                .next()
                .map(|el| el.text().collect::<String>())
                .unwrap_or_default();
            Some(SearchResultItem::new(&title, &url, &snippet))
        })
        .take(limit)
        .collect()
}

/// Resolves `//duckduckgo.com/l/?uddg=<encoded>&rut=...` redirect links to
/// their destination. Other links are returned unchanged.
#[must_use]
pub fn unwrap_redirect(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };
    Url::parse(&absolute)
        .ok()
        .and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == "uddg")
                .map(|(_, v)| v.into_owned())
        })
        .filter(|dest| !dest.is_empty())
        .unwrap_or(absolute)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::search::backends::testing::serve;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::http::{HeaderMap, Method, StatusCode, Uri};
    use axum::{Form, Router, routing::post};
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::search::extract::PageExtractor;
    use crate::search::report::build_report;

    fn result_block(title: &str, href: &str, snippet: &str) -> String {
        format!(
            r#"<div class="result results_links web-result">
                 <h2 class="result__title"><a class="result__a" href="{href}">{title}</a></h2>
                 <a class="result__snippet" href="{href}">{snippet}</a>
               </div>"#
        )
    }

    fn page(blocks: &[String]) -> String {
        format!("<html><body><div id=\"links\">{}</div></body></html>", blocks.concat())
    }

    fn app(hits: Arc<AtomicUsize>) -> Router {
        Router::new().route(
            "/html/",
            post(move |headers: HeaderMap, Form(form): Form<HashMap<String, String>>| {
                let hits = Arc::clone(&hits);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    let ua = headers
                        .get("user-agent")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default();
                    if !ua.contains("Chrome/120") || form.get("kl").map(String::as_str) != Some("wt-wt") {
                        return (StatusCode::FORBIDDEN, String::new());
                    }
                    let body = match form.get("q").map(String::as_str) {
                        Some("blocked") => page(&[
                            result_block("Zhihu", "https://www.zhihu.com/question/1", "a"),
                            result_block("CSDN", "//duckduckgo.com/l/?uddg=https%3A%2F%2Fblog.csdn.net%2Fx&rut=1", "b"),
                        ]),
                        Some("empty") => page(&[]),
                        _ => page(&[
                            result_block("Bilibili", "https://www.bilibili.com/video/1", "skip"),
                            result_block(
                                "Paris - Wikipedia",
                                "//duckduckgo.com/l/?uddg=https%3A%2F%2Fen.wikipedia.org%2Fwiki%2FParis&rut=abc",
                                "Paris is the capital of France.",
                            ),
                            result_block("Britannica", "https://www.britannica.com/place/Paris", "City"),
                        ]),
                    };
                    (StatusCode::OK, body)
                }
            }),
        )
    }

    async fn backend(hits: &Arc<AtomicUsize>) -> FilteredMetasearch {
        let addr = serve(app(Arc::clone(hits))).await;
        let config = SearchConfig {
            ddg_endpoint: format!("http://{addr}/html/"),
            ..SearchConfig::default()
        };
        FilteredMetasearch::new(&config).unwrap_or_else(|e| panic!("{e}"))
    }

    #[tokio::test]
    async fn test_blacklisted_domains_are_excluded() {
        let hits = Arc::new(AtomicUsize::new(0));
        let items = backend(&hits)
            .await
            .fetch_candidates("paris")
            .await
            .unwrap_or_else(|e| panic!("{e}"));

        let urls: Vec<&str> = items.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://en.wikipedia.org/wiki/Paris",
                "https://www.britannica.com/place/Paris"
            ]
        );
        assert_eq!(items[0].snippet, "Paris is the capital of France.");
    }

    #[tokio::test]
    async fn test_all_filtered_differs_from_no_results() {
        let hits = Arc::new(AtomicUsize::new(0));
        let b = backend(&hits).await;

        let filtered = b.fetch_candidates("blocked").await;
        let empty = b.fetch_candidates("empty").await;

        assert_eq!(filtered, Err(SearchError::AllResultsFiltered));
        assert_eq!(empty, Err(SearchError::EmptyResultSet));
        assert_ne!(
            SearchError::AllResultsFiltered.to_string(),
            SearchError::EmptyResultSet.to_string()
        );
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_policy_without_proxy_is_direct() {
        let b = FilteredMetasearch::new(&SearchConfig::default())
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(b.policy().route, FetchRoute::Direct);
        assert_eq!(b.policy().min_content_chars, 500);
    }

    #[test]
    fn test_policy_with_proxy_routes_through_it() {
        let config = SearchConfig {
            proxy: Some("http://127.0.0.1:7890".to_string()),
            ..SearchConfig::default()
        };
        let b = FilteredMetasearch::new(&config).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(b.policy().route, FetchRoute::Proxy);
    }

    /// Forward proxy fixture: answers every absolute-form request and records
    /// the target URI.
    async fn proxy_fixture(seen: Arc<Mutex<Vec<String>>>) -> std::net::SocketAddr {
        let app = Router::new().fallback(move |method: Method, uri: Uri| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock()
                    .unwrap_or_else(|e| panic!("lock: {e}"))
                    .push(format!("{method} {uri}"));
                if method == Method::POST {
                    return page(&[result_block(
                        "Paris guide",
                        "http://site.invalid/paris",
                        "short snippet",
                    )]);
                }
                let para = "<p>Paris is the capital and most populous city of France, \
                            a centre of finance, diplomacy, commerce and the arts.</p>";
                format!("<html><body><article>{}</article></body></html>", para.repeat(10))
            }
        });
        serve(app).await
    }

    #[tokio::test]
    async fn test_search_and_extraction_go_through_proxy() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let proxy = proxy_fixture(Arc::clone(&seen)).await;
        let config = SearchConfig {
            proxy: Some(format!("http://{proxy}")),
            ddg_endpoint: "http://ddg.invalid/html/".to_string(),
            ..SearchConfig::default()
        };
        let backend = FilteredMetasearch::new(&config).unwrap_or_else(|e| panic!("{e}"));
        let extractor = PageExtractor::proxied(&config).unwrap_or_else(|e| panic!("{e}"));

        let report = build_report(&backend, &extractor, "paris").await;

        let seen = seen.lock().unwrap_or_else(|e| panic!("lock: {e}")).clone();
        assert_eq!(
            seen,
            vec![
                "POST http://ddg.invalid/html/".to_string(),
                "GET http://site.invalid/paris".to_string(),
            ]
        );
        assert!(report.contains("URL: http://site.invalid/paris"));
        assert!(report.contains("most populous city of France"));
        assert!(!report.contains("short snippet"));
    }

    #[test]
    fn test_unwrap_redirect() {
        assert_eq!(
            unwrap_redirect("//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fa%3Fb%3D1&rut=x"),
            "https://example.com/a?b=1"
        );
        assert_eq!(unwrap_redirect("https://example.com/"), "https://example.com/");
    }

    #[test]
    fn test_parse_results_respects_limit() {
        let blocks: Vec<String> = (0..15)
            .map(|i| result_block(&format!("T{i}"), &format!("https://s{i}.test/"), "s"))
            .collect();
        assert_eq!(parse_results(&page(&blocks), RAW_POOL).len(), 10);
    }
}
