//! Page content extraction.
//!
//! Turns a URL into a bounded, whitespace-collapsed block of readable text.
//! Extraction never fails from the caller's point of view: any error along
//! the way yields an empty string and the report falls back to the provider
//! snippet.
//!
//! Stages:
//! 1. [`FetchRoute::Direct`] only: a plain GET, keeping the text of the
//!    densest non-boilerplate block.
//! 2. A GET presenting as a desktop browser (through the proxy for
//!    [`FetchRoute::Proxy`]), re-decoding the body with its detected
//!    encoding, then the same block extraction with a whole-document
//!    `html2text` rendering as fallback.

use std::io::Cursor;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;

use super::config::SearchConfig;
use super::http::{api_client, browser_client};
use crate::error::SearchError;

/// Upper bound on extracted text, before any per-provider cap.
pub const MAX_EXTRACT_CHARS: usize = 5000;

/// Minimum visible characters for a block to be considered content.
const MIN_BLOCK_CHARS: usize = 20;
/// Line width for `html2text` rendering.
const RENDER_WIDTH: usize = 120;
/// Bytes scanned for a `<meta charset>` declaration.
const CHARSET_SNIFF_BYTES: usize = 4096;

/// Subtrees whose text never counts as page content.
const SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "nav", "header", "footer", "aside", "form",
    "iframe",
];

/// Class/id fragments marking navigation or advertising containers.
const BOILERPLATE_MARKERS: &[&str] = &[
    "nav",
    "menu",
    "sidebar",
    "footer",
    "header",
    "banner",
    "cookie",
    "consent",
    "advert",
    "promo",
    "subscribe",
    "newsletter",
];

static META_CHARSET: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?\s*([a-z0-9_\-:.]+)"#).ok()
});

/// How a page is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchRoute {
    /// Plain network path; the lightweight stage is tried first.
    Direct,
    /// Through the configured proxy, skipping the lightweight stage.
    Proxy,
}

/// Fetches a page and returns its readable text, or `""` on any failure.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Extracts the main text of `url`.
    async fn extract(&self, url: &str, route: FetchRoute) -> String;
}

/// HTTP-backed [`ContentExtractor`].
#[derive(Debug, Clone)]
pub struct PageExtractor {
    lightweight: reqwest::Client,
    browser: reqwest::Client,
    proxied: Option<reqwest::Client>,
    fetch_timeout: Duration,
    proxied_timeout: Duration,
    max_chars: usize,
}

impl PageExtractor {
    /// Builds the extractor's HTTP clients from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Client`] if a client cannot be built.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        Ok(Self {
            lightweight: api_client(config.fetch_timeout)?,
            browser: browser_client(config.fetch_timeout, None)?,
            proxied: None,
            fetch_timeout: config.fetch_timeout,
            proxied_timeout: config.proxied_fetch_timeout,
            max_chars: MAX_EXTRACT_CHARS,
        })
    }

    /// Like [`PageExtractor::new`], plus a client for [`FetchRoute::Proxy`]
    /// through `config.proxy` when one is set.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Client`] if a client cannot be built, e.g. for
    /// a malformed proxy URL.
    pub fn proxied(config: &SearchConfig) -> Result<Self, SearchError> {
        let mut extractor = Self::new(config)?;
        extractor.proxied = config
            .proxy
            .as_deref()
            .map(|p| browser_client(config.proxied_fetch_timeout, Some(p)))
            .transpose()?;
        Ok(extractor)
    }

    /// Sets the output cap in characters.
    #[must_use]
    pub const fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    async fn lightweight_fetch(&self, url: &str) -> Result<Option<String>, SearchError> {
        let timeout = self.fetch_timeout.as_secs();
        let resp = self
            .lightweight
            .get(url)
            .send()
            .await
            .map_err(|e| SearchError::from_reqwest(&e, timeout))?;
        if !resp.status().is_success() {
            return Err(SearchError::UpstreamHttp(format!("HTTP {}", resp.status())));
        }
        let kind = body_kind(content_type(&resp).as_deref())?;
        let body = resp
            .text()
            .await
            .map_err(|e| SearchError::from_reqwest(&e, timeout))?;
        Ok(match kind {
            BodyKind::Plain => Some(body.trim().to_string()).filter(|t| !t.is_empty()),
            BodyKind::Markup => main_text(&body),
        })
    }

    async fn full_fetch(
        &self,
        client: &reqwest::Client,
        url: &str,
        timeout: u64,
    ) -> Result<String, SearchError> {
        let resp = client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| SearchError::from_reqwest(&e, timeout))?;
        if !resp.status().is_success() {
            return Err(SearchError::UpstreamHttp(format!("HTTP {}", resp.status())));
        }
        let content_type = content_type(&resp);
        let kind = body_kind(content_type.as_deref())?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| SearchError::from_reqwest(&e, timeout))?;

        let body = decode_body(&bytes, content_type.as_deref());
        Ok(match kind {
            BodyKind::Plain => body,
            BodyKind::Markup => readable_text(&body),
        })
    }
}

enum BodyKind {
    Plain,
    Markup,
}

fn content_type(resp: &reqwest::Response) -> Option<String> {
    resp.headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_ascii_lowercase)
}

/// Accepts HTML and other text bodies; a missing header is treated as HTML.
fn body_kind(content_type: Option<&str>) -> Result<BodyKind, SearchError> {
    match content_type {
        Some(ct) if ct.starts_with("text/plain") => Ok(BodyKind::Plain),
        Some(ct) if !ct.contains("html") && !ct.starts_with("text/") => Err(
            SearchError::UpstreamHttp(format!("unsupported content type {ct}")),
        ),
        _ => Ok(BodyKind::Markup),
    }
}

#[async_trait]
impl ContentExtractor for PageExtractor {
    async fn extract(&self, url: &str, route: FetchRoute) -> String {
        if route == FetchRoute::Direct {
            match self.lightweight_fetch(url).await {
                Ok(Some(text)) => return finalize(&text, self.max_chars),
                Ok(None) => debug!(url, "lightweight fetch found no body text"),
                Err(e) => debug!(url, error = %e, "lightweight fetch failed"),
            }
        }

        let (client, timeout) = match (route, self.proxied.as_ref()) {
            (FetchRoute::Proxy, Some(proxied)) => (proxied, self.proxied_timeout),
            _ => (&self.browser, self.fetch_timeout),
        };
        match self.full_fetch(client, url, timeout.as_secs()).await {
            Ok(text) => finalize(&text, self.max_chars),
            Err(e) => {
                debug!(url, error = %e, "page extraction failed");
                String::new()
            }
        }
    }
}

/// Decodes a response body with the `Content-Type` charset, else a
/// `<meta charset>` declaration, else UTF-8. A byte-order mark overrides
/// all of them.
#[must_use]
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let declared = content_type
        .and_then(charset_param)
        .or_else(|| sniff_meta_charset(bytes))
        .and_then(|label| encoding_rs::Encoding::for_label(label.as_bytes()));
    let encoding = declared.unwrap_or(encoding_rs::UTF_8);
    let (text, used, _had_errors) = encoding.decode(bytes);
    if used != encoding {
        debug!(declared = encoding.name(), used = used.name(), "byte-order mark overrides charset");
    }
    text.into_owned()
}

fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(['"', '\'']).to_string())
    })
}

fn sniff_meta_charset(bytes: &[u8]) -> Option<String> {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(CHARSET_SNIFF_BYTES)]);
    let re = META_CHARSET.as_ref()?;
    re.captures(&head)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Main text of an HTML document, falling back to a plain rendering of the
/// whole document.
#[must_use]
pub fn readable_text(html: &str) -> String {
    main_text(html).unwrap_or_else(|| {
        html2text::from_read(Cursor::new(html.as_bytes()), RENDER_WIDTH).unwrap_or_default()
    })
}

/// Visible text of the densest content block, or of `<body>` when no block
/// qualifies. `None` if the page has no visible text.
#[must_use]
pub fn main_text(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let block_sel = Selector::parse("article, main, section, div").ok()?;
    let link_sel = Selector::parse("a").ok()?;

    let mut best: Option<(i64, String)> = None;
    for el in doc.select(&block_sel) {
        if is_boilerplate(&el) {
            continue;
        }
        let text = visible_text(&el);
        let chars = text.chars().count();
        if chars < MIN_BLOCK_CHARS {
            continue;
        }
        let link_chars: usize = el
            .select(&link_sel)
            .map(|a| visible_text(&a).chars().count())
            .sum();

        let chars_i = i64::try_from(chars).unwrap_or(i64::MAX);
        let links_i = i64::try_from(link_chars).unwrap_or(i64::MAX);
        let mut score = chars_i.saturating_sub(links_i.saturating_mul(2));
        score += match el.value().name() {
            "article" => 500,
            "main" => 300,
            _ => 0,
        };
        if link_chars > chars / 2 {
            score -= 500;
        }
        if best.as_ref().is_none_or(|(s, _)| score > *s) {
            best = Some((score, text));
        }
    }

    let text = match best {
        Some((score, text)) if score > 0 => text,
        _ => {
            let body_sel = Selector::parse("body").ok()?;
            doc.select(&body_sel)
                .next()
                .map(|b| visible_text(&b))
                .unwrap_or_default()
        }
    };
    let text = collapse_whitespace(&text);
    (!text.is_empty()).then_some(text)
}

fn is_boilerplate(el: &ElementRef<'_>) -> bool {
    let mut marker = String::new();
    if let Some(class) = el.value().attr("class") {
        marker.push_str(class);
        marker.push(' ');
    }
    if let Some(id) = el.value().attr("id") {
        marker.push_str(id);
    }
    let marker = marker.to_ascii_lowercase();
    !marker.is_empty() && BOILERPLATE_MARKERS.iter().any(|m| marker.contains(m))
}

fn visible_text(el: &ElementRef<'_>) -> String {
    let mut buf = String::new();
    collect_text(el, &mut buf);
    buf
}

fn collect_text(el: &ElementRef<'_>, buf: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => {
                buf.push_str(text);
                buf.push(' ');
            }
            Node::Element(inner) if !SKIP_TAGS.contains(&inner.name()) => {
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(&child_ref, buf);
                }
            }
            _ => {}
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapses all whitespace (newlines included) to single spaces and keeps
/// at most `max_chars` characters.
#[must_use]
pub fn finalize(text: &str, max_chars: usize) -> String {
    collapse_whitespace(text).chars().take(max_chars).collect()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use axum::http::{StatusCode, header};
    use axum::{Router, routing::get};
    use std::net::SocketAddr;

    const ARTICLE_PAGE: &str = r#"<html><head><title>Paris</title>
        <script>var tracking = "do not extract me";</script></head>
        <body>
          <div class="navbar"><a href="/">Home</a> <a href="/about">About</a></div>
          <article>
            <h1>Paris</h1>
            <p>Paris is the capital and most populous city of France.</p>
            <p>It has been a centre of finance, diplomacy and the arts since the 17th century.</p>
          </article>
          <div id="footer">Copyright 2026</div>
        </body></html>"#;

    async fn fixture() -> SocketAddr {
        let app = Router::new()
            .route(
                "/article",
                get(|| async { ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], ARTICLE_PAGE) }),
            )
            .route(
                "/broken",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            )
            .route(
                "/gbk",
                get(|| async {
                    let html = "<html><head><meta charset=\"gbk\"></head><body><p>巴黎是法国的首都，也是法国最大的城市。</p></body></html>";
                    let (bytes, _, _) = encoding_rs::GBK.encode(html);
                    ([(header::CONTENT_TYPE, "text/html")], bytes.into_owned())
                }),
            )
            .route(
                "/report.pdf",
                get(|| async {
                    let mut pdf = b"%PDF-1.7\n".to_vec();
                    pdf.extend((0x28_u8..0x7e).cycle().take(400));
                    ([(header::CONTENT_TYPE, "application/pdf")], pdf)
                }),
            )
            .route(
                "/notes.txt",
                get(|| async { ([(header::CONTENT_TYPE, "text/plain")], "  plain notes about Paris  ") }),
            )
            .route(
                "/image",
                get(|| async { ([(header::CONTENT_TYPE, "image/png")], vec![0x89_u8, b'P', b'N', b'G']) }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|e| panic!("bind: {e}"));
        let addr = listener
            .local_addr()
            .unwrap_or_else(|e| panic!("addr: {e}"));
        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .unwrap_or_else(|e| panic!("serve: {e}"));
        });
        addr
    }

    fn extractor() -> PageExtractor {
        let config = SearchConfig {
            fetch_timeout: Duration::from_secs(2),
            ..SearchConfig::default()
        };
        PageExtractor::new(&config).unwrap_or_else(|e| panic!("extractor: {e}"))
    }

    #[tokio::test]
    async fn test_extracts_article_text() {
        let addr = fixture().await;
        let text = extractor()
            .extract(&format!("http://{addr}/article"), FetchRoute::Direct)
            .await;
        assert!(text.contains("capital and most populous city of France"));
        assert!(!text.contains("do not extract me"));
        assert!(!text.contains("Copyright"));
        assert!(!text.contains('\n'));
    }

    #[tokio::test]
    async fn test_error_status_yields_empty() {
        let addr = fixture().await;
        let text = extractor()
            .extract(&format!("http://{addr}/broken"), FetchRoute::Direct)
            .await;
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_unreachable_host_yields_empty() {
        let text = extractor()
            .extract("http://127.0.0.1:1/nothing", FetchRoute::Direct)
            .await;
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_non_text_content_yields_empty() {
        let addr = fixture().await;
        let text = extractor()
            .extract(&format!("http://{addr}/image"), FetchRoute::Proxy)
            .await;
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_binary_content_yields_empty_on_direct_route() {
        let addr = fixture().await;
        let text = extractor()
            .extract(&format!("http://{addr}/report.pdf"), FetchRoute::Direct)
            .await;
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_plain_text_on_direct_route() {
        let addr = fixture().await;
        let text = extractor()
            .extract(&format!("http://{addr}/notes.txt"), FetchRoute::Direct)
            .await;
        assert_eq!(text, "plain notes about Paris");
    }

    #[test]
    fn test_body_kind_gate() {
        assert!(matches!(body_kind(Some("text/html; charset=utf-8")), Ok(BodyKind::Markup)));
        assert!(matches!(body_kind(None), Ok(BodyKind::Markup)));
        assert!(matches!(body_kind(Some("text/plain")), Ok(BodyKind::Plain)));
        assert!(body_kind(Some("application/pdf")).is_err());
    }

    #[test]
    fn test_malformed_proxy_only_breaks_proxied_extractor() {
        let config = SearchConfig {
            proxy: Some("::not a url::".to_string()),
            ..SearchConfig::default()
        };
        assert!(PageExtractor::new(&config).is_ok());
        assert!(matches!(
            PageExtractor::proxied(&config),
            Err(SearchError::Client(_))
        ));
    }

    #[tokio::test]
    async fn test_full_fetch_redecodes_declared_charset() {
        let addr = fixture().await;
        let text = extractor()
            .extract(&format!("http://{addr}/gbk"), FetchRoute::Proxy)
            .await;
        assert!(text.contains("巴黎是法国的首都"));
    }

    #[tokio::test]
    async fn test_output_is_capped() {
        let addr = fixture().await;
        let text = extractor()
            .with_max_chars(10)
            .extract(&format!("http://{addr}/article"), FetchRoute::Direct)
            .await;
        assert_eq!(text.chars().count(), 10);
    }

    #[test]
    fn test_main_text_skips_link_heavy_blocks() {
        let html = r#"<body>
            <div><a href="/1">one link</a> <a href="/2">two link</a> <a href="/3">three link</a></div>
            <div><p>A long paragraph of real body text that should win the scoring.</p></div>
        </body>"#;
        let text = main_text(html).unwrap_or_default();
        assert!(text.starts_with("A long paragraph"));
    }

    #[test]
    fn test_main_text_falls_back_to_body() {
        assert_eq!(main_text("<body><p>Short.</p></body>").as_deref(), Some("Short."));
        assert_eq!(main_text("<body><script>x()</script></body>"), None);
    }

    #[test]
    fn test_decode_body_prefers_header_charset() {
        let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode("café");
        assert_eq!(decode_body(&bytes, Some("text/html; charset=windows-1252")), "café");
    }

    #[test]
    fn test_decode_body_defaults_to_utf8() {
        assert_eq!(decode_body("naïve".as_bytes(), None), "naïve");
    }

    #[test]
    fn test_finalize_collapses_newlines() {
        assert_eq!(finalize("a\n\n b\t c  ", 100), "a b c");
        assert_eq!(finalize("abcdef", 3), "abc");
    }
}
