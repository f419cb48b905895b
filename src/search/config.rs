//! Search-layer configuration: provider selection, credentials, proxy,
//! endpoints and timeouts.
//!
//! Resolved the same way as [`crate::agent::AgentConfig`]: explicit values →
//! environment variables → defaults. Credentials stay optional here; a
//! backend reports a missing credential as report text when it is used.

use std::time::Duration;

use url::Url;

/// Default Bocha web-search endpoint.
pub const DEFAULT_BOCHA_ENDPOINT: &str = "https://api.bochaai.com/v1/web-search";
/// Default Google Custom Search JSON API endpoint.
pub const DEFAULT_GOOGLE_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";
/// Default DuckDuckGo HTML endpoint.
pub const DEFAULT_DDG_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
/// Default search provider identifier.
pub const DEFAULT_SEARCH_PROVIDER: &str = "duckduckgo";

/// Domains skipped by the metasearch backend unless overridden.
pub const DEFAULT_BLACKLIST: &[&str] = &[
    "baidu.com",
    "zhihu.com",
    "tieba.baidu.com",
    "zhidao.baidu.com",
    "bilibili.com",
    "csdn.net",
];

const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 15;
const DEFAULT_METASEARCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PROXIED_FETCH_TIMEOUT_SECS: u64 = 15;

/// Immutable search configuration shared by every backend of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// Provider identifier (`bocha`, `google`, `duckduckgo` or an alias).
    pub provider: String,
    /// Bocha API key (keyed backend).
    pub bocha_api_key: Option<String>,
    /// Google API key (custom-search backend).
    pub google_api_key: Option<String>,
    /// Google programmable search engine id (`cx`).
    pub google_cx: Option<String>,
    /// HTTP(S)/SOCKS proxy URL used by the metasearch backend.
    pub proxy: Option<String>,
    /// Keyed backend endpoint.
    pub bocha_endpoint: String,
    /// Custom-search backend endpoint.
    pub google_endpoint: String,
    /// Metasearch backend endpoint.
    pub ddg_endpoint: String,
    /// Timeout for keyed and custom search calls.
    pub search_timeout: Duration,
    /// Timeout for the metasearch call (slow when proxied).
    pub metasearch_timeout: Duration,
    /// Timeout for a direct page fetch.
    pub fetch_timeout: Duration,
    /// Timeout for a page fetch through the proxy.
    pub proxied_fetch_timeout: Duration,
    /// Domain substrings excluded from metasearch results.
    pub blacklist: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_SEARCH_PROVIDER.to_string(),
            bocha_api_key: None,
            google_api_key: None,
            google_cx: None,
            proxy: None,
            bocha_endpoint: DEFAULT_BOCHA_ENDPOINT.to_string(),
            google_endpoint: DEFAULT_GOOGLE_ENDPOINT.to_string(),
            ddg_endpoint: DEFAULT_DDG_ENDPOINT.to_string(),
            search_timeout: Duration::from_secs(DEFAULT_SEARCH_TIMEOUT_SECS),
            metasearch_timeout: Duration::from_secs(DEFAULT_METASEARCH_TIMEOUT_SECS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            proxied_fetch_timeout: Duration::from_secs(DEFAULT_PROXIED_FETCH_TIMEOUT_SECS),
            blacklist: DEFAULT_BLACKLIST.iter().map(|d| (*d).to_string()).collect(),
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl SearchConfig {
    /// Fills unset credentials, proxy and endpoints from the environment.
    ///
    /// Fields already holding a value are left alone; endpoints and the
    /// provider are only replaced when the corresponding variable is set.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if let Some(p) = env_nonempty("SLEUTH_SEARCH_PROVIDER") {
            self.provider = p;
        }
        if self.bocha_api_key.is_none() {
            self.bocha_api_key = env_nonempty("BOCHA_API_KEY");
        }
        if self.google_api_key.is_none() {
            self.google_api_key = env_nonempty("GOOGLE_API_KEY");
        }
        if self.google_cx.is_none() {
            self.google_cx = env_nonempty("GOOGLE_CX");
        }
        if self.proxy.is_none() {
            self.proxy = env_nonempty("SLEUTH_PROXY").or_else(|| env_nonempty("HTTPS_PROXY"));
        }
        if let Some(e) = env_nonempty("SLEUTH_BOCHA_ENDPOINT") {
            self.bocha_endpoint = e;
        }
        if let Some(e) = env_nonempty("SLEUTH_GOOGLE_ENDPOINT") {
            self.google_endpoint = e;
        }
        if let Some(e) = env_nonempty("SLEUTH_DDG_ENDPOINT") {
            self.ddg_endpoint = e;
        }
        if let Some(list) = env_nonempty("SLEUTH_BLACKLIST") {
            self.blacklist = parse_domain_list(&list);
        }
        self
    }

    /// Returns `true` if the host of `url` contains any blacklisted domain
    /// substring, ignoring case. An unparseable `url` is matched as a whole.
    #[must_use]
    pub fn is_blacklisted(&self, url: &str) -> bool {
        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
            .unwrap_or_else(|| url.to_ascii_lowercase());
        self.blacklist.iter().any(|domain| {
            !domain.is_empty() && host.contains(domain.to_ascii_lowercase().as_str())
        })
    }
}

/// Splits a comma- or whitespace-separated domain list, dropping duplicates.
#[must_use]
pub fn parse_domain_list(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for part in raw.split(|c: char| c == ',' || c.is_whitespace()) {
        let d = part.trim().to_ascii_lowercase();
        if !d.is_empty() && !out.contains(&d) {
            out.push(d);
        }
    }
    out
}
