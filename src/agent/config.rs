//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.
//! The built [`AgentConfig`] is immutable and handed to the research loop at
//! construction, so concurrent runs never share mutable settings.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::error::AgentError;
use crate::search::SearchConfig;

/// Default completion model.
const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Default sampling temperature. Low to keep tool selection deterministic.
const DEFAULT_TEMPERATURE: f32 = 0.3;
/// Default completion max tokens. Leaves room for long structured thoughts.
const DEFAULT_MAX_TOKENS: u32 = 2000;
/// Default step budget.
const DEFAULT_MAX_STEPS: usize = 8;
/// Upper bound on the step budget.
pub const MAX_STEPS_LIMIT: usize = 50;
/// Default extra attempts after a decision parse failure.
const DEFAULT_PARSE_RETRIES: u32 = 2;
/// Default completion request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration for the research agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Completion provider name (e.g., "openai").
    pub provider: String,
    /// API key for the completion provider.
    pub api_key: String,
    /// Optional base URL override (for OpenAI-compatible endpoints).
    pub base_url: Option<String>,
    /// Completion model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens per completion.
    pub max_tokens: u32,
    /// Maximum decision cycles before forced termination.
    pub max_steps: usize,
    /// Extra completion attempts allowed per step after a parse failure.
    pub parse_retries: u32,
    /// Completion request timeout.
    pub timeout: Duration,
    /// Directory containing prompt template files.
    ///
    /// When set, the system prompt is loaded from `system.md` in this
    /// directory, falling back to the compiled-in default.
    pub prompt_dir: Option<PathBuf>,
    /// Search provider, credentials and proxy.
    pub search: SearchConfig,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    max_steps: Option<usize>,
    parse_retries: Option<u32>,
    timeout: Option<Duration>,
    prompt_dir: Option<PathBuf>,
    search: Option<SearchConfig>,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("SLEUTH_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("SLEUTH_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("SLEUTH_BASE_URL"))
                .ok();
        }
        if self.model.is_none() {
            self.model = std::env::var("SLEUTH_MODEL").ok();
        }
        if self.max_steps.is_none() {
            self.max_steps = env_parse("SLEUTH_MAX_STEPS");
        }
        if self.parse_retries.is_none() {
            self.parse_retries = env_parse("SLEUTH_PARSE_RETRIES");
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("SLEUTH_PROMPT_DIR").ok().map(PathBuf::from);
        }
        if self.search.is_none() {
            self.search = Some(SearchConfig::default().from_env());
        }
        self
    }

    /// Sets the completion provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the completion model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    /// Sets the completion max tokens.
    #[must_use]
    pub const fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Sets the step budget.
    #[must_use]
    pub const fn max_steps(mut self, n: usize) -> Self {
        self.max_steps = Some(n);
        self
    }

    /// Sets the number of extra attempts after a parse failure.
    #[must_use]
    pub const fn parse_retries(mut self, n: u32) -> Self {
        self.parse_retries = Some(n);
        self
    }

    /// Sets the completion request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Sets the search configuration.
    #[must_use]
    pub fn search(mut self, search: SearchConfig) -> Self {
        self.search = Some(search);
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key was set, or
    /// [`AgentError::InvalidConfig`] for a zero step budget or a temperature
    /// outside `0.0..=2.0`.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let api_key = self.api_key.ok_or(AgentError::ApiKeyMissing)?;

        let mut max_steps = self.max_steps.unwrap_or(DEFAULT_MAX_STEPS);
        if max_steps == 0 {
            return Err(AgentError::InvalidConfig(
                "max_steps must be at least 1".to_string(),
            ));
        }
        if max_steps > MAX_STEPS_LIMIT {
            warn!(requested = max_steps, limit = MAX_STEPS_LIMIT, "clamping max_steps");
            max_steps = MAX_STEPS_LIMIT;
        }

        let temperature = self.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(AgentError::InvalidConfig(format!(
                "temperature {temperature} outside 0.0..=2.0"
            )));
        }

        Ok(AgentConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature,
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            max_steps,
            parse_retries: self.parse_retries.unwrap_or(DEFAULT_PARSE_RETRIES),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            prompt_dir: self.prompt_dir,
            search: self.search.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = AgentConfig::builder()
            .api_key("test-key")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "openai");
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_steps, DEFAULT_MAX_STEPS);
        assert_eq!(config.parse_retries, DEFAULT_PARSE_RETRIES);
        assert_eq!(config.search.provider, "duckduckgo");
    }

    #[test]
    fn test_builder_missing_api_key() {
        let result = AgentConfig::builder().build();
        assert!(matches!(result, Err(AgentError::ApiKeyMissing)));
    }

    #[test]
    fn test_builder_custom_values() {
        let config = AgentConfig::builder()
            .api_key("key")
            .model("qwen-plus")
            .max_steps(3)
            .parse_retries(0)
            .temperature(0.0)
            .timeout(Duration::from_secs(30))
            .search(SearchConfig {
                provider: "google".to_string(),
                ..SearchConfig::default()
            })
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.model, "qwen-plus");
        assert_eq!(config.max_steps, 3);
        assert_eq!(config.parse_retries, 0);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.search.provider, "google");
    }

    #[test]
    fn test_builder_rejects_zero_steps() {
        let result = AgentConfig::builder().api_key("k").max_steps(0).build();
        assert!(matches!(result, Err(AgentError::InvalidConfig(_))));
    }

    #[test]
    fn test_builder_clamps_large_step_budget() {
        let config = AgentConfig::builder()
            .api_key("k")
            .max_steps(10_000)
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.max_steps, MAX_STEPS_LIMIT);
    }

    #[test]
    fn test_builder_rejects_bad_temperature() {
        let result = AgentConfig::builder().api_key("k").temperature(3.5).build();
        assert!(matches!(result, Err(AgentError::InvalidConfig(_))));
    }
}
