//! Error types for sleuth.
//!
//! Errors are split by layer: [`AgentError`] for the decision loop and the
//! completion provider, [`SearchError`] for search backends and page
//! fetching, and [`CommandError`] for the CLI. Search errors never cross the
//! dispatcher boundary as `Err`; they are rendered to report text instead.

use thiserror::Error;

/// Result alias used by the CLI layer.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Agent or completion provider failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Search backend failure that escaped report rendering.
    #[error(transparent)]
    Search(#[from] SearchError),

    /// CLI command failure.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the research loop and the completion capability.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    /// No completion API key was configured.
    #[error("completion API key missing (set OPENAI_API_KEY or SLEUTH_API_KEY)")]
    ApiKeyMissing,

    /// The completion request failed.
    #[error("completion request failed: {message}")]
    ApiRequest {
        /// Error description from the transport or SDK.
        message: String,
        /// HTTP status, when known.
        status: Option<u16>,
    },

    /// The configured completion provider name is unknown.
    #[error("unsupported completion provider: {name}")]
    UnsupportedProvider {
        /// The provider name that was requested.
        name: String,
    },

    /// The model output is not a valid decision envelope.
    #[error(transparent)]
    DecisionParse(#[from] DecisionParseError),

    /// A configuration value is out of range or malformed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The event receiver was dropped before the run finished.
    #[error("run cancelled: event receiver closed")]
    Cancelled,
}

/// Why a completion could not be turned into a decision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecisionParseError {
    /// The completion was empty after fence stripping.
    #[error("model returned an empty response")]
    Empty,

    /// The completion is not a JSON object.
    #[error("model response is not valid JSON: {message}")]
    InvalidJson {
        /// Parser error message.
        message: String,
    },

    /// The JSON object has no `action` field.
    #[error("decision has no `action` field")]
    MissingAction,

    /// `action` is `finish` but no answer was given.
    #[error("`finish` decision has no `answer`")]
    MissingAnswer,
}

/// Search-layer failures. Each renders to a human-readable sentence that is
/// fed back to the model as report text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// A required credential is not configured.
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    /// The upstream service answered with a non-success status or the
    /// request failed outright.
    #[error("upstream request failed: {0}")]
    UpstreamHttp(String),

    /// The upstream service did not answer in time.
    #[error("upstream request timed out after {0}s")]
    UpstreamTimeout(u64),

    /// The query produced no results.
    #[error("no results found")]
    EmptyResultSet,

    /// Every candidate was removed by the domain blacklist.
    #[error("all results were removed by the domain blacklist")]
    AllResultsFiltered,

    /// The provider identifier is not one of the supported backends.
    #[error("unknown search provider `{0}` (expected bocha, google or duckduckgo)")]
    UnknownProvider(String),

    /// An HTTP client could not be constructed (bad proxy URL, TLS setup).
    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

impl SearchError {
    /// Classifies a `reqwest` failure as a timeout or a generic upstream error.
    pub(crate) fn from_reqwest(err: &reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::UpstreamTimeout(timeout_secs)
        } else {
            Self::UpstreamHttp(err.to_string())
        }
    }
}

/// CLI command failures.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A command could not be completed.
    #[error("{0}")]
    ExecutionFailed(String),

    /// Output could not be serialized.
    #[error("output formatting failed: {0}")]
    OutputFormat(String),

    /// Unknown `--format` value.
    #[error("unknown output format `{0}` (expected text, json or ndjson)")]
    UnknownFormat(String),
}
