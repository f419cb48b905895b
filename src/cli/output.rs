//! Output formatting for CLI commands.

use std::str::FromStr;

use serde::Serialize;

use crate::agent::{AgentEvent, RunOutcome};
use crate::error::CommandError;

/// Characters of a search report shown in text mode.
const REPORT_PREVIEW_CHARS: usize = 1000;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// One pretty-printed JSON document.
    Json,
    /// One compact JSON object per line.
    Ndjson,
}

impl FromStr for OutputFormat {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "ndjson" | "jsonl" => Ok(Self::Ndjson),
            other => Err(CommandError::UnknownFormat(other.to_string())),
        }
    }
}

impl OutputFormat {
    /// Serializes `value` for this format (pretty for JSON, compact otherwise).
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::OutputFormat`] if serialization fails.
    pub fn to_json<T: Serialize + ?Sized>(self, value: &T) -> Result<String, CommandError> {
        let rendered = match self {
            Self::Json => serde_json::to_string_pretty(value),
            Self::Text | Self::Ndjson => serde_json::to_string(value),
        };
        rendered.map_err(|e| CommandError::OutputFormat(e.to_string()))
    }
}

/// Renders one event as a text block.
#[must_use]
pub fn format_event_text(event: &AgentEvent) -> String {
    match event {
        AgentEvent::StatusUpdate { content } => format!("== {content}\n"),
        AgentEvent::Thought { content } => format!("Thought:\n{content}\n\n"),
        AgentEvent::Action { content } => format!("> {content}\n"),
        AgentEvent::ToolOutput { content } => {
            let total = content.chars().count();
            let preview: String = content.chars().take(REPORT_PREVIEW_CHARS).collect();
            if total > REPORT_PREVIEW_CHARS {
                format!("{preview}\n... ({total} chars)\n\n")
            } else {
                format!("{preview}\n\n")
            }
        }
        AgentEvent::Error {
            content,
            fatal: false,
        } => format!("warning: {content}\n"),
        AgentEvent::Error {
            content,
            fatal: true,
        } => format!("error: {content}\n"),
        AgentEvent::FinalAnswer { content } => format!("\n=== Answer ===\n{content}\n"),
    }
}

/// Renders the closing summary line of a run in text mode.
#[must_use]
pub fn format_outcome_text(outcome: &RunOutcome, max_steps: usize) -> String {
    format!(
        "\n---\nStatus: {} | Steps: {}/{} | Searches: {} | Tokens: {}\n",
        outcome.status.as_str(),
        outcome.steps,
        max_steps,
        outcome.searches,
        outcome.usage.total_tokens
    )
}
