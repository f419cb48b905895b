//! Completion provider factory.

use crate::agent::config::AgentConfig;
use crate::agent::provider::LlmProvider;
use crate::agent::providers::OpenAiProvider;
use crate::error::AgentError;

/// Provider names served by [`OpenAiProvider`].
///
/// Every supported gateway speaks the `OpenAI` chat-completions protocol;
/// they differ only in base URL.
const OPENAI_COMPATIBLE: &[&str] = &["openai", "openai-compatible", "siliconflow"];

/// Creates the [`LlmProvider`] named by `config.provider` (case-insensitive).
///
/// # Errors
///
/// Returns [`AgentError::UnsupportedProvider`] for unknown provider names,
/// or the provider's own construction error.
pub fn create_provider(config: &AgentConfig) -> Result<Box<dyn LlmProvider>, AgentError> {
    let name = config.provider.trim().to_ascii_lowercase();
    if OPENAI_COMPATIBLE.contains(&name.as_str()) {
        return Ok(Box::new(OpenAiProvider::new(config)?));
    }
    Err(AgentError::UnsupportedProvider {
        name: config.provider.clone(),
    })
}
