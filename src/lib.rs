//! # sleuth
//!
//! A step-bounded web research agent. A language model decides at each step
//! whether to search the web or give its final answer; search results are
//! fetched, reduced to readable text and fed back into the conversation.
//!
//! ## Modules
//!
//! - [`agent`]: completion providers, decision parsing and the research loop
//! - [`search`]: search backends, content extraction and report building
//! - [`cli`]: command-line interface
//! - [`error`]: error types
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use sleuth::agent::{LlmProvider, create_provider};
//! use sleuth::search::SearchTool;
//! use sleuth::{AgentConfig, ResearchAgent, SearchDispatcher};
//!
//! # async fn demo() -> sleuth::Result<()> {
//! let config = AgentConfig::from_env()?;
//! let provider: Arc<dyn LlmProvider> = Arc::from(create_provider(&config)?);
//! let search: Arc<dyn SearchTool> = Arc::new(SearchDispatcher::new(config.search.clone()));
//! let agent = Arc::new(ResearchAgent::new(provider, search, config));
//!
//! let (handle, mut events) = agent.spawn("What is the capital of France?");
//! while let Some(event) = events.recv().await {
//!     let _ = event.content();
//! }
//! let outcome = handle.await.map_err(|e| sleuth::error::CommandError::ExecutionFailed(e.to_string()))?;
//! assert!(!outcome.final_text.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod cli;
pub mod error;
pub mod search;

pub use agent::{AgentConfig, AgentEvent, ResearchAgent, RunOutcome, RunStatus};
pub use error::{Error, Result};
pub use search::{SearchConfig, SearchDispatcher};
