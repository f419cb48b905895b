//! Research agent.
//!
//! A step-bounded loop in which a language model decides, one step at a
//! time, whether to search the web or answer. The model is reached through
//! a pluggable provider abstraction backed by OpenAI-compatible APIs; search
//! is reached through [`crate::search::SearchTool`].
//!
//! # Architecture
//!
//! ```text
//! question → ResearchAgent
//!   ├── LlmProvider::chat (JSON decision envelope)
//!   ├── parse_decision (bounded retries on malformed output)
//!   ├── search → SearchTool::search → report text
//!   ├── Conversation::push_exchange (decision + report)
//!   └── AgentEvent stream → caller
//! ```

pub mod client;
pub mod config;
pub mod decision;
pub mod event;
pub mod message;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod research_loop;

// Re-export key types
pub use client::create_provider;
pub use config::AgentConfig;
pub use decision::{Action, Decision, ParseRetryPolicy, parse_decision};
pub use event::{AgentEvent, EventSender, event_channel};
pub use message::{ChatMessage, ChatRequest, ChatResponse, Conversation, Role, TokenUsage};
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use research_loop::{LoopState, ResearchAgent, RunOutcome, RunStatus};
