//! Lifecycle events streamed from a research run to its caller.
//!
//! The loop is the only producer; the presentation layer consumes events
//! from a tokio channel as they arrive. Closing the receiving side cancels
//! the run at its next emission.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::AgentError;

/// A tagged progress or result record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Step progress ("step 2 of 8").
    StatusUpdate {
        /// Human-readable status line.
        content: String,
    },
    /// The model's reasoning for the current step.
    Thought {
        /// Thought text.
        content: String,
    },
    /// The search about to be dispatched.
    Action {
        /// Description of the action, including the query.
        content: String,
    },
    /// The search report returned by the dispatcher.
    ToolOutput {
        /// Report text.
        content: String,
    },
    /// A warning (`fatal == false`) or the terminal failure of the run.
    Error {
        /// Error description.
        content: String,
        /// Whether this event ends the run.
        fatal: bool,
    },
    /// The final answer, or the budget-exhausted notice.
    FinalAnswer {
        /// Answer text.
        content: String,
    },
}

impl AgentEvent {
    /// Wire tag of this event (`status_update`, `thought`, ...).
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::StatusUpdate { .. } => "status_update",
            Self::Thought { .. } => "thought",
            Self::Action { .. } => "action",
            Self::ToolOutput { .. } => "tool_output",
            Self::Error { .. } => "error",
            Self::FinalAnswer { .. } => "final_answer",
        }
    }

    /// Text payload.
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::StatusUpdate { content }
            | Self::Thought { content }
            | Self::Action { content }
            | Self::ToolOutput { content }
            | Self::Error { content, .. }
            | Self::FinalAnswer { content } => content,
        }
    }

    /// Whether this event ends the run.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::FinalAnswer { .. } | Self::Error { fatal: true, .. }
        )
    }
}

/// Sending half of a run's event channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::UnboundedSender<AgentEvent>,
}

/// Creates a connected event sender/receiver pair.
#[must_use]
pub fn event_channel() -> (EventSender, mpsc::UnboundedReceiver<AgentEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (EventSender { sender }, receiver)
}

impl EventSender {
    /// Emits an event.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Cancelled`] if the receiver has been dropped.
    pub fn emit(&self, event: AgentEvent) -> Result<(), AgentError> {
        self.sender.send(event).map_err(|_| AgentError::Cancelled)
    }

    /// Emits a [`AgentEvent::StatusUpdate`].
    pub fn status(&self, content: impl Into<String>) -> Result<(), AgentError> {
        self.emit(AgentEvent::StatusUpdate {
            content: content.into(),
        })
    }

    /// Emits a [`AgentEvent::Thought`].
    pub fn thought(&self, content: impl Into<String>) -> Result<(), AgentError> {
        self.emit(AgentEvent::Thought {
            content: content.into(),
        })
    }

    /// Emits an [`AgentEvent::Action`].
    pub fn action(&self, content: impl Into<String>) -> Result<(), AgentError> {
        self.emit(AgentEvent::Action {
            content: content.into(),
        })
    }

    /// Emits an [`AgentEvent::ToolOutput`].
    pub fn tool_output(&self, content: impl Into<String>) -> Result<(), AgentError> {
        self.emit(AgentEvent::ToolOutput {
            content: content.into(),
        })
    }

    /// Emits a non-fatal [`AgentEvent::Error`].
    pub fn warning(&self, content: impl Into<String>) -> Result<(), AgentError> {
        self.emit(AgentEvent::Error {
            content: content.into(),
            fatal: false,
        })
    }

    /// Emits the fatal [`AgentEvent::Error`] that ends a run.
    pub fn failure(&self, content: impl Into<String>) -> Result<(), AgentError> {
        self.emit(AgentEvent::Error {
            content: content.into(),
            fatal: true,
        })
    }

    /// Emits an [`AgentEvent::FinalAnswer`].
    pub fn final_answer(&self, content: impl Into<String>) -> Result<(), AgentError> {
        self.emit(AgentEvent::FinalAnswer {
            content: content.into(),
        })
    }
}
