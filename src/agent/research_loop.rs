//! Step-bounded research loop.
//!
//! Drives the model ↔ search round-trip: asks the model for a decision,
//! dispatches a search when requested, feeds the report back, and repeats
//! until the model finishes, the run fails, or the step budget runs out.
//! Every step emits `status → thought → action → tool_output` in that order,
//! and every run that is not cancelled ends with exactly one terminal event.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::AgentConfig;
use super::decision::{Action, Decision, ParseRetryPolicy, parse_decision};
use super::event::{AgentEvent, EventSender, event_channel};
use super::message::{ChatMessage, ChatRequest, Conversation, TokenUsage};
use super::prompt::{
    PromptSet, budget_exhausted_notice, build_question_prompt, build_tool_report_prompt,
    local_timestamp, step_status,
};
use super::provider::LlmProvider;
use crate::error::{AgentError, DecisionParseError};
use crate::search::SearchTool;

/// Position of a run in its decision cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for the model's next decision.
    Thinking,
    /// A search decision was accepted and its report is pending.
    AwaitingTool {
        /// Raw decision text, recorded alongside the report.
        decision_raw: String,
        /// Non-empty search query.
        query: String,
    },
    /// The model produced a final answer.
    Done,
    /// The run ended on an unrecoverable error.
    Failed,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The model finished with an answer.
    Done,
    /// The step budget ran out before the model finished.
    BudgetExhausted,
    /// Parse retries were exhausted, the action was unknown, or the
    /// completion request failed.
    Failed,
    /// The event receiver was dropped mid-run.
    Cancelled,
}

impl RunStatus {
    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::BudgetExhausted => "budget_exhausted",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Result of a research run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    /// Terminal status.
    pub status: RunStatus,
    /// Final answer, budget notice, or failure description.
    pub final_text: String,
    /// Steps started (never exceeds the configured budget).
    pub steps: usize,
    /// Searches dispatched.
    pub searches: usize,
    /// Token usage summed over every completion call.
    pub usage: TokenUsage,
    /// Full conversation transcript.
    pub messages: Vec<ChatMessage>,
}

/// A parsed decision with its raw text, or the attempt count and last error.
type DecisionAttempt = Result<(String, Decision), (u32, DecisionParseError)>;

/// Mutable bookkeeping for one run.
struct RunRecord {
    conversation: Conversation,
    steps: usize,
    searches: usize,
    usage: TokenUsage,
    final_text: String,
}

/// A research agent bound to a completion provider and a search tool.
///
/// Holds only shared, read-only state; each call to [`ResearchAgent::run`]
/// owns its own conversation, so one agent can serve concurrent runs.
pub struct ResearchAgent {
    provider: Arc<dyn LlmProvider>,
    search: Arc<dyn SearchTool>,
    config: AgentConfig,
    prompts: PromptSet,
}

impl ResearchAgent {
    /// Creates an agent, loading prompts from `config.prompt_dir`.
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        search: Arc<dyn SearchTool>,
        config: AgentConfig,
    ) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        Self {
            provider,
            search,
            config,
            prompts,
        }
    }

    /// Replaces the prompt templates.
    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = prompts;
        self
    }

    /// Runs the loop for `question`, emitting events on `events`.
    ///
    /// Failures are reported as a fatal [`AgentEvent::Error`] and reflected
    /// in [`RunOutcome::status`]; a dropped receiver yields
    /// [`RunStatus::Cancelled`].
    pub async fn run(&self, question: &str, events: &EventSender) -> RunOutcome {
        let system_prompt = self
            .prompts
            .render_system(self.search.provider_name(), &local_timestamp());
        let mut record = RunRecord {
            conversation: Conversation::new(&system_prompt, &build_question_prompt(question)),
            steps: 0,
            searches: 0,
            usage: TokenUsage::default(),
            final_text: String::new(),
        };

        info!(
            model = %self.config.model,
            search = self.search.provider_name(),
            max_steps = self.config.max_steps,
            "research run started"
        );

        let status = match self.drive(&mut record, events).await {
            Ok(status) => status,
            Err(AgentError::Cancelled) => {
                info!(steps = record.steps, "research run cancelled");
                RunStatus::Cancelled
            }
            Err(e) => {
                record.final_text = e.to_string();
                if events.failure(&record.final_text).is_err() {
                    RunStatus::Cancelled
                } else {
                    RunStatus::Failed
                }
            }
        };

        info!(
            ?status,
            steps = record.steps,
            searches = record.searches,
            total_tokens = record.usage.total_tokens,
            "research run finished"
        );

        RunOutcome {
            status,
            final_text: record.final_text,
            steps: record.steps,
            searches: record.searches,
            usage: record.usage,
            messages: record.conversation.into_messages(),
        }
    }

    /// Spawns a run on the tokio runtime and returns its event receiver.
    ///
    /// Dropping the receiver cancels the run at its next emission.
    #[must_use]
    pub fn spawn(
        self: Arc<Self>,
        question: impl Into<String>,
    ) -> (JoinHandle<RunOutcome>, mpsc::UnboundedReceiver<AgentEvent>) {
        let (sender, receiver) = event_channel();
        let question = question.into();
        let handle = tokio::spawn(async move { self.run(&question, &sender).await });
        (handle, receiver)
    }

    async fn drive(
        &self,
        record: &mut RunRecord,
        events: &EventSender,
    ) -> Result<RunStatus, AgentError> {
        let max_steps = self.config.max_steps;
        let mut state = LoopState::Thinking;

        loop {
            state = match state {
                LoopState::Thinking => {
                    if record.steps >= max_steps {
                        let notice = budget_exhausted_notice(max_steps);
                        events.final_answer(&notice)?;
                        record.final_text = notice;
                        return Ok(RunStatus::BudgetExhausted);
                    }
                    record.steps += 1;
                    events.status(step_status(record.steps, max_steps))?;

                    let (raw, decision) = match self.decide(record, events).await? {
                        Ok(parsed) => parsed,
                        Err((attempts, err)) => {
                            let message =
                                format!("decision parse failed after {attempts} attempt(s): {err}");
                            events.failure(&message)?;
                            record.final_text = message;
                            return Ok(RunStatus::Failed);
                        }
                    };
                    events.thought(&decision.thought)?;
                    self.next_state(raw, decision, record, events)?
                }
                LoopState::AwaitingTool {
                    decision_raw,
                    query,
                } => {
                    debug!(step = record.steps, query = %query, "dispatching search");
                    let report = self.search.search(&query).await;
                    record.searches += 1;
                    events.tool_output(&report)?;
                    record
                        .conversation
                        .push_exchange(&decision_raw, &build_tool_report_prompt(&report));
                    LoopState::Thinking
                }
                LoopState::Done => return Ok(RunStatus::Done),
                LoopState::Failed => return Ok(RunStatus::Failed),
            };
        }
    }

    /// Maps a parsed decision to the next state, emitting its events.
    fn next_state(
        &self,
        raw: String,
        decision: Decision,
        record: &mut RunRecord,
        events: &EventSender,
    ) -> Result<LoopState, AgentError> {
        match decision.action {
            Action::Finish => {
                let answer = decision.answer.unwrap_or_default();
                events.final_answer(&answer)?;
                record.final_text = answer;
                Ok(LoopState::Done)
            }
            Action::Search => {
                let query = decision.query.unwrap_or_default();
                if query.is_empty() {
                    warn!(step = record.steps, "search decision without a query");
                    events.warning("model chose to search but gave no query; skipping this step")?;
                    return Ok(LoopState::Thinking);
                }
                events.action(format!(
                    "search ({}): {query}",
                    self.search.provider_name()
                ))?;
                Ok(LoopState::AwaitingTool {
                    decision_raw: raw,
                    query,
                })
            }
            Action::Other(name) => {
                let message = format!("unknown action `{name}` (expected search or finish)");
                events.failure(&message)?;
                record.final_text = message;
                Ok(LoopState::Failed)
            }
        }
    }

    /// Requests a decision, retrying on parse failures per the retry policy.
    ///
    /// The outer error is a transport failure or cancellation; the inner
    /// error carries the attempt count and the last parse error.
    async fn decide(
        &self,
        record: &mut RunRecord,
        events: &EventSender,
    ) -> Result<DecisionAttempt, AgentError> {
        let policy = ParseRetryPolicy::new(self.config.parse_retries);
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: record.conversation.messages().to_vec(),
            temperature: Some(self.config.temperature),
            max_tokens: Some(self.config.max_tokens),
            json_mode: true,
        };

        let mut failed = 0_u32;
        loop {
            let response = self.provider.chat(&request).await?;
            record.usage.accumulate(response.usage);

            match parse_decision(&response.content) {
                Ok(decision) => {
                    debug!(step = record.steps, action = ?decision.action, "decision parsed");
                    return Ok(Ok((response.content, decision)));
                }
                Err(err) => {
                    failed += 1;
                    warn!(step = record.steps, attempt = failed, error = %err, "decision parse failed");
                    if !policy.should_retry(failed) {
                        return Ok(Err((failed, err)));
                    }
                    events.warning(format!(
                        "could not parse the model's decision (attempt {failed}/{}): {err}; retrying",
                        policy.max_attempts()
                    ))?;
                }
            }
        }
    }
}
