//! Research Loop
//!
//! Drives one run through the bounded state machine:
//!
//! ```text
//! reason ─▶ route ─┬─▶ execute tools ─▶ reason ...
//!                  └─▶ compress ─▶ finalize
//! ```
//!
//! The guardrails can send the loop to compression on any iteration,
//! including the first.

use backon::Retryable;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::compression::{self, RawNotesPolicy};
use crate::error::{AgentError, Result};
use crate::execution::ToolExecutor;
use crate::message::{Conversation, Message};
use crate::metrics::TokenMetrics;
use crate::provider::{Completion, ModelBinding};
use crate::retry::{RetryPolicy, with_timeout};
use crate::router::{Guardrails, Route};
use crate::run_log::{self, RunLog, RunLogSink, RunStatus, TracingRunLogSink};
use crate::state::RunState;
use crate::tool::{ToolRegistry, ToolSchema};

pub const DEFAULT_RESEARCH_PROMPT: &str = r"You are a research assistant conducting research on the user's input topic.

Use the tools you are given to gather information. You have a small budget of tool calls, so:
- Start with broader searches, then narrow down
- Reflect after each search: what did you learn, what is missing?
- Stop as soon as you can answer the question comprehensively

When you have enough information, answer directly without calling any tool.";

/// Research loop configuration
#[derive(Clone, Debug, Serialize)]
pub struct ResearchConfig {
    /// System prompt for the reasoning model
    pub system_prompt: String,

    /// Iteration and tool-call limits
    pub guardrails: Guardrails,

    /// Deadline for each model call
    pub model_timeout: Duration,

    /// Deadline for each tool call
    pub tool_timeout: Duration,

    /// Retry policy for model calls
    pub retry: RetryPolicy,

    /// Run the tool requests of one turn concurrently
    pub parallel_tool_calls: bool,

    /// Whether earlier note blocks survive compression
    pub raw_notes: RawNotesPolicy,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_RESEARCH_PROMPT.into(),
            guardrails: Guardrails::default(),
            model_timeout: Duration::from_secs(60),
            tool_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            parallel_tool_calls: true,
            raw_notes: RawNotesPolicy::default(),
        }
    }
}

/// Final output of a run
#[derive(Clone, Debug, Serialize)]
pub struct ResearchOutput {
    pub compressed_research: String,
    pub raw_notes: Vec<String>,
    pub conversation: Conversation,
    pub run_log: RunLog,
}

/// A run that stopped on an unrecoverable error.
///
/// `log` holds the metrics gathered up to the failure.
#[derive(Debug, thiserror::Error)]
#[error("research run {} failed: {error}", .log.run_id)]
pub struct RunFailure {
    #[source]
    pub error: AgentError,
    pub log: RunLog,
}

/// The research agent
pub struct Researcher {
    reasoning: ModelBinding,
    compression: ModelBinding,
    tools: Arc<ToolRegistry>,
    sink: Arc<dyn RunLogSink>,
    config: ResearchConfig,
}

impl Researcher {
    /// Create a new researcher
    pub fn new(
        reasoning: ModelBinding,
        compression: ModelBinding,
        tools: Arc<ToolRegistry>,
        sink: Arc<dyn RunLogSink>,
        config: ResearchConfig,
    ) -> Self {
        Self {
            reasoning,
            compression,
            tools,
            sink,
            config,
        }
    }

    /// Research a brief from scratch
    pub async fn run(&self, brief: &str) -> std::result::Result<ResearchOutput, RunFailure> {
        let mut state = RunState::new(brief);
        self.run_state(&mut state).await
    }

    /// Drive an existing state to completion.
    ///
    /// On failure the state keeps everything gathered so far, and a run log
    /// with status `failed` has already been sent to the sink.
    pub async fn run_state(&self, state: &mut RunState) -> std::result::Result<ResearchOutput, RunFailure> {
        tracing::info!(
            run_id = %state.run_id(),
            reasoning_model = %self.reasoning.model(),
            tools = self.tools.len(),
            "Starting research run"
        );

        match self.drive(state).await {
            Ok(()) => {
                let run_log = run_log::finalize(state, RunStatus::Completed, self.sink.as_ref());
                Ok(ResearchOutput {
                    compressed_research: state.compressed_research().unwrap_or_default().to_string(),
                    raw_notes: state.raw_notes().to_vec(),
                    conversation: state.conversation().clone(),
                    run_log,
                })
            }
            Err(error) => {
                tracing::error!(run_id = %state.run_id(), error = %error, "Research run failed");
                let log = RunLog::from_state(state, RunStatus::Failed).with_error(&error);
                run_log::emit(&log, self.sink.as_ref());
                Err(RunFailure { error, log })
            }
        }
    }

    async fn drive(&self, state: &mut RunState) -> Result<()> {
        loop {
            self.reasoning_step(state).await?;

            let reason = self.config.guardrails.evaluate(state);
            tracing::debug!(
                run_id = %state.run_id(),
                loop_count = state.loop_count(),
                tool_calls = state.tool_metrics().total_calls(),
                %reason,
                "Routed"
            );

            match reason.route() {
                Route::ExecuteTools => {
                    let batch = self
                        .executor()
                        .step(&mut state.conversation, &mut state.tool_metrics)
                        .await;
                    if batch.failures() > 0 {
                        tracing::warn!(
                            run_id = %state.run_id(),
                            failed = batch.failures(),
                            of = batch.len(),
                            "Some tool calls failed"
                        );
                    }
                }
                Route::Compress => break,
            }
        }

        self.compression_step(state).await
    }

    fn executor(&self) -> ToolExecutor<'_> {
        ToolExecutor::new(&self.tools, self.config.tool_timeout, self.config.parallel_tool_calls)
    }

    /// Reads: `conversation`. Mutates: `loop_count`, `conversation`, `token_metrics`.
    pub async fn reasoning_step(&self, state: &mut RunState) -> Result<()> {
        state.loop_count += 1;

        let mut messages = Vec::with_capacity(state.conversation.len() + 1);
        messages.push(Message::system(&self.config.system_prompt));
        messages.extend(state.conversation.messages().iter().cloned());

        let schemas = self.tools.schemas();
        let completion = self
            .invoke(&self.reasoning, "reasoning", &messages, &schemas, &mut state.token_metrics)
            .await?;

        tracing::debug!(
            run_id = %state.run_id(),
            loop_count = state.loop_count,
            tool_calls = completion.tool_calls.len(),
            "Reasoning step complete"
        );
        state.conversation.push(completion.into_message());
        Ok(())
    }

    /// Reads: `conversation`. Mutates: `token_metrics`, `compressed_research`, `raw_notes`.
    pub async fn compression_step(&self, state: &mut RunState) -> Result<()> {
        let messages = compression::compression_messages(&state.conversation, &compression::today_str());
        let completion = self
            .invoke(&self.compression, "compression", &messages, &[], &mut state.token_metrics)
            .await?;

        state.compressed_research = Some(completion.content);
        let block = compression::raw_notes_block(&state.conversation);
        compression::merge_raw_notes(&mut state.raw_notes, block, self.config.raw_notes);
        Ok(())
    }

    /// Model call with timeout and retries; usage is recorded on success
    async fn invoke(
        &self,
        binding: &ModelBinding,
        what: &str,
        messages: &[Message],
        tools: &[ToolSchema],
        tokens: &mut TokenMetrics,
    ) -> Result<Completion> {
        let limit = self.config.model_timeout;
        let completion = (|| with_timeout(what, limit, binding.invoke(messages, tools)))
            .retry(self.config.retry.backoff())
            .when(AgentError::is_retryable)
            .notify(|err: &AgentError, delay: Duration| {
                tracing::warn!(
                    call = what,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "Retrying external call"
                );
            })
            .await?;
        tokens.record(completion.usage);
        Ok(completion)
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get configuration
    pub const fn config(&self) -> &ResearchConfig {
        &self.config
    }
}

/// Builder for [`Researcher`]
pub struct ResearcherBuilder {
    reasoning: Option<ModelBinding>,
    compression: Option<ModelBinding>,
    tools: ToolRegistry,
    sink: Arc<dyn RunLogSink>,
    config: ResearchConfig,
}

impl Default for ResearcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResearcherBuilder {
    pub fn new() -> Self {
        Self {
            reasoning: None,
            compression: None,
            tools: ToolRegistry::new(),
            sink: Arc::new(TracingRunLogSink),
            config: ResearchConfig::default(),
        }
    }

    #[must_use]
    pub fn reasoning_model(mut self, binding: ModelBinding) -> Self {
        self.reasoning = Some(binding);
        self
    }

    #[must_use]
    pub fn compression_model(mut self, binding: ModelBinding) -> Self {
        self.compression = Some(binding);
        self
    }

    #[must_use]
    pub fn tool<T: crate::tool::Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    #[must_use]
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn RunLogSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    #[must_use]
    pub const fn guardrails(mut self, guardrails: Guardrails) -> Self {
        self.config.guardrails = guardrails;
        self
    }

    #[must_use]
    pub fn config(mut self, config: ResearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate and build; fails before any model is called
    pub fn build(self) -> Result<Researcher> {
        let reasoning = self
            .reasoning
            .ok_or_else(|| AgentError::Config("Reasoning model is required".into()))?;
        let compression = self.compression.unwrap_or_else(|| reasoning.clone());

        if self.tools.is_empty() {
            return Err(AgentError::Config("At least one tool must be registered".into()));
        }
        if self.config.guardrails.max_loops == 0 {
            return Err(AgentError::Config("max_loops must be at least 1".into()));
        }
        if self.config.model_timeout.is_zero() || self.config.tool_timeout.is_zero() {
            return Err(AgentError::Config("Timeouts must be non-zero".into()));
        }

        Ok(Researcher::new(
            reasoning,
            compression,
            Arc::new(self.tools),
            self.sink,
            self.config,
        ))
    }
}
