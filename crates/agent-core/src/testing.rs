//! Test doubles for the research loop.
//!
//! Compiled for this crate's tests and, behind the `testing` feature, for
//! downstream crates.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::provider::{Completion, GenerationOptions, LlmProvider};
use crate::tool::{ParameterSchema, Tool, ToolArguments, ToolCall, ToolResult, ToolSchema};

/// What a [`ScriptedProvider`] was asked
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<String>,
    pub model: String,
}

/// Provider that replays a fixed list of responses in order
#[derive(Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<Completion>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<Completion>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Number of `complete` calls so far, failed ones included
    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                messages: messages.to_vec(),
                tools: tools.iter().map(|t| t.name.clone()).collect(),
                model: options.model.clone(),
            });
        }

        let next = self
            .script
            .lock()
            .map_err(|_| AgentError::Other("script poisoned".into()))?
            .pop_front();

        next.unwrap_or_else(|| Err(AgentError::ModelInvocation("script exhausted".into())))
            .map(|mut completion| {
                if completion.model.is_empty() {
                    completion.model.clone_from(&options.model);
                }
                completion
            })
    }
}

fn query_schema(name: &str) -> ToolSchema {
    ToolSchema {
        name: name.to_string(),
        description: format!("Test tool {name}"),
        parameters: vec![ParameterSchema::required("query", "string", "Input")],
        external: false,
    }
}

/// Answers `"<name>: <query>"`
pub struct EchoTool {
    name: String,
}

impl EchoTool {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Tool for EchoTool {
    fn schema(&self) -> ToolSchema {
        query_schema(&self.name)
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let query = call.require_str("query")?;
        Ok(ToolResult::success(&self.name, format!("{}: {query}", self.name)))
    }
}

/// Always fails with [`AgentError::ToolExecution`]
pub struct FailingTool {
    name: String,
}

impl FailingTool {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn schema(&self) -> ToolSchema {
        query_schema(&self.name)
    }

    async fn execute(&self, _call: &ToolCall) -> Result<ToolResult> {
        Err(AgentError::tool(&self.name, "upstream returned 500"))
    }
}

/// Sleeps before answering
pub struct SlowTool {
    name: String,
    delay: Duration,
}

impl SlowTool {
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
        }
    }
}

#[async_trait]
impl Tool for SlowTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name.clone(),
            description: "Slow test tool".into(),
            parameters: Vec::new(),
            external: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        tokio::time::sleep(self.delay).await;
        Ok(ToolResult::success(
            &self.name,
            format!("{}: {}", self.name, call.str_arg("query").unwrap_or_default()),
        ))
    }
}

/// Call with a single `query` argument and a fixed id
pub fn query_call(tool: &str, query: &str, id: &str) -> ToolCall {
    let mut args = ToolArguments::new();
    args.insert("query".into(), query.into());
    ToolCall::with_id(tool, args, id)
}
