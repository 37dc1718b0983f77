//! # agent-core
//!
//! Bounded research loop with a provider-agnostic LLM abstraction and an
//! extensible tool system.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           Researcher                             │
//! │  ┌───────────┐   ┌──────────┐   ┌──────────────┐                 │
//! │  │ Reasoning │──▶│  Router  │──▶│ ToolExecutor │──┐              │
//! │  │   step    │◀──┤Guardrails│   │  (registry)  │  │              │
//! │  └───────────┘   └────┬─────┘   └──────────────┘  │              │
//! │        ▲              │                           │              │
//! │        └──────────────┼───────────────────────────┘              │
//! │                       ▼                                          │
//! │               ┌──────────────┐   ┌───────────┐                   │
//! │               │ Compression  │──▶│  RunLog   │──▶ RunLogSink     │
//! │               └──────────────┘   └───────────┘                   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait enables swapping between OpenAI, Ollama, or any
//! other backend without changing loop logic.

pub mod compression;
pub mod error;
pub mod execution;
pub mod message;
pub mod metrics;
pub mod provider;
pub mod reasoning;
pub mod retry;
pub mod router;
pub mod run_log;
pub mod state;
pub mod tool;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{AgentError, Result};
pub use message::{Conversation, Message, Role};
pub use metrics::{TokenMetrics, ToolMetrics};
pub use provider::{Completion, GenerationOptions, LlmProvider, ModelBinding};
pub use reasoning::{ResearchConfig, ResearchOutput, Researcher, ResearcherBuilder, RunFailure};
pub use retry::RetryPolicy;
pub use router::{Guardrails, Route};
pub use run_log::{RunLog, RunLogSink, RunStatus};
pub use state::{RunId, RunState};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};
