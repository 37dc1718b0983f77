//! Run State
//!
//! Everything one research run knows about itself. Created once per brief,
//! mutated in place by the loop steps, discarded after finalization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::message::Conversation;
use crate::metrics::{TokenMetrics, ToolMetrics};

/// Unique run identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// State of a single research run
#[derive(Debug)]
pub struct RunState {
    run_id: RunId,
    started_at: DateTime<Utc>,
    start: Instant,
    research_topic: String,

    /// Append-only message history
    pub(crate) conversation: Conversation,
    pub(crate) tool_metrics: ToolMetrics,
    pub(crate) token_metrics: TokenMetrics,
    pub(crate) loop_count: u32,
    pub(crate) compressed_research: Option<String>,
    pub(crate) raw_notes: Vec<String>,
}

impl RunState {
    /// Fresh state seeded with the brief as the first user turn
    pub fn new(brief: impl Into<String>) -> Self {
        let brief = brief.into();
        Self {
            run_id: RunId::new(),
            started_at: Utc::now(),
            start: Instant::now(),
            conversation: Conversation::from_brief(brief.clone()),
            research_topic: brief,
            tool_metrics: ToolMetrics::new(),
            token_metrics: TokenMetrics::new(),
            loop_count: 0,
            compressed_research: None,
            raw_notes: Vec::new(),
        }
    }

    /// Fresh state that carries note blocks from earlier runs
    pub fn with_prior_notes(brief: impl Into<String>, raw_notes: Vec<String>) -> Self {
        let mut state = Self::new(brief);
        state.raw_notes = raw_notes;
        state
    }

    pub const fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn research_topic(&self) -> &str {
        &self.research_topic
    }

    pub const fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub const fn tool_metrics(&self) -> &ToolMetrics {
        &self.tool_metrics
    }

    pub const fn token_metrics(&self) -> &TokenMetrics {
        &self.token_metrics
    }

    /// Number of reasoning steps taken so far
    pub const fn loop_count(&self) -> u32 {
        self.loop_count
    }

    pub fn compressed_research(&self) -> Option<&str> {
        self.compressed_research.as_deref()
    }

    pub fn raw_notes(&self) -> &[String] {
        &self.raw_notes
    }
}
