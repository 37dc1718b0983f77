//! Run Finalizer
//!
//! Builds the structured record of a finished (or failed) run and hands it to
//! a [`RunLogSink`]. Nothing here persists beyond the process.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use crate::error::{AgentError, Result};
use crate::metrics::{TokenMetrics, ToolMetrics};
use crate::state::{RunId, RunState};

/// How the run ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
}

/// Structured summary of one run
#[derive(Clone, Debug, Serialize)]
pub struct RunLog {
    pub run_id: RunId,
    pub loops: u32,
    pub tool_metrics: ToolMetrics,
    pub token_metrics: TokenMetrics,
    pub duration_sec: f64,
    pub started_at: DateTime<Utc>,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunLog {
    /// Snapshot the state; duration is measured now
    pub fn from_state(state: &RunState, status: RunStatus) -> Self {
        Self {
            run_id: state.run_id().clone(),
            loops: state.loop_count(),
            tool_metrics: state.tool_metrics().clone(),
            token_metrics: *state.token_metrics(),
            duration_sec: round2(state.elapsed().as_secs_f64()),
            started_at: state.started_at(),
            status,
            error: None,
        }
    }

    #[must_use]
    pub fn with_error(mut self, error: &AgentError) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

fn round2(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}

/// Destination for finalized run logs
pub trait RunLogSink: Send + Sync {
    fn record(&self, log: &RunLog) -> Result<()>;
}

/// Emit the log, never failing the run because of the sink
pub fn finalize(state: &RunState, status: RunStatus, sink: &dyn RunLogSink) -> RunLog {
    let log = RunLog::from_state(state, status);
    emit(&log, sink);
    log
}

pub(crate) fn emit(log: &RunLog, sink: &dyn RunLogSink) {
    if let Err(e) = sink.record(log) {
        tracing::warn!(run_id = %log.run_id, error = %e, "Run log sink failed");
    }
}

/// Writes each run log as a structured tracing event
#[derive(Debug, Default)]
pub struct TracingRunLogSink;

impl RunLogSink for TracingRunLogSink {
    fn record(&self, log: &RunLog) -> Result<()> {
        let json = serde_json::to_string(log)?;
        tracing::info!(
            run_id = %log.run_id,
            loops = log.loops,
            tool_calls = log.tool_metrics.total_calls(),
            total_tokens = log.token_metrics.total(),
            duration_sec = log.duration_sec,
            status = ?log.status,
            log = %json,
            "Agent run finished"
        );
        Ok(())
    }
}

/// Prints a banner and pretty JSON to stdout
#[derive(Debug, Default)]
pub struct StdoutRunLogSink;

impl RunLogSink for StdoutRunLogSink {
    fn record(&self, log: &RunLog) -> Result<()> {
        let json = serde_json::to_string_pretty(log)?;
        println!("\n===== AGENT RUN LOG =====");
        println!("{json}");
        Ok(())
    }
}

/// Keeps the most recent logs in memory
pub struct MemoryRunLogSink {
    logs: RwLock<VecDeque<RunLog>>,
    capacity: usize,
}

impl Default for MemoryRunLogSink {
    fn default() -> Self {
        Self::new(100)
    }
}

impl MemoryRunLogSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            logs: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Most recent first
    pub fn recent(&self, limit: usize) -> Result<Vec<RunLog>> {
        let logs = self
            .logs
            .read()
            .map_err(|_| AgentError::Sink("run log store poisoned".into()))?;
        Ok(logs.iter().rev().take(limit).cloned().collect())
    }

    pub fn get(&self, run_id: &RunId) -> Result<Option<RunLog>> {
        let logs = self
            .logs
            .read()
            .map_err(|_| AgentError::Sink("run log store poisoned".into()))?;
        Ok(logs.iter().find(|l| &l.run_id == run_id).cloned())
    }
}

impl RunLogSink for MemoryRunLogSink {
    fn record(&self, log: &RunLog) -> Result<()> {
        let mut logs = self
            .logs
            .write()
            .map_err(|_| AgentError::Sink("run log store poisoned".into()))?;
        if self.capacity > 0 && logs.len() >= self.capacity {
            logs.pop_front();
        }
        logs.push_back(log.clone());
        Ok(())
    }
}

/// Sends each log to several sinks
#[derive(Default)]
pub struct FanoutRunLogSink {
    sinks: Vec<Arc<dyn RunLogSink>>,
}

impl FanoutRunLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, sink: Arc<dyn RunLogSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl RunLogSink for FanoutRunLogSink {
    fn record(&self, log: &RunLog) -> Result<()> {
        for sink in &self.sinks {
            emit(log, sink.as_ref());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolArguments;

    struct BrokenSink;

    impl RunLogSink for BrokenSink {
        fn record(&self, _log: &RunLog) -> Result<()> {
            Err(AgentError::Sink("disk full".into()))
        }
    }

    #[test]
    fn test_rounding() {
        assert!((round2(1.23456) - 1.23).abs() < f64::EPSILON);
        assert!((round2(2.999) - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_log_fields() {
        let mut state = RunState::new("brief");
        state.loop_count = 2;
        state.tool_metrics.record_tool_call("think", &ToolArguments::new());
        state.token_metrics.record_token_usage(100, 20);

        let sink = MemoryRunLogSink::new(10);
        let log = finalize(&state, RunStatus::Completed, &sink);

        assert_eq!(&log.run_id, state.run_id());
        assert_eq!(log.loops, 2);
        assert_eq!(log.tool_metrics.total_calls(), 1);
        assert_eq!(log.token_metrics.total(), 120);
        assert!(log.duration_sec >= 0.0);

        let json = serde_json::to_value(&log).unwrap();
        for key in ["run_id", "loops", "tool_metrics", "token_metrics", "duration_sec"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert!(json.get("error").is_none());
        assert_eq!(sink.get(state.run_id()).unwrap().unwrap().loops, 2);
    }

    #[test]
    fn test_memory_sink_evicts_oldest() {
        let sink = MemoryRunLogSink::new(2);
        let states: Vec<_> = (0..3).map(|i| RunState::new(format!("brief {i}"))).collect();
        for state in &states {
            finalize(state, RunStatus::Completed, &sink);
        }

        let recent = sink.recent(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(&recent[0].run_id, states[2].run_id());
        assert!(sink.get(states[0].run_id()).unwrap().is_none());
    }

    #[test]
    fn test_failing_sink_is_swallowed() {
        let state = RunState::new("brief");
        let memory = Arc::new(MemoryRunLogSink::default());
        let fanout = FanoutRunLogSink::new()
            .with(Arc::new(BrokenSink))
            .with(memory.clone());

        let log = finalize(&state, RunStatus::Failed, &fanout);
        assert_eq!(log.status, RunStatus::Failed);
        assert_eq!(memory.recent(1).unwrap().len(), 1);
    }
}
