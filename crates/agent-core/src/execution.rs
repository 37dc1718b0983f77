//! Tool Execution Step
//!
//! Runs every pending tool request of the latest assistant turn. Each call
//! produces its own `Result`, so one failure never aborts its siblings.
//! Metrics and conversation appends happen afterwards, in request order.

use futures::future::join_all;
use std::time::Duration;

use crate::error::Result;
use crate::message::{Conversation, Message};
use crate::metrics::ToolMetrics;
use crate::retry::with_timeout;
use crate::tool::{ToolCall, ToolRegistry, ToolResult};

/// Outcome of one tool request
#[derive(Debug)]
pub struct CallOutcome {
    pub call: ToolCall,
    pub result: Result<ToolResult>,
}

impl CallOutcome {
    /// Tool message answering this call; failures carry an `Error:` prefix
    pub fn to_message(&self) -> Message {
        match &self.result {
            Ok(result) if result.success => {
                Message::tool(result.output.clone(), self.call.id.clone()).with_name(&self.call.name)
            }
            Ok(result) => Message::tool(format!("Error: {}", result.output), self.call.id.clone())
                .with_name(&self.call.name)
                .mark_error(),
            Err(e) => Message::tool(format!("Error: {e}"), self.call.id.clone())
                .with_name(&self.call.name)
                .mark_error(),
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(&self.result, Ok(r) if r.success)
    }
}

/// Results of one batch, in request order
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub outcomes: Vec<CallOutcome>,
}

impl BatchOutcome {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.succeeded()).count()
    }
}

/// Executes tool batches against a registry
pub struct ToolExecutor<'a> {
    registry: &'a ToolRegistry,
    timeout: Duration,
    parallel: bool,
}

impl<'a> ToolExecutor<'a> {
    pub const fn new(registry: &'a ToolRegistry, timeout: Duration, parallel: bool) -> Self {
        Self {
            registry,
            timeout,
            parallel,
        }
    }

    async fn run_one(&self, call: ToolCall) -> CallOutcome {
        let result = with_timeout(&call.name, self.timeout, self.registry.execute(&call)).await;
        match &result {
            Ok(r) => tracing::debug!(tool = %call.name, id = %call.id, success = r.success, "Tool finished"),
            Err(e) => tracing::warn!(tool = %call.name, id = %call.id, error = %e, "Tool failed"),
        }
        CallOutcome { call, result }
    }

    /// Run all calls; the returned outcomes match the order of `calls`
    pub async fn run_batch(&self, calls: Vec<ToolCall>) -> BatchOutcome {
        let outcomes = if self.parallel {
            join_all(calls.into_iter().map(|call| self.run_one(call))).await
        } else {
            let mut outcomes = Vec::with_capacity(calls.len());
            for call in calls {
                outcomes.push(self.run_one(call).await);
            }
            outcomes
        };
        BatchOutcome { outcomes }
    }

    /// Execute the pending requests of the latest assistant message.
    ///
    /// Reads: `conversation` (tail). Mutates: `tool_metrics`, `conversation`.
    pub async fn step(&self, conversation: &mut Conversation, metrics: &mut ToolMetrics) -> BatchOutcome {
        let calls = conversation.pending_tool_calls().to_vec();
        let batch = self.run_batch(calls).await;

        for outcome in &batch.outcomes {
            metrics.record_tool_call(&outcome.call.name, &outcome.call.arguments);
        }
        conversation.extend(batch.outcomes.iter().map(CallOutcome::to_message));

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;
    use crate::testing::{EchoTool, FailingTool, SlowTool, query_call};

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool::new("quick_search"));
        registry.register(EchoTool::new("deep_search"));
        registry.register(FailingTool::new("broken"));
        registry.register(SlowTool::new("slow", Duration::from_secs(60)));
        registry
    }

    fn turn(calls: Vec<ToolCall>) -> Conversation {
        let mut conv = Conversation::from_brief("Research JAMF");
        conv.push(Message::assistant("").with_tool_calls(calls));
        conv
    }

    #[tokio::test]
    async fn test_two_calls_to_different_tools() {
        let registry = registry();
        let mut conv = turn(vec![
            query_call("quick_search", "jamf", "a"),
            query_call("deep_search", "jamf market", "b"),
        ]);
        let mut metrics = ToolMetrics::new();

        let batch = ToolExecutor::new(&registry, Duration::from_secs(5), true)
            .step(&mut conv, &mut metrics)
            .await;

        assert_eq!(batch.len(), 2);
        assert_eq!(conv.len(), 4);
        assert_eq!(metrics.total_calls(), 2);
        assert_eq!(metrics.count_for("quick_search"), 1);
        assert_eq!(metrics.count_for("deep_search"), 1);

        let tail = &conv.messages()[2..];
        assert!(tail.iter().all(|m| m.role == Role::Tool));
        assert_eq!(tail[0].tool_call_id(), Some("a"));
        assert_eq!(tail[0].content, "quick_search: jamf");
        assert_eq!(tail[1].tool_call_id(), Some("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_order_preserved_regardless_of_completion() {
        let mut registry = ToolRegistry::new();
        registry.register(SlowTool::new("slow", Duration::from_millis(50)));
        registry.register(EchoTool::new("fast"));

        let mut conv = turn(vec![
            query_call("slow", "one", "1"),
            query_call("fast", "two", "2"),
            query_call("slow", "three", "3"),
        ]);
        let mut metrics = ToolMetrics::new();

        ToolExecutor::new(&registry, Duration::from_secs(5), true)
            .step(&mut conv, &mut metrics)
            .await;

        let ids: Vec<_> = conv.messages()[2..].iter().filter_map(Message::tool_call_id).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        let logged: Vec<_> = metrics.calls().iter().map(|c| c.tool.as_str()).collect();
        assert_eq!(logged, vec!["slow", "fast", "slow"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_do_not_abort_siblings() {
        let registry = registry();
        let mut conv = turn(vec![
            query_call("broken", "x", "1"),
            query_call("missing_tool", "x", "2"),
            query_call("slow", "x", "3"),
            query_call("quick_search", "x", "4"),
        ]);
        let mut metrics = ToolMetrics::new();

        let batch = ToolExecutor::new(&registry, Duration::from_secs(1), true)
            .step(&mut conv, &mut metrics)
            .await;

        assert_eq!(batch.failures(), 3);
        assert_eq!(metrics.total_calls(), 4);

        let results = &conv.messages()[2..];
        assert_eq!(results.len(), 4);
        assert!(results[0].is_error() && results[0].content.starts_with("Error:"));
        assert!(results[1].content.contains("Tool not found"));
        assert!(results[2].content.contains("Timed out"));
        assert!(!results[3].is_error());
        assert_eq!(results[3].content, "quick_search: x");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sub_second_tool_timeout_reported_in_millis() {
        let registry = registry();
        let mut conv = turn(vec![query_call("slow", "x", "1")]);
        let mut metrics = ToolMetrics::new();

        ToolExecutor::new(&registry, Duration::from_millis(500), true)
            .step(&mut conv, &mut metrics)
            .await;

        let result = &conv.messages()[2];
        assert!(result.is_error());
        assert!(result.content.contains("Timed out after 500ms: slow"));
    }

    #[tokio::test]
    async fn test_sequential_mode_matches_parallel() {
        let registry = registry();
        let mut conv = turn(vec![
            query_call("quick_search", "a", "1"),
            query_call("deep_search", "b", "2"),
        ]);
        let mut metrics = ToolMetrics::new();

        ToolExecutor::new(&registry, Duration::from_secs(5), false)
            .step(&mut conv, &mut metrics)
            .await;

        let contents: Vec<_> = conv.messages()[2..].iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["quick_search: a", "deep_search: b"]);
    }
}
