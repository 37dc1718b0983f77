//! Run Metrics
//!
//! Tool-call and token counters for a single research run. Fields are only
//! mutable through the `record_*` methods so the totals always agree with
//! their parts.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::provider::TokenUsage;
use crate::tool::ToolArguments;

/// One entry of the ordered tool call log
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolCallRecord {
    pub tool: String,
    pub args: ToolArguments,
}

/// Tool invocation counters
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ToolMetrics {
    total_calls: u64,
    by_tool: BTreeMap<String, u64>,
    calls: Vec<ToolCallRecord>,
}

impl ToolMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one call to `name`
    pub fn record_tool_call(&mut self, name: &str, args: &ToolArguments) {
        self.total_calls += 1;
        *self.by_tool.entry(name.to_string()).or_insert(0) += 1;
        self.calls.push(ToolCallRecord {
            tool: name.to_string(),
            args: args.clone(),
        });
    }

    pub const fn total_calls(&self) -> u64 {
        self.total_calls
    }

    pub const fn by_tool(&self) -> &BTreeMap<String, u64> {
        &self.by_tool
    }

    /// Calls in the order they were made
    pub fn calls(&self) -> &[ToolCallRecord] {
        &self.calls
    }

    pub fn count_for(&self, name: &str) -> u64 {
        self.by_tool.get(name).copied().unwrap_or(0)
    }
}

/// Token counters; `total` is always `input + output`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TokenMetrics {
    input: u64,
    output: u64,
    total: u64,
}

impl TokenMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn record_token_usage(&mut self, input_tokens: u64, output_tokens: u64) {
        self.input += input_tokens;
        self.output += output_tokens;
        self.total = self.input + self.output;
    }

    /// Record a response's usage; missing usage counts as zero
    pub fn record(&mut self, usage: Option<TokenUsage>) {
        let usage = usage.unwrap_or_default();
        self.record_token_usage(usage.input_tokens, usage.output_tokens);
    }

    pub const fn input(&self) -> u64 {
        self.input
    }

    pub const fn output(&self) -> u64 {
        self.output
    }

    pub const fn total(&self) -> u64 {
        self.total
    }
}
