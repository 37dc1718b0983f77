//! Guardrail Router
//!
//! Decides what happens after each reasoning step. Budget limits win over
//! the model's own request for more tools.

use serde::{Deserialize, Serialize};

use crate::state::RunState;

pub const DEFAULT_MAX_TOOL_CALLS: u64 = 3;
pub const DEFAULT_MAX_LOOPS: u32 = 3;

/// Next step of the loop
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    ExecuteTools,
    Compress,
}

/// Why the router picked its route
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteReason {
    ToolBudgetExhausted,
    LoopBudgetExhausted,
    ToolsRequested,
    FinalAnswer,
}

impl RouteReason {
    pub const fn route(self) -> Route {
        match self {
            Self::ToolsRequested => Route::ExecuteTools,
            Self::ToolBudgetExhausted | Self::LoopBudgetExhausted | Self::FinalAnswer => {
                Route::Compress
            }
        }
    }
}

impl std::fmt::Display for RouteReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ToolBudgetExhausted => "tool call budget exhausted",
            Self::LoopBudgetExhausted => "loop budget exhausted",
            Self::ToolsRequested => "model requested tools",
            Self::FinalAnswer => "model gave a final answer",
        };
        f.write_str(s)
    }
}

/// Iteration and call-count limits
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guardrails {
    pub max_tool_calls: u64,
    pub max_loops: u32,
}

impl Default for Guardrails {
    fn default() -> Self {
        Self {
            max_tool_calls: DEFAULT_MAX_TOOL_CALLS,
            max_loops: DEFAULT_MAX_LOOPS,
        }
    }
}

impl Guardrails {
    /// Pick the next route. First matching rule wins.
    pub fn evaluate(&self, state: &RunState) -> RouteReason {
        if state.tool_metrics().total_calls() >= self.max_tool_calls {
            RouteReason::ToolBudgetExhausted
        } else if state.loop_count() >= self.max_loops {
            RouteReason::LoopBudgetExhausted
        } else if !state.conversation().pending_tool_calls().is_empty() {
            RouteReason::ToolsRequested
        } else {
            RouteReason::FinalAnswer
        }
    }

    pub fn route(&self, state: &RunState) -> Route {
        self.evaluate(state).route()
    }
}
