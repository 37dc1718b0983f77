//! Reflection Tool

use async_trait::async_trait;

use agent_core::{Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema, tool::ParameterSchema};

pub const THINK_TOOL: &str = "think";

/// Lets the model pause and assess progress; echoes the reflection back
#[derive(Debug, Default)]
pub struct ThinkTool;

#[async_trait]
impl Tool for ThinkTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: THINK_TOOL.into(),
            description: "Record a strategic reflection on the research process. Use after reviewing \
                search results to assess findings, identify gaps, and decide whether to keep searching \
                or answer."
                .into(),
            parameters: vec![ParameterSchema::required(
                "reflection",
                "string",
                "Findings so far, gaps, quality of evidence, and next steps",
            )],
            external: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let reflection = call.require_str("reflection")?;
        Ok(ToolResult::success(THINK_TOOL, format!("Reflection recorded: {reflection}")))
    }
}
