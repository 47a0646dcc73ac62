//! get_current_directory tool

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::tools::{Tool, ToolContext, ToolResult};

/// Report the session's working directory
pub struct CurrentDirectoryTool;

#[async_trait]
impl Tool for CurrentDirectoryTool {
    fn name(&self) -> &'static str {
        "get_current_directory"
    }

    fn description(&self) -> &'static str {
        "Get the current working directory."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _input: Value, ctx: &mut ToolContext) -> ToolResult {
        debug!("CurrentDirectoryTool::execute: called");
        ToolResult::success(format!("Current working directory: {}", ctx.working_directory().display()))
    }
}
