//! change_directory tool - builtin `cd` against the session

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::tools::{Tool, ToolContext, ToolResult};

/// Change the session's working directory
pub struct ChangeDirectoryTool;

#[async_trait]
impl Tool for ChangeDirectoryTool {
    fn name(&self) -> &'static str {
        "change_directory"
    }

    fn description(&self) -> &'static str {
        "Change the working directory used by later commands. No path means the home directory."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Target directory; relative, ~ and $VAR forms are resolved against the current one"
                }
            }
        })
    }

    fn input_from_argument(&self, argument: &str) -> Value {
        serde_json::json!({ "path": argument })
    }

    async fn execute(&self, input: Value, ctx: &mut ToolContext) -> ToolResult {
        debug!(?input, "ChangeDirectoryTool::execute: called");
        let path = input["path"].as_str().unwrap_or("");
        ctx.session_mut().change_directory(path).into()
    }
}
