//! Tool trait definition

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::ToolError;
use super::context::ToolContext;
use crate::shell::CommandResult;

/// A tool the orchestration loop can call by name
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (matches the name the orchestration loop routes on)
    fn name(&self) -> &'static str;

    /// Human-readable description
    fn description(&self) -> &'static str;

    /// JSON Schema for input parameters
    fn input_schema(&self) -> Value;

    /// Map a bare string argument onto this tool's input object
    ///
    /// Tools without parameters ignore the argument.
    fn input_from_argument(&self, _argument: &str) -> Value {
        Value::Object(Default::default())
    }

    /// Execute the tool against the session held by `ctx`
    async fn execute(&self, input: Value, ctx: &mut ToolContext) -> ToolResult;
}

/// Result of a tool execution: the uniform `(content, is_error)` envelope
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(content: impl Into<String>) -> Self {
        debug!("ToolResult::success: called");
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    /// Create an error result
    pub fn error(content: impl Into<String>) -> Self {
        debug!("ToolResult::error: called");
        Self {
            content: content.into(),
            is_error: true,
        }
    }

    pub fn is_success(&self) -> bool {
        !self.is_error
    }

    /// `(text, success)` as handed back to the orchestration loop
    pub fn into_envelope(self) -> (String, bool) {
        let success = self.is_success();
        (self.content, success)
    }
}

impl From<CommandResult> for ToolResult {
    fn from(result: CommandResult) -> Self {
        let content = result.to_string();
        if result.success() {
            Self::success(content)
        } else {
            Self::error(content)
        }
    }
}

impl From<ToolError> for ToolResult {
    fn from(err: ToolError) -> Self {
        Self::error(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::ExitState;

    #[test]
    fn test_tool_result_success() {
        let result = ToolResult::success("Changed directory to: /tmp");
        assert!(!result.is_error);
        assert_eq!(result.content, "Changed directory to: /tmp");
    }

    #[test]
    fn test_tool_result_error() {
        let result = ToolResult::error("Unknown tool: nope");
        assert!(result.is_error);
        assert_eq!(result.into_envelope(), ("Unknown tool: nope".to_string(), false));
    }

    #[test]
    fn test_from_failed_command_result() {
        let result: ToolResult = CommandResult::completed("false", "/tmp", "", "", ExitState::Exited(1)).into();
        assert!(result.is_error);
        assert!(result.content.contains("Failed (exit code 1)"));
    }

    #[test]
    fn test_from_tool_error() {
        let result: ToolResult = ToolError::EmptyInput.into();
        assert!(result.is_error);
        assert_eq!(result.content, "Error: Empty command provided");
    }
}
