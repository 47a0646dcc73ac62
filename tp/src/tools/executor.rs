//! ToolExecutor - routes tool calls by name and normalizes their results

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use super::builtin::{
    CalculatorTool, ChangeDirectoryTool, CurrentDirectoryTool, DetectSystemTool, ListDirectoryTool, RunCommandTool,
    SystemInfoTool, WebSearchTool,
};
use super::{Tool, ToolContext, ToolError, ToolResult};

/// A structured tool call: name plus JSON input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub input: Value,
}

/// Name, description, and input schema of a registered tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// The tool dispatcher
///
/// Adds no timeout of its own; every tool bounds itself.
pub struct ToolExecutor {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolExecutor {
    /// Create executor with the standard tool set
    pub fn standard() -> Self {
        debug!("ToolExecutor::standard: called");
        let mut executor = Self::empty();

        // Session and shell tools
        executor.add_tool(Box::new(ChangeDirectoryTool));
        executor.add_tool(Box::new(RunCommandTool));
        executor.add_tool(Box::new(ListDirectoryTool));
        executor.add_tool(Box::new(CurrentDirectoryTool));

        // Collaborators
        executor.add_tool(Box::new(WebSearchTool));
        executor.add_tool(Box::new(CalculatorTool));
        executor.add_tool(Box::new(DetectSystemTool));
        executor.add_tool(Box::new(SystemInfoTool));

        executor
    }

    /// Create an empty executor (for testing)
    pub fn empty() -> Self {
        debug!("ToolExecutor::empty: called");
        Self { tools: HashMap::new() }
    }

    /// Add a tool to the executor
    pub fn add_tool(&mut self, tool: Box<dyn Tool>) {
        debug!(tool_name = %tool.name(), "ToolExecutor::add_tool: called");
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Get tool definitions, sorted by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        debug!("ToolExecutor::definitions: called");
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Dispatch `(tool_name, argument)` and return the uniform envelope
    pub async fn dispatch(&self, name: &str, argument: &str, ctx: &mut ToolContext) -> ToolResult {
        debug!(%name, %argument, "ToolExecutor::dispatch: called");
        match self.tools.get(name) {
            Some(tool) => {
                let input = tool.input_from_argument(argument);
                tool.execute(input, ctx).await
            }
            None => {
                debug!("ToolExecutor::dispatch: unknown tool");
                ToolError::UnknownTool { name: name.to_string() }.into()
            }
        }
    }

    /// Execute a structured tool call
    pub async fn execute(&self, tool_call: &ToolCall, ctx: &mut ToolContext) -> ToolResult {
        debug!(tool_name = %tool_call.name, "ToolExecutor::execute: called");
        match self.tools.get(&tool_call.name) {
            Some(tool) => {
                debug!("ToolExecutor::execute: tool found, executing");
                tool.execute(tool_call.input.clone(), ctx).await
            }
            None => {
                debug!("ToolExecutor::execute: unknown tool");
                ToolError::UnknownTool {
                    name: tool_call.name.clone(),
                }
                .into()
            }
        }
    }

    /// Check if a tool exists
    pub fn has_tool(&self, name: &str) -> bool {
        debug!(%name, "ToolExecutor::has_tool: called");
        self.tools.contains_key(name)
    }

    /// Get tool names, sorted
    pub fn tool_names(&self) -> Vec<String> {
        debug!("ToolExecutor::tool_names: called");
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ToolExecutor {
    fn default() -> Self {
        Self::standard()
    }
}
