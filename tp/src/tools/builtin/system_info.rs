//! get_system_info tool

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::detect_system::{PACKAGE_MANAGERS, detect_system, uname};
use crate::tools::{Tool, ToolContext, ToolResult};

/// Report system, kernel release, and available package managers
pub struct SystemInfoTool;

#[async_trait]
impl Tool for SystemInfoTool {
    fn name(&self) -> &'static str {
        "get_system_info"
    }

    fn description(&self) -> &'static str {
        "Get system information including OS, kernel, and available package managers."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _input: Value, _ctx: &mut ToolContext) -> ToolResult {
        debug!("SystemInfoTool::execute: called");
        let mut info = vec![format!("System: {}", detect_system().await)];

        if let Some(kernel) = uname("-r").await {
            info.push(format!("Kernel: {}", kernel));
        }

        let available: Vec<&str> = PACKAGE_MANAGERS
            .iter()
            .copied()
            .filter(|pm| which::which(pm).is_ok())
            .collect();
        debug!(?available, "SystemInfoTool::execute: package managers");
        if !available.is_empty() {
            info.push(format!("Available package managers: {}", available.join(", ")));
        }

        ToolResult::success(info.join("\n"))
    }
}
