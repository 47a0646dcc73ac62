//! list_directory tool - list files and directories

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::shell;
use crate::tools::{Tool, ToolContext, ToolResult};

/// List files and directories in a path
pub struct ListDirectoryTool;

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &'static str {
        "list_directory"
    }

    fn description(&self) -> &'static str {
        "List files and directories in a path. Default is the current directory."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory path relative to the working directory (default: .)"
                }
            }
        })
    }

    fn input_from_argument(&self, argument: &str) -> Value {
        serde_json::json!({ "path": argument })
    }

    async fn execute(&self, input: Value, ctx: &mut ToolContext) -> ToolResult {
        debug!(?input, "ListDirectoryTool::execute: called");
        let path = match input["path"].as_str().map(str::trim) {
            Some(p) if !p.is_empty() => p,
            _ => ".",
        };

        let full_path = ctx.session().resolve(path);
        debug!(?full_path, "ListDirectoryTool::execute: resolved path");

        match shell::list(&full_path).await {
            Ok(listing) => {
                debug!(empty = listing.is_empty(), "ListDirectoryTool::execute: listed");
                ToolResult::success(listing.to_string())
            }
            Err(e) => {
                debug!(%e, "ListDirectoryTool::execute: failed to list");
                ToolResult::error(format!("Error listing directory '{}': {}", full_path.display(), e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::Session;
    use std::fs;
    use tempfile::tempdir;

    fn context(dir: &std::path::Path) -> ToolContext {
        ToolContext::new(Session::new(dir).unwrap())
    }

    #[tokio::test]
    async fn test_list_directory_basic() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("file1.txt"), "").unwrap();
        fs::write(temp.path().join("file2.txt"), "").unwrap();
        fs::create_dir(temp.path().join("subdir")).unwrap();
        let mut ctx = context(temp.path());

        let result = ListDirectoryTool.execute(serde_json::json!({}), &mut ctx).await;

        assert!(!result.is_error);
        assert!(result.content.starts_with("Contents of '"));
        assert!(result.content.contains("\nfile1.txt"));
        assert!(result.content.contains("\nfile2.txt"));
        assert!(result.content.contains("\nsubdir/"));
    }

    #[tokio::test]
    async fn test_list_directory_with_path() {
        let temp = tempdir().unwrap();
        let subdir = temp.path().join("subdir");
        fs::create_dir(&subdir).unwrap();
        fs::write(subdir.join("nested.txt"), "").unwrap();
        let mut ctx = context(temp.path());

        let result = ListDirectoryTool
            .execute(serde_json::json!({"path": "subdir"}), &mut ctx)
            .await;

        assert!(!result.is_error);
        assert!(result.content.contains("nested.txt"));
    }

    #[tokio::test]
    async fn test_list_directory_empty_is_success() {
        let temp = tempdir().unwrap();
        let mut ctx = context(temp.path());

        let result = ListDirectoryTool.execute(serde_json::json!({"path": ""}), &mut ctx).await;

        assert!(!result.is_error);
        assert!(result.content.starts_with("Directory '"));
        assert!(result.content.ends_with("' is empty."));
    }

    #[tokio::test]
    async fn test_list_directory_missing_is_error() {
        let temp = tempdir().unwrap();
        let mut ctx = context(temp.path());

        let result = ListDirectoryTool
            .execute(serde_json::json!({"path": "missing"}), &mut ctx)
            .await;

        assert!(result.is_error);
        assert!(result.content.starts_with("Error listing directory"));
        assert!(result.content.contains("no such file or directory"));
    }
}
