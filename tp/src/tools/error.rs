//! Tool error types

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during tool execution
///
/// None of these reach the orchestration loop as a fault: every variant is
/// rendered into an error `ToolResult` at the tool boundary. `Timeout` and
/// `ProcessSpawnFailure` are never retried automatically.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Error: Empty command provided")]
    EmptyInput,

    #[error("no such file or directory: {}", path.display())]
    PathNotFound { path: PathBuf },

    #[error("permission denied: {}", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("credential unavailable: could not read {}: {reason}", path.display())]
    CredentialUnavailable { path: PathBuf, reason: String },

    #[error("Command '{command}' timed out after {} seconds", timeout.as_secs())]
    Timeout { command: String, timeout: Duration },

    #[error("Error executing command '{command}': {reason}")]
    ProcessSpawnFailure { command: String, reason: String },

    #[error("Failed (exit code {code})")]
    NonZeroExit { code: i32 },

    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("{0}")]
    InvalidArgument(String),
}

impl ToolError {
    /// Map an io error on `path` into the lister/cd taxonomy
    pub fn from_io(path: PathBuf, err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::PathNotFound { path },
        }
    }
}
