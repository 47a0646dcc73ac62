//! CommandResult - the immutable outcome of one command request

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::tools::ToolError;

/// How a command ended
///
/// A missing exit status is `Unknown` and never counts as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    /// Process exited with this status code
    Exited(i32),
    /// Process was terminated by this signal
    Signaled(i32),
    /// Overall timeout elapsed; the process group was killed
    TimedOut,
    /// Process ended but no status could be observed
    Unknown,
}

impl ExitState {
    pub fn is_success(&self) -> bool {
        matches!(self, ExitState::Exited(0))
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            ExitState::Exited(code) => Some(*code),
            _ => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            ExitState::Exited(0) => "Success".to_string(),
            ExitState::Exited(code) => ToolError::NonZeroExit { code: *code }.to_string(),
            ExitState::Signaled(sig) => format!("Failed (killed by signal {})", sig),
            ExitState::TimedOut => "Timed out".to_string(),
            ExitState::Unknown => "Failed (exit status unknown)".to_string(),
        }
    }
}

/// Result of one command request
///
/// Built exactly once by the executor that ran it.
#[derive(Debug, Clone)]
pub struct CommandResult {
    command: String,
    working_dir: PathBuf,
    stdout: String,
    stderr: String,
    exit: ExitState,
    timeout: Option<Duration>,
    builtin: bool,
}

impl CommandResult {
    /// Result of a process that ran to completion (or was killed)
    pub fn completed(
        command: impl Into<String>,
        working_dir: impl Into<PathBuf>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        exit: ExitState,
    ) -> Self {
        let result = Self {
            command: command.into(),
            working_dir: working_dir.into(),
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit,
            timeout: None,
            builtin: false,
        };
        debug!(command = %result.command, exit = ?result.exit, "CommandResult::completed: called");
        result
    }

    /// Result of a process killed after `timeout`, keeping whatever it printed
    pub fn timed_out(
        command: impl Into<String>,
        working_dir: impl Into<PathBuf>,
        partial_output: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        debug!(?timeout, "CommandResult::timed_out: called");
        Self {
            command: command.into(),
            working_dir: working_dir.into(),
            stdout: partial_output.into(),
            stderr: String::new(),
            exit: ExitState::TimedOut,
            timeout: Some(timeout),
            builtin: false,
        }
    }

    /// Synthetic result of a builtin that never touched the shell (e.g. `cd`)
    pub fn builtin(
        command: impl Into<String>,
        working_dir: impl Into<PathBuf>,
        success: bool,
        message: impl Into<String>,
    ) -> Self {
        debug!(success, "CommandResult::builtin: called");
        Self {
            command: command.into(),
            working_dir: working_dir.into(),
            stdout: message.into(),
            stderr: String::new(),
            exit: ExitState::Exited(if success { 0 } else { 1 }),
            timeout: None,
            builtin: true,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn exit(&self) -> ExitState {
        self.exit
    }

    pub fn success(&self) -> bool {
        self.exit.is_success()
    }

    pub fn is_timed_out(&self) -> bool {
        self.exit == ExitState::TimedOut
    }

    /// The taxonomy entry for a failed result, if any
    pub fn error(&self) -> Option<ToolError> {
        match self.exit {
            ExitState::Exited(0) => None,
            ExitState::Exited(code) => Some(ToolError::NonZeroExit { code }),
            ExitState::TimedOut => Some(ToolError::Timeout {
                command: self.command.clone(),
                timeout: self.timeout.unwrap_or_default(),
            }),
            ExitState::Signaled(_) | ExitState::Unknown => None,
        }
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.builtin {
            return write!(f, "{}", self.stdout);
        }

        if let Some(err @ ToolError::Timeout { .. }) = self.error() {
            write!(f, "{}", err)?;
            if !self.stdout.is_empty() {
                write!(f, "\nPartial output:\n{}", self.stdout)?;
            }
            return Ok(());
        }

        writeln!(f, "Command: {}", self.command)?;
        writeln!(f, "Working directory: {}", self.working_dir.display())?;
        writeln!(f, "Status: {}", self.exit.label())?;

        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (true, true) => write!(f, "(no output)"),
            (false, true) => write!(f, "Output:\n{}", self.stdout),
            (true, false) => write!(f, "Errors:\n{}", self.stderr),
            (false, false) => write!(f, "Output:\n{}\nErrors:\n{}", self.stdout, self.stderr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_derived_from_exit_state() {
        assert!(ExitState::Exited(0).is_success());
        assert!(!ExitState::Exited(1).is_success());
        assert!(!ExitState::Signaled(9).is_success());
        assert!(!ExitState::TimedOut.is_success());
        assert!(!ExitState::Unknown.is_success());
    }

    #[test]
    fn test_render_success() {
        let result = CommandResult::completed("echo hello", "/tmp", "hello\n", "", ExitState::Exited(0));
        let text = result.to_string();

        assert!(text.contains("Command: echo hello"));
        assert!(text.contains("Working directory: /tmp"));
        assert!(text.contains("Status: Success"));
        assert!(text.contains("Output:\nhello"));
    }

    #[test]
    fn test_render_failure_with_stderr() {
        let result = CommandResult::completed("ls nope", "/tmp", "", "ls: nope: No such file", ExitState::Exited(2));
        let text = result.to_string();

        assert!(!result.success());
        assert!(text.contains("Status: Failed (exit code 2)"));
        assert!(text.contains("Errors:\nls: nope"));
        assert!(!text.contains("Output:"));
    }

    #[test]
    fn test_render_timeout_distinct_from_exit() {
        let result = CommandResult::timed_out("sleep 100", "/tmp", "", Duration::from_secs(60));

        assert!(result.is_timed_out());
        assert_eq!(result.exit().code(), None);
        assert!(result.to_string().contains("timed out after 60 seconds"));
        assert!(matches!(result.error(), Some(ToolError::Timeout { .. })));
    }

    #[test]
    fn test_builtin_renders_message_only() {
        let result = CommandResult::builtin("cd /tmp", "/tmp", true, "Changed directory to: /tmp");

        assert!(result.success());
        assert_eq!(result.to_string(), "Changed directory to: /tmp");
    }

    #[test]
    fn test_unknown_exit_is_failure() {
        let result = CommandResult::completed("sudo true", "/", "", "", ExitState::Unknown);

        assert!(!result.success());
        assert!(result.to_string().contains("exit status unknown"));
    }
}
