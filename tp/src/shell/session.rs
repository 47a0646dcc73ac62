//! Session - the per-conversation working directory

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::path;
use super::result::CommandResult;
use crate::tools::ToolError;

/// Mutable state shared by every tool call in one conversation
///
/// `working_directory` is always an existing absolute directory. Only
/// [`Session::change_directory`] mutates it.
#[derive(Debug, Clone)]
pub struct Session {
    working_directory: PathBuf,
}

impl Session {
    /// Create a session rooted at `dir`, which must be an existing directory
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, ToolError> {
        let dir = dir.as_ref();
        debug!(?dir, "Session::new: called");
        let canonical = dir.canonicalize().map_err(|e| ToolError::from_io(dir.to_path_buf(), &e))?;
        if !canonical.is_dir() {
            debug!("Session::new: not a directory");
            return Err(ToolError::PathNotFound { path: canonical });
        }
        Ok(Self {
            working_directory: canonical,
        })
    }

    /// Create a session rooted at the process's current directory
    pub fn from_current_dir() -> Result<Self, ToolError> {
        let cwd = std::env::current_dir().map_err(|e| ToolError::from_io(PathBuf::from("."), &e))?;
        Self::new(cwd)
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    /// Resolve a path argument against this session's working directory
    pub fn resolve(&self, arg: &str) -> PathBuf {
        path::resolve(arg, &self.working_directory)
    }

    /// Builtin `cd`: change the working directory without spawning a shell
    ///
    /// An empty argument targets the home directory. On failure the session
    /// is left unchanged.
    pub fn change_directory(&mut self, argument: &str) -> CommandResult {
        debug!(%argument, "Session::change_directory: called");
        let argument = argument.trim();
        let command = if argument.is_empty() {
            "cd".to_string()
        } else {
            format!("cd {}", argument)
        };

        let target = if argument.is_empty() {
            match dirs::home_dir() {
                Some(home) => home,
                None => {
                    debug!("Session::change_directory: no home directory");
                    return CommandResult::builtin(
                        command,
                        &self.working_directory,
                        false,
                        "cd: error changing directory: home directory unknown",
                    );
                }
            }
        } else {
            self.resolve(argument)
        };

        match target.canonicalize() {
            Ok(canonical) if canonical.is_dir() => {
                info!(from = ?self.working_directory, to = ?canonical, "Changed working directory");
                self.working_directory = canonical;
                CommandResult::builtin(
                    command,
                    &self.working_directory,
                    true,
                    format!("Changed directory to: {}", self.working_directory.display()),
                )
            }
            _ => {
                debug!(?target, "Session::change_directory: target is not a directory");
                CommandResult::builtin(
                    command,
                    &self.working_directory,
                    false,
                    format!("cd: {}", ToolError::PathNotFound { path: target }),
                )
            }
        }
    }
}
