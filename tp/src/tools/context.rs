//! ToolContext - execution context for tools

use std::path::Path;
use tracing::debug;

use crate::config::{Config, SearchConfig};
use crate::shell::{
    CommandExecutor, CredentialStore, InteractionPolicy, PrivilegedCommandExecutor, PromptTimeouts, Session,
};

/// Execution context for tools - scoped to a single conversation
///
/// The context owns the [`Session`], so every tool call that could touch the
/// working directory borrows it mutably. That makes one in-flight command per
/// session a compile-time property rather than a locking convention.
pub struct ToolContext {
    session: Session,

    commands: CommandExecutor,

    privileged: PrivilegedCommandExecutor,

    /// Leading token that routes `run_command` to the privileged executor
    pub privileged_keyword: String,

    /// Command output beyond this many characters is truncated
    pub max_output_chars: usize,

    /// Settings for the `web_search` collaborator
    pub search: SearchConfig,
}

impl ToolContext {
    /// Create a context with default settings
    ///
    /// The credential file resolves against the session's starting directory.
    pub fn new(session: Session) -> Self {
        debug!(working_directory = ?session.working_directory(), "ToolContext::new: called");
        let config = Config::default();
        let credentials = CredentialStore::new(session.working_directory().join(&config.privileged.credential_file));
        let privileged = PrivilegedCommandExecutor::new(
            config.shell.clone(),
            credentials,
            InteractionPolicy::default(),
            PromptTimeouts::from(&config.privileged),
        );
        Self::assemble(session, &config, privileged)
    }

    /// Create a context from loaded config
    ///
    /// A relative `credential-file` resolves against `base_dir`, normally the
    /// directory the process started in.
    pub fn from_config(config: &Config, session: Session, base_dir: &Path) -> Result<Self, regex::Error> {
        debug!(?base_dir, "ToolContext::from_config: called");
        let privileged = PrivilegedCommandExecutor::from_config(config, base_dir)?;
        Ok(Self::assemble(session, config, privileged))
    }

    fn assemble(session: Session, config: &Config, privileged: PrivilegedCommandExecutor) -> Self {
        Self {
            session,
            commands: CommandExecutor::from_config(config),
            privileged,
            privileged_keyword: config.privileged.keyword.clone(),
            max_output_chars: config.command.max_output_chars,
            search: config.search.clone(),
        }
    }

    /// Replace the privileged executor
    pub fn with_privileged(mut self, privileged: PrivilegedCommandExecutor) -> Self {
        self.privileged = privileged;
        self
    }

    /// Replace the plain command executor
    pub fn with_commands(mut self, commands: CommandExecutor) -> Self {
        self.commands = commands;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn working_directory(&self) -> &Path {
        self.session.working_directory()
    }

    pub fn commands(&self) -> &CommandExecutor {
        &self.commands
    }

    pub fn privileged(&self) -> &PrivilegedCommandExecutor {
        &self.privileged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_new_uses_defaults() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(Session::new(temp.path()).unwrap());

        assert_eq!(ctx.privileged_keyword, "sudo");
        assert_eq!(ctx.max_output_chars, 30_000);
        assert_eq!(ctx.working_directory(), temp.path().canonicalize().unwrap());
    }

    #[test]
    fn test_from_config_carries_settings() {
        let temp = tempdir().unwrap();
        let mut config = Config::default();
        config.privileged.keyword = "doas".to_string();
        config.command.max_output_chars = 10;
        config.privileged.credential_file = PathBuf::from("secret.txt");

        let ctx = ToolContext::from_config(&config, Session::new(temp.path()).unwrap(), temp.path()).unwrap();
        assert_eq!(ctx.privileged_keyword, "doas");
        assert_eq!(ctx.max_output_chars, 10);
    }

    #[test]
    fn test_from_config_rejects_bad_pattern() {
        let temp = tempdir().unwrap();
        let mut config = Config::default();
        config.privileged.password_prompts = vec!["(".to_string()];

        assert!(ToolContext::from_config(&config, Session::new(temp.path()).unwrap(), temp.path()).is_err());
    }
}
