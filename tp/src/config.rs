//! Termpilot configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::shell::policy::{
    DEFAULT_COMPLETION_PROMPTS, DEFAULT_CONFIRMATION_PROMPTS, DEFAULT_PASSWORD_PROMPTS, InteractionPolicy,
};

/// Main Termpilot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shell interpreter used for `-c <command>`
    pub shell: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Plain command execution
    pub command: CommandConfig,

    /// Privileged (pty-driven) command execution
    pub privileged: PrivilegedConfig,

    /// Web search collaborator
    pub search: SearchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shell: "/bin/sh".to_string(),
            log_level: None,
            command: CommandConfig::default(),
            privileged: PrivilegedConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration before use
    ///
    /// Compiles every prompt pattern and rejects zero timeouts so that a bad
    /// config fails at startup rather than mid-command.
    pub fn validate(&self) -> Result<()> {
        InteractionPolicy::from_config(&self.privileged).context("Invalid prompt pattern in privileged config")?;

        let timeouts = [
            ("command.timeout-ms", self.command.timeout_ms),
            ("privileged.timeout-ms", self.privileged.timeout_ms),
            ("privileged.password-timeout-ms", self.privileged.password_timeout_ms),
            ("privileged.confirmation-timeout-ms", self.privileged.confirmation_timeout_ms),
            ("search.timeout-ms", self.search.timeout_ms),
        ];
        for (key, value) in timeouts {
            if value == 0 {
                return Err(eyre::eyre!("{} must be greater than zero", key));
            }
        }

        if self.privileged.keyword.trim().is_empty() {
            return Err(eyre::eyre!("privileged.keyword must not be empty"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .termpilot.yml
        let local_config = PathBuf::from(".termpilot.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/termpilot/termpilot.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("termpilot").join("termpilot.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load just the log level, before logging is set up
    ///
    /// Errors are swallowed; the full load reports them later.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates: Vec<PathBuf> = match config_path {
            Some(path) => vec![path.clone()],
            None => {
                let mut paths = vec![PathBuf::from(".termpilot.yml")];
                if let Some(config_dir) = dirs::config_dir() {
                    paths.push(config_dir.join("termpilot").join("termpilot.yml"));
                }
                paths
            }
        };

        candidates
            .iter()
            .find(|p| p.exists())
            .and_then(|p| Self::load_from_file(p).ok())
            .and_then(|c| c.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Plain command execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    /// Timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Output longer than this many characters is truncated
    #[serde(rename = "max-output-chars")]
    pub max_output_chars: usize,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 60_000,
            max_output_chars: 30_000,
        }
    }
}

impl CommandConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Privileged execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivilegedConfig {
    /// Leading token that marks a command as privileged
    pub keyword: String,

    /// Overall timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// How long to watch for a password prompt
    #[serde(rename = "password-timeout-ms")]
    pub password_timeout_ms: u64,

    /// Per-iteration wait in the confirmation loop
    #[serde(rename = "confirmation-timeout-ms")]
    pub confirmation_timeout_ms: u64,

    /// File holding the credential; relative paths resolve against the
    /// directory the process started in
    #[serde(rename = "credential-file")]
    pub credential_file: PathBuf,

    #[serde(rename = "password-prompts")]
    pub password_prompts: Vec<String>,

    #[serde(rename = "confirmation-prompts")]
    pub confirmation_prompts: Vec<String>,

    #[serde(rename = "completion-prompts")]
    pub completion_prompts: Vec<String>,

    /// Response written to confirmation prompts
    #[serde(rename = "affirmative-response")]
    pub affirmative_response: String,
}

impl Default for PrivilegedConfig {
    fn default() -> Self {
        let owned = |patterns: &[&str]| -> Vec<String> { patterns.iter().map(|p| p.to_string()).collect() };
        Self {
            keyword: "sudo".to_string(),
            timeout_ms: 120_000,
            password_timeout_ms: 10_000,
            confirmation_timeout_ms: 30_000,
            credential_file: PathBuf::from("sudopass.txt"),
            password_prompts: owned(DEFAULT_PASSWORD_PROMPTS),
            confirmation_prompts: owned(DEFAULT_CONFIRMATION_PROMPTS),
            completion_prompts: owned(DEFAULT_COMPLETION_PROMPTS),
            affirmative_response: "y".to_string(),
        }
    }
}

impl PrivilegedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn password_timeout(&self) -> Duration {
        Duration::from_millis(self.password_timeout_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.confirmation_timeout_ms)
    }
}

/// Web search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Instant-answer endpoint; the query is appended as `q`
    pub endpoint: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Maximum related topics to include
    #[serde(rename = "max-related")]
    pub max_related: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.duckduckgo.com/".to_string(),
            timeout_ms: 10_000,
            max_related: 3,
        }
    }
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
