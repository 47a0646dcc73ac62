//! Termpilot - a tool-invocation runtime for conversational shell agents
//!
//! An orchestration loop (a language model, or a person at the `tp` REPL)
//! decides which tool to call; termpilot executes it and hands back a
//! uniform `(text, success)` envelope. The runtime runs shell commands,
//! including privileged ones that prompt for a password, and tracks a
//! per-session working directory. It answers confirmation prompts and
//! enforces hard timeouts.
//!
//! # Modules
//!
//! - [`shell`] - sessions, path resolution, listings, command executors
//! - [`tools`] - the `Tool` trait, dispatcher, and builtin tools
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface
//! - [`repl`] - interactive line-oriented loop

pub mod cli;
pub mod config;
pub mod repl;
pub mod shell;
pub mod tools;

pub use config::Config;
pub use shell::{CommandResult, ExitState, Session};
pub use tools::{Tool, ToolContext, ToolError, ToolExecutor, ToolResult};
