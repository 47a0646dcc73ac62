//! run_command tool - execute shell commands in the session directory

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::shell::CommandResult;
use crate::tools::{Tool, ToolContext, ToolError, ToolResult};

/// Where a raw command line is routed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandRoute {
    /// Blank after trimming
    Empty,
    /// Leading `cd` token: handled in-process, with the rest as the path
    ChangeDirectory(String),
    /// Leading privileged keyword: run under a pty with the credential
    Privileged,
    /// Everything else: host shell with captured pipes
    Plain,
}

/// Classify a command line by its first whitespace-separated token
///
/// Only a whole-token match counts, so `cdrecord` and `sudoedit` stay
/// plain commands.
pub fn classify(command: &str, privileged_keyword: &str) -> CommandRoute {
    let trimmed = command.trim();
    let Some(first) = trimmed.split_whitespace().next() else {
        return CommandRoute::Empty;
    };

    if first == "cd" {
        return CommandRoute::ChangeDirectory(cd_target(trimmed["cd".len()..].trim()));
    }
    if first == privileged_keyword {
        return CommandRoute::Privileged;
    }
    CommandRoute::Plain
}

/// Unquote the argument of `cd` when it is a single shell word
///
/// `cd "My Dir"` and `cd My\ Dir` both target `My Dir`. Anything else
/// (several words, unbalanced quotes) is passed through as written.
fn cd_target(rest: &str) -> String {
    match shlex::split(rest) {
        Some(words) if words.len() <= 1 => words.into_iter().next().unwrap_or_default(),
        _ => rest.to_string(),
    }
}

/// Cut `text` to `max_chars` characters on a char boundary, with a marker
pub fn truncate_output(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text.to_string();
    }
    let cut = text.char_indices().nth(max_chars).map(|(i, _)| i).unwrap_or(text.len());
    format!("{}...\n[truncated, {} chars total]", &text[..cut], total)
}

/// Execute a shell command in the session's working directory
pub struct RunCommandTool;

impl RunCommandTool {
    fn render(result: CommandResult, max_chars: usize) -> ToolResult {
        let content = truncate_output(&result.to_string(), max_chars);
        if result.success() {
            ToolResult::success(content)
        } else {
            ToolResult::error(content)
        }
    }
}

#[async_trait]
impl Tool for RunCommandTool {
    fn name(&self) -> &'static str {
        "run_command"
    }

    fn description(&self) -> &'static str {
        "Execute a terminal command in the current working directory. `cd` changes the directory; \
         commands starting with the privileged keyword (sudo) get the password supplied automatically."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "Shell command to execute"
                }
            },
            "required": ["command"]
        })
    }

    fn input_from_argument(&self, argument: &str) -> Value {
        serde_json::json!({ "command": argument })
    }

    async fn execute(&self, input: Value, ctx: &mut ToolContext) -> ToolResult {
        debug!(?input, "RunCommandTool::execute: called");
        let command = input["command"].as_str().unwrap_or("");

        let max_chars = ctx.max_output_chars;
        let outcome = match classify(command, &ctx.privileged_keyword) {
            CommandRoute::Empty => {
                debug!("RunCommandTool::execute: empty command");
                return ToolError::EmptyInput.into();
            }
            CommandRoute::ChangeDirectory(path) => {
                debug!(%path, "RunCommandTool::execute: routing to change_directory");
                return ctx.session_mut().change_directory(&path).into();
            }
            CommandRoute::Privileged => {
                info!(%command, "Routing privileged command");
                ctx.privileged().run(command, ctx.working_directory()).await
            }
            CommandRoute::Plain => {
                debug!("RunCommandTool::execute: running plain command");
                ctx.commands().run(command, ctx.working_directory()).await
            }
        };

        match outcome {
            Ok(result) => {
                debug!(exit = ?result.exit(), "RunCommandTool::execute: command finished");
                Self::render(result, max_chars)
            }
            Err(e) => {
                debug!(%e, "RunCommandTool::execute: command could not run");
                e.into()
            }
        }
    }
}
