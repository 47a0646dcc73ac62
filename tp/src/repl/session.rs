//! REPL session management

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use crate::tools::{ToolContext, ToolExecutor, ToolResult};

/// One parsed REPL line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplInput {
    /// Blank line
    Nothing,
    /// `:tools`
    Tools,
    /// `:help`
    Help,
    /// `:quit`, `:q`, or `:exit`
    Quit,
    /// Any other `:` command
    UnknownMeta(String),
    /// `<tool> [argument]`
    Call { tool: String, argument: String },
}

/// Parse a line: meta commands start with `:`, anything else is a tool call
///
/// The argument is everything after the tool name, trimmed, so
/// `run_command ls  -la` passes `ls  -la` through untouched.
pub fn parse_line(line: &str) -> ReplInput {
    let line = line.trim();
    if line.is_empty() {
        return ReplInput::Nothing;
    }

    if let Some(meta) = line.strip_prefix(':') {
        return match meta.trim() {
            "tools" | "t" => ReplInput::Tools,
            "help" | "h" => ReplInput::Help,
            "quit" | "q" | "exit" => ReplInput::Quit,
            other => ReplInput::UnknownMeta(other.to_string()),
        };
    }

    let (tool, argument) = match line.split_once(char::is_whitespace) {
        Some((tool, rest)) => (tool, rest.trim()),
        None => (line, ""),
    };
    ReplInput::Call {
        tool: tool.to_string(),
        argument: argument.to_string(),
    }
}

/// Interactive REPL session
pub struct ReplSession {
    executor: ToolExecutor,
    ctx: ToolContext,
}

impl ReplSession {
    /// Create a new REPL session
    pub fn new(executor: ToolExecutor, ctx: ToolContext) -> Self {
        Self { executor, ctx }
    }

    /// Run the REPL main loop
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();

        // Create readline editor for proper line editing
        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let prompt = format!(
                "{} {} ",
                self.ctx.working_directory().display().to_string().dimmed(),
                ">".bright_green()
            );

            match rl.readline(&prompt) {
                Ok(line) => {
                    let input = parse_line(&line);
                    if input != ReplInput::Nothing {
                        let _ = rl.add_history_entry(line.trim());
                    }
                    if !self.handle(input).await {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C - just show new prompt
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D - exit
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Handle one input; false means quit
    async fn handle(&mut self, input: ReplInput) -> bool {
        debug!(?input, "ReplSession::handle: called");
        match input {
            ReplInput::Nothing => {}
            ReplInput::Tools => self.print_tools(),
            ReplInput::Help => self.print_help(),
            ReplInput::Quit => return false,
            ReplInput::UnknownMeta(cmd) => {
                println!("{} Unknown command: :{}", "?".yellow(), cmd);
                println!("Type {} for available commands", ":help".yellow());
            }
            ReplInput::Call { tool, argument } => {
                let result = self.executor.dispatch(&tool, &argument, &mut self.ctx).await;
                print_result(&result);
            }
        }
        true
    }

    /// Print welcome message
    fn print_welcome(&self) {
        println!();
        println!("{}", "Termpilot Interactive REPL".bright_cyan().bold());
        println!("Working directory: {}", self.ctx.working_directory().display());
        println!("Type {} for help, {} to quit", ":help".yellow(), ":quit".yellow());
        println!();
    }

    /// Print help message
    fn print_help(&self) {
        println!();
        println!("{}", "Usage:".bright_cyan());
        println!("  {:24} Call a tool", "<tool> [argument]".yellow());
        println!("  {:24} List tools", ":tools".yellow());
        println!("  {:24} Show this help", ":help".yellow());
        println!("  {:24} Exit the REPL", ":quit".yellow());
        println!();
        println!("{}", "Examples:".bright_cyan());
        println!("  run_command ls -la");
        println!("  change_directory ~/src");
        println!("  calculator (2 + 3) * 4");
        println!();
    }

    fn print_tools(&self) {
        println!();
        println!("{}", "Available Tools:".bright_cyan());
        for def in self.executor.definitions() {
            println!("  {:24} {}", def.name.yellow(), def.description);
        }
        println!();
    }
}

fn print_result(result: &ToolResult) {
    if result.is_error {
        println!("{} {}", "✗".red(), result.content);
    } else {
        println!("{} {}", "✓".green(), result.content);
    }
}
