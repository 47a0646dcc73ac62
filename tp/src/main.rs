//! Termpilot - tool-invocation runtime for shell agents
//!
//! CLI entry point: dispatch single tool calls or drive an interactive loop.

use std::env;
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use eyre::{Context, Result};
use tracing::{debug, info};

use termpilot::cli::{Cli, Command, OutputFormat};
use termpilot::config::Config;
use termpilot::repl::ReplSession;
use termpilot::shell::Session;
use termpilot::tools::{ToolContext, ToolExecutor};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("termpilot")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("termpilot.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    // Relative credential paths resolve against where the process started,
    // not against the session directory
    let start_dir = env::current_dir().context("Failed to read current directory")?;
    let session_dir = cli.cwd.clone().unwrap_or_else(|| start_dir.clone());
    let session = Session::new(&session_dir)
        .with_context(|| format!("Invalid starting directory {}", session_dir.display()))?;
    info!(working_directory = ?session.working_directory(), "Session started");

    let mut ctx = ToolContext::from_config(&config, session, &start_dir).context("Invalid prompt pattern")?;
    let executor = ToolExecutor::standard();

    debug!(command = ?cli.command, "main: dispatching command");
    let success = match cli.command {
        Some(Command::Call { format, tool, argument }) => {
            cmd_call(&executor, &mut ctx, &tool, &argument.join(" "), format).await?
        }
        Some(Command::Exec { format, command }) => {
            cmd_call(&executor, &mut ctx, "run_command", &command.join(" "), format).await?
        }
        Some(Command::Tools { format }) => cmd_tools(&executor, format)?,
        Some(Command::Repl) | None => {
            ReplSession::new(executor, ctx).run().await?;
            true
        }
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}

/// Dispatch one tool call and print the envelope; returns its success flag
async fn cmd_call(
    executor: &ToolExecutor,
    ctx: &mut ToolContext,
    tool: &str,
    argument: &str,
    format: OutputFormat,
) -> Result<bool> {
    debug!(%tool, %argument, ?format, "cmd_call: called");
    let (content, success) = executor.dispatch(tool, argument, ctx).await.into_envelope();

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "tool": tool,
                "argument": argument,
                "content": content,
                "success": success,
                "working_directory": ctx.working_directory().display().to_string(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => println!("{}", content),
    }
    Ok(success)
}

/// Print the registered tools
fn cmd_tools(executor: &ToolExecutor, format: OutputFormat) -> Result<bool> {
    debug!(?format, "cmd_tools: called");
    let definitions = executor.definitions();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&definitions)?),
        OutputFormat::Text => {
            for def in definitions {
                println!("{:24} {}", def.name, def.description);
            }
        }
    }
    Ok(true)
}
