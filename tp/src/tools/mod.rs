//! Tool system
//!
//! Tools are what the orchestration loop calls by name. Each call goes
//! through [`ToolExecutor::dispatch`] with the conversation's
//! [`ToolContext`] and comes back as a [`ToolResult`] envelope; no tool
//! failure escapes as an `Err`.

mod context;
mod error;
mod executor;
mod traits;

pub mod builtin;

pub use context::ToolContext;
pub use error::ToolError;
pub use executor::{ToolCall, ToolDefinition, ToolExecutor};
pub use traits::{Tool, ToolResult};
