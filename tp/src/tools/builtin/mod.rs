//! Built-in tools

mod calculator;
mod change_directory;
mod current_directory;
mod detect_system;
mod list_directory;
mod run_command;
mod search;
mod system_info;

pub use calculator::{CalculatorTool, evaluate};
pub use change_directory::ChangeDirectoryTool;
pub use current_directory::CurrentDirectoryTool;
pub use detect_system::{DetectSystemTool, PACKAGE_MANAGERS, detect_system, uname};
pub use list_directory::ListDirectoryTool;
pub use run_command::{CommandRoute, RunCommandTool, classify, truncate_output};
pub use search::{WebSearchTool, render_instant_answer};
pub use system_info::SystemInfoTool;
