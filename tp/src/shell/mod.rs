//! Shell runtime - command execution, working-directory tracking, listings
//!
//! Everything here operates on an explicit [`Session`]; there is no
//! process-wide working directory. Callers serialize calls per session.

pub mod command;
pub mod credential;
pub mod listing;
pub mod path;
pub mod policy;
pub mod privileged;
pub mod pty;
pub mod result;
pub mod session;

pub use command::CommandExecutor;
pub use credential::CredentialStore;
pub use listing::{DirectoryEntry, EntryKind, Listing, list};
pub use path::resolve;
pub use policy::{InteractionPolicy, PromptAction, PromptRule};
pub use privileged::{PrivilegedCommandExecutor, PromptState, PromptTimeouts};
pub use pty::{NativePty, PtySession, ReadEvent};
pub use result::{CommandResult, ExitState};
pub use session::Session;
