//! Interactive REPL: a hand-driven orchestration loop
//!
//! Each line names a tool and its argument; the envelope is printed back.

mod session;

pub use session::{ReplInput, ReplSession, parse_line};
