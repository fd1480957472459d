//! Generic utility primitives with zero domain knowledge.
//!
//! - `command` - Command execution with error handling
//! - `io` - File I/O with consistent error handling
//! - `shell` - Shell quoting for display and word splitting

pub mod command;
pub mod io;
pub mod shell;
