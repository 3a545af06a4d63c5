//! Generic utility primitives with zero domain knowledge.
//!
//! - `command` - Local process execution with captured output
//! - `io` - File I/O with consistent error handling
//! - `parser` - Text splitting and trimming helpers
//! - `shell` - Shell quoting for displayed command lines

pub mod command;
pub mod io;
pub mod parser;
pub mod shell;
