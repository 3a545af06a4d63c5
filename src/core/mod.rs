// Public modules
pub mod build;
pub mod config;
pub mod deploy;
pub mod error;
pub mod platform;
pub mod rename;
pub mod rewrite;
pub mod scratch;
pub mod suffix;
pub mod tree;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
