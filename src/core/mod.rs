// Public modules
pub mod action;
pub mod config;
pub mod engine;
pub mod error;
pub mod runner;
pub mod workflow;

// Public modules for CLI access
pub mod defaults;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
