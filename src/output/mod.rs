//! Output module for persisting and summarizing run results
//!
//! This module handles:
//! - Writing a [`RunResult`] as JSON
//! - Loading a previously written result
//! - Printing run statistics to the console

mod json;
pub mod stats;

pub use json::{read_json, write_json};
pub use stats::{format_summary, print_summary};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error writing {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to serialize run result: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
