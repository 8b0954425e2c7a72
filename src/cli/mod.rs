//! CLI support for fluent-query
//!
//! Provides programmatic access to the `fq` commands for embedding in other
//! tools.

mod eval;

pub use eval::{EvalOptions, EvalResult, execute_eval, execute_parse};

use std::io;

use thiserror::Error;

use crate::error::QueryError;

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The expression reads `$source` but no input was given
    #[error("No input provided. Use --input or pipe JSON to stdin.")]
    NoInput,
}
