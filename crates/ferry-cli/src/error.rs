//! CLI error types.

use thiserror::Error;

/// Errors that abort the command before a report can be printed.
#[derive(Debug, Error)]
pub enum CliError {
    /// Error from the migration engine.
    #[error(transparent)]
    Core(#[from] ferry_core::Error),

    /// Error writing output.
    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
}
