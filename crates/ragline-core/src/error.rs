//! Error types for ragline domain values.

use thiserror::Error;

/// Core error type for ragline domain operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid document status: {0}")]
    InvalidStatus(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias using ragline's core Error.
pub type Result<T> = std::result::Result<T, Error>;
