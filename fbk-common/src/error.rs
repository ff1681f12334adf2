//! Common error types for FBK

use thiserror::Error;

/// Common result type for FBK operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across FBK crates
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport error (wraps reqwest::Error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation attempted on a component that was already shut down
    #[error("Torn down: {0}")]
    TornDown(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
