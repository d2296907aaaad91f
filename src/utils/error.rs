//! Error types and handling
//!
//! Common error types used across the application.

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum CamError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Detection error: {0}")]
    Detection(String),

    #[error("Sink unavailable: {0}")]
    SinkUnavailable(String),

    #[error("Sink error: {0}")]
    Sink(String),
}

/// Result type alias using CamError
pub type CamResult<T> = Result<T, CamError>;
