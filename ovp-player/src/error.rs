//! Error types for ovp-player
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. Scheduling-time conditions (resolution misses, pipeline
//! rejections, stale polls) are recovered locally and never surface here;
//! these variants cover init and misuse only.

use thiserror::Error;

/// Main error type for the ovp-player module
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Manifest or track resolution errors at session init
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// Media pipeline errors
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using ovp-player Error
pub type Result<T> = std::result::Result<T, Error>;
