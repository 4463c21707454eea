//! Error types for wsopt
//!
//! This module defines the error types used throughout the wsopt crates.
//! All errors are derived from `thiserror` for convenient error handling
//! and automatic `From` implementations.
//!
//! Per-workspace failures never surface as these errors to the caller of a
//! processing cycle: they are converted into result codes at the calculator
//! and evaluator boundaries. These errors describe what the collaborators and
//! the configuration layer can report.
//!
//! # Example
//!
//! ```
//! use wsopt_core::error::{WsoptError, Result};
//!
//! fn example_function() -> Result<()> {
//!     // This will automatically convert serde_json::Error to WsoptError
//!     let _value: serde_json::Value = serde_json::from_str("{}")?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Main error type for wsopt operations
#[derive(Error, Debug)]
pub enum WsoptError {
    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// The monitoring service rejected or failed a query
    #[error("Monitoring query failed: {0}")]
    Monitoring(String),

    /// The compute control plane rejected or failed a call
    #[error("Control plane call failed: {0}")]
    ControlPlane(String),

    /// Invalid date or time value
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Convenience type alias for Results in wsopt
///
/// # Example
///
/// ```
/// use wsopt_core::Result;
///
/// fn process_data() -> Result<String> {
///     Ok("Processed successfully".to_string())
/// }
/// ```
pub type Result<T> = std::result::Result<T, WsoptError>;
