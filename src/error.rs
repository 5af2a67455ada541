//! Error types for the Sleuth library.
//!
//! All fallible operations return [`SleuthError`] through the crate-wide
//! [`Result`] alias. A failed structural alignment is *not* an error: "no
//! match" is an empty result.
//!
//! # Examples
//!
//! ```
//! use sleuth::error::{Result, SleuthError};
//!
//! fn compile() -> Result<()> {
//!     Err(SleuthError::invalid_pattern("pattern has no matchable words"))
//! }
//!
//! match compile() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Sleuth operations.
#[derive(Error, Debug)]
pub enum SleuthError {
    /// A search phrase was rejected at registration (multiple roots,
    /// unknown wildcard entity type, no matchable words).
    #[error("Invalid search phrase: {0}")]
    InvalidPattern(String),

    /// An explicit document filter named a label that is not registered.
    #[error("Unknown document: {0}")]
    UnknownDocument(String),

    /// A search phrase handle that is no longer (or never was) registered.
    #[error("Unknown search phrase handle: {0}")]
    UnknownSearchPhrase(u64),

    /// The ontology source could not be read or is malformed.
    #[error("Ontology load error: {0}")]
    OntologyLoad(String),

    /// The parse handed over by the front end violates the input contract.
    #[error("Invalid parsed input: {0}")]
    InvalidInput(String),

    /// A batch operation was cancelled by its caller.
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// The worker pool could not be created.
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// I/O errors (ontology and configuration files).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for operations that may fail with SleuthError.
pub type Result<T> = std::result::Result<T, SleuthError>;

impl SleuthError {
    /// Create a new invalid search phrase error.
    pub fn invalid_pattern<S: Into<String>>(msg: S) -> Self {
        SleuthError::InvalidPattern(msg.into())
    }

    /// Create a new unknown document error.
    pub fn unknown_document<S: Into<String>>(label: S) -> Self {
        SleuthError::UnknownDocument(label.into())
    }

    /// Create a new ontology load error.
    pub fn ontology<S: Into<String>>(msg: S) -> Self {
        SleuthError::OntologyLoad(msg.into())
    }

    /// Create a new invalid input error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        SleuthError::InvalidInput(msg.into())
    }

    /// Create a new cancelled error.
    pub fn cancelled<S: Into<String>>(msg: S) -> Self {
        SleuthError::Cancelled(msg.into())
    }

    /// Create a new thread pool error.
    pub fn thread_pool<S: Into<String>>(msg: S) -> Self {
        SleuthError::ThreadPool(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = SleuthError::invalid_pattern("two roots");
        assert_eq!(error.to_string(), "Invalid search phrase: two roots");

        let error = SleuthError::unknown_document("42");
        assert_eq!(error.to_string(), "Unknown document: 42");

        let error = SleuthError::ontology("cycle at dog");
        assert_eq!(error.to_string(), "Ontology load error: cycle at dog");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = SleuthError::from(io_error);

        match error {
            SleuthError::Io(_) => {}
            _ => panic!("Expected IO error variant"),
        }
    }
}
