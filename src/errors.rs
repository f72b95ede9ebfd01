/*!
 * Error types for the pagetran application.
 *
 * The dispatch pipeline distinguishes retryable per-batch failures
 * (`NetworkError`, `ParseError`) from the fatal run-level `DispatchError`.
 * Everything is defined with the thiserror crate; application glue wraps
 * these in `AppError` or `anyhow::Error`.
 */

use thiserror::Error;

/// Errors that can occur when talking to the translation backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    /// The request did not complete within the configured wait
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// Error returned by the backend itself
    #[error("Backend responded with error: {status_code} - {message}")]
    Status {
        /// HTTP status code
        status_code: u16,
        /// Error body returned by the backend
        message: String,
    },

    /// A 2xx response whose body lacks the expected text field
    #[error("Unexpected response body: {0}")]
    InvalidBody(String),
}

/// The backend reply matched none of the extraction patterns
#[derive(Error, Debug, Clone, PartialEq)]
#[error("No page translations found in backend reply ({reply_chars} chars): {excerpt}")]
pub struct ParseError {
    /// Length of the raw reply in characters
    pub reply_chars: usize,
    /// Leading part of the reply, for diagnostics
    pub excerpt: String,
}

impl ParseError {
    /// Build a parse error carrying a short excerpt of the offending reply
    pub fn from_reply(raw: &str) -> Self {
        Self {
            reply_chars: raw.chars().count(),
            excerpt: raw.chars().take(200).collect(),
        }
    }
}

/// A single failed attempt at translating one batch
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BatchError {
    /// Transport or backend failure
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// The reply could not be mapped back to pages
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Run-level errors raised by the dispatch scheduler
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// The operator aborted the run while handling an escalated batch
    #[error("Run aborted by operator at batch {} (pages {:?})", .batch_index + 1, .page_numbers)]
    Aborted {
        /// Index of the batch whose escalation led to the abort
        batch_index: usize,
        /// Pages covered by that batch
        page_numbers: Vec<u32>,
    },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from the dispatch pipeline
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
