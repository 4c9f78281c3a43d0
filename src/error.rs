//! Error types for sheetconv
//!
//! This module provides error handling for the library, including:
//! - Pre-flight errors that reject a `start` call before a request exists
//!   (validation failures, unknown formats, a busy session)
//! - Transport-level errors raised while talking to the conversion backend
//! - A `Result` alias used throughout the crate
//!
//! Failures of a conversion that has already been accepted are *not* errors
//! in this sense: they settle through
//! [`ConversionOutcome`](crate::types::ConversionOutcome) so that `start`
//! never throws past its boundary once a request is in flight.

use thiserror::Error;

/// Result type alias for sheetconv operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for sheetconv
///
/// These errors are only ever returned *before* a conversion request is
/// accepted. Once a request is in flight, its failures are delivered as a
/// [`ConversionOutcome`](crate::types::ConversionOutcome).
#[derive(Debug, Error)]
pub enum Error {
    /// Selected file was rejected by the validator
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A conversion is already in flight for this session
    #[error("conversion already in flight")]
    Busy,

    /// Requested output format is not present in the catalog
    #[error("unknown format: {0}")]
    UnknownFormat(String),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "upload_chunk_size")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error outside a conversion attempt (e.g., building a client)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Validation errors produced by [`FileValidator`](crate::validator::FileValidator)
///
/// Both variants are recoverable: the user may pick another file and try
/// again. Rules are evaluated in declaration order and short-circuit, so a
/// file that is both oversized and of an unsupported type reports `TooLarge`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// File exceeds the configured maximum size
    #[error("file is too large: {size} bytes exceeds the {max_size} byte limit")]
    TooLarge {
        /// Actual size of the selected file in bytes
        size: u64,
        /// Configured maximum size in bytes
        max_size: u64,
    },

    /// File extension is not in the accepted set
    #[error("unsupported file type: {extension:?}")]
    UnsupportedType {
        /// The offending extension, lowercased; empty when the name has no dot
        extension: String,
    },
}

/// Transport-level failures while transferring a conversion request
///
/// All variants map to [`FailureReason::Network`](crate::types::FailureReason)
/// in the delivered outcome, except aborts caused by an explicit cancellation,
/// which settle as `Cancelled`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection could not be established or was lost mid-transfer
    #[error("connection failed: {0}")]
    Connect(String),

    /// Request exceeded the configured timeout
    #[error("request timed out")]
    Timeout,

    /// Transfer was aborted before a reply arrived
    #[error("transfer aborted")]
    Aborted,
}

impl TransportError {
    /// Classify a reqwest error into a transport error
    pub(crate) fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else {
            // Refused connections and body errors mid-transfer both count as
            // a lost connection
            TransportError::Connect(err.to_string())
        }
    }
}
