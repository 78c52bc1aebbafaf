//! Error types for the rideshare API client.
//!
//! # Design
//! A non-2xx answer from the service is *not* an `ApiError`: it is returned
//! as `ApiResponse::Error` so callers branch on it like any other result.
//! `ApiError` is reserved for failures that abort the call path: invalid
//! construction arguments, transport failures, and a success response whose
//! body does not match the declared type.

use thiserror::Error;

/// Errors that abort a client call or client construction.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required constructor argument was empty or whitespace.
    #[error("parameter is required: {0}")]
    MissingParameter(&'static str),

    /// The transport failed before a response was received.
    #[error("transport failed: {0}")]
    Transport(String),

    /// A 2xx response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),
}
