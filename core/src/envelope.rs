//! Success/error envelope returned by every API client call.
//!
//! # Design
//! `ApiResponse` is an enum, so a completed call carries either data or an
//! error and never both or neither. Decoding is a pure function over an
//! `HttpResponse`:
//!
//! - 2xx: the body must decode as `T`; a mismatch is an `ApiError`.
//! - non-2xx: the body is decoded as `ErrorInfo`. Bodies that are not a
//!   recognizable error document (empty, HTML, other JSON) are replaced by an
//!   `ErrorInfo` synthesized from the status code.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::http::HttpResponse;

/// Error document returned by the service on a failed call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorInfo {
    pub message: String,
    pub code: String,
    /// Per-field validation messages, when the service reports them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<HashMap<String, String>>,
}

impl ErrorInfo {
    /// Builds an error from the bare status when the body is unusable.
    pub fn from_status(status: u16, body: &str) -> Self {
        let body = body.trim();
        let message = if body.is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {body}")
        };
        Self {
            message,
            code: status.to_string(),
            fields: None,
        }
    }
}

/// Outcome of one API call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
    Data(T),
    Error(ErrorInfo),
}

impl<T> ApiResponse<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            ApiResponse::Data(data) => Some(data),
            ApiResponse::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        match self {
            ApiResponse::Data(_) => None,
            ApiResponse::Error(error) => Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ApiResponse::Data(_))
    }

    pub fn into_result(self) -> Result<T, ErrorInfo> {
        match self {
            ApiResponse::Data(data) => Ok(data),
            ApiResponse::Error(error) => Err(error),
        }
    }
}

/// Decode a response whose success body is a `T`.
pub fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<ApiResponse<T>, ApiError> {
    if !response.is_success() {
        return Ok(ApiResponse::Error(decode_error(response)));
    }
    serde_json::from_str(&response.body)
        .map(ApiResponse::Data)
        .map_err(|e| ApiError::Deserialization(e.to_string()))
}

/// Decode a response whose success carries no payload (cancel/delete).
pub fn decode_flag(response: &HttpResponse) -> ApiResponse<bool> {
    if response.is_success() {
        ApiResponse::Data(true)
    } else {
        ApiResponse::Error(decode_error(response))
    }
}

fn decode_error(response: &HttpResponse) -> ErrorInfo {
    match serde_json::from_str::<ErrorInfo>(&response.body) {
        Ok(error) => error,
        Err(e) => {
            tracing::warn!(status = response.status, error = %e, "error body is not an error document");
            ErrorInfo::from_status(response.status, &response.body)
        }
    }
}
