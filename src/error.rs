// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::directory::DirectoryError;

/// Body shared by every enumeration-sensitive failure.
pub const GENERIC_DENIAL_MESSAGE: &str =
    "Request could not be completed. Please verify your details and try again.";

/// The one denial returned when an admin already exists *and* when the user
/// cannot be found. Both branches return this value, so their responses
/// cannot drift apart.
pub const GENERIC_DENIAL: ApiError = ApiError::Denied;

/// Failures of the bootstrap endpoint, as seen by the caller.
///
/// Structural failures (method, token, size, JSON, email) are each
/// distinguishable. `Denied` covers every state-dependent refusal. `Internal`
/// covers everything else and never carries driver detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    // 400 Bad Request
    InvalidJson,
    InvalidEmail,

    // 401 Unauthorized
    Unauthorized,

    // 403 Forbidden
    Denied,

    // 405 Method Not Allowed
    MethodNotAllowed,

    // 413 Payload Too Large
    PayloadTooLarge,

    // 500 Internal Server Error
    Internal,
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidJson => 400,
            ApiError::InvalidEmail => 400,
            ApiError::Unauthorized => 401,
            ApiError::Denied => 403,
            ApiError::MethodNotAllowed => 405,
            ApiError::PayloadTooLarge => 413,
            ApiError::Internal => 500,
        }
    }

    /// Client-safe error message
    pub fn message(&self) -> &'static str {
        match self {
            ApiError::InvalidJson => "Invalid JSON body",
            ApiError::InvalidEmail => "A valid email address is required",
            ApiError::Unauthorized => "Unauthorized",
            ApiError::Denied => GENERIC_DENIAL_MESSAGE,
            ApiError::MethodNotAllowed => "Method not allowed",
            ApiError::PayloadTooLarge => "Payload too large",
            ApiError::Internal => "An internal error occurred",
        }
    }

    pub fn to_json(&self) -> Value {
        json!({ "error": self.message() })
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        // Log the real error but return generic message
        tracing::error!("Directory error during admin bootstrap: {}", err);
        ApiError::Internal
    }
}

impl From<crate::email::InvalidEmail> for ApiError {
    fn from(_: crate::email::InvalidEmail) -> Self {
        ApiError::InvalidEmail
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
