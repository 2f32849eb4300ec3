//! Engine-facing error taxonomy.
//!
//! These are the only error kinds that cross the engine/transport boundary
//! (spec §7). Transports map `ApiErrorKind` to whatever status code or
//! protocol-level error shape they speak; the core never picks a status code
//! itself.

use thiserror::Error;

/// The closed taxonomy of error kinds the core can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    InvalidRequest,
    NotFound,
    TooManyRequests,
    ServerError,
    Unauthenticated,
}

impl ApiErrorKind {
    /// The snake_case wire name for this kind (spec §7's taxonomy spelling),
    /// used as `ResponseError.code` in a `failed` Response.
    pub fn wire_code(self) -> &'static str {
        match self {
            ApiErrorKind::InvalidRequest => "invalid_request",
            ApiErrorKind::NotFound => "not_found",
            ApiErrorKind::TooManyRequests => "too_many_requests",
            ApiErrorKind::ServerError => "server_error",
            ApiErrorKind::Unauthenticated => "unauthenticated",
        }
    }
}

/// A structured, user-visible failure.
#[derive(Debug, Error, Clone)]
#[error("{kind:?}: {message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
    /// The request parameter this error is about, when applicable
    /// (e.g. `"model"`, `"previous_response_id"`).
    pub param: Option<String>,
}

impl ApiError {
    pub fn invalid_request(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::InvalidRequest,
            message: message.into(),
            param: Some(param.into()),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::NotFound,
            message: message.into(),
            param: None,
        }
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::TooManyRequests,
            message: message.into(),
            param: None,
        }
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::ServerError,
            message: message.into(),
            param: None,
        }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Unauthenticated,
            message: message.into(),
            param: None,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::server_error(format!("json error: {e}"))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::server_error(format!("backend request failed: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
