// ABOUTME: Unified error handling system with standard error codes and HTTP responses
// ABOUTME: Every handler returns AppResult<T>; AppError implements Axum's IntoResponse directly

//! Error taxonomy for the credential server.
//!
//! `ErrorCode` is the closed, client-visible vocabulary. `AppError` pairs a
//! code with a human message and an optional request id used to correlate
//! the response with server-side logs. Internal failure detail never
//! crosses the HTTP boundary; only `sanitized_message()` does.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

/// Closed set of client-visible error codes, mapped 1:1 to HTTP status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed JSON, missing field, invalid enum value or name format.
    InvalidInput,
    /// Missing or invalid bearer token, or an expired session.
    Unauthorized,
    /// Authenticated identity lacks the required role.
    Forbidden,
    /// Named resource does not exist.
    NotFound,
    /// Duplicate name on create, or delete blocked by a dependent row.
    Conflict,
    /// Caller's IP is under a rate-limit lockout.
    RateLimited,
    /// Storage, crypto, or CA failure. Logged with full context server-side.
    Internal,
}

impl ErrorCode {
    /// HTTP status code this error kind maps to.
    #[must_use]
    pub const fn http_status(self) -> StatusCode {
        match self {
            Self::InvalidInput => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable identifier sent on the wire as `code`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::RateLimited => "rate_limited",
            Self::Internal => "internal",
        }
    }
}

/// An error produced anywhere in the server, ready to become an HTTP response.
#[derive(Debug, Clone)]
pub struct AppError {
    code: ErrorCode,
    message: String,
    request_id: Option<String>,
}

impl AppError {
    /// Construct an error with the given code and message.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            request_id: None,
        }
    }

    /// Attach a request id for log correlation. Not sent to the client.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Convenience constructor for `InvalidInput`.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Convenience constructor for `Unauthorized`.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Convenience constructor for `Forbidden`.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Convenience constructor for `NotFound`.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Convenience constructor for `Conflict`.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Convenience constructor for `RateLimited`.
    #[must_use]
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::RateLimited, message)
    }

    /// Convenience constructor for `Internal`. `source` is logged, never sent.
    #[must_use]
    pub fn internal(source: impl fmt::Display) -> Self {
        tracing::error!(error = %source, "internal error");
        Self::new(ErrorCode::Internal, "internal server error")
    }

    /// The error code this error carries.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Message safe to return to the client: never includes internal detail.
    #[must_use]
    pub fn sanitized_message(&self) -> &str {
        match self.code {
            ErrorCode::Internal => "internal server error",
            _ => &self.message,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::internal(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: &'a str,
    code: &'a str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.code == ErrorCode::Internal {
            tracing::error!(
                request_id = self.request_id.as_deref().unwrap_or("-"),
                message = %self.message,
                "request failed with internal error"
            );
        }
        let body = ErrorResponse {
            error: self.sanitized_message(),
            code: self.code.as_str(),
        };
        (self.code.http_status(), Json(body)).into_response()
    }
}

/// Result type returned by every handler and most component methods.
pub type AppResult<T> = Result<T, AppError>;
