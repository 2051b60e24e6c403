//! Helper types and traits for cleaner route handlers.
//!
//! Converts core errors and `Option`/`Result` values into HTTP error
//! responses so routes can use `?` throughout.

use axum::http::StatusCode;
use langue_core::{Error, ErrorKind};
use tracing::{error, warn};

/// Standard result type for route handlers.
pub type RouteResult<T> = Result<T, (StatusCode, String)>;

/// HTTP status for each error category
pub const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidArgument | ErrorKind::Extraction => StatusCode::BAD_REQUEST,
        ErrorKind::SizeLimitExceeded => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorKind::Session => StatusCode::NOT_FOUND,
        ErrorKind::TranslationService | ErrorKind::Service => StatusCode::BAD_GATEWAY,
        ErrorKind::Render | ErrorKind::Config | ErrorKind::Io => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Turn a core error into a route error, logging server-side failures.
pub fn error_response(e: &Error) -> (StatusCode, String) {
    let status = status_for(e.kind());
    if status.is_server_error() {
        error!("Request failed: {}", e);
    } else {
        warn!("Request rejected: {}", e);
    }
    (status, e.to_string())
}

/// Extension trait for core results.
pub trait CoreResultExt<T> {
    /// Maps the error to the status matching its kind.
    fn or_status(self) -> RouteResult<T>;
}

impl<T> CoreResultExt<T> for langue_core::Result<T> {
    fn or_status(self) -> RouteResult<T> {
        self.map_err(|e| error_response(&e))
    }
}

/// Extension trait for converting `Result<T, E>` to `RouteResult<T>`.
pub trait ResultExt<T, E: std::fmt::Display> {
    /// Converts the error to 500 Internal Server Error.
    fn or_internal_error(self) -> RouteResult<T>;

    /// Converts the error to 400 Bad Request.
    fn or_bad_request(self) -> RouteResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T, E> for Result<T, E> {
    fn or_internal_error(self) -> RouteResult<T> {
        self.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
    }

    fn or_bad_request(self) -> RouteResult<T> {
        self.map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
    }
}

/// Extension trait for required form fields.
pub trait OptionExt<T> {
    /// Returns the contained value or a 400 Bad Request naming the field.
    fn or_missing(self, field: &str) -> RouteResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_missing(self, field: &str) -> RouteResult<T> {
        self.ok_or_else(|| (StatusCode::BAD_REQUEST, format!("missing field '{field}'")))
    }
}
