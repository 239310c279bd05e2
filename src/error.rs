//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// This enum represents all possible errors that can occur in the application.
/// Each variant maps to a specific HTTP status code and error message.
///
/// # Error Categories
///
/// - **Authentication Errors**: missing, malformed, or rejected credentials
/// - **Management Errors**: conflicts and missing targets during key administration
/// - **Validation Errors**: invalid request data
/// - **Storage Errors**: any sqlx::Error from database operations
///
/// The authentication variants are deliberately split three ways: a request
/// with no credential at all, a credential that is not even well-formed, and
/// a well-formed credential the registry rejects. The first two are 401s
/// (the caller never presented a usable key), the last is a 403.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No `Authorization` header was supplied.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Authorization header missing")]
    MissingApiKey,

    /// An `Authorization` header was supplied but is not `Bearer <api_key>`.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid authorization format. Use 'Bearer <api_key>'")]
    MalformedAuthorization,

    /// The presented API key is unknown or has been deactivated.
    ///
    /// Returns HTTP 403 Forbidden. Unknown and inactive keys are not
    /// distinguished in the response, so callers cannot probe which
    /// key strings exist.
    #[error("Invalid API key")]
    InvalidApiKey,

    /// The administrator credential is absent or does not match.
    ///
    /// Returns HTTP 403 Forbidden. The admin check fails closed: any
    /// mismatch, including a missing header, lands here.
    #[error("Invalid admin credentials")]
    InvalidAdminCredentials,

    /// A key with the requested token string already exists.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("API key already exists")]
    DuplicateKey,

    /// The key targeted by a management operation does not exist.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("API key not found")]
    KeyNotFound,

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// Database operation failed (e.g., connection error, query error).
    ///
    /// This wraps any sqlx::Error using the `#[from]` attribute, which
    /// automatically implements `From<sqlx::Error> for AppError`.
    ///
    /// Returns HTTP 503 Service Unavailable. A storage failure is never
    /// reported as an authentication failure: a caller holding a valid key
    /// must be able to tell "your key is bad" apart from "the service is
    /// degraded".
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Convert AppError into an HTTP response.
///
/// This implementation allows Axum handlers to return `Result<T, AppError>`
/// and have errors automatically converted to proper HTTP responses.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `MissingApiKey` → 401 Unauthorized
/// - `MalformedAuthorization` → 401 Unauthorized
/// - `InvalidApiKey` → 403 Forbidden
/// - `InvalidAdminCredentials` → 403 Forbidden
/// - `DuplicateKey` → 409 Conflict
/// - `KeyNotFound` → 404 Not Found
/// - `InvalidRequest` → 400 Bad Request
/// - `Database` → 503 Service Unavailable (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Map each error variant to (HTTP status, error code, message)
        let (status, code, message) = match self {
            AppError::MissingApiKey => (
                StatusCode::UNAUTHORIZED,
                "missing_api_key",
                self.to_string(),
            ),
            AppError::MalformedAuthorization => (
                StatusCode::UNAUTHORIZED,
                "malformed_authorization",
                self.to_string(),
            ),
            AppError::InvalidApiKey => {
                (StatusCode::FORBIDDEN, "invalid_api_key", self.to_string())
            }
            AppError::InvalidAdminCredentials => (
                StatusCode::FORBIDDEN,
                "invalid_admin_credentials",
                self.to_string(),
            ),
            AppError::DuplicateKey => (StatusCode::CONFLICT, "duplicate_key", self.to_string()),
            AppError::KeyNotFound => (StatusCode::NOT_FOUND, "key_not_found", self.to_string()),
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::Database(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                "Service temporarily unavailable".to_string(),
            ),
        };

        // Build JSON response body
        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        // Return the response with status code and JSON body
        (status, body).into_response()
    }
}
