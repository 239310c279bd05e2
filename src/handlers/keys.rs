//! HTTP handlers for API key management and caller identity.
//!
//! This module implements:
//! - The administrative key-management endpoints (issue, list, enable/disable,
//!   revoke), all gated by the admin middleware
//! - `GET /api/v1/me`, the bearer-protected endpoint that returns the calling
//!   key's own record

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::error::AppError;
use crate::models::api_key::{ApiKeyResponse, IssueKeyRequest, SetActiveRequest};
use crate::services::key_registry::Identity;
use crate::state::AppState;

/// Issue a new API key.
///
/// # Endpoint
///
/// `POST /api/v1/admin/keys`
///
/// # Request Body
///
/// ```json
/// {
///   "organization": "Acme Corp",
///   "key": "acme-staging-key"
/// }
/// ```
///
/// `key` is optional; when omitted, the registry generates a random
/// `cti_`-prefixed token. The token is returned in the response and can be
/// retrieved again later via the list endpoint.
///
/// # Response
///
/// - **Success (201 Created)**: the new record, active with zero requests
/// - **Error (400)**: empty organization or explicit key
/// - **Error (403)**: invalid admin credentials
/// - **Error (409)**: a key with this token already exists
pub async fn issue_key(
    State(state): State<AppState>,
    Json(request): Json<IssueKeyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let record = state
        .registry
        .issue_key(&request.organization, request.key)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiKeyResponse::from(record))))
}

/// List all API keys, most-recently-created first.
///
/// # Endpoint
///
/// `GET /api/v1/admin/keys`
///
/// # Response
///
/// - **Success (200 OK)**: array of key records (may be empty)
/// - **Error (403)**: invalid admin credentials
pub async fn list_keys(
    State(state): State<AppState>,
) -> Result<Json<Vec<ApiKeyResponse>>, AppError> {
    let keys = state.registry.list_keys().await?;

    let responses: Vec<ApiKeyResponse> = keys.into_iter().map(Into::into).collect();

    Ok(Json(responses))
}

/// Enable or disable an API key.
///
/// # Endpoint
///
/// `PATCH /api/v1/admin/keys/{key}`
///
/// # Request Body
///
/// ```json
/// {
///   "active": false
/// }
/// ```
///
/// Disabling is a reversible soft-disable: counters and timestamps are
/// preserved, and the key authenticates again as soon as it is re-enabled.
///
/// # Response
///
/// - **Success (200 OK)**: the updated record
/// - **Error (403)**: invalid admin credentials
/// - **Error (404)**: no key with this token exists
pub async fn set_key_active(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(request): Json<SetActiveRequest>,
) -> Result<Json<ApiKeyResponse>, AppError> {
    let record = state.registry.set_active(&key, request.active).await?;

    Ok(Json(record.into()))
}

/// Revoke (hard-delete) an API key.
///
/// # Endpoint
///
/// `DELETE /api/v1/admin/keys/{key}`
///
/// # Response
///
/// - **Success (204 No Content)**: the record is gone; the token stops
///   authenticating immediately
/// - **Error (403)**: invalid admin credentials
/// - **Error (404)**: no key with this token exists
pub async fn revoke_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode, AppError> {
    state.registry.revoke_key(&key).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Return the calling key's own record.
///
/// # Endpoint
///
/// `GET /api/v1/me`
///
/// # Authentication
///
/// Requires a valid API key in the Authorization header. The successful
/// authentication performed by the middleware counts toward the key's
/// `requests_count`, like any other protected request.
///
/// # Response
///
/// - **Success (200 OK)**: the caller's record, including usage statistics
/// - **Error (401/403)**: missing, malformed, or invalid API key
pub async fn current_key(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ApiKeyResponse>, AppError> {
    let record = state.registry.get_key(&identity.key).await?;

    Ok(Json(record.into()))
}
