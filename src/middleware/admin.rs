//! Administrator credential middleware.
//!
//! Gates the key-management endpoints behind a single configured secret,
//! supplied in the `X-Admin-Password` header and compared by exact string
//! equality. The check is independent of the key registry: no issued API
//! key, active or not, passes it.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{error::AppError, state::AppState};

/// Header carrying the administrator secret.
pub const ADMIN_PASSWORD_HEADER: &str = "X-Admin-Password";

/// Administrator authentication middleware function.
///
/// Fails closed: a missing header, an undecodable header, and a wrong
/// password all produce the same 403 response.
pub async fn admin_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let supplied = request
        .headers()
        .get(ADMIN_PASSWORD_HEADER)
        .and_then(|value| value.to_str().ok());

    match supplied {
        Some(candidate) if candidate == state.admin_password => Ok(next.run(request).await),
        _ => Err(AppError::InvalidAdminCredentials),
    }
}
