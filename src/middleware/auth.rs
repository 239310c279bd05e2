//! API key authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the raw Authorization header value
//! 2. Hand it to the key registry for the authentication decision
//! 3. Inject the resolved identity into the request
//! 4. Reject unauthenticated requests with HTTP 401/403
//!
//! The decision itself (missing vs malformed vs invalid, usage recording)
//! lives in [`crate::services::key_registry::KeyRegistry::authenticate`];
//! this layer is transport plumbing only.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{error::AppError, state::AppState};

/// API key authentication middleware function.
///
/// # Flow
///
/// 1. Read the `Authorization: Bearer <key>` header from the request
/// 2. Ask the registry to authenticate it (which also records the usage)
/// 3. If accepted: inject [`Identity`] into request extensions, call next handler
/// 4. If rejected: return the registry's error (401 missing/malformed, 403 invalid)
///
/// Route handlers extract the identity with `Extension<Identity>`.
///
/// [`Identity`]: crate::services::key_registry::Identity
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // A header that is present but not valid UTF-8 is malformed, not absent
    let authorization = match request.headers().get("Authorization") {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| AppError::MalformedAuthorization)?,
        ),
        None => None,
    };

    let identity = state.registry.authenticate(authorization).await?;

    // Route handlers can now extract this using Extension<Identity>
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}
