//! Shared application state.

use crate::services::key_registry::KeyRegistry;

/// State shared with all handlers and middleware via `Router::with_state`.
///
/// Cloned per request by axum; both fields are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Handle to the persisted API key registry
    pub registry: KeyRegistry,

    /// Administrator secret for the key-management surface
    ///
    /// Kept alongside the registry rather than inside it: the admin
    /// credential is configuration, not a registry record.
    pub admin_password: String,
}
