//! API key data model and key-management request/response types.
//!
//! This module defines:
//! - `ApiKey`: Database entity representing one issued key
//! - `IssueKeyRequest` / `SetActiveRequest`: Request bodies for the admin endpoints
//! - `ApiKeyResponse`: Response body returned to clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents an API key record from the database.
///
/// # Database Table
///
/// Maps to the `api_keys` table. The key string itself is the primary
/// identifier; there is no surrogate id column.
///
/// # Lifecycle
///
/// A record is created by the admin "issue key" operation and lives until
/// the admin deletes it. In between, `active` can be toggled off and on as a
/// reversible soft-disable. Deleting a key and later issuing the same literal
/// string again produces a fresh record with counters back at zero.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKey {
    /// The opaque bearer token presented in `Authorization: Bearer <key>`
    pub key: String,

    /// Human-readable label for the organization that owns this key
    ///
    /// This is the identity handed to route handlers after successful
    /// authentication. It is not unique: one organization may hold
    /// several keys.
    pub organization: String,

    /// Timestamp when this API key was issued. Set once, never updated.
    pub created_at: DateTime<Utc>,

    /// Whether this API key is currently active
    ///
    /// Inactive keys are rejected during authentication. This provides a way to revoke access without deleting the record.
    pub active: bool,

    /// Number of successful authentications performed with this key
    ///
    /// Incremented atomically with the authentication lookup. Rejected
    /// attempts (unknown key, inactive key, malformed header) never touch it.
    pub requests_count: i64,

    /// Timestamp of the most recent successful authentication
    ///
    /// `None` until the key is used for the first time.
    pub last_used: Option<DateTime<Utc>>,
}

/// Request body for issuing a new API key.
///
/// # JSON Example
///
/// ```json
/// {
///   "organization": "Acme Corp",
///   "key": "acme-staging-key"
/// }
/// ```
///
/// # Validation
///
/// - `organization`: Required, any non-empty string
/// - `key`: Optional explicit token. When omitted, the registry generates a
///   random `cti_`-prefixed token.
#[derive(Debug, Deserialize)]
pub struct IssueKeyRequest {
    pub organization: String,

    #[serde(default)]
    pub key: Option<String>,
}

/// Request body for enabling or disabling an existing key.
///
/// # JSON Example
///
/// ```json
/// {
///   "active": false
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

/// Response body for key records returned by the admin endpoints and
/// `GET /api/v1/me`.
///
/// The literal key string is included: the admin surface manages keys by
/// value, and `/me` only ever shows a caller the key it just authenticated
/// with.
#[derive(Debug, Serialize)]
pub struct ApiKeyResponse {
    pub key: String,
    pub organization: String,
    pub created_at: DateTime<Utc>,
    pub active: bool,
    pub requests_count: i64,
    pub last_used: Option<DateTime<Utc>>,
}

impl From<ApiKey> for ApiKeyResponse {
    fn from(record: ApiKey) -> Self {
        Self {
            key: record.key,
            organization: record.organization,
            created_at: record.created_at,
            active: record.active,
            requests_count: record.requests_count,
            last_used: record.last_used,
        }
    }
}
