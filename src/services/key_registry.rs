//! API key registry - Core authentication and key management logic.
//!
//! This service owns the set of valid API keys, their organization labels,
//! active/inactive status, and usage statistics. It answers "is this key
//! currently usable, and by whom" and records usage as a side effect of each
//! successful authentication.
//!
//! # Atomicity Guarantees
//!
//! The authenticate-and-record step is a single SQL statement, so concurrent
//! authentications against the same key never lose `requests_count` updates.
//! Bootstrap seeding runs inside a database transaction.
//!
//! # Ownership
//!
//! All registry state lives behind this type; no other component writes the
//! `api_keys` table directly. Handlers receive a `KeyRegistry` handle through
//! application state rather than reaching for a global table.

use chrono::Utc;

use crate::{db::DbPool, error::AppError, models::api_key::ApiKey};

/// Bootstrap demo key, present on every fresh registry.
pub const DEMO_KEY: &str = "demo-key-CHANGE_ME";
/// Organization label the demo key authenticates to.
pub const DEMO_ORGANIZATION: &str = "demo_user";

/// Bootstrap test key, present on every fresh registry.
pub const TEST_KEY: &str = "test-key-123";
/// Organization label the test key authenticates to.
pub const TEST_ORGANIZATION: &str = "test_user";

/// Namespace tag prefixed to every generated key.
const KEY_PREFIX: &str = "cti_";

/// Identity of an authenticated caller.
///
/// Returned by [`KeyRegistry::authenticate`] and inserted into request
/// extensions by the auth middleware, so route handlers can know who made
/// the request.
#[derive(Debug, Clone)]
pub struct Identity {
    /// The literal key the caller authenticated with
    pub key: String,

    /// Organization label of the key's owner
    pub organization: String,
}

/// Handle to the persisted API key registry.
///
/// Cloning is cheap (the underlying pool is reference counted); every
/// request-handling task holds its own clone through application state.
#[derive(Debug, Clone)]
pub struct KeyRegistry {
    pool: DbPool,
}

impl KeyRegistry {
    /// Wrap a database pool in a registry handle.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Seed the registry with the two bootstrap keys if it is empty.
    ///
    /// Safe to call on every process start: the count check and the inserts
    /// run in one transaction, and seeding only happens when the table holds
    /// no records at all. Re-running never duplicates the bootstrap keys and
    /// never resurrects keys an administrator has since revoked.
    pub async fn initialize(&self) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM api_keys")
            .fetch_one(&mut *tx)
            .await?;

        if existing == 0 {
            let now = Utc::now();
            for (key, organization) in [(DEMO_KEY, DEMO_ORGANIZATION), (TEST_KEY, TEST_ORGANIZATION)]
            {
                sqlx::query(
                    r#"
                    INSERT INTO api_keys (key, organization, created_at, active, requests_count)
                    VALUES (?1, ?2, ?3, TRUE, 0)
                    "#,
                )
                .bind(key)
                .bind(organization)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
            tx.commit().await?;
            tracing::info!("Seeded bootstrap API keys");
        }

        Ok(())
    }

    /// Authenticate the raw value of an `Authorization` header.
    ///
    /// # Decision
    ///
    /// - Header absent → `MissingApiKey` (401)
    /// - Header present but not `Bearer <token>` → `MalformedAuthorization` (401)
    /// - Token unknown or key inactive → `InvalidApiKey` (403)
    /// - Otherwise → the key's [`Identity`]
    ///
    /// The `Bearer ` prefix is case-sensitive with a single space, matching
    /// what issued-key holders are documented to send.
    ///
    /// # Side Effects
    ///
    /// On success, `requests_count` is incremented and `last_used` set to now
    /// in the same statement that performs the lookup, so two requests racing
    /// on one key both land in the counter. The write is committed before
    /// this returns. Rejected attempts leave the record untouched.
    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<Identity, AppError> {
        let header = authorization.ok_or(AppError::MissingApiKey)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AppError::MalformedAuthorization)?;
        if token.is_empty() {
            return Err(AppError::MalformedAuthorization);
        }

        // Lookup and usage recording as one atomic statement. Filtering on
        // `active` here means unknown and deactivated keys are
        // indistinguishable to the caller.
        let organization = sqlx::query_scalar::<_, String>(
            r#"
            UPDATE api_keys
            SET requests_count = requests_count + 1,
                last_used = ?1
            WHERE key = ?2 AND active = TRUE
            RETURNING organization
            "#,
        )
        .bind(Utc::now())
        .bind(token)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::InvalidApiKey)?;

        Ok(Identity {
            key: token.to_string(),
            organization,
        })
    }

    /// Issue a new API key for an organization.
    ///
    /// # Process
    ///
    /// 1. Validate the organization label
    /// 2. Use the explicit key if one was supplied, otherwise generate a
    ///    random `cti_`-prefixed token (24 bytes from the OS CSPRNG)
    /// 3. Insert the record: active, zero requests, never used
    ///
    /// # Errors
    ///
    /// - `InvalidRequest`: empty organization or empty explicit key
    /// - `DuplicateKey`: the key string already exists; the existing record
    ///   is left unmodified
    pub async fn issue_key(
        &self,
        organization: &str,
        explicit_key: Option<String>,
    ) -> Result<ApiKey, AppError> {
        let organization = organization.trim();
        if organization.is_empty() {
            return Err(AppError::InvalidRequest(
                "Organization must not be empty".to_string(),
            ));
        }

        let key = match explicit_key {
            Some(key) => {
                let key = key.trim().to_string();
                if key.is_empty() {
                    return Err(AppError::InvalidRequest(
                        "Explicit key must not be empty".to_string(),
                    ));
                }
                key
            }
            None => generate_key(),
        };

        let record = sqlx::query_as::<_, ApiKey>(
            r#"
            INSERT INTO api_keys (key, organization, created_at, active, requests_count)
            VALUES (?1, ?2, ?3, TRUE, 0)
            RETURNING key, organization, created_at, active, requests_count, last_used
            "#,
        )
        .bind(&key)
        .bind(organization)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            // Unique constraint on `key`: surface as a conflict, not a 503
            sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::DuplicateKey,
            other => AppError::Database(other),
        })?;

        Ok(record)
    }

    /// Hard-delete a key. Terminal: the record and its usage history are
    /// gone, and re-issuing the same literal string later starts over at
    /// zero requests.
    pub async fn revoke_key(&self, key: &str) -> Result<(), AppError> {
        let deleted = sqlx::query("DELETE FROM api_keys WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(AppError::KeyNotFound);
        }

        Ok(())
    }

    /// Enable or disable a key without touching its counters.
    pub async fn set_active(&self, key: &str, active: bool) -> Result<ApiKey, AppError> {
        sqlx::query_as::<_, ApiKey>(
            r#"
            UPDATE api_keys
            SET active = ?1
            WHERE key = ?2
            RETURNING key, organization, created_at, active, requests_count, last_used
            "#,
        )
        .bind(active)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::KeyNotFound)
    }

    /// List all key records, most-recently-created first. Read-only.
    pub async fn list_keys(&self) -> Result<Vec<ApiKey>, AppError> {
        let records = sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT key, organization, created_at, active, requests_count, last_used
            FROM api_keys
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Cheap storage connectivity probe for the health endpoint.
    pub async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Fetch a single key record by its literal key string.
    pub async fn get_key(&self, key: &str) -> Result<ApiKey, AppError> {
        sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT key, organization, created_at, active, requests_count, last_used
            FROM api_keys
            WHERE key = ?1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::KeyNotFound)
    }
}

/// Generate a random API key.
///
/// # Output
///
/// `cti_` followed by 48 hex characters (24 random bytes), URL-safe.
fn generate_key() -> String {
    let bytes: [u8; 24] = rand::random();
    format!("{}{}", KEY_PREFIX, hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

    use super::*;

    /// Fresh registry over an in-memory database with migrations applied and
    /// bootstrap keys seeded.
    ///
    /// The pool is capped at one connection: every pooled connection to
    /// `sqlite::memory:` would otherwise open its own private database.
    async fn test_registry() -> KeyRegistry {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").expect("options");
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .expect("in-memory pool");

        crate::db::run_migrations(&pool).await.expect("migrations");

        let registry = KeyRegistry::new(pool);
        registry.initialize().await.expect("bootstrap");
        registry
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let registry = test_registry().await;

        // Seeded once by the helper; run it twice more
        registry.initialize().await.expect("second init");
        registry.initialize().await.expect("third init");

        let keys = registry.list_keys().await.expect("list");
        assert_eq!(keys.len(), 2);
        assert!(keys.iter().any(|k| k.key == DEMO_KEY));
        assert!(keys.iter().any(|k| k.key == TEST_KEY));
    }

    #[tokio::test]
    async fn bootstrap_demo_key_authenticates() {
        let registry = test_registry().await;

        let header = bearer(DEMO_KEY);
        let identity = registry
            .authenticate(Some(header.as_str()))
            .await
            .expect("demo key authenticates");

        assert_eq!(identity.organization, DEMO_ORGANIZATION);
        assert_eq!(identity.key, DEMO_KEY);

        let record = registry.get_key(DEMO_KEY).await.expect("record");
        assert_eq!(record.requests_count, 1);
        assert!(record.last_used.is_some());
    }

    #[tokio::test]
    async fn missing_header_is_unauthenticated() {
        let registry = test_registry().await;

        let result = registry.authenticate(None).await;
        assert!(matches!(result, Err(AppError::MissingApiKey)));
    }

    #[tokio::test]
    async fn malformed_headers_are_rejected_before_lookup() {
        let registry = test_registry().await;

        // Bare token, wrong scheme, lowercase scheme, missing token
        for header in [
            DEMO_KEY,
            "Token demo-key-CHANGE_ME",
            "bearer demo-key-CHANGE_ME",
            "Bearer",
            "Bearer ",
        ] {
            let result = registry.authenticate(Some(header)).await;
            assert!(
                matches!(result, Err(AppError::MalformedAuthorization)),
                "header {header:?} should be malformed"
            );
        }

        // None of the rejected attempts touched the demo key's counters
        let record = registry.get_key(DEMO_KEY).await.expect("record");
        assert_eq!(record.requests_count, 0);
        assert!(record.last_used.is_none());
    }

    #[tokio::test]
    async fn unknown_token_is_forbidden() {
        let registry = test_registry().await;

        let result = registry.authenticate(Some("Bearer no-such-key")).await;
        assert!(matches!(result, Err(AppError::InvalidApiKey)));
    }

    #[tokio::test]
    async fn issued_key_has_expected_shape() {
        let registry = test_registry().await;

        let record = registry.issue_key("Acme", None).await.expect("issue");

        let token = record.key.strip_prefix(KEY_PREFIX).expect("cti_ prefix");
        assert_eq!(token.len(), 48);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(record.organization, "Acme");
        assert!(record.active);
        assert_eq!(record.requests_count, 0);
        assert!(record.last_used.is_none());
    }

    #[tokio::test]
    async fn counter_tracks_each_successful_authentication() {
        let registry = test_registry().await;

        let record = registry.issue_key("Acme", None).await.expect("issue");
        let header = bearer(&record.key);

        for expected in 1..=3 {
            let identity = registry
                .authenticate(Some(header.as_str()))
                .await
                .expect("authenticate");
            assert_eq!(identity.organization, "Acme");

            let current = registry.get_key(&record.key).await.expect("record");
            assert_eq!(current.requests_count, expected);
        }
    }

    #[tokio::test]
    async fn duplicate_issuance_conflicts_and_preserves_existing_record() {
        let registry = test_registry().await;

        registry
            .issue_key("Acme", Some("acme-prod-key".to_string()))
            .await
            .expect("first issue");
        let header = bearer("acme-prod-key");
        registry
            .authenticate(Some(header.as_str()))
            .await
            .expect("authenticate");

        let result = registry
            .issue_key("Intruder Inc", Some("acme-prod-key".to_string()))
            .await;
        assert!(matches!(result, Err(AppError::DuplicateKey)));

        // Existing record unmodified by the failed issuance
        let record = registry.get_key("acme-prod-key").await.expect("record");
        assert_eq!(record.organization, "Acme");
        assert_eq!(record.requests_count, 1);
        assert!(record.active);
    }

    #[tokio::test]
    async fn empty_organization_is_rejected() {
        let registry = test_registry().await;

        let result = registry.issue_key("   ", None).await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));

        let result = registry.issue_key("Acme", Some("  ".to_string())).await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn inactive_key_fails_until_reactivated() {
        let registry = test_registry().await;

        let record = registry.issue_key("Acme", None).await.expect("issue");
        let header = bearer(&record.key);

        registry
            .authenticate(Some(header.as_str()))
            .await
            .expect("active key authenticates");

        let disabled = registry
            .set_active(&record.key, false)
            .await
            .expect("disable");
        assert!(!disabled.active);
        // Toggling does not alter counters
        assert_eq!(disabled.requests_count, 1);

        let result = registry.authenticate(Some(header.as_str())).await;
        assert!(matches!(result, Err(AppError::InvalidApiKey)));

        // The rejected attempt did not count
        let current = registry.get_key(&record.key).await.expect("record");
        assert_eq!(current.requests_count, 1);

        registry
            .set_active(&record.key, true)
            .await
            .expect("re-enable");
        let identity = registry
            .authenticate(Some(header.as_str()))
            .await
            .expect("re-enabled key authenticates");
        assert_eq!(identity.organization, "Acme");
    }

    #[tokio::test]
    async fn revoked_key_never_authenticates_again() {
        let registry = test_registry().await;

        let record = registry.issue_key("Acme", None).await.expect("issue");
        let header = bearer(&record.key);

        registry.revoke_key(&record.key).await.expect("revoke");

        let result = registry.authenticate(Some(header.as_str())).await;
        assert!(matches!(result, Err(AppError::InvalidApiKey)));

        let keys = registry.list_keys().await.expect("list");
        assert!(keys.iter().all(|k| k.key != record.key));
    }

    #[tokio::test]
    async fn management_operations_on_unknown_keys_are_not_found() {
        let registry = test_registry().await;

        let result = registry.revoke_key("no-such-key").await;
        assert!(matches!(result, Err(AppError::KeyNotFound)));

        let result = registry.set_active("no-such-key", false).await;
        assert!(matches!(result, Err(AppError::KeyNotFound)));
    }

    #[tokio::test]
    async fn reissuing_a_revoked_key_starts_a_fresh_history() {
        let registry = test_registry().await;

        registry
            .issue_key("Acme", Some("acme-rotating-key".to_string()))
            .await
            .expect("issue");
        let header = bearer("acme-rotating-key");
        for _ in 0..3 {
            registry
                .authenticate(Some(header.as_str()))
                .await
                .expect("use key");
        }

        registry.revoke_key("acme-rotating-key").await.expect("revoke");

        let reissued = registry
            .issue_key("Acme", Some("acme-rotating-key".to_string()))
            .await
            .expect("reissue");
        assert_eq!(reissued.requests_count, 0);
        assert!(reissued.last_used.is_none());
    }

    #[tokio::test]
    async fn list_returns_newest_first() {
        let registry = test_registry().await;

        let first = registry.issue_key("Acme", None).await.expect("issue");
        let second = registry.issue_key("Globex", None).await.expect("issue");

        let keys = registry.list_keys().await.expect("list");
        assert_eq!(keys.len(), 4);
        assert_eq!(keys[0].key, second.key);
        assert_eq!(keys[1].key, first.key);
    }

    #[tokio::test]
    async fn concurrent_authentications_all_land_in_the_counter() {
        let registry = test_registry().await;

        let record = registry.issue_key("Acme", None).await.expect("issue");
        let header = bearer(&record.key);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            let header = header.clone();
            handles.push(tokio::spawn(async move {
                registry.authenticate(Some(header.as_str())).await
            }));
        }
        for handle in handles {
            handle.await.expect("task").expect("authenticate");
        }

        let current = registry.get_key(&record.key).await.expect("record");
        assert_eq!(current.requests_count, 16);
    }

    #[test]
    fn generated_keys_are_unique_and_well_formed() {
        let a = generate_key();
        let b = generate_key();

        assert_ne!(a, b);
        for key in [a, b] {
            let token = key.strip_prefix(KEY_PREFIX).expect("prefix");
            assert_eq!(token.len(), 48);
            assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }
}
