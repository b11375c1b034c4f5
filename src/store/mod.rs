//! Database store for identities, artists, the team ledger and invitations
//!
//! Every operation that has to uphold a ledger invariant (one active
//! membership per person and artist, one primary agent per artist, one
//! pending invitation per email and artist, single-use invitation tokens)
//! runs its check and its write inside one transaction, with a partial
//! unique index behind it. Each such transaction opens with a write, so it
//! holds the SQLite write lock before its checks run.

mod identity;
mod invitation;
mod membership;
mod token;

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Database store
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))
    }
}

pub(crate) fn parse_uuid(value: &str, field: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| AppError::Internal(format!("Invalid {} UUID: {}", field, e)))
}

pub(crate) fn parse_optional_uuid(value: Option<String>, field: &str) -> Result<Option<Uuid>> {
    value.map(|v| parse_uuid(&v, field)).transpose()
}

/// In-memory store with the schema applied, for tests
#[cfg(test)]
pub(crate) async fn test_store() -> Store {
    use sqlx::sqlite::SqlitePoolOptions;

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    let store = Store::new(pool);
    store.migrate().await.expect("Failed to run migrations");
    store
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uuid_invalid() {
        let result = parse_uuid("not-a-uuid", "artist_id");
        assert!(matches!(result.unwrap_err(), AppError::Internal(_)));
    }

    #[test]
    fn test_parse_optional_uuid() {
        assert_eq!(parse_optional_uuid(None, "identity_id").unwrap(), None);
        let id = Uuid::new_v4();
        assert_eq!(
            parse_optional_uuid(Some(id.to_string()), "identity_id").unwrap(),
            Some(id)
        );
        assert!(parse_optional_uuid(Some("bad".to_string()), "identity_id").is_err());
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let store = test_store().await;
        store.migrate().await.unwrap();
    }
}
