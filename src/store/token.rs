//! Bearer access tokens

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{parse_uuid, Store};
use crate::error::{AppError, Result};
use crate::models::{AccessToken, Identity};

impl Store {
    pub async fn insert_access_token(
        &self,
        identity_id: Uuid,
        token_hash: &str,
        name: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<AccessToken> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO access_tokens (id, identity_id, token_hash, name, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(identity_id.to_string())
        .bind(token_hash)
        .bind(name)
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(AccessToken {
            id,
            identity_id,
            name: name.to_string(),
            expires_at,
            last_used_at: None,
            created_at: now,
        })
    }

    /// Resolve an unexpired token to its identity and stamp `last_used_at`
    pub async fn find_identity_by_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<(Identity, AccessToken)>> {
        let row = sqlx::query_as::<_, AccessTokenRow>(
            r#"
            SELECT id, identity_id, name, expires_at, last_used_at, created_at
            FROM access_tokens
            WHERE token_hash = ? AND expires_at > ?
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut token: AccessToken = row.try_into()?;

        sqlx::query("UPDATE access_tokens SET last_used_at = ? WHERE id = ?")
            .bind(now)
            .bind(token.id.to_string())
            .execute(&self.pool)
            .await?;
        token.last_used_at = Some(now);

        let identity = self.get_identity(token.identity_id).await?;
        Ok(Some((identity, token)))
    }

    /// Returns whether a token was removed
    pub async fn delete_access_token(&self, token_hash: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM access_tokens WHERE token_hash = ?")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Drop tokens past their expiry; returns how many were removed
    pub async fn purge_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM access_tokens WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct AccessTokenRow {
    id: String,
    identity_id: String,
    name: String,
    expires_at: DateTime<Utc>,
    last_used_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AccessTokenRow> for AccessToken {
    type Error = AppError;

    fn try_from(row: AccessTokenRow) -> Result<Self> {
        Ok(AccessToken {
            id: parse_uuid(&row.id, "token")?,
            identity_id: parse_uuid(&row.identity_id, "identity_id")?,
            name: row.name,
            expires_at: row.expires_at,
            last_used_at: row.last_used_at,
            created_at: row.created_at,
        })
    }
}
