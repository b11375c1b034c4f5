//! Identities and artist profiles

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{parse_uuid, Store};
use crate::error::{AppError, Result};
use crate::models::{normalize_email, ArtistProfile, ContextKind, Identity};

const IDENTITY_COLUMNS: &str = "id, name, email, password_hash, current_context, available_contexts, is_multi_role, created_at, updated_at";
const ARTIST_COLUMNS: &str =
    "id, owner_id, name, email, bio, avatar, agency_id, created_at, updated_at";

impl Store {
    // Identity operations

    /// Create an identity, and its artist profile when `artist_name` is given,
    /// in one transaction.
    pub async fn register_identity(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        artist_name: Option<&str>,
    ) -> Result<(Identity, Option<ArtistProfile>)> {
        let id = Uuid::new_v4();
        let email = normalize_email(email);
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO identities (id, name, email, password_hash, available_contexts, is_multi_role, created_at, updated_at)
            VALUES (?, ?, ?, ?, '[]', 0, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(name)
        .bind(&email)
        .bind(password_hash)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, "This email is already registered"))?;

        let artist = match artist_name {
            Some(artist_name) => {
                let artist = ArtistProfile {
                    id: Uuid::new_v4(),
                    owner_id: id,
                    name: artist_name.to_string(),
                    email: Some(email.clone()),
                    bio: None,
                    avatar: None,
                    agency_id: None,
                    created_at: now,
                    updated_at: now,
                };
                sqlx::query(
                    r#"
                    INSERT INTO artists (id, owner_id, name, email, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(artist.id.to_string())
                .bind(id.to_string())
                .bind(&artist.name)
                .bind(&artist.email)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await?;
                Some(artist)
            }
            None => None,
        };

        tx.commit().await?;

        let identity = Identity {
            id,
            name: name.to_string(),
            email,
            password_hash: password_hash.to_string(),
            current_context: None,
            available_contexts: BTreeSet::new(),
            is_multi_role: false,
            created_at: now,
            updated_at: now,
        };
        Ok((identity, artist))
    }

    pub async fn get_identity(&self, id: Uuid) -> Result<Identity> {
        let sql = format!("SELECT {} FROM identities WHERE id = ?", IDENTITY_COLUMNS);
        let row = sqlx::query_as::<_, IdentityRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Identity {} not found", id)))?;

        row.try_into()
    }

    pub async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>> {
        let sql = format!("SELECT {} FROM identities WHERE email = ?", IDENTITY_COLUMNS);
        let row = sqlx::query_as::<_, IdentityRow>(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.try_into()).transpose()
    }

    /// Persist a recomputed context set in a single write
    pub async fn save_contexts(
        &self,
        id: Uuid,
        available: &BTreeSet<ContextKind>,
        current: Option<ContextKind>,
    ) -> Result<()> {
        let available_json = serde_json::to_string(available)
            .map_err(|e| AppError::Internal(format!("Failed to encode contexts: {}", e)))?;

        sqlx::query(
            r#"
            UPDATE identities
            SET available_contexts = ?, is_multi_role = ?, current_context = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(available_json)
        .bind(available.len() > 1)
        .bind(current.map(|c| c.as_str()))
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Set `current_context` only if it is in the stored `available_contexts`.
    ///
    /// Returns whether the row changed; check and write are one statement.
    pub async fn switch_context_if_available(&self, id: Uuid, context: ContextKind) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE identities
            SET current_context = ?, updated_at = ?
            WHERE id = ?
              AND EXISTS (SELECT 1 FROM json_each(identities.available_contexts) WHERE json_each.value = ?)
            "#,
        )
        .bind(context.as_str())
        .bind(Utc::now())
        .bind(id.to_string())
        .bind(context.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    // Artist operations

    pub async fn get_artist(&self, id: Uuid) -> Result<ArtistProfile> {
        let sql = format!("SELECT {} FROM artists WHERE id = ?", ARTIST_COLUMNS);
        let row = sqlx::query_as::<_, ArtistRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Artist {} not found", id)))?;

        row.try_into()
    }

    pub async fn find_artist_by_owner(&self, owner_id: Uuid) -> Result<Option<ArtistProfile>> {
        let sql = format!("SELECT {} FROM artists WHERE owner_id = ?", ARTIST_COLUMNS);
        let row = sqlx::query_as::<_, ArtistRow>(&sql)
            .bind(owner_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.try_into()).transpose()
    }

    pub async fn update_artist_profile(
        &self,
        id: Uuid,
        name: Option<&str>,
        bio: Option<&str>,
    ) -> Result<ArtistProfile> {
        sqlx::query(
            r#"
            UPDATE artists
            SET name = COALESCE(?, name), bio = COALESCE(?, bio), updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(name)
        .bind(bio)
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        self.get_artist(id).await
    }
}

// Internal row types for sqlx

#[derive(sqlx::FromRow)]
pub(super) struct IdentityRow {
    id: String,
    name: String,
    email: String,
    password_hash: String,
    current_context: Option<String>,
    available_contexts: String,
    is_multi_role: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<IdentityRow> for Identity {
    type Error = AppError;

    fn try_from(row: IdentityRow) -> Result<Self> {
        let available_contexts: BTreeSet<ContextKind> = serde_json::from_str(&row.available_contexts)
            .map_err(|e| AppError::Internal(format!("Invalid available_contexts: {}", e)))?;
        let current_context = row
            .current_context
            .map(|c| c.parse())
            .transpose()
            .map_err(|e| AppError::Internal(format!("Invalid current_context: {}", e)))?;

        Ok(Identity {
            id: parse_uuid(&row.id, "identity")?,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            current_context,
            available_contexts,
            is_multi_role: row.is_multi_role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ArtistRow {
    id: String,
    owner_id: String,
    name: String,
    email: Option<String>,
    bio: Option<String>,
    avatar: Option<String>,
    agency_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ArtistRow> for ArtistProfile {
    type Error = AppError;

    fn try_from(row: ArtistRow) -> Result<Self> {
        Ok(ArtistProfile {
            id: parse_uuid(&row.id, "artist")?,
            owner_id: parse_uuid(&row.owner_id, "owner_id")?,
            name: row.name,
            email: row.email,
            bio: row.bio,
            avatar: row.avatar,
            agency_id: row.agency_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
