//! Team membership ledger rows

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use super::{parse_optional_uuid, parse_uuid, Store};
use crate::error::{AppError, Result};
use crate::models::{MembershipUpdate, NewMembership, TeamMembership, TeamRole};

const MEMBERSHIP_COLUMNS: &str = "id, artist_id, identity_id, name, email, phone, role, custom_role, is_primary, can_invite_others, can_manage_bookings, can_access_financials, permissions, is_active, joined_at, created_at, updated_at";

pub(super) const ALREADY_MEMBER: &str = "This person is already a team member";
pub(super) const PRIMARY_AGENT_TAKEN: &str = "This artist already has a primary agent";

impl Store {
    /// Insert a ledger entry, rejecting a second active membership for the
    /// same person or a second active primary agent for the artist.
    pub async fn insert_membership(&self, new: &NewMembership) -> Result<TeamMembership> {
        let mut tx = self.pool.begin().await?;

        // Write before reading so the transaction holds the write lock for
        // its checks; a deferred read-then-write fails with SQLITE_BUSY.
        sqlx::query("UPDATE artists SET updated_at = updated_at WHERE id = ?")
            .bind(new.artist_id.to_string())
            .execute(&mut *tx)
            .await?;

        let membership = insert_membership_in(&mut *tx, new).await?;
        tx.commit().await?;
        Ok(membership)
    }

    pub async fn get_membership(&self, id: Uuid) -> Result<TeamMembership> {
        let sql = format!("SELECT {} FROM team_memberships WHERE id = ?", MEMBERSHIP_COLUMNS);
        let row = sqlx::query_as::<_, MembershipRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Team member {} not found", id)))?;

        row.try_into()
    }

    pub async fn list_active_memberships_for_artist(&self, artist_id: Uuid) -> Result<Vec<TeamMembership>> {
        let sql = format!(
            "SELECT {} FROM team_memberships WHERE artist_id = ? AND is_active = 1 ORDER BY created_at ASC, id ASC",
            MEMBERSHIP_COLUMNS
        );
        let rows = sqlx::query_as::<_, MembershipRow>(&sql)
            .bind(artist_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// Active memberships held by an identity, oldest first
    pub async fn list_active_memberships_for_identity(&self, identity_id: Uuid) -> Result<Vec<TeamMembership>> {
        let sql = format!(
            "SELECT {} FROM team_memberships WHERE identity_id = ? AND is_active = 1 ORDER BY created_at ASC, id ASC",
            MEMBERSHIP_COLUMNS
        );
        let rows = sqlx::query_as::<_, MembershipRow>(&sql)
            .bind(identity_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// The active agent-role membership an identity holds on an artist's team
    pub async fn find_active_agent_membership(
        &self,
        artist_id: Uuid,
        identity_id: Uuid,
    ) -> Result<Option<TeamMembership>> {
        let sql = format!(
            "SELECT {} FROM team_memberships WHERE artist_id = ? AND identity_id = ? AND role = 'agent' AND is_active = 1",
            MEMBERSHIP_COLUMNS
        );
        let row = sqlx::query_as::<_, MembershipRow>(&sql)
            .bind(artist_id.to_string())
            .bind(identity_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.try_into()).transpose()
    }

    /// Apply a partial edit. Re-checks the primary-agent rule when the
    /// result would be an active primary agent.
    pub async fn update_membership(&self, id: Uuid, update: &MembershipUpdate) -> Result<TeamMembership> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE team_memberships SET updated_at = updated_at WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        let sql = format!("SELECT {} FROM team_memberships WHERE id = ?", MEMBERSHIP_COLUMNS);
        let current: TeamMembership = sqlx::query_as::<_, MembershipRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Team member {} not found", id)))?
            .try_into()?;

        let mut updated = update.apply_to(&current);
        updated.updated_at = Utc::now();

        if updated.is_active
            && updated.is_primary_agent()
            && other_primary_agent_exists(&mut *tx, updated.artist_id, Some(id)).await?
        {
            return Err(AppError::Conflict(PRIMARY_AGENT_TAKEN.to_string()));
        }

        sqlx::query(
            r#"
            UPDATE team_memberships
            SET name = ?, email = ?, phone = ?, role = ?, custom_role = ?, is_primary = ?,
                can_invite_others = ?, can_manage_bookings = ?, can_access_financials = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&updated.name)
        .bind(&updated.email)
        .bind(&updated.phone)
        .bind(updated.role.as_str())
        .bind(updated.role.custom_label())
        .bind(updated.is_primary)
        .bind(updated.can_invite_others)
        .bind(updated.can_manage_bookings)
        .bind(updated.can_access_financials)
        .bind(updated.updated_at)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, PRIMARY_AGENT_TAKEN))?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Soft-delete: rows are never removed
    pub async fn deactivate_membership(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE team_memberships SET is_active = 0, updated_at = ? WHERE id = ?
            "#,
        )
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Team member {} not found", id)));
        }
        Ok(())
    }
}

/// Check-and-insert on an open transaction; shared with invitation acceptance.
pub(super) async fn insert_membership_in(
    conn: &mut SqliteConnection,
    new: &NewMembership,
) -> Result<TeamMembership> {
    if let Some(identity_id) = new.identity_id {
        let existing: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT id FROM team_memberships
            WHERE artist_id = ? AND identity_id = ? AND is_active = 1
            "#,
        )
        .bind(new.artist_id.to_string())
        .bind(identity_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

        if existing.is_some() {
            return Err(AppError::Conflict(ALREADY_MEMBER.to_string()));
        }
    }

    if new.is_primary_agent() && other_primary_agent_exists(&mut *conn, new.artist_id, None).await? {
        return Err(AppError::Conflict(PRIMARY_AGENT_TAKEN.to_string()));
    }

    let id = Uuid::new_v4();
    let now = Utc::now();
    let permissions = serde_json::to_string(&new.permissions)
        .map_err(|e| AppError::Internal(format!("Failed to encode permissions: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO team_memberships (
            id, artist_id, identity_id, name, email, phone, role, custom_role, is_primary,
            can_invite_others, can_manage_bookings, can_access_financials, permissions,
            is_active, joined_at, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(new.artist_id.to_string())
    .bind(new.identity_id.map(|u| u.to_string()))
    .bind(&new.name)
    .bind(&new.email)
    .bind(&new.phone)
    .bind(new.role.as_str())
    .bind(new.role.custom_label())
    .bind(new.is_primary)
    .bind(new.can_invite_others)
    .bind(new.can_manage_bookings)
    .bind(new.can_access_financials)
    .bind(permissions)
    .bind(new.joined_at)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        let message = if new.is_primary_agent() {
            PRIMARY_AGENT_TAKEN
        } else {
            ALREADY_MEMBER
        };
        AppError::conflict_on_unique(e, message)
    })?;

    Ok(TeamMembership {
        id,
        artist_id: new.artist_id,
        identity_id: new.identity_id,
        name: new.name.clone(),
        email: new.email.clone(),
        phone: new.phone.clone(),
        role: new.role.clone(),
        is_primary: new.is_primary,
        can_invite_others: new.can_invite_others,
        can_manage_bookings: new.can_manage_bookings,
        can_access_financials: new.can_access_financials,
        permissions: new.permissions.clone(),
        is_active: true,
        joined_at: new.joined_at,
        created_at: now,
        updated_at: now,
    })
}

/// Whether an active member (by email) is already on the artist's team
pub(super) async fn active_member_with_email(
    conn: &mut SqliteConnection,
    artist_id: Uuid,
    email: &str,
) -> Result<bool> {
    let existing: Option<(String,)> = sqlx::query_as(
        r#"
        SELECT id FROM team_memberships WHERE artist_id = ? AND email = ? AND is_active = 1
        "#,
    )
    .bind(artist_id.to_string())
    .bind(email)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(existing.is_some())
}

async fn other_primary_agent_exists(
    conn: &mut SqliteConnection,
    artist_id: Uuid,
    excluding: Option<Uuid>,
) -> Result<bool> {
    let existing: Option<(String,)> = sqlx::query_as(
        r#"
        SELECT id FROM team_memberships
        WHERE artist_id = ? AND role = 'agent' AND is_primary = 1 AND is_active = 1 AND id != ?
        "#,
    )
    .bind(artist_id.to_string())
    .bind(excluding.map(|u| u.to_string()).unwrap_or_default())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(existing.is_some())
}

// Internal row types for sqlx

#[derive(sqlx::FromRow)]
struct MembershipRow {
    id: String,
    artist_id: String,
    identity_id: Option<String>,
    name: String,
    email: String,
    phone: Option<String>,
    role: String,
    custom_role: Option<String>,
    is_primary: bool,
    can_invite_others: bool,
    can_manage_bookings: bool,
    can_access_financials: bool,
    permissions: String,
    is_active: bool,
    joined_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MembershipRow> for TeamMembership {
    type Error = AppError;

    fn try_from(row: MembershipRow) -> Result<Self> {
        let role = TeamRole::from_parts(&row.role, row.custom_role)
            .map_err(|e| AppError::Internal(format!("Invalid role: {}", e)))?;
        let permissions: Vec<String> = serde_json::from_str(&row.permissions)
            .map_err(|e| AppError::Internal(format!("Invalid permissions: {}", e)))?;

        Ok(TeamMembership {
            id: parse_uuid(&row.id, "membership")?,
            artist_id: parse_uuid(&row.artist_id, "artist_id")?,
            identity_id: parse_optional_uuid(row.identity_id, "identity_id")?,
            name: row.name,
            email: row.email,
            phone: row.phone,
            role,
            is_primary: row.is_primary,
            can_invite_others: row.can_invite_others,
            can_manage_bookings: row.can_manage_bookings,
            can_access_financials: row.can_access_financials,
            permissions,
            is_active: row.is_active,
            joined_at: row.joined_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
