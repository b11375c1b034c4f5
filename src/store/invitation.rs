//! Team invitations

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use super::membership::{active_member_with_email, insert_membership_in, ALREADY_MEMBER};
use super::{parse_uuid, Store};
use crate::error::{AppError, Result};
use crate::models::{
    normalize_email, Identity, InvitationStatus, NewInvitation, NewMembership, TeamInvitation,
    TeamMembership, TeamRole,
};

const INVITATION_COLUMNS: &str =
    "id, artist_id, email, name, role, custom_role, status, expires_at, message, created_at, updated_at";

pub(crate) const ALREADY_INVITED: &str = "An invitation has already been sent to this email";
/// Invalid, expired and consumed tokens all read the same
pub(crate) const INVALID_INVITATION: &str = "Invalid or expired invitation";

impl Store {
    /// Insert a pending invitation for (artist, email).
    ///
    /// Pending rows for the pair that have already expired are flipped to
    /// `expired` first, in the same transaction.
    pub async fn create_invitation(
        &self,
        artist_id: Uuid,
        new: &NewInvitation,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<TeamInvitation> {
        let id = Uuid::new_v4();
        let email = normalize_email(&new.email);
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE team_invitations
            SET status = 'expired', updated_at = ?
            WHERE artist_id = ? AND email = ? AND status = 'pending' AND expires_at < ?
            "#,
        )
        .bind(now)
        .bind(artist_id.to_string())
        .bind(&email)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if active_member_with_email(&mut *tx, artist_id, &email).await? {
            return Err(AppError::Conflict(ALREADY_MEMBER.to_string()));
        }

        let pending: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT id FROM team_invitations WHERE artist_id = ? AND email = ? AND status = 'pending'
            "#,
        )
        .bind(artist_id.to_string())
        .bind(&email)
        .fetch_optional(&mut *tx)
        .await?;

        if pending.is_some() {
            return Err(AppError::Conflict(ALREADY_INVITED.to_string()));
        }

        sqlx::query(
            r#"
            INSERT INTO team_invitations (id, artist_id, email, name, role, custom_role, status, token_hash, expires_at, message, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, 'pending', ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(artist_id.to_string())
        .bind(&email)
        .bind(&new.name)
        .bind(new.role.as_str())
        .bind(new.role.custom_label())
        .bind(token_hash)
        .bind(expires_at)
        .bind(&new.message)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, ALREADY_INVITED))?;

        tx.commit().await?;

        Ok(TeamInvitation {
            id,
            artist_id,
            email,
            name: new.name.clone(),
            role: new.role.clone(),
            status: InvitationStatus::Pending,
            expires_at,
            message: new.message.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_invitation(&self, id: Uuid) -> Result<TeamInvitation> {
        let sql = format!("SELECT {} FROM team_invitations WHERE id = ?", INVITATION_COLUMNS);
        let row = sqlx::query_as::<_, InvitationRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Invitation {} not found", id)))?;

        row.try_into()
    }

    /// Pending invitations that have not yet expired at `now`
    pub async fn list_pending_invitations(&self, artist_id: Uuid, now: DateTime<Utc>) -> Result<Vec<TeamInvitation>> {
        let sql = format!(
            "SELECT {} FROM team_invitations WHERE artist_id = ? AND status = 'pending' AND expires_at >= ? ORDER BY created_at ASC, id ASC",
            INVITATION_COLUMNS
        );
        let rows = sqlx::query_as::<_, InvitationRow>(&sql)
            .bind(artist_id.to_string())
            .bind(now)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// Consume the token and create the membership atomically.
    ///
    /// The pending → accepted flip is a conditional update; a token already
    /// consumed by a concurrent request fails it and nothing is created.
    pub async fn accept_invitation(
        &self,
        token_hash: &str,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> Result<(TeamInvitation, TeamMembership)> {
        let mut tx = self.pool.begin().await?;

        let invitation = resolve_pending(&mut *tx, token_hash, InvitationStatus::Accepted, now).await?;

        let new = NewMembership::member(
            invitation.artist_id,
            identity.name.clone(),
            identity.email.clone(),
            invitation.role.clone(),
        )
        .for_identity(identity.id)
        .joined(now);
        let membership = insert_membership_in(&mut *tx, &new).await?;

        tx.commit().await?;
        Ok((invitation, membership))
    }

    pub async fn decline_invitation(&self, token_hash: &str, now: DateTime<Utc>) -> Result<TeamInvitation> {
        let mut tx = self.pool.begin().await?;
        let invitation = resolve_pending(&mut *tx, token_hash, InvitationStatus::Declined, now).await?;
        tx.commit().await?;
        Ok(invitation)
    }
}

/// Move a pending, unexpired invitation to a terminal status and return it.
async fn resolve_pending(
    conn: &mut SqliteConnection,
    token_hash: &str,
    to: InvitationStatus,
    now: DateTime<Utc>,
) -> Result<TeamInvitation> {
    if !to.is_terminal() {
        return Err(AppError::Internal(format!(
            "Invitation cannot be resolved to {}",
            to.as_str()
        )));
    }

    let result = sqlx::query(
        r#"
        UPDATE team_invitations
        SET status = ?, updated_at = ?
        WHERE token_hash = ? AND status = 'pending' AND expires_at >= ?
        "#,
    )
    .bind(to.as_str())
    .bind(now)
    .bind(token_hash)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(INVALID_INVITATION.to_string()));
    }

    let sql = format!("SELECT {} FROM team_invitations WHERE token_hash = ?", INVITATION_COLUMNS);
    sqlx::query_as::<_, InvitationRow>(&sql)
        .bind(token_hash)
        .fetch_one(&mut *conn)
        .await?
        .try_into()
}

// Internal row types for sqlx

#[derive(sqlx::FromRow)]
struct InvitationRow {
    id: String,
    artist_id: String,
    email: String,
    name: String,
    role: String,
    custom_role: Option<String>,
    status: String,
    expires_at: DateTime<Utc>,
    message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<InvitationRow> for TeamInvitation {
    type Error = AppError;

    fn try_from(row: InvitationRow) -> Result<Self> {
        Ok(TeamInvitation {
            id: parse_uuid(&row.id, "invitation")?,
            artist_id: parse_uuid(&row.artist_id, "artist_id")?,
            email: row.email,
            name: row.name,
            role: TeamRole::from_parts(&row.role, row.custom_role)
                .map_err(|e| AppError::Internal(format!("Invalid role: {}", e)))?,
            status: row
                .status
                .parse()
                .map_err(|e| AppError::Internal(format!("Invalid status: {}", e)))?,
            expires_at: row.expires_at,
            message: row.message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArtistProfile;
    use crate::store::test_store;
    use chrono::Duration;

    async fn artist(store: &Store) -> ArtistProfile {
        let (_, artist) = store
            .register_identity("Owner", "owner@example.com", "hash", Some("Band"))
            .await
            .unwrap();
        artist.unwrap()
    }

    fn invite(email: &str) -> NewInvitation {
        NewInvitation {
            email: email.to_string(),
            name: "Bob".to_string(),
            role: TeamRole::TourManager,
            message: Some("Join us".to_string()),
        }
    }

    async fn expire(store: &Store, id: Uuid) {
        sqlx::query("UPDATE team_invitations SET expires_at = ? WHERE id = ?")
            .bind(Utc::now() - Duration::minutes(1))
            .bind(id.to_string())
            .execute(store.pool())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_and_get_invitation() {
        let store = test_store().await;
        let artist = artist(&store).await;
        let expires_at = Utc::now() + Duration::days(7);

        let created = store
            .create_invitation(artist.id, &invite("Bob@Example.com"), "digest-1", expires_at)
            .await
            .unwrap();
        assert_eq!(created.email, "bob@example.com");
        assert_eq!(created.status, InvitationStatus::Pending);

        let fetched = store.get_invitation(created.id).await.unwrap();
        assert_eq!(fetched.role, TeamRole::TourManager);
        assert_eq!(fetched.message.as_deref(), Some("Join us"));
    }

    #[tokio::test]
    async fn test_duplicate_pending_invitation_conflicts() {
        let store = test_store().await;
        let artist = artist(&store).await;
        let expires_at = Utc::now() + Duration::days(7);

        store
            .create_invitation(artist.id, &invite("bob@example.com"), "digest-1", expires_at)
            .await
            .unwrap();
        let result = store
            .create_invitation(artist.id, &invite("bob@example.com"), "digest-2", expires_at)
            .await;
        assert!(matches!(result.unwrap_err(), AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_expired_pending_invitation_is_flipped() {
        let store = test_store().await;
        let artist = artist(&store).await;
        let expires_at = Utc::now() + Duration::days(7);

        let first = store
            .create_invitation(artist.id, &invite("bob@example.com"), "digest-1", expires_at)
            .await
            .unwrap();
        expire(&store, first.id).await;

        let second = store
            .create_invitation(artist.id, &invite("bob@example.com"), "digest-2", expires_at)
            .await
            .unwrap();
        assert_ne!(first.id, second.id);

        let old = store.get_invitation(first.id).await.unwrap();
        assert_eq!(old.status, InvitationStatus::Expired);
    }

    #[tokio::test]
    async fn test_accept_creates_membership_once() {
        let store = test_store().await;
        let artist = artist(&store).await;
        let (bob, _) = store
            .register_identity("Bob", "bob@example.com", "hash", None)
            .await
            .unwrap();
        store
            .create_invitation(artist.id, &invite("bob@example.com"), "digest-1", Utc::now() + Duration::days(7))
            .await
            .unwrap();

        let (invitation, membership) = store.accept_invitation("digest-1", &bob, Utc::now()).await.unwrap();
        assert_eq!(invitation.status, InvitationStatus::Accepted);
        assert_eq!(membership.identity_id, Some(bob.id));
        assert_eq!(membership.role, TeamRole::TourManager);
        assert!(membership.joined_at.is_some());

        let again = store.accept_invitation("digest-1", &bob, Utc::now()).await;
        assert!(matches!(again.unwrap_err(), AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_accept_expired_pending_is_not_found() {
        let store = test_store().await;
        let artist = artist(&store).await;
        let (bob, _) = store
            .register_identity("Bob", "bob@example.com", "hash", None)
            .await
            .unwrap();
        let created = store
            .create_invitation(artist.id, &invite("bob@example.com"), "digest-1", Utc::now() + Duration::days(7))
            .await
            .unwrap();
        expire(&store, created.id).await;

        let result = store.accept_invitation("digest-1", &bob, Utc::now()).await;
        assert!(matches!(result.unwrap_err(), AppError::NotFound(_)));

        // stored status untouched by the failed attempt
        let stored = store.get_invitation(created.id).await.unwrap();
        assert_eq!(stored.status, InvitationStatus::Pending);
    }

    #[tokio::test]
    async fn test_accept_by_existing_member_rolls_back() {
        let store = test_store().await;
        let artist = artist(&store).await;
        let (bob, _) = store
            .register_identity("Bob", "bob@example.com", "hash", None)
            .await
            .unwrap();
        store
            .insert_membership(
                &NewMembership::member(artist.id, "Bob", "bob-old@example.com", TeamRole::Legal).for_identity(bob.id),
            )
            .await
            .unwrap();
        let created = store
            .create_invitation(artist.id, &invite("bob@example.com"), "digest-1", Utc::now() + Duration::days(7))
            .await
            .unwrap();

        let result = store.accept_invitation("digest-1", &bob, Utc::now()).await;
        assert!(matches!(result.unwrap_err(), AppError::Conflict(_)));

        let stored = store.get_invitation(created.id).await.unwrap();
        assert_eq!(stored.status, InvitationStatus::Pending);
    }

    #[tokio::test]
    async fn test_decline_invitation() {
        let store = test_store().await;
        let artist = artist(&store).await;
        store
            .create_invitation(artist.id, &invite("bob@example.com"), "digest-1", Utc::now() + Duration::days(7))
            .await
            .unwrap();

        let declined = store.decline_invitation("digest-1", Utc::now()).await.unwrap();
        assert_eq!(declined.status, InvitationStatus::Declined);

        let result = store.decline_invitation("digest-1", Utc::now()).await;
        assert!(matches!(result.unwrap_err(), AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_pending_skips_expired_and_resolved() {
        let store = test_store().await;
        let artist = artist(&store).await;
        let expires_at = Utc::now() + Duration::days(7);

        let live = store
            .create_invitation(artist.id, &invite("a@example.com"), "d-a", expires_at)
            .await
            .unwrap();
        let stale = store
            .create_invitation(artist.id, &invite("b@example.com"), "d-b", expires_at)
            .await
            .unwrap();
        expire(&store, stale.id).await;
        store
            .create_invitation(artist.id, &invite("c@example.com"), "d-c", expires_at)
            .await
            .unwrap();
        store.decline_invitation("d-c", Utc::now()).await.unwrap();

        let pending = store.list_pending_invitations(artist.id, Utc::now()).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, live.id);
    }

    #[tokio::test]
    async fn test_resolve_pending_requires_terminal_status() {
        let store = test_store().await;
        let artist = artist(&store).await;
        store
            .create_invitation(artist.id, &invite("bob@example.com"), "digest-1", Utc::now() + Duration::days(7))
            .await
            .unwrap();

        let mut conn = store.pool().acquire().await.unwrap();
        let result = resolve_pending(&mut *conn, "digest-1", InvitationStatus::Pending, Utc::now()).await;
        assert!(matches!(result.unwrap_err(), AppError::Internal(_)));

        let resolved = resolve_pending(&mut *conn, "digest-1", InvitationStatus::Expired, Utc::now())
            .await
            .unwrap();
        assert_eq!(resolved.status, InvitationStatus::Expired);
    }

    #[tokio::test]
    async fn test_invite_existing_member_conflicts() {
        let store = test_store().await;
        let artist = artist(&store).await;
        store
            .insert_membership(&NewMembership::member(artist.id, "Bob", "bob@example.com", TeamRole::Legal))
            .await
            .unwrap();

        let result = store
            .create_invitation(artist.id, &invite("BOB@example.com"), "digest-1", Utc::now() + Duration::days(7))
            .await;
        assert!(matches!(result.unwrap_err(), AppError::Conflict(_)));
    }
}
