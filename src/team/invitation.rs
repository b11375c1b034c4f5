//! Invitation workflow
//!
//! `pending -> accepted | declined | expired`. Tokens are random, delivered
//! only through [`TeamEvent::InvitationCreated`], and stored as digests.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::events::{TeamEvent, TeamEvents};
use crate::auth::token::{generate_token, hash_token};
use crate::error::Result;
use crate::models::{Identity, NewInvitation, TeamInvitation, TeamMembership};
use crate::store::Store;

/// Lifetime of an invitation from creation
pub const INVITATION_TTL_DAYS: i64 = 7;

#[derive(Clone)]
pub struct InvitationWorkflow {
    store: Store,
    events: TeamEvents,
}

impl InvitationWorkflow {
    pub fn new(store: Store, events: TeamEvents) -> Self {
        Self { store, events }
    }

    pub async fn create(&self, artist_id: Uuid, new: &NewInvitation) -> Result<TeamInvitation> {
        let token = generate_token();
        let expires_at = Utc::now() + Duration::days(INVITATION_TTL_DAYS);

        let invitation = self
            .store
            .create_invitation(artist_id, new, &hash_token(&token), expires_at)
            .await?;

        tracing::info!(
            "Invitation {} created for artist {} ({})",
            invitation.id,
            artist_id,
            invitation.role.as_str()
        );
        self.events.emit(TeamEvent::InvitationCreated {
            invitation_id: invitation.id,
            artist_id,
            email: invitation.email.clone(),
            token,
        });
        Ok(invitation)
    }

    /// Consume `token` and attach `identity` to the inviting artist's team.
    ///
    /// Unknown, consumed and expired tokens all fail with the same `NotFound`.
    pub async fn accept(&self, token: &str, identity: &Identity) -> Result<TeamMembership> {
        let (invitation, membership) = self
            .store
            .accept_invitation(&hash_token(token), identity, Utc::now())
            .await?;

        tracing::info!(
            "Invitation {} accepted by {}, membership {}",
            invitation.id,
            identity.id,
            membership.id
        );
        self.events.emit(TeamEvent::InvitationAccepted {
            invitation_id: invitation.id,
            membership_id: membership.id,
            identity_id: identity.id,
        });
        self.events.emit(TeamEvent::MembershipCreated {
            membership_id: membership.id,
            artist_id: membership.artist_id,
            role: membership.role.clone(),
        });
        Ok(membership)
    }

    pub async fn decline(&self, token: &str) -> Result<TeamInvitation> {
        let invitation = self.store.decline_invitation(&hash_token(token), Utc::now()).await?;

        tracing::info!("Invitation {} declined", invitation.id);
        self.events.emit(TeamEvent::InvitationDeclined {
            invitation_id: invitation.id,
            artist_id: invitation.artist_id,
        });
        Ok(invitation)
    }

    pub async fn list_pending(&self, artist_id: Uuid) -> Result<Vec<TeamInvitation>> {
        self.store.list_pending_invitations(artist_id, Utc::now()).await
    }

    pub fn is_expired(invitation: &TeamInvitation, now: DateTime<Utc>) -> bool {
        invitation.is_expired_at(now)
    }

    pub fn is_pending(invitation: &TeamInvitation, now: DateTime<Utc>) -> bool {
        invitation.is_pending_at(now)
    }
}
