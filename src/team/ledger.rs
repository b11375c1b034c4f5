//! Team membership ledger
//!
//! Memberships are created through invitation acceptance or by an artist
//! acting as their own agent, and are deactivated rather than deleted.

use chrono::Utc;
use uuid::Uuid;

use super::events::{TeamEvent, TeamEvents};
use crate::error::{AppError, Result};
use crate::models::{ArtistProfile, Identity, MembershipUpdate, NewMembership, TeamMembership, TeamRole};
use crate::store::Store;

#[derive(Clone)]
pub struct TeamLedger {
    store: Store,
    events: TeamEvents,
}

impl TeamLedger {
    pub fn new(store: Store, events: TeamEvents) -> Self {
        Self { store, events }
    }

    /// Record a new membership; the store rejects duplicate active members
    /// and a second primary agent.
    pub async fn add_membership(&self, new: NewMembership) -> Result<TeamMembership> {
        let membership = self.store.insert_membership(&new).await?;
        tracing::info!(
            "Membership {} created for artist {} as {}",
            membership.id,
            membership.artist_id,
            membership.role.as_str()
        );
        self.events.emit(TeamEvent::MembershipCreated {
            membership_id: membership.id,
            artist_id: membership.artist_id,
            role: membership.role.clone(),
        });
        Ok(membership)
    }

    /// The identity's active agent membership on the artist's team, if any
    pub async fn own_agent_membership(&self, artist: &ArtistProfile, identity: &Identity) -> Result<Option<TeamMembership>> {
        self.store.find_active_agent_membership(artist.id, identity.id).await
    }

    /// Make the artist's owner their own primary agent. Idempotent.
    pub async fn set_own_agent(&self, identity: &Identity, artist: &ArtistProfile) -> Result<TeamMembership> {
        if artist.owner_id != identity.id {
            return Err(AppError::forbidden("Only the artist can act as their own agent"));
        }

        if let Some(existing) = self.own_agent_membership(artist, identity).await? {
            return Ok(existing);
        }

        let new = NewMembership::member(artist.id, identity.name.clone(), identity.email.clone(), TeamRole::Agent)
            .for_identity(identity.id)
            .primary()
            .with_flags(true, true, true)
            .joined(Utc::now());

        match self.add_membership(new).await {
            Ok(membership) => Ok(membership),
            // a concurrent call may have created it first
            Err(AppError::Conflict(message)) => match self.own_agent_membership(artist, identity).await? {
                Some(existing) => Ok(existing),
                None => Err(AppError::Conflict(message)),
            },
            Err(e) => Err(e),
        }
    }

    pub async fn list(&self, artist_id: Uuid) -> Result<Vec<TeamMembership>> {
        self.store.list_active_memberships_for_artist(artist_id).await
    }

    /// Fetch an active membership, reporting a removed one or one from
    /// another artist's team as missing
    pub async fn get_for_artist(&self, artist_id: Uuid, membership_id: Uuid) -> Result<TeamMembership> {
        let membership = self.store.get_membership(membership_id).await?;
        if membership.artist_id != artist_id || !membership.is_active {
            return Err(AppError::NotFound(format!("Team member {} not found", membership_id)));
        }
        Ok(membership)
    }

    pub async fn update(&self, artist_id: Uuid, membership_id: Uuid, update: &MembershipUpdate) -> Result<TeamMembership> {
        self.get_for_artist(artist_id, membership_id).await?;
        let membership = self.store.update_membership(membership_id, update).await?;
        tracing::info!("Membership {} updated", membership.id);
        self.events.emit(TeamEvent::MembershipUpdated {
            membership_id: membership.id,
            artist_id: membership.artist_id,
        });
        Ok(membership)
    }

    /// Deactivate a membership. A primary agent cannot remove themself.
    pub async fn deactivate(&self, artist_id: Uuid, membership_id: Uuid, requester: &Identity) -> Result<()> {
        let membership = self.get_for_artist(artist_id, membership_id).await?;

        if membership.identity_id == Some(requester.id) && membership.is_primary_agent() {
            return Err(AppError::forbidden("Cannot remove yourself as the primary agent"));
        }

        self.store.deactivate_membership(membership_id).await?;
        tracing::info!("Membership {} deactivated by {}", membership_id, requester.id);
        self.events.emit(TeamEvent::MembershipDeactivated {
            membership_id,
            artist_id,
            deactivated_by: requester.id,
        });
        Ok(())
    }
}
