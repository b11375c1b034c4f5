//! Context resolution for identities
//!
//! The set of contexts an identity may adopt is derived from the ledger,
//! persisted on the identity, and only changed through [`ContextResolver::refresh_contexts`]
//! and [`ContextResolver::switch_context`].

use std::collections::BTreeSet;

use serde::{Serialize, Serializer};

use crate::error::Result;
use crate::models::{ArtistProfile, ContextKind, Identity, TeamMembership, TeamRole};
use crate::store::Store;

/// Role an identity is currently acting in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentRole {
    Artist,
    Agent,
    Team(TeamRole),
}

impl CurrentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CurrentRole::Artist => "artist",
            CurrentRole::Agent => "agent",
            CurrentRole::Team(role) => role.as_str(),
        }
    }
}

impl Serialize for CurrentRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Clone)]
pub struct ContextResolver {
    store: Store,
}

impl ContextResolver {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Contexts the ledger currently justifies for `identity`. No side effects.
    pub async fn compute_available_contexts(&self, identity: &Identity) -> Result<BTreeSet<ContextKind>> {
        let mut contexts = BTreeSet::new();

        if self.store.find_artist_by_owner(identity.id).await?.is_some() {
            contexts.insert(ContextKind::Artist);
        }

        for membership in self.store.list_active_memberships_for_identity(identity.id).await? {
            if membership.is_primary_agent() {
                contexts.insert(ContextKind::Agent);
            } else {
                contexts.insert(ContextKind::TeamMember);
            }
        }

        Ok(contexts)
    }

    /// Recompute and persist the context set, returning the stored identity.
    ///
    /// A missing or no-longer-available `current_context` falls back to the
    /// highest-priority available context (or none).
    pub async fn refresh_contexts(&self, identity: &Identity) -> Result<Identity> {
        let available = self.compute_available_contexts(identity).await?;
        let current = identity
            .current_context
            .filter(|c| available.contains(c))
            .or_else(|| available.first().copied());

        if current != identity.current_context {
            tracing::debug!(
                "Context for identity {} reset from {:?} to {:?}",
                identity.id,
                identity.current_context,
                current
            );
        }

        self.store.save_contexts(identity.id, &available, current).await?;
        self.store.get_identity(identity.id).await
    }

    /// Activate `requested` if it is in the stored context set.
    ///
    /// The check runs against what was last persisted, not a fresh computation.
    pub async fn switch_context(&self, identity: &Identity, requested: ContextKind) -> Result<bool> {
        let switched = self.store.switch_context_if_available(identity.id, requested).await?;
        if switched {
            tracing::info!("Identity {} switched context to {}", identity.id, requested);
        } else {
            tracing::debug!("Identity {} cannot switch to {}", identity.id, requested);
        }
        Ok(switched)
    }

    /// Ledger entry backing the current `agent` or `team_member` context.
    ///
    /// Oldest matching membership wins when more than one qualifies.
    pub async fn current_membership(&self, identity: &Identity) -> Result<Option<TeamMembership>> {
        let wants_primary_agent = match identity.current_context {
            Some(ContextKind::Agent) => true,
            Some(ContextKind::TeamMember) => false,
            _ => return Ok(None),
        };

        let memberships = self.store.list_active_memberships_for_identity(identity.id).await?;
        Ok(memberships
            .into_iter()
            .find(|m| m.is_primary_agent() == wants_primary_agent))
    }

    /// Artist the identity is acting for in its current context
    pub async fn current_artist(&self, identity: &Identity) -> Result<Option<ArtistProfile>> {
        match identity.current_context {
            Some(ContextKind::Artist) => self.store.find_artist_by_owner(identity.id).await,
            Some(ContextKind::Agent) | Some(ContextKind::TeamMember) => {
                match self.current_membership(identity).await? {
                    Some(membership) => Ok(Some(self.store.get_artist(membership.artist_id).await?)),
                    None => Ok(None),
                }
            }
            _ => Ok(None),
        }
    }

    pub async fn current_role(&self, identity: &Identity) -> Result<Option<CurrentRole>> {
        match identity.current_context {
            Some(ContextKind::Artist) => Ok(Some(CurrentRole::Artist)),
            Some(ContextKind::Agent) => Ok(Some(CurrentRole::Agent)),
            Some(ContextKind::TeamMember) => Ok(self
                .current_membership(identity)
                .await?
                .map(|m| CurrentRole::Team(m.role))),
            _ => Ok(None),
        }
    }
}
