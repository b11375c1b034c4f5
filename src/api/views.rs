//! Response shapes

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::access::{CurrentRole, Permissions};
use crate::error::Result;
use crate::models::{ArtistProfile, ContextKind, Identity, InvitationStatus, TeamInvitation, TeamMembership};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ArtistSummary {
    pub id: Uuid,
    pub name: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

impl From<&ArtistProfile> for ArtistSummary {
    fn from(artist: &ArtistProfile) -> Self {
        Self {
            id: artist.id,
            name: artist.name.clone(),
            bio: artist.bio.clone(),
            avatar: artist.avatar.clone(),
        }
    }
}

/// The caller as seen from its current context
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub current_context: Option<ContextKind>,
    pub available_contexts: Vec<ContextKind>,
    pub is_multi_role: bool,
    pub current_role: Option<CurrentRole>,
    pub permissions: Permissions,
    pub artist: Option<ArtistSummary>,
}

impl UserView {
    pub async fn build(state: &AppState, identity: &Identity) -> Result<Self> {
        let artist = state.resolver.current_artist(identity).await?;
        let current_role = state.resolver.current_role(identity).await?;
        let permissions = state.evaluator.permissions(identity).await?;

        Ok(Self {
            id: identity.id,
            name: identity.name.clone(),
            email: identity.email.clone(),
            current_context: identity.current_context,
            available_contexts: identity.available_contexts.iter().copied().collect(),
            is_multi_role: identity.is_multi_role,
            current_role,
            permissions,
            artist: artist.as_ref().map(ArtistSummary::from),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub user: UserView,
}

#[derive(Debug, Serialize)]
pub struct ContextsView {
    pub available_contexts: Vec<ContextKind>,
    pub current_context: Option<ContextKind>,
    pub is_multi_role: bool,
}

impl From<&Identity> for ContextsView {
    fn from(identity: &Identity) -> Self {
        Self {
            available_contexts: identity.available_contexts.iter().copied().collect(),
            current_context: identity.current_context,
            is_multi_role: identity.is_multi_role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MemberView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    pub role_display: String,
    pub custom_role: Option<String>,
    pub is_primary: bool,
    pub can_invite_others: bool,
    pub can_manage_bookings: bool,
    pub can_access_financials: bool,
    pub permissions: Vec<String>,
    pub joined_at: Option<DateTime<Utc>>,
    pub is_registered_user: bool,
}

impl From<&TeamMembership> for MemberView {
    fn from(m: &TeamMembership) -> Self {
        Self {
            id: m.id,
            name: m.name.clone(),
            email: m.email.clone(),
            phone: m.phone.clone(),
            role: m.role.as_str().to_string(),
            role_display: m.role.display_name().to_string(),
            custom_role: m.role.custom_label().map(str::to_string),
            is_primary: m.is_primary,
            can_invite_others: m.can_invite_others,
            can_manage_bookings: m.can_manage_bookings,
            can_access_financials: m.can_access_financials,
            permissions: m.permissions.clone(),
            joined_at: m.joined_at,
            is_registered_user: m.identity_id.is_some(),
        }
    }
}

/// Invitation summary; never carries the token
#[derive(Debug, Serialize)]
pub struct InvitationView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub role_display: String,
    pub status: InvitationStatus,
    pub message: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<&TeamInvitation> for InvitationView {
    fn from(i: &TeamInvitation) -> Self {
        Self {
            id: i.id,
            name: i.name.clone(),
            email: i.email.clone(),
            role: i.role.as_str().to_string(),
            role_display: i.role.display_name().to_string(),
            status: i.status,
            message: i.message.clone(),
            expires_at: i.expires_at,
            created_at: i.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RoleOption {
    pub value: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ArtistProfileView {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub agency_id: Option<String>,
}

impl From<&ArtistProfile> for ArtistProfileView {
    fn from(a: &ArtistProfile) -> Self {
        Self {
            id: a.id,
            name: a.name.clone(),
            email: a.email.clone(),
            bio: a.bio.clone(),
            avatar: a.avatar.clone(),
            agency_id: a.agency_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TeamRole;

    #[test]
    fn test_member_view_custom_role() {
        let now = Utc::now();
        let membership = TeamMembership {
            id: Uuid::new_v4(),
            artist_id: Uuid::new_v4(),
            identity_id: None,
            name: "Kim".to_string(),
            email: "kim@example.com".to_string(),
            phone: None,
            role: TeamRole::Custom("Merch Lead".to_string()),
            is_primary: false,
            can_invite_others: false,
            can_manage_bookings: false,
            can_access_financials: false,
            permissions: vec![],
            is_active: true,
            joined_at: None,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(MemberView::from(&membership)).unwrap();
        assert_eq!(json["role"], "custom");
        assert_eq!(json["role_display"], "Merch Lead");
        assert_eq!(json["custom_role"], "Merch Lead");
        assert_eq!(json["is_registered_user"], false);
    }
}
