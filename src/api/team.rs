//! Team routes
//!
//! Every route acts on the caller's current artist.

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde_json::{json, Value};
use uuid::Uuid;

use super::extract::{JsonBody, PathParam};
use super::middleware::Caller;
use super::views::{InvitationView, MemberView, RoleOption};
use crate::access::Capability;
use crate::error::{AppError, Result};
use crate::models::{
    ArtistProfile, Identity, InviteRequest, MembershipUpdate, NewInvitation, TeamRole, UpdateMemberRequest,
};
use crate::validation::{validate_email, validate_length, validate_text, MAX_NAME_LENGTH};
use crate::AppState;

pub const ARTIST_NOT_FOUND: &str = "Artist profile not found";

async fn current_artist(state: &AppState, identity: &Identity) -> Result<ArtistProfile> {
    state
        .resolver
        .current_artist(identity)
        .await?
        .ok_or_else(|| AppError::NotFound(ARTIST_NOT_FOUND.to_string()))
}

fn parse_role(role: &str, custom_role: Option<&str>) -> Result<TeamRole> {
    if let Some(label) = custom_role {
        validate_length("custom_role", label, 0, MAX_NAME_LENGTH)?;
    }
    TeamRole::from_parts(role, custom_role.map(|l| l.trim().to_string()))
        .map_err(|_| AppError::BadRequest(format!("The selected role '{}' is invalid", role)))
}

pub async fn list_members(
    State(state): State<Arc<AppState>>,
    Extension(Caller(identity)): Extension<Caller>,
) -> Result<Json<Value>> {
    state
        .gate
        .guarded(Some(&identity), None, || async {
            let artist = current_artist(&state, &identity).await?;
            let members: Vec<MemberView> = state.ledger.list(artist.id).await?.iter().map(MemberView::from).collect();
            Ok::<_, AppError>(Json(json!({
                "team_members": members,
                "total_count": members.len(),
            })))
        })
        .await
}

pub async fn invite(
    State(state): State<Arc<AppState>>,
    Extension(Caller(identity)): Extension<Caller>,
    JsonBody(req): JsonBody<InviteRequest>,
) -> Result<Json<Value>> {
    state
        .gate
        .guarded(Some(&identity), Some(Capability::InviteMembers.as_str()), || async {
            let artist = current_artist(&state, &identity).await?;

            validate_length("name", req.name.trim(), 1, MAX_NAME_LENGTH)?;
            validate_email(&req.email)?;
            validate_text("message", req.message.as_deref())?;
            let role = parse_role(&req.role, req.custom_role.as_deref())?;

            let invitation = state
                .invitations
                .create(
                    artist.id,
                    &NewInvitation {
                        email: req.email.clone(),
                        name: req.name.trim().to_string(),
                        role,
                        message: req.message.clone(),
                    },
                )
                .await?;

            Ok::<_, AppError>(Json(json!({
                "message": "Invitation sent successfully",
                "invitation": InvitationView::from(&invitation),
            })))
        })
        .await
}

pub async fn list_invitations(
    State(state): State<Arc<AppState>>,
    Extension(Caller(identity)): Extension<Caller>,
) -> Result<Json<Value>> {
    state
        .gate
        .guarded(Some(&identity), Some(Capability::InviteMembers.as_str()), || async {
            let artist = current_artist(&state, &identity).await?;
            let invitations: Vec<InvitationView> = state
                .invitations
                .list_pending(artist.id)
                .await?
                .iter()
                .map(InvitationView::from)
                .collect();
            Ok::<_, AppError>(Json(json!({
                "invitations": invitations,
                "total_count": invitations.len(),
            })))
        })
        .await
}

/// Attach the caller to the inviting team. No capability is required; the
/// token itself is the credential.
pub async fn accept_invitation(
    State(state): State<Arc<AppState>>,
    Extension(Caller(identity)): Extension<Caller>,
    PathParam(token): PathParam<String>,
) -> Result<Json<Value>> {
    let membership = state.invitations.accept(&token, &identity).await?;
    state.resolver.refresh_contexts(&identity).await?;

    Ok(Json(json!({
        "message": "Invitation accepted successfully",
        "team_member": MemberView::from(&membership),
    })))
}

pub async fn decline_invitation(
    State(state): State<Arc<AppState>>,
    Extension(Caller(_)): Extension<Caller>,
    PathParam(token): PathParam<String>,
) -> Result<Json<Value>> {
    state.invitations.decline(&token).await?;
    Ok(Json(json!({ "message": "Invitation declined" })))
}

pub async fn update_member(
    State(state): State<Arc<AppState>>,
    Extension(Caller(identity)): Extension<Caller>,
    PathParam(id): PathParam<Uuid>,
    JsonBody(req): JsonBody<UpdateMemberRequest>,
) -> Result<Json<Value>> {
    state
        .gate
        .guarded(Some(&identity), Some(Capability::ManageTeam.as_str()), || async {
            let artist = current_artist(&state, &identity).await?;
            let current = state.ledger.get_for_artist(artist.id, id).await?;

            if let Some(name) = &req.name {
                validate_length("name", name.trim(), 1, MAX_NAME_LENGTH)?;
            }
            if let Some(email) = &req.email {
                validate_email(email)?;
            }
            if let Some(phone) = &req.phone {
                validate_length("phone", phone, 0, MAX_NAME_LENGTH)?;
            }

            let role = match (&req.role, &req.custom_role) {
                (Some(role), custom) => Some(parse_role(role, custom.as_deref())?),
                // relabel an existing custom role
                (None, Some(label)) if matches!(current.role, TeamRole::Custom(_)) => {
                    Some(parse_role("custom", Some(label.as_str()))?)
                }
                (None, _) => None,
            };

            let update = MembershipUpdate {
                name: req.name.as_deref().map(|n| n.trim().to_string()),
                email: req.email.clone(),
                phone: req.phone.clone(),
                role,
                is_primary: req.is_primary,
                can_invite_others: req.can_invite_others,
                can_manage_bookings: req.can_manage_bookings,
                can_access_financials: req.can_access_financials,
            };
            let membership = state.ledger.update(artist.id, id, &update).await?;

            Ok::<_, AppError>(Json(json!({
                "message": "Team member updated successfully",
                "team_member": MemberView::from(&membership),
            })))
        })
        .await
}

pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    Extension(Caller(identity)): Extension<Caller>,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<Value>> {
    state
        .gate
        .guarded(Some(&identity), Some(Capability::ManageTeam.as_str()), || async {
            let artist = current_artist(&state, &identity).await?;
            state.ledger.deactivate(artist.id, id, &identity).await?;
            Ok::<_, AppError>(Json(json!({ "message": "Team member removed successfully" })))
        })
        .await
}

/// The caller becomes primary agent of the artist profile they own
pub async fn set_own_agent(
    State(state): State<Arc<AppState>>,
    Extension(Caller(identity)): Extension<Caller>,
) -> Result<Json<Value>> {
    state
        .gate
        .guarded(Some(&identity), None, || async {
            let artist = state
                .store
                .find_artist_by_owner(identity.id)
                .await?
                .ok_or_else(|| AppError::NotFound(ARTIST_NOT_FOUND.to_string()))?;

            let membership = state.ledger.set_own_agent(&identity, &artist).await?;
            state.resolver.refresh_contexts(&identity).await?;

            Ok::<_, AppError>(Json(json!({
                "message": "You are now set as your own agent",
                "team_member": MemberView::from(&membership),
            })))
        })
        .await
}

pub async fn roles() -> Json<Value> {
    let roles: Vec<RoleOption> = TeamRole::catalog()
        .into_iter()
        .map(|(value, label)| RoleOption { value, label })
        .collect();
    Json(json!({ "roles": roles }))
}
