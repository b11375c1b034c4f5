//! Owned artist profile routes

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde_json::{json, Value};

use super::extract::JsonBody;
use super::middleware::Caller;
use super::team::ARTIST_NOT_FOUND;
use super::views::ArtistProfileView;
use crate::error::{AppError, Result};
use crate::models::{ArtistProfile, Identity, UpdateProfileRequest};
use crate::validation::{validate_length, validate_text, MAX_NAME_LENGTH};
use crate::AppState;

async fn owned_artist(state: &AppState, identity: &Identity) -> Result<ArtistProfile> {
    state
        .store
        .find_artist_by_owner(identity.id)
        .await?
        .ok_or_else(|| AppError::NotFound(ARTIST_NOT_FOUND.to_string()))
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(Caller(identity)): Extension<Caller>,
) -> Result<Json<Value>> {
    let artist = owned_artist(&state, &identity).await?;
    Ok(Json(json!({ "artist": ArtistProfileView::from(&artist) })))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(Caller(identity)): Extension<Caller>,
    JsonBody(req): JsonBody<UpdateProfileRequest>,
) -> Result<Json<Value>> {
    let artist = owned_artist(&state, &identity).await?;

    let name = req.name.as_deref().map(str::trim);
    if let Some(name) = name {
        validate_length("name", name, 1, MAX_NAME_LENGTH)?;
    }
    validate_text("bio", req.bio.as_deref())?;

    let artist = state
        .store
        .update_artist_profile(artist.id, name, req.bio.as_deref())
        .await?;
    tracing::info!("Artist profile {} updated", artist.id);

    Ok(Json(json!({
        "message": "Profile updated successfully",
        "artist": ArtistProfileView::from(&artist),
    })))
}
