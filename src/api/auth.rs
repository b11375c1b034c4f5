//! Authentication and context routes

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde_json::{json, Value};

use super::extract::JsonBody;
use super::middleware::{BearerToken, Caller};
use super::views::{ContextsView, SessionResponse, UserView};
use crate::auth::Session;
use crate::error::Result;
use crate::models::{LoginRequest, RegisterRequest, SwitchContextRequest};
use crate::AppState;

async fn session_response(state: &AppState, session: Session) -> Result<Json<SessionResponse>> {
    let user = UserView::build(state, &session.identity).await?;
    Ok(Json(SessionResponse {
        token: session.token,
        token_type: "Bearer",
        expires_at: session.expires_at,
        user,
    }))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<Json<SessionResponse>> {
    let session = state.auth.register(&req).await?;
    session_response(&state, session).await
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<SessionResponse>> {
    let session = state.auth.login(&req).await?;
    session_response(&state, session).await
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> Result<Json<Value>> {
    state.auth.logout(&token).await?;
    Ok(Json(json!({ "message": "Logged out successfully" })))
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> Result<Json<SessionResponse>> {
    let session = state.auth.refresh(&token).await?;
    session_response(&state, session).await
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(Caller(identity)): Extension<Caller>,
) -> Result<Json<Value>> {
    let user = UserView::build(&state, &identity).await?;
    Ok(Json(json!({ "user": user })))
}

/// Refreshes the stored context set before reporting it
pub async fn contexts(
    State(state): State<Arc<AppState>>,
    Extension(Caller(identity)): Extension<Caller>,
) -> Result<Json<ContextsView>> {
    let identity = state.resolver.refresh_contexts(&identity).await?;
    Ok(Json(ContextsView::from(&identity)))
}

pub async fn switch_context(
    State(state): State<Arc<AppState>>,
    Extension(Caller(identity)): Extension<Caller>,
    JsonBody(req): JsonBody<SwitchContextRequest>,
) -> Result<Json<Value>> {
    let identity = state.auth.switch(&identity, &req.context).await?;
    let user = UserView::build(&state, &identity).await?;
    Ok(Json(json!({
        "message": format!("Switched to {} context", req.context),
        "user": user,
    })))
}
