//! HTTP routes

pub mod artist;
pub mod auth;
pub mod extract;
pub mod middleware;
pub mod team;
pub mod views;

use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};

use crate::AppState;

/// All routes; everything except health, login and registration requires a
/// bearer token.
pub fn router(state: Arc<AppState>) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register));

    let protected = Router::new()
        .route("/me", get(auth::me))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/contexts", get(auth::contexts))
        .route("/auth/switch-context", post(auth::switch_context))
        .route("/artist/profile", get(artist::get_profile).put(artist::update_profile))
        .route("/team/members", get(team::list_members))
        .route("/team/members/:id", put(team::update_member).delete(team::remove_member))
        .route("/team/invite", post(team::invite))
        .route("/team/invitations", get(team::list_invitations))
        .route("/team/accept-invitation/:token", post(team::accept_invitation))
        .route("/team/decline-invitation/:token", post(team::decline_invitation))
        .route("/team/set-own-agent", post(team::set_own_agent))
        .route("/team/roles", get(team::roles))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth));

    public.merge(protected).with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
