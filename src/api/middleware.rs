//! Bearer authentication middleware
//!
//! Resolves `Authorization: Bearer <token>` to an identity and makes it
//! available to handlers as an [`Extension`](axum::Extension).

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::error::{AppError, Result};
use crate::models::Identity;
use crate::AppState;

/// The authenticated caller
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

/// The raw bearer token of the current request
#[derive(Clone)]
pub struct BearerToken(pub String);

pub fn bearer_token(request: &Request) -> Result<String> {
    let value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthenticated("Missing Authorization header".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            AppError::Unauthenticated("Invalid Authorization header format. Expected 'Bearer <token>'".to_string())
        })
}

pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = bearer_token(&request)?;
    let identity = state.auth.authenticate(&token).await?;

    request.extensions_mut().insert(Caller(identity));
    request.extensions_mut().insert(BearerToken(token));

    Ok(next.run(request).await)
}
