//! Error types for the application

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::access::Permissions;
use crate::models::ContextKind;

/// Diagnostics attached to a capability denial.
///
/// Only ever describes the caller's own context, never other users' data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub required: String,
    pub current_context: Option<ContextKind>,
    pub permissions: Permissions,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Context unavailable: {message}")]
    ContextUnavailable {
        message: String,
        available_contexts: Vec<ContextKind>,
    },

    #[error("Forbidden: {message}")]
    Forbidden {
        message: String,
        denial: Option<Box<Denial>>,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Forbidden without capability diagnostics (e.g. disallowed self-removal).
    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Forbidden {
            message: message.into(),
            denial: None,
        }
    }

    /// Stable machine-readable kind, echoed in every error body.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Database(_) | AppError::Internal(_) => "internal",
            AppError::Unauthenticated(_) => "unauthenticated",
            AppError::BadRequest(_) | AppError::ContextUnavailable { .. } => "bad_request",
            AppError::Forbidden { .. } => "forbidden",
            AppError::Conflict(_) => "conflict",
            AppError::NotFound(_) => "not_found",
        }
    }

    /// Map a unique-index violation to `Conflict`, pass everything else through.
    pub fn conflict_on_unique(err: sqlx::Error, message: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(message.to_string())
            }
            _ => AppError::Database(err),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let (status, body) = match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Database error", "kind": kind }),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": e, "kind": kind }),
                )
            }
            AppError::Unauthenticated(e) => {
                (StatusCode::UNAUTHORIZED, json!({ "error": e, "kind": kind }))
            }
            AppError::BadRequest(e) => {
                (StatusCode::BAD_REQUEST, json!({ "error": e, "kind": kind }))
            }
            AppError::ContextUnavailable {
                message,
                available_contexts,
            } => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": message,
                    "kind": kind,
                    "available_contexts": available_contexts,
                }),
            ),
            AppError::Forbidden { message, denial } => {
                let body = match denial {
                    Some(d) => json!({
                        "error": message,
                        "kind": kind,
                        "required_permission": d.required,
                        "current_context": d.current_context,
                        "current_permissions": d.permissions,
                    }),
                    None => json!({ "error": message, "kind": kind }),
                };
                (StatusCode::FORBIDDEN, body)
            }
            AppError::Conflict(e) => (StatusCode::CONFLICT, json!({ "error": e, "kind": kind })),
            AppError::NotFound(e) => (StatusCode::NOT_FOUND, json!({ "error": e, "kind": kind })),
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
