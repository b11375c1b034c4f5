//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use axum::{body::Body, Router};
use backstage::{api, team::TeamEvent, AppState};
use hyper::{Method, Request, StatusCode};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::broadcast;
use tower::ServiceExt;

pub const PASSWORD: &str = "correct-horse";

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
}

pub async fn setup_app() -> TestApp {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    let state = AppState::new(pool);
    state.store.migrate().await.expect("Failed to run migrations");

    TestApp {
        router: api::router(state.clone()),
        state,
    }
}

impl TestApp {
    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    /// Register and return the bearer token
    pub async fn register(&self, name: &str, email: &str, artist_name: Option<&str>) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({
                    "name": name,
                    "email": email,
                    "password": PASSWORD,
                    "artist_name": artist_name,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }

    /// Log in again so the returned user reflects fresh contexts
    pub async fn login(&self, email: &str, context: Option<&str>) -> (StatusCode, Value) {
        self.request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": email, "password": PASSWORD, "context": context })),
        )
        .await
    }

    /// Send an invitation and capture its token from the event bus
    pub async fn invite(&self, token: &str, email: &str, role: &str) -> (StatusCode, Value, Option<String>) {
        let mut events = self.state.events.subscribe();
        let (status, body) = self
            .post(
                "/team/invite",
                token,
                json!({ "name": "Invitee", "email": email, "role": role }),
            )
            .await;
        (status, body, invitation_token(&mut events))
    }
}

pub fn invitation_token(events: &mut broadcast::Receiver<TeamEvent>) -> Option<String> {
    while let Ok(event) = events.try_recv() {
        if let TeamEvent::InvitationCreated { token, .. } = event {
            return Some(token);
        }
    }
    None
}
