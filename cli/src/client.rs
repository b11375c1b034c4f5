//! HTTP client for the Backstage API

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use url::Url;

use crate::messages::{
    ApiError, Contexts, InvitationEnvelope, InviteRequest, LoginRequest, MemberEnvelope, Members,
    Message, Roles, Session, User, UserEnvelope,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid server URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message} ({status})")]
    Api { status: StatusCode, message: String },

    #[error("not logged in; pass --token or set BACKSTAGE_TOKEN")]
    MissingToken,
}

pub type Result<T> = std::result::Result<T, ClientError>;

pub struct BackstageClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl BackstageClient {
    pub fn new(server: &str, token: Option<String>) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            base: Url::parse(server)?,
            token,
        })
    }

    pub async fn login(&self, email: &str, password: &str, context: Option<&str>) -> Result<Session> {
        let body = LoginRequest {
            email,
            password,
            context,
        };
        self.send(Method::POST, "/auth/login", Some(&body), false).await
    }

    pub async fn me(&self) -> Result<User> {
        let envelope: UserEnvelope = self.send::<(), _>(Method::GET, "/me", None, true).await?;
        Ok(envelope.user)
    }

    pub async fn contexts(&self) -> Result<Contexts> {
        self.send::<(), _>(Method::GET, "/auth/contexts", None, true).await
    }

    pub async fn switch_context(&self, context: &str) -> Result<User> {
        let body = json!({ "context": context });
        let envelope: UserEnvelope = self
            .send(Method::POST, "/auth/switch-context", Some(&body), true)
            .await?;
        Ok(envelope.user)
    }

    pub async fn roles(&self) -> Result<Roles> {
        self.send::<(), _>(Method::GET, "/team/roles", None, true).await
    }

    pub async fn members(&self) -> Result<Members> {
        self.send::<(), _>(Method::GET, "/team/members", None, true).await
    }

    pub async fn invite(&self, request: &InviteRequest<'_>) -> Result<InvitationEnvelope> {
        self.send(Method::POST, "/team/invite", Some(request), true).await
    }

    pub async fn accept(&self, token: &str) -> Result<MemberEnvelope> {
        let path = format!("/team/accept-invitation/{}", token);
        self.send::<(), _>(Method::POST, &path, None, true).await
    }

    pub async fn decline(&self, token: &str) -> Result<Message> {
        let path = format!("/team/decline-invitation/{}", token);
        self.send::<(), _>(Method::POST, &path, None, true).await
    }

    async fn send<B, T>(&self, method: Method, path: &str, body: Option<&B>, authed: bool) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.base.join(path)?;
        tracing::debug!("{} {}", method, url);

        let mut request = self.http.request(method, url);
        if authed {
            let token = self.token.as_deref().ok_or(ClientError::MissingToken)?;
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await?;
        let message = serde_json::from_str::<ApiError>(&text)
            .map(|e| match e.available_contexts {
                Some(available) if !available.is_empty() => {
                    format!("{} (available: {})", e.error, available.join(", "))
                }
                _ => e.error,
            })
            .unwrap_or(text);
        Err(ClientError::Api { status, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn user_json() -> serde_json::Value {
        json!({
            "id": "5f0c2a64-8a4c-4f4b-9a55-3c1c0f4f1e11",
            "name": "Ann",
            "email": "ann@example.com",
            "current_context": "artist",
            "available_contexts": ["artist", "agent"],
            "is_multi_role": true,
            "current_role": "artist",
            "permissions": {
                "manage_team": true,
                "manage_bookings": true,
                "access_financials": true,
                "invite_members": true,
                "create_threads": true
            },
            "artist": {
                "id": "0b7d7c1e-2d55-4f39-8d8e-1e0c8e1b7a20",
                "name": "Ann Band",
                "bio": null,
                "avatar": null
            }
        })
    }

    #[tokio::test]
    async fn test_login_returns_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(json!({
                "email": "ann@example.com",
                "password": "correct-horse",
                "context": "agent"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": "tok",
                "token_type": "Bearer",
                "expires_at": "2030-01-01T00:00:00Z",
                "user": user_json()
            })))
            .mount(&server)
            .await;

        let client = BackstageClient::new(&server.uri(), None).unwrap();
        let session = client
            .login("ann@example.com", "correct-horse", Some("agent"))
            .await
            .unwrap();

        assert_eq!(session.token, "tok");
        assert!(session.user.is_multi_role);
        assert_eq!(session.user.artist.unwrap().name, "Ann Band");
    }

    #[tokio::test]
    async fn test_me_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user": user_json() })))
            .mount(&server)
            .await;

        let client = BackstageClient::new(&server.uri(), Some("tok".to_string())).unwrap();
        let user = client.me().await.unwrap();
        assert_eq!(user.email, "ann@example.com");
        assert_eq!(user.permissions.granted().len(), 5);
    }

    #[tokio::test]
    async fn test_missing_token_fails_before_request() {
        let server = MockServer::start().await;
        let client = BackstageClient::new(&server.uri(), None).unwrap();

        let err = client.members().await.unwrap_err();
        assert!(matches!(err, ClientError::MissingToken));
    }

    #[tokio::test]
    async fn test_error_body_surfaces_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/switch-context"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "The requested context is not available",
                "kind": "context_unavailable",
                "available_contexts": ["artist"]
            })))
            .mount(&server)
            .await;

        let client = BackstageClient::new(&server.uri(), Some("tok".to_string())).unwrap();
        let err = client.switch_context("agent").await.unwrap_err();
        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert!(message.contains("not available"));
                assert!(message.contains("available: artist"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_accept_hits_token_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/team/accept-invitation/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "Invitation accepted successfully",
                "team_member": {
                    "id": "9a1f5d0e-6b1c-4e0a-9a0e-3f6f0a7e2c44",
                    "name": "Bob",
                    "email": "bob@example.com",
                    "phone": null,
                    "role": "tour_manager",
                    "role_display": "Tour Manager",
                    "custom_role": null,
                    "is_primary": false,
                    "can_invite_others": false,
                    "can_manage_bookings": false,
                    "can_access_financials": false,
                    "permissions": [],
                    "joined_at": "2030-01-01T00:00:00Z",
                    "is_registered_user": true
                }
            })))
            .mount(&server)
            .await;

        let client = BackstageClient::new(&server.uri(), Some("tok".to_string())).unwrap();
        let accepted = client.accept("abc123").await.unwrap();
        assert_eq!(accepted.team_member.role_display, "Tour Manager");
    }
}
