//! Registration, login and bearer-token sessions

use chrono::{DateTime, Duration, Utc};

use super::password::{hash_password, validate_password, verify_password};
use super::token::{generate_token, hash_token};
use crate::access::ContextResolver;
use crate::error::{AppError, Result};
use crate::models::{ContextKind, Identity, LoginRequest, RegisterRequest};
use crate::store::Store;
use crate::validation::{validate_email, validate_length, MAX_NAME_LENGTH};

pub const INVALID_CREDENTIALS: &str = "The provided credentials are incorrect.";
pub const INVALID_TOKEN: &str = "Invalid or expired token";
const TOKEN_NAME: &str = "auth_token";

/// Credential settings
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub token_ttl: Duration,
    pub pepper: Option<String>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            token_ttl: Duration::hours(720),
            pepper: None,
        }
    }
}

/// An issued bearer token and the identity it belongs to
#[derive(Debug, Clone)]
pub struct Session {
    pub identity: Identity,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AuthService {
    store: Store,
    resolver: ContextResolver,
    settings: AuthSettings,
}

impl AuthService {
    pub fn new(store: Store, resolver: ContextResolver, settings: AuthSettings) -> Self {
        Self {
            store,
            resolver,
            settings,
        }
    }

    /// Create an identity (and optionally its artist profile) and sign it in
    pub async fn register(&self, req: &RegisterRequest) -> Result<Session> {
        validate_length("name", req.name.trim(), 1, MAX_NAME_LENGTH)?;
        validate_email(&req.email)?;
        validate_password(&req.password)?;
        let artist_name = req.artist_name.as_deref().map(str::trim).filter(|n| !n.is_empty());
        if let Some(artist_name) = artist_name {
            validate_length("artist_name", artist_name, 1, MAX_NAME_LENGTH)?;
        }

        let password_hash = hash_password(&req.password, self.settings.pepper.as_deref())?;
        let (identity, artist) = self
            .store
            .register_identity(req.name.trim(), &req.email, &password_hash, artist_name)
            .await?;

        tracing::info!(
            "Registered identity {} (artist profile: {})",
            identity.id,
            artist.is_some()
        );

        let identity = self.resolver.refresh_contexts(&identity).await?;
        self.issue(identity).await
    }

    /// Verify credentials, refresh contexts and optionally switch before
    /// issuing a token. A failed switch issues nothing.
    pub async fn login(&self, req: &LoginRequest) -> Result<Session> {
        let identity = self
            .store
            .find_identity_by_email(&req.email)
            .await?
            .ok_or_else(|| AppError::Unauthenticated(INVALID_CREDENTIALS.to_string()))?;

        if !verify_password(&req.password, &identity.password_hash, self.settings.pepper.as_deref())? {
            tracing::debug!("Failed login for identity {}", identity.id);
            return Err(AppError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
        }

        let mut identity = self.resolver.refresh_contexts(&identity).await?;

        if let Some(context) = req.context.as_deref() {
            identity = self.switch(&identity, context).await?;
        }

        tracing::info!("Identity {} logged in", identity.id);
        self.issue(identity).await
    }

    /// Switch to the named context, returning the updated identity, or fail
    /// with the stored set of available contexts. Names outside the known
    /// context kinds fail the same way.
    pub async fn switch(&self, identity: &Identity, requested: &str) -> Result<Identity> {
        let switched = match requested.parse::<ContextKind>() {
            Ok(context) => self.resolver.switch_context(identity, context).await?,
            Err(_) => false,
        };
        if !switched {
            return Err(AppError::ContextUnavailable {
                message: format!("Context '{}' is not available for this account", requested),
                available_contexts: identity.available_contexts.iter().copied().collect(),
            });
        }
        self.store.get_identity(identity.id).await
    }

    /// Resolve a presented bearer token to its identity
    pub async fn authenticate(&self, token: &str) -> Result<Identity> {
        self.store
            .find_identity_by_token(&hash_token(token), Utc::now())
            .await?
            .map(|(identity, _)| identity)
            .ok_or_else(|| AppError::Unauthenticated(INVALID_TOKEN.to_string()))
    }

    pub async fn logout(&self, token: &str) -> Result<()> {
        self.store.delete_access_token(&hash_token(token)).await?;
        Ok(())
    }

    /// Rotate: the presented token stops working and a new one is issued
    pub async fn refresh(&self, token: &str) -> Result<Session> {
        let identity = self.authenticate(token).await?;
        self.store.delete_access_token(&hash_token(token)).await?;
        self.issue(identity).await
    }

    async fn issue(&self, identity: Identity) -> Result<Session> {
        let token = generate_token();
        let expires_at = Utc::now() + self.settings.token_ttl;
        self.store
            .insert_access_token(identity.id, &hash_token(&token), TOKEN_NAME, expires_at)
            .await?;

        Ok(Session {
            identity,
            token,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_store;

    async fn service() -> AuthService {
        let store = test_store().await;
        AuthService::new(store.clone(), ContextResolver::new(store), AuthSettings::default())
    }

    fn register_request(email: &str, artist_name: Option<&str>) -> RegisterRequest {
        RegisterRequest {
            name: "Ann".to_string(),
            email: email.to_string(),
            password: "correct-horse".to_string(),
            artist_name: artist_name.map(str::to_string),
        }
    }

    fn login_request(email: &str, password: &str, context: Option<&str>) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
            context: context.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_register_with_artist_profile() {
        let auth = service().await;
        let session = auth
            .register(&register_request("Ann@Example.com", Some("Ann Band")))
            .await
            .unwrap();

        assert_eq!(session.identity.email, "ann@example.com");
        assert_eq!(session.identity.current_context, Some(ContextKind::Artist));
        let identity = auth.authenticate(&session.token).await.unwrap();
        assert_eq!(identity.id, session.identity.id);
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input() {
        let auth = service().await;

        let mut req = register_request("ann@example.com", None);
        req.password = "short".to_string();
        assert!(matches!(auth.register(&req).await.unwrap_err(), AppError::BadRequest(_)));

        let req = register_request("not-an-email", None);
        assert!(matches!(auth.register(&req).await.unwrap_err(), AppError::BadRequest(_)));

        auth.register(&register_request("ann@example.com", None)).await.unwrap();
        let dup = auth.register(&register_request("ANN@example.com", None)).await;
        assert!(matches!(dup.unwrap_err(), AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_login_wrong_password_and_unknown_email_match() {
        let auth = service().await;
        auth.register(&register_request("ann@example.com", None)).await.unwrap();

        let wrong = auth
            .login(&login_request("ann@example.com", "nope-nope", None))
            .await
            .unwrap_err();
        let unknown = auth
            .login(&login_request("who@example.com", "correct-horse", None))
            .await
            .unwrap_err();
        assert_eq!(wrong.to_string(), unknown.to_string());
        assert!(matches!(wrong, AppError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn test_login_with_unavailable_context() {
        let auth = service().await;
        auth.register(&register_request("ann@example.com", Some("Ann Band"))).await.unwrap();

        match auth
            .login(&login_request("ann@example.com", "correct-horse", Some("agent")))
            .await
            .unwrap_err()
        {
            AppError::ContextUnavailable { available_contexts, .. } => {
                assert_eq!(available_contexts, vec![ContextKind::Artist]);
            }
            other => panic!("expected context unavailable, got {:?}", other),
        }

        let session = auth
            .login(&login_request("ann@example.com", "correct-horse", Some("artist")))
            .await
            .unwrap();
        assert_eq!(session.identity.current_context, Some(ContextKind::Artist));
    }

    #[tokio::test]
    async fn test_unknown_context_reports_available_set() {
        let auth = service().await;
        auth.register(&register_request("ann@example.com", Some("Ann Band"))).await.unwrap();

        for requested in ["superuser", "", "ARTIST"] {
            match auth
                .login(&login_request("ann@example.com", "correct-horse", Some(requested)))
                .await
                .unwrap_err()
            {
                AppError::ContextUnavailable { available_contexts, .. } => {
                    assert_eq!(available_contexts, vec![ContextKind::Artist]);
                }
                other => panic!("expected context unavailable, got {:?}", other),
            }
        }

        let session = auth
            .login(&login_request("ann@example.com", "correct-horse", None))
            .await
            .unwrap();
        let result = auth.switch(&session.identity, "admin").await;
        assert!(matches!(result.unwrap_err(), AppError::ContextUnavailable { .. }));
        let stored = auth.authenticate(&session.token).await.unwrap();
        assert_eq!(stored.current_context, Some(ContextKind::Artist));
    }

    #[tokio::test]
    async fn test_logout_and_refresh() {
        let auth = service().await;
        let session = auth.register(&register_request("ann@example.com", None)).await.unwrap();

        let rotated = auth.refresh(&session.token).await.unwrap();
        assert_ne!(rotated.token, session.token);
        assert!(matches!(
            auth.authenticate(&session.token).await.unwrap_err(),
            AppError::Unauthenticated(_)
        ));

        auth.logout(&rotated.token).await.unwrap();
        assert!(auth.authenticate(&rotated.token).await.is_err());
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let store = test_store().await;
        let settings = AuthSettings {
            token_ttl: Duration::seconds(-1),
            pepper: None,
        };
        let auth = AuthService::new(store.clone(), ContextResolver::new(store), settings);
        let session = auth.register(&register_request("ann@example.com", None)).await.unwrap();

        assert!(matches!(
            auth.authenticate(&session.token).await.unwrap_err(),
            AppError::Unauthenticated(_)
        ));
    }
}
