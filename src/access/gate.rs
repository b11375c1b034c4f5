//! Request-time authorization

use std::future::Future;

use super::capability::Permissions;
use super::permission::PermissionEvaluator;
use crate::error::{AppError, Denial, Result};
use crate::models::Identity;

pub const NO_ACTIVE_CONTEXT: &str = "No active context. Please select a role.";
pub const INSUFFICIENT_PERMISSIONS: &str = "Insufficient permissions for this action";

#[derive(Clone)]
pub struct AuthorizationGate {
    evaluator: PermissionEvaluator,
}

impl AuthorizationGate {
    pub fn new(evaluator: PermissionEvaluator) -> Self {
        Self { evaluator }
    }

    /// Decide whether `identity` may proceed.
    ///
    /// With a `required` capability the evaluated permission set must grant it.
    /// Without one the identity only needs an active context. Returns the
    /// evaluated set on success.
    pub async fn authorize(&self, identity: Option<&Identity>, required: Option<&str>) -> Result<Permissions> {
        let identity = identity.ok_or_else(|| AppError::Unauthenticated("Unauthenticated".to_string()))?;
        let permissions = self.evaluator.permissions(identity).await?;

        match required {
            Some(capability) => {
                if !permissions.by_name(capability) {
                    tracing::debug!(
                        "Identity {} denied {} in context {:?}",
                        identity.id,
                        capability,
                        identity.current_context
                    );
                    return Err(AppError::Forbidden {
                        message: INSUFFICIENT_PERMISSIONS.to_string(),
                        denial: Some(Box::new(Denial {
                            required: capability.to_string(),
                            current_context: identity.current_context,
                            permissions,
                        })),
                    });
                }
            }
            None => {
                if identity.current_context.is_none() {
                    return Err(AppError::BadRequest(NO_ACTIVE_CONTEXT.to_string()));
                }
            }
        }

        Ok(permissions)
    }

    /// Run `operation` only once `authorize` passes
    pub async fn guarded<T, F, Fut>(&self, identity: Option<&Identity>, required: Option<&str>, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.authorize(identity, required).await?;
        operation().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::ContextResolver;
    use crate::models::{ContextKind, NewMembership, TeamRole};
    use crate::store::{test_store, Store};
    use std::sync::atomic::{AtomicBool, Ordering};

    async fn setup() -> (Store, AuthorizationGate) {
        let store = test_store().await;
        let gate = AuthorizationGate::new(PermissionEvaluator::new(ContextResolver::new(store.clone())));
        (store, gate)
    }

    #[tokio::test]
    async fn test_missing_identity_is_unauthenticated() {
        let (_, gate) = setup().await;
        let result = gate.authorize(None, Some("manage_team")).await;
        assert!(matches!(result.unwrap_err(), AppError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn test_missing_context_is_bad_request() {
        let (store, gate) = setup().await;
        let (zed, _) = store.register_identity("Zed", "zed@example.com", "h", None).await.unwrap();
        let result = gate.authorize(Some(&zed), None).await;
        assert!(matches!(result.unwrap_err(), AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_denial_carries_diagnostics() {
        let (store, gate) = setup().await;
        let (_, artist) = store.register_identity("O", "o@example.com", "h", Some("O")).await.unwrap();
        let (mut sam, _) = store.register_identity("Sam", "sam@example.com", "h", None).await.unwrap();
        store
            .insert_membership(
                &NewMembership::member(artist.unwrap().id, "Sam", "sam@example.com", TeamRole::Legal)
                    .for_identity(sam.id)
                    .with_flags(false, false, true),
            )
            .await
            .unwrap();
        sam.current_context = Some(ContextKind::TeamMember);

        match gate.authorize(Some(&sam), Some("invite_members")).await.unwrap_err() {
            AppError::Forbidden { denial: Some(denial), .. } => {
                assert_eq!(denial.required, "invite_members");
                assert_eq!(denial.current_context, Some(ContextKind::TeamMember));
                assert!(denial.permissions.access_financials);
                assert!(!denial.permissions.invite_members);
            }
            other => panic!("expected forbidden, got {:?}", other),
        }

        let perms = gate.authorize(Some(&sam), Some("access_financials")).await.unwrap();
        assert!(perms.access_financials);
    }

    #[tokio::test]
    async fn test_unknown_capability_is_denied() {
        let (store, gate) = setup().await;
        let (mut owner, _) = store.register_identity("O", "o@example.com", "h", Some("O")).await.unwrap();
        owner.current_context = Some(ContextKind::Artist);
        let result = gate.authorize(Some(&owner), Some("launch_rockets")).await;
        assert!(matches!(result.unwrap_err(), AppError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_guarded_skips_operation_on_denial() {
        let (store, gate) = setup().await;
        let (zed, _) = store.register_identity("Zed", "zed@example.com", "h", None).await.unwrap();
        let ran = AtomicBool::new(false);

        let result = gate
            .guarded(Some(&zed), Some("manage_team"), || async {
                ran.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert!(result.is_err());
        assert!(!ran.load(Ordering::SeqCst));

        let mut zed = zed;
        zed.current_context = Some(ContextKind::Artist);
        let value = gate.guarded(Some(&zed), None, || async { Ok(42) }).await.unwrap();
        assert_eq!(value, 42);
    }
}
