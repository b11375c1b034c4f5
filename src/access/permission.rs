//! Permission evaluation for the active context

use super::capability::Permissions;
use super::context::ContextResolver;
use crate::error::Result;
use crate::models::{ContextKind, Identity};

#[derive(Clone)]
pub struct PermissionEvaluator {
    resolver: ContextResolver,
}

impl PermissionEvaluator {
    pub fn new(resolver: ContextResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &ContextResolver {
        &self.resolver
    }

    /// Full capability set for the identity's current context
    pub async fn permissions(&self, identity: &Identity) -> Result<Permissions> {
        let membership = match identity.current_context {
            Some(ContextKind::TeamMember) => self.resolver.current_membership(identity).await?,
            _ => None,
        };
        Ok(Permissions::for_context(identity.current_context, membership.as_ref()))
    }

    /// Single capability by name; unknown names are `false`
    pub async fn has_permission(&self, identity: &Identity, capability: &str) -> Result<bool> {
        Ok(self.permissions(identity).await?.by_name(capability))
    }
}
