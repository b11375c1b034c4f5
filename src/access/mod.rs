//! Context-based authorization
//!
//! An identity acts in one context at a time. The [`ContextResolver`] derives
//! and persists the available contexts, the [`PermissionEvaluator`] turns the
//! active context into a [`Permissions`] record, and the [`AuthorizationGate`]
//! checks that record before a protected operation runs.

pub mod capability;
pub mod context;
pub mod gate;
pub mod permission;

pub use capability::{Capability, Permissions};
pub use context::{ContextResolver, CurrentRole};
pub use gate::AuthorizationGate;
pub use permission::PermissionEvaluator;
