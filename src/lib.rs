//! Backstage server - artist team management with role-context authorization

pub mod access;
pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod store;
pub mod team;
pub mod validation;

use sqlx::SqlitePool;
use std::sync::Arc;

use access::{AuthorizationGate, ContextResolver, PermissionEvaluator};
use auth::{AuthService, AuthSettings};
use team::{InvitationWorkflow, TeamEvents, TeamLedger};

/// Application state shared across handlers
pub struct AppState {
    pub store: store::Store,
    pub resolver: ContextResolver,
    pub evaluator: PermissionEvaluator,
    pub gate: AuthorizationGate,
    pub ledger: TeamLedger,
    pub invitations: InvitationWorkflow,
    pub auth: AuthService,
    pub events: TeamEvents,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Arc<Self> {
        Self::with_settings(pool, AuthSettings::default())
    }

    pub fn with_settings(pool: SqlitePool, settings: AuthSettings) -> Arc<Self> {
        let store = store::Store::new(pool);
        let events = TeamEvents::new();
        let resolver = ContextResolver::new(store.clone());
        let evaluator = PermissionEvaluator::new(resolver.clone());

        Arc::new(Self {
            gate: AuthorizationGate::new(evaluator.clone()),
            ledger: TeamLedger::new(store.clone(), events.clone()),
            invitations: InvitationWorkflow::new(store.clone(), events.clone()),
            auth: AuthService::new(store.clone(), resolver.clone(), settings),
            store,
            resolver,
            evaluator,
            events,
        })
    }
}
