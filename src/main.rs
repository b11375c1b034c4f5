//! Backstage server - artist team management with role-context authorization

use backstage::{api, config::Config, store::Store, team, AppState};
use clap::Parser;
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backstage=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();

    // Database connection
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    // Run migrations
    Store::new(pool.clone()).migrate().await?;

    let state = AppState::with_settings(pool, config.auth_settings());
    let _delivery = team::spawn_invitation_delivery(&state.events);

    let purged = state.store.purge_expired_tokens(chrono::Utc::now()).await?;
    if purged > 0 {
        tracing::info!("Purged {} expired access tokens", purged);
    }

    // Build router
    let app = api::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
