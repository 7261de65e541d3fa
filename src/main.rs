use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blogd::config::Config;
use blogd::db::Database;
use blogd::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blogd=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting blogd...");

    // Missing settings abort startup here
    let config = Arc::new(Config::load()?);
    tracing::info!("Configuration loaded, uploads in {}", config.storage.upload_dir);

    let db = Database::new(&config.database.url()?, config.database.max_connections).await?;
    db.run_migrations().await?;
    tracing::info!("Database initialized");

    let state = AppState::new(db, config.clone());
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
