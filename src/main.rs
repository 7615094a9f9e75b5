mod calibrations;
mod common;
mod config;
mod devices;
mod equipments;
mod external;
mod malfunctions;
mod routes;
mod users;

#[cfg(test)]
mod test_helpers;

use crate::common::state::AppState;
use crate::config::Config;
use crate::external::blob::{BlobStore, MemoryBlobStore};
use crate::external::s3::{S3BlobStore, get_client};
use anyhow::Context;
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Set up tracing/logging
    tracing_subscriber::fmt::init();
    info!("Starting server...");

    // Load configuration and environment variables to pass to the application
    let config: Config = Config::from_env();

    let db_url = config
        .db_url
        .clone()
        .context("DATABASE_URL or DB_* variables must be set")?;
    let db: DatabaseConnection = Database::connect(&db_url)
        .await
        .context("Could not connect to the database")?;

    if db.ping().await.is_ok() {
        info!("Connected to the database");
    } else {
        warn!("Could not ping the database");
    }

    Migrator::up(&db, None)
        .await
        .context("Failed to run migrations")?;
    info!("DB migrations complete");

    let blobs: Arc<dyn BlobStore> = match get_client(&config).await {
        Some(client) => Arc::new(S3BlobStore::new(client, &config)),
        None => {
            warn!("S3_URL is not set; media is kept in memory and lost on restart");
            Arc::new(MemoryBlobStore::default())
        }
    };

    users::services::bootstrap_admin(&db, &config)
        .await
        .map_err(|err| anyhow::anyhow!("Failed to bootstrap admin user: {err}"))?;

    if !config.require_session {
        warn!("REQUIRE_SESSION is off; API routes are not protected");
    }

    info!(
        "Starting server {} ({} deployment) ...",
        config.app_name,
        config.deployment.to_uppercase()
    );

    let addr: std::net::SocketAddr = config
        .bind_addr
        .parse()
        .with_context(|| format!("Invalid BIND_ADDR '{}'", config.bind_addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Could not bind {addr}"))?;
    info!("Listening on {addr}");

    let state = AppState::new(db, config, blobs);
    let router = routes::build_router(&state);

    axum::serve(listener, router.into_make_service())
        .await
        .context("Server error")?;
    Ok(())
}
