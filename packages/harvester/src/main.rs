// Main entry point for the booking property harvester

use std::sync::Arc;

use anyhow::{Context, Result};
use harvester::{run_harvest, Config, HttpFetcher, PostgresStore, TokioSleeper};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,harvester=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting booking property harvester");

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    let fetcher =
        HttpFetcher::new(config.session_cookie.clone()).context("Failed to build HTTP client")?;
    let store = Arc::new(PostgresStore::new(pool));

    let started = std::time::Instant::now();
    let stats = run_harvest(&fetcher, &TokioSleeper, store, &config)
        .await
        .context("Harvest run failed")?;

    tracing::info!(
        listed = stats.listed,
        harvested = stats.harvested,
        failed = stats.failed,
        inserted = stats.inserted,
        updated = stats.updated,
        rejected = stats.rejected,
        duration_secs = started.elapsed().as_secs(),
        "harvest run complete"
    );

    Ok(())
}
