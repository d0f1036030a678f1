use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Search-results page that seeds the harvest run
    pub listing_url: String,
    /// Base URL that detail page names are appended to
    pub detail_base_url: String,
    /// Session cookie for the listing endpoint; without it the site may
    /// serve a degraded variant of the page
    pub session_cookie: Option<String>,
    /// Where the one-shot backup JSON is written (full overwrite per run)
    pub backup_path: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            listing_url: env::var("LISTING_URL").context("LISTING_URL must be set")?,
            detail_base_url: env::var("DETAIL_BASE_URL")
                .unwrap_or_else(|_| "https://www.booking.com/hotel/kz".to_string()),
            session_cookie: env::var("SESSION_COOKIE").ok(),
            backup_path: env::var("BACKUP_PATH").unwrap_or_else(|_| "final_data.json".to_string()),
        })
    }
}
