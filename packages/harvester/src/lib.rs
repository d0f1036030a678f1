//! Harvests structured property listings from pages that embed their real
//! data as a serialized client-side state graph inside server-rendered
//! markup.
//!
//! Pipeline: fetch → locate blob → parse graph → classify nodes, driven
//! item by item by the harvest orchestrator, with the resulting batch
//! handed to storage and mirrored to a backup file.

pub mod backup;
pub mod config;
pub mod detail;
pub mod error;
pub mod fetcher;
pub mod graph;
pub mod harvest;
pub mod locator;
pub mod records;
pub mod storage;
pub mod summary;

pub use config::Config;
pub use error::{HarvestError, Result};
pub use fetcher::{HttpFetcher, PageFetcher};
pub use harvest::{
    run_harvest, Harvester, HarvestOutcome, HarvestResult, RunStats, Sleeper, TokioSleeper,
};
pub use records::{DetailRecord, ReviewScore, SummaryRecord};
pub use storage::{ListingStore, PostgresStore, UpsertOutcome};
