//! Harvest orchestrator: turns listing references into detailed records
//! with bounded retry, backoff, and partial-failure tolerance.
//!
//! The loop is strictly sequential by design — one item at a time bounds
//! load on the scraped origin and keeps backoff bookkeeping deterministic.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::backup;
use crate::config::Config;
use crate::detail::{self, DetailDefaults};
use crate::error::Result;
use crate::fetcher::PageFetcher;
use crate::graph::StateGraph;
use crate::locator;
use crate::records::{DetailRecord, SummaryRecord};
use crate::storage::{self, ListingStore};
use crate::summary;

/// Attempts per listing item before giving up on it.
pub const MAX_ATTEMPTS: u32 = 3;

/// Delay after each successful item, independent of retry backoff, to
/// respect the target site's rate limits.
const ITEM_DELAY: Duration = Duration::from_secs(3);

/// Workers used when persisting the harvested batch.
const PERSIST_WORKERS: usize = 4;

/// Injectable delay source so retry timing is deterministic in tests.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Final state of one listing item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestOutcome {
    Succeeded,
    Exhausted,
}

/// Per-item result, finalized once retries are exhausted or a success
/// occurs, then folded into the run-level tally.
#[derive(Debug, Clone)]
pub struct HarvestResult {
    pub page_name: String,
    pub attempts: u32,
    pub outcome: HarvestOutcome,
    pub error: Option<String>,
}

/// Output of one pass over the listing items.
#[derive(Debug, Default)]
pub struct HarvestRun {
    pub details: Vec<DetailRecord>,
    pub results: Vec<HarvestResult>,
}

impl HarvestRun {
    pub fn succeeded(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome == HarvestOutcome::Succeeded)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

/// Run-level tally reported to the caller.
#[derive(Debug, Default)]
pub struct RunStats {
    pub listed: usize,
    pub harvested: usize,
    pub failed: usize,
    pub inserted: usize,
    pub updated: usize,
    pub rejected: usize,
}

pub struct Harvester<'a> {
    fetcher: &'a dyn PageFetcher,
    sleeper: &'a dyn Sleeper,
    detail_base_url: &'a str,
}

impl<'a> Harvester<'a> {
    pub fn new(
        fetcher: &'a dyn PageFetcher,
        sleeper: &'a dyn Sleeper,
        detail_base_url: &'a str,
    ) -> Self {
        Self {
            fetcher,
            sleeper,
            detail_base_url,
        }
    }

    fn detail_url(&self, page_name: &str) -> String {
        format!("{}/{}.html", self.detail_base_url, page_name)
    }

    /// One fetch → locate → parse → classify attempt.
    async fn harvest_detail(&self, url: &str, defaults: &DetailDefaults) -> Result<DetailRecord> {
        let html = self.fetcher.fetch(url).await?;
        let blob = locator::locate_state_blob(&html)?;
        let graph = StateGraph::parse(blob)?;
        Ok(detail::classify(&graph, url, defaults))
    }

    /// Harvest one listing item with bounded retry. Backoff between
    /// attempt k and k+1 waits 2*k seconds; a permanently failing item is
    /// recorded and skipped, never fatal.
    pub async fn harvest_item(
        &self,
        summary: &SummaryRecord,
    ) -> (Option<DetailRecord>, HarvestResult) {
        let url = self.detail_url(&summary.page_name);
        let defaults = DetailDefaults::from_summary(summary);

        let mut last_error = None;
        for attempt in 1..=MAX_ATTEMPTS {
            if attempt > 1 {
                let backoff = Duration::from_secs(2 * u64::from(attempt - 1));
                info!(
                    url = %url,
                    attempt,
                    backoff_secs = backoff.as_secs(),
                    "retrying after backoff"
                );
                self.sleeper.sleep(backoff).await;
            }

            match self.harvest_detail(&url, &defaults).await {
                Ok(record) => {
                    return (
                        Some(record),
                        HarvestResult {
                            page_name: summary.page_name.clone(),
                            attempts: attempt,
                            outcome: HarvestOutcome::Succeeded,
                            error: None,
                        },
                    );
                }
                Err(e) => {
                    warn!(
                        url = %url,
                        attempt,
                        max_attempts = MAX_ATTEMPTS,
                        error = %e,
                        "detail attempt failed"
                    );
                    last_error = Some(e.to_string());
                }
            }
        }

        (
            None,
            HarvestResult {
                page_name: summary.page_name.clone(),
                attempts: MAX_ATTEMPTS,
                outcome: HarvestOutcome::Exhausted,
                error: last_error,
            },
        )
    }

    /// Process every listing item sequentially, pausing between successful
    /// items. Individual failures are recorded and the loop continues.
    pub async fn run(&self, summaries: &[SummaryRecord]) -> HarvestRun {
        let mut run = HarvestRun::default();

        for (i, summary) in summaries.iter().enumerate() {
            info!(
                item = i + 1,
                total = summaries.len(),
                name = %summary.name,
                "processing listing item"
            );

            let (detail, result) = self.harvest_item(summary).await;
            match detail {
                Some(record) => {
                    run.details.push(record);
                    self.sleeper.sleep(ITEM_DELAY).await;
                }
                None => {
                    error!(
                        page_name = %summary.page_name,
                        error = result.error.as_deref().unwrap_or("unknown"),
                        "skipping item after {MAX_ATTEMPTS} attempts"
                    );
                }
            }
            run.results.push(result);
        }

        info!(
            succeeded = run.succeeded(),
            failed = run.failed(),
            total = summaries.len(),
            "harvest pass complete"
        );
        run
    }
}

/// Full harvest run: listing extraction, per-item harvesting, batch
/// persistence, and backup. A listing-page failure is the only fatal one.
pub async fn run_harvest(
    fetcher: &dyn PageFetcher,
    sleeper: &dyn Sleeper,
    store: Arc<dyn ListingStore>,
    config: &Config,
) -> Result<RunStats> {
    let summaries = summary::fetch_summaries(fetcher, &config.listing_url).await?;
    info!(count = summaries.len(), "listing items found");

    let harvester = Harvester::new(fetcher, sleeper, &config.detail_base_url);
    let run = harvester.run(&summaries).await;

    let mut stats = RunStats {
        listed: summaries.len(),
        harvested: run.succeeded(),
        failed: run.failed(),
        ..Default::default()
    };

    if run.details.is_empty() {
        warn!("no detail records harvested; skipping persistence and backup");
        return Ok(stats);
    }

    let batch = storage::persist_batch(store, run.details.clone(), PERSIST_WORKERS).await;
    stats.inserted = batch.inserted;
    stats.updated = batch.updated;
    stats.rejected = batch.failed;

    // Backup failure is logged, not fatal: the data already reached storage.
    if let Err(e) = backup::write_backup(config.backup_path.as_ref(), &run.details) {
        error!(path = %config.backup_path, error = %e, "failed to write backup file");
    } else {
        info!(path = %config.backup_path, records = run.details.len(), "backup file written");
    }

    Ok(stats)
}
