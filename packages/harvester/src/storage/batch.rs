//! Batch persistence over a bounded worker pool.
//!
//! A fixed number of workers consume a pre-filled, closed work queue (one
//! task per record) and publish exactly one result per task; the caller
//! blocks until every submitted record is accounted for, so no outcome is
//! silently lost. There is no per-task timeout — a stuck persistence call
//! occupies a worker slot indefinitely (known limitation).

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use crate::records::DetailRecord;
use crate::storage::{ActivityEntry, ListingStore, UpsertOutcome};

/// Tally of one batch persistence pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    pub inserted: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Persist a harvested batch with `workers` concurrent store calls.
pub async fn persist_batch(
    store: Arc<dyn ListingStore>,
    records: Vec<DetailRecord>,
    workers: usize,
) -> BatchOutcome {
    let total = records.len();
    if total == 0 {
        return BatchOutcome::default();
    }

    info!(records = total, workers, "persisting harvested batch");

    let (task_tx, task_rx) = mpsc::channel(total);
    for record in records {
        task_tx.send(record).await.expect("queue sized for batch");
    }
    drop(task_tx); // queue is pre-filled and closed

    let task_rx = Arc::new(Mutex::new(task_rx));
    let (result_tx, mut result_rx) = mpsc::channel::<Option<UpsertOutcome>>(total);

    for _ in 0..workers.max(1) {
        let task_rx = Arc::clone(&task_rx);
        let result_tx = result_tx.clone();
        let store = Arc::clone(&store);

        tokio::spawn(async move {
            loop {
                // The queue is pre-filled, so holding the lock across the
                // recv is momentary; the upsert itself runs unlocked.
                let record = { task_rx.lock().await.recv().await };
                let Some(record) = record else { break };

                let started_at = Utc::now();
                let timer = Instant::now();
                let outcome = store.upsert(&record).await;
                let duration_ms = timer.elapsed().as_millis() as i64;

                let (status, error_text, result) = match &outcome {
                    Ok(o) => ("success", None, Some(*o)),
                    Err(e) => {
                        warn!(
                            page_name = %record.page_name,
                            error = %e,
                            "failed to persist record"
                        );
                        ("failed", Some(e.to_string()), None)
                    }
                };

                let operation = match result {
                    Some(UpsertOutcome::Inserted) => "insert",
                    Some(UpsertOutcome::Updated) => "update",
                    None => "insert",
                };

                store
                    .log_activity(&ActivityEntry {
                        external_id: record.page_name.clone(),
                        operation: operation.to_string(),
                        status: status.to_string(),
                        error_text,
                        started_at,
                        duration_ms,
                    })
                    .await;

                // Exactly one result per task; a send failure would mean
                // the caller already went away.
                let _ = result_tx.send(result).await;
            }
        });
    }
    drop(result_tx);

    let mut outcome = BatchOutcome::default();
    let mut received = 0;
    while let Some(result) = result_rx.recv().await {
        received += 1;
        match result {
            Some(UpsertOutcome::Inserted) => outcome.inserted += 1,
            Some(UpsertOutcome::Updated) => outcome.updated += 1,
            None => outcome.failed += 1,
        }
        if received == total {
            break;
        }
    }

    info!(
        inserted = outcome.inserted,
        updated = outcome.updated,
        failed = outcome.failed,
        "batch persistence complete"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HarvestError, Result};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    /// In-memory store keyed like the real one, on the external id.
    #[derive(Default)]
    struct MemoryStore {
        rows: StdMutex<HashMap<String, DetailRecord>>,
        activity: StdMutex<Vec<ActivityEntry>>,
    }

    #[async_trait]
    impl ListingStore for MemoryStore {
        async fn upsert(&self, record: &DetailRecord) -> Result<UpsertOutcome> {
            crate::storage::validate(record)?;
            let mut rows = self.rows.lock().unwrap();
            let outcome = if rows.contains_key(&record.page_name) {
                UpsertOutcome::Updated
            } else {
                UpsertOutcome::Inserted
            };
            rows.insert(record.page_name.clone(), record.clone());
            Ok(outcome)
        }

        async fn log_activity(&self, entry: &ActivityEntry) {
            self.activity.lock().unwrap().push(entry.clone());
        }
    }

    fn record(page_name: &str) -> DetailRecord {
        let mut r = DetailRecord::new(format!("https://example.com/{page_name}"));
        r.name = page_name.to_string();
        r.page_name = page_name.to_string();
        r
    }

    #[tokio::test]
    async fn upsert_is_idempotent_on_external_id() {
        let store = MemoryStore::default();
        let r = record("guesthouse-aisha");

        assert_eq!(store.upsert(&r).await.unwrap(), UpsertOutcome::Inserted);
        assert_eq!(store.upsert(&r).await.unwrap(), UpsertOutcome::Updated);
        assert_eq!(store.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn batch_accounts_for_every_record() {
        let store = Arc::new(MemoryStore::default());
        let records = vec![record("a"), record("b"), record("c"), record("d")];

        let outcome = persist_batch(store.clone(), records, 2).await;

        assert_eq!(outcome.inserted, 4);
        assert_eq!(outcome.updated, 0);
        assert_eq!(outcome.failed, 0);
        assert_eq!(store.activity.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn invalid_record_blocks_itself_not_the_batch() {
        let store = Arc::new(MemoryStore::default());
        let mut bad = record("bad");
        bad.name = String::new(); // fails validation
        let records = vec![record("good-1"), bad, record("good-2")];

        let outcome = persist_batch(store.clone(), records, 2).await;

        assert_eq!(outcome.inserted, 2);
        assert_eq!(outcome.failed, 1);
        let activity = store.activity.lock().unwrap();
        assert_eq!(activity.len(), 3);
        assert!(activity.iter().any(|e| e.status == "failed"));
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let store = Arc::new(MemoryStore::default());
        let outcome = persist_batch(store, Vec::new(), 2).await;
        assert_eq!(outcome, BatchOutcome::default());
    }

    #[tokio::test]
    async fn validation_error_is_the_validation_variant() {
        let store = MemoryStore::default();
        let mut bad = record("bad");
        bad.name = String::new();
        assert!(matches!(
            store.upsert(&bad).await,
            Err(HarvestError::Validation(_))
        ));
    }
}
