//! Storage collaborator contract and batch persistence.
//!
//! The harvester only needs two operations from storage: an idempotent
//! upsert keyed on (source website, external id), and a fire-and-forget
//! activity-log write.

mod batch;
mod postgres;

pub use batch::{persist_batch, BatchOutcome};
pub use postgres::PostgresStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{HarvestError, Result};
use crate::records::DetailRecord;

/// Source-site tag every harvested record is filed under.
pub const SOURCE_WEBSITE: &str = "booking";

/// Whether an upsert created a new row or refreshed an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// One activity-log row describing a persistence operation.
#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub external_id: String,
    pub operation: String,
    pub status: String,
    pub error_text: Option<String>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: i64,
}

#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Upsert one record, idempotent on (source website, external id).
    /// Persisting the same identity twice yields `Updated` the second
    /// time, never a duplicate.
    async fn upsert(&self, record: &DetailRecord) -> Result<UpsertOutcome>;

    /// Fire-and-forget activity log; implementations swallow their own
    /// failures (logging them) rather than propagating.
    async fn log_activity(&self, entry: &ActivityEntry);
}

/// Structural checks a record must pass before persistence. A failure here
/// blocks this record only, never the batch.
pub fn validate(record: &DetailRecord) -> Result<()> {
    if record.name.trim().is_empty() {
        return Err(HarvestError::Validation("record has no name".to_string()));
    }
    if record.page_name.trim().is_empty() {
        return Err(HarvestError::Validation(format!(
            "record '{}' has no page identifier",
            record.name
        )));
    }
    if let Some(score) = record.review_score {
        if !(0.0..=10.0).contains(&score) {
            return Err(HarvestError::Validation(format!(
                "review score {score} out of range for '{}'",
                record.page_name
            )));
        }
    }
    if let Some(lat) = record.latitude {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(HarvestError::Validation(format!(
                "latitude {lat} out of range for '{}'",
                record.page_name
            )));
        }
    }
    if let Some(lon) = record.longitude {
        if !(-180.0..=180.0).contains(&lon) {
            return Err(HarvestError::Validation(format!(
                "longitude {lon} out of range for '{}'",
                record.page_name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, page_name: &str) -> DetailRecord {
        let mut r = DetailRecord::new("https://example.com/p");
        r.name = name.to_string();
        r.page_name = page_name.to_string();
        r
    }

    #[test]
    fn valid_record_passes() {
        assert!(validate(&record("Hotel", "hotel")).is_ok());
    }

    #[test]
    fn missing_identity_fields_are_rejected() {
        assert!(matches!(
            validate(&record("", "hotel")),
            Err(HarvestError::Validation(_))
        ));
        assert!(matches!(
            validate(&record("Hotel", "  ")),
            Err(HarvestError::Validation(_))
        ));
    }

    #[test]
    fn out_of_range_score_is_rejected() {
        let mut r = record("Hotel", "hotel");
        r.review_score = Some(11.0);
        assert!(matches!(
            validate(&r),
            Err(HarvestError::Validation(_))
        ));
    }
}
