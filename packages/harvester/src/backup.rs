//! One-shot backup serialization of a harvest batch.
//!
//! The file is fully overwritten on every run; it is a snapshot of the
//! latest batch, not an append-only log.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::error::{HarvestError, Result};
use crate::records::DetailRecord;

/// Write the batch as pretty-printed JSON to `path`, replacing any
/// previous content.
pub fn write_backup(path: &Path, records: &[DetailRecord]) -> Result<()> {
    let file = File::create(path).map_err(|e| HarvestError::Storage(Box::new(e)))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, records)
        .map_err(|e| HarvestError::Storage(Box::new(e)))?;
    Ok(())
}
