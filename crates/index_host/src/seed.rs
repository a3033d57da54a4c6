//! Startup seeding from a JSON file of entries.

use anyhow::{Context, Result};
use spatial_index::{IndexEntry, SpatialIndex, StoreBackend};
use std::path::Path;
use tracing::{info, warn};

/// Reads a JSON array of `{ "id": ..., "coordinates": [...] }` objects
pub async fn load_entries(path: &Path) -> Result<Vec<IndexEntry>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read seed file {}", path.display()))?;
    let entries: Vec<IndexEntry> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse seed file {}", path.display()))?;
    Ok(entries)
}

/// Inserts `entries`, moving ids that are already indexed.
///
/// Entries the index rejects are logged and skipped; store failures abort.
/// Returns the number of entries written.
pub async fn seed_index<S: StoreBackend>(
    index: &SpatialIndex<S>,
    entries: &[IndexEntry],
) -> Result<usize> {
    let mut written = 0;
    for entry in entries {
        let result = if index.get(&entry.id).await?.is_some() {
            index.update(&entry.coordinates, &entry.id).await
        } else {
            index.insert(&entry.coordinates, &entry.id).await
        };

        match result {
            Ok(()) => written += 1,
            Err(spatial_index::IndexError::Store(e)) => return Err(e.into()),
            Err(e) => warn!(id = %entry.id, "skipping seed entry: {}", e),
        }
    }
    info!("Seeded {} of {} entries", written, entries.len());
    Ok(written)
}
