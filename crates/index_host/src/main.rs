//! Index host entry point
//!
//! Loads configuration, sets up logging, builds a spatial index over the
//! in-memory store, seeds it, and optionally answers one box query on stdout.

mod cli;
mod config;
mod logging;
mod seed;

use anyhow::{anyhow, Result};
use spatial_index::{MemoryStore, SpatialIndex};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::cli::CliArgs;
use crate::config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse()?;

    // Load configuration first (before logging setup)
    let mut config = AppConfig::load_from_file(&args.config_path).await?;
    config.apply_overrides(&args);
    config
        .validate()
        .map_err(|e| anyhow!("Configuration validation failed: {e}"))?;

    logging::setup_logging(&config.logging)?;

    let store = Arc::new(MemoryStore::new());
    let index = SpatialIndex::new(store.clone(), config.index.clone())?;
    info!(
        dimensions = config.index.dimensions,
        precision = config.index.precision,
        "Spatial index ready"
    );

    if let Some(path) = &config.seed.path {
        let entries = seed::load_entries(&PathBuf::from(path)).await?;
        seed::seed_index(&index, &entries).await?;
    }
    info!(
        members = store.sorted_len(&config.index.collection_key).await,
        "Index loaded"
    );

    if let Some(range) = &args.query {
        let hits = index.query(range).await?;
        info!(matched = hits.len(), "Query complete");
        println!("{}", serde_json::to_string_pretty(&hits)?);
    }

    Ok(())
}
