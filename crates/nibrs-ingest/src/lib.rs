//! NIBRS Ingest Library
//!
//! Converts an NIBRS national master file, a fixed-width text file mixing
//! seven record layouts, into one SQLite table per record type.
//!
//! # Pipeline
//!
//! ```text
//! source ──► chunks ──► workers (parse) ──► resequence ──► save + checkpoint
//! ```
//!
//! - [`extract`] and [`schema`] define where every field lives in a line
//! - [`parser`] dispatches a line to its layout by the two-byte tag
//! - [`chunk`] parses a bounded batch of lines into a [`models::TypeBatch`]
//! - [`orchestrator`] runs chunks in parallel and applies them in file order
//! - [`storage`] appends rows, encoding repeated fields as JSON arrays
//!
//! # Example
//!
//! ```no_run
//! use nibrs_ingest::{ingest, config::IngestConfig, progress::NoProgress};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::new("2023_NIBRS_NATIONAL_MASTER_FILE.txt")
//!         .with_database("nibrs_data.db");
//!     let summary = ingest(&config, Arc::new(NoProgress)).await?;
//!     println!("{} records", summary.total_records());
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod chunk;
pub mod config;
pub mod extract;
pub mod models;
pub mod orchestrator;
pub mod parser;
pub mod progress;
pub mod resequence;
pub mod schema;
pub mod source;
pub mod storage;

use config::IngestConfig;
use models::RunSummary;
use nibrs_common::checksum::source_fingerprint;
use nibrs_common::Result;
use orchestrator::Orchestrator;
use progress::ProgressSink;
use source::SourceReader;
use std::sync::Arc;
use storage::SqliteDestination;
use tracing::info;

/// Ingest a master file into a SQLite database
///
/// The source is opened before the destination, so a missing file fails
/// without creating a database.
pub async fn ingest(config: &IngestConfig, progress: Arc<dyn ProgressSink>) -> Result<RunSummary> {
    config.validate()?;

    let source = SourceReader::open(&config.source).await?;
    let source_key = tokio::task::spawn_blocking({
        let path = config.source.clone();
        move || source_fingerprint(&path)
    })
    .await
    .map_err(std::io::Error::other)??;
    info!(source = %config.source.display(), key = %source_key, "Fingerprinted source");

    let destination = SqliteDestination::connect(&config.database).await?;

    Orchestrator::new(config.clone(), destination)
        .with_progress(progress)
        .with_checkpoint_key(source_key)
        .run(source)
        .await
}
