//! Persistence adapter
//!
//! [`Destination`] is the table-oriented store the pipeline writes into. It is
//! owned exclusively by the orchestrator and used by one writer at a time.
//! [`save`] turns a [`TypeBatch`] into flat rows: scalar fields are written as
//! they were extracted and repeated fields become one compact JSON array per
//! cell (`["10","","20"]`). Every call appends; nothing is ever truncated.

pub mod sqlite;

use crate::models::{FieldValue, Record, TypeBatch};
use crate::schema::RecordType;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nibrs_common::Result;
use std::collections::BTreeMap;
use tracing::info;

pub use sqlite::SqliteDestination;

/// Progress marker for one source, committed together with a chunk's rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    /// Fingerprint of the source file
    pub source_key: String,
    /// Lines of the source fully accounted for, from the start of the file
    pub lines_consumed: u64,
    pub chunks_committed: u64,
    pub updated_at: DateTime<Utc>,
}

/// Table-oriented persistent store
#[async_trait]
pub trait Destination: Send {
    /// Create the table if needed and confirm it has every column
    async fn ensure_table(&mut self, table: &str, columns: &[&str]) -> Result<()>;

    /// Append rows, each parallel to `columns`; returns rows written
    async fn append_rows(&mut self, table: &str, columns: &[&str], rows: &[Vec<String>]) -> Result<u64>;

    async fn count_rows(&mut self, table: &str) -> Result<u64>;

    /// User-visible tables in name order; internal bookkeeping tables are excluded
    async fn list_tables(&mut self) -> Result<Vec<String>>;

    /// Start a unit of work covering one chunk
    async fn begin(&mut self) -> Result<()>;

    /// Make everything since `begin` durable
    async fn commit(&mut self) -> Result<()>;

    async fn load_checkpoint(&mut self, source_key: &str) -> Result<Option<Checkpoint>>;

    async fn store_checkpoint(&mut self, checkpoint: &Checkpoint) -> Result<()>;

    /// Release the underlying connection; uncommitted work is discarded
    async fn close(&mut self) -> Result<()>;
}

/// Encode one record as a row of text cells in schema column order
pub fn encode_row(record: &Record) -> Result<Vec<String>> {
    record
        .values
        .iter()
        .map(|value| match value {
            FieldValue::Scalar(s) => Ok(s.clone()),
            FieldValue::Repeated(values) => Ok(serde_json::to_string(values)?),
        })
        .collect()
}

/// Append every type in the batch to its table
///
/// Returns the number of rows written per record type.
pub async fn save<D>(destination: &mut D, batch: &TypeBatch) -> Result<BTreeMap<RecordType, u64>>
where
    D: Destination + ?Sized,
{
    let mut written = BTreeMap::new();

    for (record_type, records) in batch.iter() {
        let schema = record_type.schema();
        let columns: Vec<&str> = schema.columns().collect();
        let table = record_type.table_name();

        destination.ensure_table(table, &columns).await?;

        let rows = records.iter().map(encode_row).collect::<Result<Vec<_>>>()?;
        let count = destination.append_rows(table, &columns, &rows).await?;

        info!(table, rows = count, "Saved {} rows to table {}", count, table);
        written.insert(record_type, count);
    }

    Ok(written)
}

/// Every user table with its current row count
pub async fn table_summary<D>(destination: &mut D) -> Result<Vec<(String, u64)>>
where
    D: Destination + ?Sized,
{
    let mut summary = Vec::new();
    for table in destination.list_tables().await? {
        let rows = destination.count_rows(&table).await?;
        summary.push((table, rows));
    }
    Ok(summary)
}
