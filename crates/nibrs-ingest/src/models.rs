// NIBRS ingestion data models

use crate::schema::{RecordType, Schema};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Value of one extracted field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Scalar(String),
    Repeated(Vec<String>),
}

impl FieldValue {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            FieldValue::Scalar(s) => Some(s),
            FieldValue::Repeated(_) => None,
        }
    }

    pub fn as_repeated(&self) -> Option<&[String]> {
        match self {
            FieldValue::Repeated(values) => Some(values),
            FieldValue::Scalar(_) => None,
        }
    }
}

/// One parsed line
///
/// `values` is parallel to the schema's field list: every field is always
/// present, possibly as an empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub record_type: RecordType,
    pub values: Vec<FieldValue>,
}

impl Record {
    pub fn schema(&self) -> &'static Schema {
        self.record_type.schema()
    }

    /// Look up a field by column name
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        let index = self.schema().fields.iter().position(|f| f.name == name)?;
        self.values.get(index)
    }

    /// Iterate `(column, value)` pairs in schema order
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> + '_ {
        self.schema().columns().zip(self.values.iter())
    }
}

/// Records of one chunk grouped by type, in line order within each type
///
/// Only types that received at least one record have an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeBatch {
    records: BTreeMap<RecordType, Vec<Record>>,
}

impl TypeBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: Record) {
        self.records.entry(record.record_type).or_default().push(record);
    }

    pub fn get(&self, record_type: RecordType) -> Option<&[Record]> {
        self.records.get(&record_type).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RecordType, &[Record])> {
        self.records.iter().map(|(t, r)| (*t, r.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total records across all types
    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn counts(&self) -> BTreeMap<RecordType, u64> {
        self.records
            .iter()
            .map(|(t, r)| (*t, r.len() as u64))
            .collect()
    }
}

/// Aggregate statistics for one ingestion run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Lines consumed from the source by this run (excludes resumed lines)
    pub lines_read: u64,
    /// Lines skipped because a checkpoint said they were already ingested
    pub lines_resumed: u64,
    pub chunks_processed: u64,
    /// Chunks whose processing task panicked
    pub chunks_failed: u64,
    pub lines_in_failed_chunks: u64,
    /// Lines whose tag matched no layout
    pub lines_unrecognized: u64,
    /// Lines dropped by a per-line extraction failure
    pub lines_failed: u64,
    pub records_by_type: BTreeMap<RecordType, u64>,
    pub rows_written_by_table: BTreeMap<String, u64>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn total_records(&self) -> u64 {
        self.records_by_type.values().sum()
    }

    pub fn total_rows_written(&self) -> u64 {
        self.rows_written_by_table.values().sum()
    }

    /// True when every line was either stored or carried an unknown tag
    pub fn is_clean(&self) -> bool {
        self.chunks_failed == 0 && self.lines_failed == 0
    }
}
