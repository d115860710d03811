// Pipeline orchestrator
//
// Streams the source in chunks, parses up to `workers` chunks at once on
// blocking threads, and applies results to the destination strictly in read
// order. Reading the next chunk overlaps with parsing of earlier ones.
//
// Failure policy:
// - a line that fails extraction is counted and skipped inside its chunk
// - a chunk whose task panics is logged, counted, and skipped
// - any source read or destination error stops the run

use crate::chunk::{process_chunk, Chunk, ChunkOutput};
use crate::config::IngestConfig;
use crate::models::RunSummary;
use crate::parser::Decoding;
use crate::progress::{ChunkReport, NoProgress, ProgressSink};
use crate::resequence::Resequencer;
use crate::source::SourceReader;
use crate::storage::{self, Checkpoint, Destination};
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use nibrs_common::Result;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

/// Function run on a worker for each chunk
pub type ChunkProcessor = Arc<dyn Fn(&Chunk, Decoding) -> ChunkOutput + Send + Sync>;

/// A chunk whose processing task has finished, successfully or not
struct Completed {
    first_line: u64,
    lines: u64,
    bytes_read: u64,
    output: std::result::Result<ChunkOutput, JoinError>,
}

pub struct Orchestrator<D> {
    config: IngestConfig,
    destination: D,
    progress: Arc<dyn ProgressSink>,
    checkpoint_key: Option<String>,
    processor: ChunkProcessor,
    /// Lines and chunks committed before this run, from a checkpoint
    base_lines: u64,
    base_chunks: u64,
}

impl<D: Destination> Orchestrator<D> {
    /// Create a new orchestrator that owns `destination` for the run
    pub fn new(config: IngestConfig, destination: D) -> Self {
        Self {
            config,
            destination,
            progress: Arc::new(NoProgress),
            checkpoint_key: None,
            processor: Arc::new(process_chunk),
            base_lines: 0,
            base_chunks: 0,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Record progress under this key, and resume from it when configured
    pub fn with_checkpoint_key(mut self, key: impl Into<String>) -> Self {
        self.checkpoint_key = Some(key.into());
        self
    }

    /// Replace the per-chunk processing function
    pub fn with_processor(mut self, processor: ChunkProcessor) -> Self {
        self.processor = processor;
        self
    }

    /// Ingest the whole source, then close the destination
    pub async fn run(mut self, mut source: SourceReader) -> Result<RunSummary> {
        let started = Instant::now();
        let mut summary = RunSummary::default();

        info!(
            "Starting ingestion: chunk_size={}, workers={}, resume={}",
            self.config.chunk_size, self.config.workers, self.config.resume
        );

        let result = self.drive(&mut source, &mut summary).await;
        let closed = self.destination.close().await;
        summary.elapsed = started.elapsed();

        if let Err(e) = result {
            if let Err(close_err) = closed {
                warn!("Failed to close destination after abort: {}", close_err);
            }
            error!(
                lines_committed = summary.lines_read,
                "Ingestion aborted: {}", e
            );
            return Err(e);
        }
        closed?;

        info!(
            "Ingestion complete: {} lines, {} records, {} rows written in {:.2}s",
            summary.lines_read,
            summary.total_records(),
            summary.total_rows_written(),
            summary.elapsed.as_secs_f64()
        );
        if !summary.is_clean() {
            warn!(
                chunks_failed = summary.chunks_failed,
                lines_in_failed_chunks = summary.lines_in_failed_chunks,
                lines_failed = summary.lines_failed,
                "Some input was skipped"
            );
        }

        self.progress.finished(&summary);
        Ok(summary)
    }

    async fn drive(&mut self, source: &mut SourceReader, summary: &mut RunSummary) -> Result<()> {
        self.resume(source, summary).await?;
        self.progress.started(source.total_bytes(), summary.lines_resumed);

        let workers = self.config.workers.max(1);
        let chunk_size = self.config.chunk_size.max(1);
        let mut in_flight = FuturesUnordered::new();
        let mut resequencer: Resequencer<Completed> = Resequencer::new(0);
        let mut next_seq = 0u64;
        let mut exhausted = false;

        loop {
            while !exhausted && in_flight.len() + resequencer.buffered() < workers {
                let first_line = source.lines_read() + 1;
                let lines = source.read_chunk(chunk_size).await?;
                if lines.is_empty() {
                    exhausted = true;
                    break;
                }

                let seq = next_seq;
                next_seq += 1;
                let line_count = lines.len() as u64;
                let bytes_read = source.bytes_read();
                debug!(seq, first_line, lines = line_count, "Submitting chunk");

                let chunk = Chunk {
                    seq,
                    first_line,
                    lines,
                };
                let processor = Arc::clone(&self.processor);
                let decoding = self.config.decoding;
                let handle = tokio::task::spawn_blocking(move || processor(&chunk, decoding));

                in_flight.push(async move {
                    let output = handle.await;
                    (
                        seq,
                        Completed {
                            first_line,
                            lines: line_count,
                            bytes_read,
                            output,
                        },
                    )
                });
            }

            let Some((seq, completed)) = in_flight.next().await else {
                break;
            };
            resequencer.push(seq, completed);

            while let Some((seq, completed)) = resequencer.pop_ready() {
                self.apply(seq, completed, summary).await?;
            }
        }

        Ok(())
    }

    async fn resume(&mut self, source: &mut SourceReader, summary: &mut RunSummary) -> Result<()> {
        if !self.config.resume {
            return Ok(());
        }
        let Some(key) = self.checkpoint_key.as_deref() else {
            warn!("Resume requested without a checkpoint key; starting from the first line");
            return Ok(());
        };
        let Some(checkpoint) = self.destination.load_checkpoint(key).await? else {
            info!("No checkpoint for this source; starting from the first line");
            return Ok(());
        };

        let skipped = source.skip_lines(checkpoint.lines_consumed).await?;
        if skipped < checkpoint.lines_consumed {
            warn!(
                "Checkpoint covers {} lines but the source has only {}",
                checkpoint.lines_consumed, skipped
            );
        }
        info!(
            "Resuming after {} lines ({} chunks committed at {})",
            skipped, checkpoint.chunks_committed, checkpoint.updated_at
        );

        summary.lines_resumed = skipped;
        self.base_lines = skipped;
        self.base_chunks = checkpoint.chunks_committed;
        Ok(())
    }

    /// Persist one chunk's result together with the checkpoint
    async fn apply(&mut self, seq: u64, completed: Completed, summary: &mut RunSummary) -> Result<()> {
        let Completed {
            first_line,
            lines,
            bytes_read,
            output,
        } = completed;

        self.destination.begin().await?;

        let failed = match output {
            Ok(output) => {
                let written = storage::save(&mut self.destination, &output.batch)
                    .await
                    .inspect_err(|e| error!(seq, first_line, "Destination write failed: {}", e))?;

                summary.chunks_processed += 1;
                summary.lines_unrecognized += output.stats.unrecognized;
                summary.lines_failed += output.stats.failed;
                for (record_type, count) in output.batch.counts() {
                    *summary.records_by_type.entry(record_type).or_default() += count;
                }
                for (record_type, count) in written {
                    *summary
                        .rows_written_by_table
                        .entry(record_type.table_name().to_string())
                        .or_default() += count;
                }
                false
            },
            Err(e) => {
                error!(
                    seq,
                    first_line,
                    lines,
                    "Chunk failed, skipping {} lines: {}",
                    lines,
                    e
                );
                summary.chunks_failed += 1;
                summary.lines_in_failed_chunks += lines;
                true
            },
        };
        summary.lines_read += lines;

        if let Some(key) = &self.checkpoint_key {
            let checkpoint = Checkpoint {
                source_key: key.clone(),
                lines_consumed: self.base_lines + summary.lines_read,
                chunks_committed: self.base_chunks + summary.chunks_processed + summary.chunks_failed,
                updated_at: Utc::now(),
            };
            self.destination.store_checkpoint(&checkpoint).await?;
        }

        self.destination.commit().await?;

        info!("Processed {} lines", self.base_lines + summary.lines_read);
        self.progress.chunk_committed(&ChunkReport {
            seq,
            lines,
            lines_total: summary.lines_read,
            bytes_read,
            rows_written: summary.total_rows_written(),
            failed,
        });
        Ok(())
    }
}
