//! Progress reporting
//!
//! The pipeline reports through [`ProgressSink`]; every method has a no-op
//! default so a sink only implements what it displays. [`BarProgress`] is the
//! terminal implementation used by the CLI.

use crate::models::RunSummary;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// What the orchestrator knows after committing one chunk
#[derive(Debug, Clone, Default)]
pub struct ChunkReport {
    pub seq: u64,
    pub lines: u64,
    /// Lines committed by this run so far
    pub lines_total: u64,
    /// Source bytes consumed up to the end of this chunk
    pub bytes_read: u64,
    /// Rows written by this run so far
    pub rows_written: u64,
    /// The chunk's processing task failed and its lines were skipped
    pub failed: bool,
}

pub trait ProgressSink: Send + Sync {
    /// Called once before the first chunk
    fn started(&self, _total_bytes: Option<u64>, _resumed_lines: u64) {}

    fn chunk_committed(&self, _report: &ChunkReport) {}

    fn finished(&self, _summary: &RunSummary) {}
}

/// Sink that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// Terminal progress: a byte bar for plain files, a spinner otherwise
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BarProgress {
    fn started(&self, total_bytes: Option<u64>, resumed_lines: u64) {
        match total_bytes {
            Some(total) => {
                self.bar.set_length(total);
                self.bar.set_style(
                    ProgressStyle::default_bar()
                        .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("#>-"),
                );
            },
            None => {
                self.bar.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner:.green} [{elapsed_precise}] {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                self.bar.enable_steady_tick(Duration::from_millis(100));
            },
        }
        self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        if resumed_lines > 0 {
            self.bar.set_message(format!("Resuming after {} lines", resumed_lines));
        } else {
            self.bar.set_message("Ingesting");
        }
    }

    fn chunk_committed(&self, report: &ChunkReport) {
        self.bar.set_position(report.bytes_read);
        self.bar.set_message(format!(
            "{} lines processed, {} rows written",
            report.lines_total, report.rows_written
        ));
    }

    fn finished(&self, summary: &RunSummary) {
        self.bar.finish_with_message(format!(
            "Done: {} lines, {} records in {:.1}s",
            summary.lines_read,
            summary.total_records(),
            summary.elapsed.as_secs_f64()
        ));
    }
}
