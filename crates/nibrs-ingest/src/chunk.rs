// Chunk processor
//
// Pure CPU work: no I/O happens here, so a chunk can run on any blocking
// worker thread.

use crate::models::TypeBatch;
use crate::parser::{parse_line_with, Decoding};
use tracing::warn;

/// A bounded, ordered run of raw lines
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    /// Position of this chunk in read order, starting at 0
    pub seq: u64,
    /// 1-based line number of `lines[0]` within the source
    pub first_line: u64,
    pub lines: Vec<Vec<u8>>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Per-chunk line accounting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkStats {
    pub lines: u64,
    pub records: u64,
    pub unrecognized: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ChunkOutput {
    pub batch: TypeBatch,
    pub stats: ChunkStats,
}

/// Parse every line of a chunk and group the records by type
///
/// A line that fails extraction is logged with its absolute line number,
/// counted, and skipped.
pub fn process_chunk(chunk: &Chunk, decoding: Decoding) -> ChunkOutput {
    let mut output = ChunkOutput::default();
    output.stats.lines = chunk.lines.len() as u64;

    for (offset, line) in chunk.lines.iter().enumerate() {
        match parse_line_with(line, decoding) {
            Ok(Some(record)) => {
                output.batch.push(record);
                output.stats.records += 1;
            },
            Ok(None) => output.stats.unrecognized += 1,
            Err(e) => {
                warn!(
                    seq = chunk.seq,
                    line = chunk.first_line + offset as u64,
                    "Skipping line: {}",
                    e
                );
                output.stats.failed += 1;
            },
        }
    }

    output
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::schema::RecordType;

    fn chunk(lines: &[&[u8]]) -> Chunk {
        Chunk {
            seq: 0,
            first_line: 1,
            lines: lines.iter().map(|l| l.to_vec()).collect(),
        }
    }

    #[test]
    fn test_groups_by_type_and_omits_empty() {
        let output = process_chunk(
            &chunk(&[b"BH", b"01", b"05", b"05", b"ZZ"]),
            Decoding::Strict,
        );
        assert_eq!(output.batch.get(RecordType::BatchHeader).map(<[_]>::len), Some(1));
        assert_eq!(output.batch.get(RecordType::Offender).map(<[_]>::len), Some(2));
        assert!(output.batch.get(RecordType::Property).is_none());
        assert_eq!(
            output.stats,
            ChunkStats {
                lines: 5,
                records: 4,
                unrecognized: 1,
                failed: 0
            }
        );
    }

    #[test]
    fn test_bad_line_is_skipped_not_fatal() {
        let bad: &[u8] = b"05XXXXXXXXXXXXXX\xFF\xFE";
        let output = process_chunk(&chunk(&[b"05", bad, b"06"]), Decoding::Strict);
        assert_eq!(output.stats.failed, 1);
        assert_eq!(output.stats.records, 2);
        assert_eq!(output.batch.len(), 2);
    }

    #[test]
    fn test_lossy_keeps_bad_line() {
        let bad: &[u8] = b"05XXXXXXXXXXXXXX\xFF\xFE";
        let output = process_chunk(&chunk(&[bad]), Decoding::Lossy);
        assert_eq!(output.stats.failed, 0);
        assert_eq!(output.stats.records, 1);
    }

    #[test]
    fn test_overlong_line_counts_as_failed() {
        let mut long = b"05".to_vec();
        long.resize(crate::parser::MAX_LINE_BYTES + 1, b'X');
        let output = process_chunk(&chunk(&[long.as_slice(), b"05"]), Decoding::Lossy);
        assert_eq!(output.stats.failed, 1);
        assert_eq!(output.stats.records, 1);
    }

    #[test]
    fn test_empty_chunk() {
        let output = process_chunk(&Chunk::default(), Decoding::Strict);
        assert!(output.batch.is_empty());
        assert_eq!(output.stats, ChunkStats::default());
    }
}
