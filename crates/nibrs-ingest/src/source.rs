// Source stream reader
//
// Streams a master file line by line in bounded chunks. Paths ending in
// `.gz` are decompressed on the fly.

use crate::parser::MAX_LINE_BYTES;
use async_compression::tokio::bufread::GzipDecoder;
use nibrs_common::{NibrsError, Result};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tracing::debug;

/// Read buffer for the underlying file
const READ_BUFFER_BYTES: usize = 1 << 20;

/// Upper bound on the line vector preallocated per chunk
const MAX_PREALLOC_LINES: usize = 1 << 16;

pub struct SourceReader {
    reader: Box<dyn AsyncBufRead + Unpin + Send>,
    lines_read: u64,
    bytes_read: u64,
    total_bytes: Option<u64>,
}

impl SourceReader {
    /// Open a file, transparently decompressing `.gz`
    ///
    /// Any failure to open is fatal and reported as [`NibrsError::SourceOpen`].
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let open_err = |source| NibrsError::SourceOpen {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).await.map_err(open_err)?;
        let metadata = file.metadata().await.map_err(open_err)?;
        if metadata.is_dir() {
            return Err(open_err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "is a directory",
            )));
        }
        let buffered = BufReader::with_capacity(READ_BUFFER_BYTES, file);

        let compressed = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));
        debug!(path = %path.display(), compressed, size = metadata.len(), "Opened source");

        if compressed {
            let mut decoder = GzipDecoder::new(buffered);
            decoder.multiple_members(true);
            Ok(Self::new(BufReader::with_capacity(READ_BUFFER_BYTES, decoder)))
        } else {
            let mut reader = Self::new(buffered);
            reader.total_bytes = Some(metadata.len());
            Ok(reader)
        }
    }

    /// Wrap any buffered async reader
    pub fn new<R>(reader: R) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        Self {
            reader: Box::new(reader),
            lines_read: 0,
            bytes_read: 0,
            total_bytes: None,
        }
    }

    /// Read up to `max_lines` lines, fewer only at end of stream
    ///
    /// Line terminators (`\n` or `\r\n`) are removed. An empty result means
    /// the stream is exhausted. A line longer than [`MAX_LINE_BYTES`] is cut
    /// to `MAX_LINE_BYTES + 1` bytes and the rest of it is discarded, so the
    /// parser still sees it as too long.
    pub async fn read_chunk(&mut self, max_lines: usize) -> Result<Vec<Vec<u8>>> {
        let mut lines = Vec::with_capacity(max_lines.min(MAX_PREALLOC_LINES));
        while lines.len() < max_lines {
            match self.next_line().await? {
                Some(line) => lines.push(line),
                None => break,
            }
        }
        Ok(lines)
    }

    /// Discard up to `count` lines; returns how many were actually skipped
    pub async fn skip_lines(&mut self, count: u64) -> Result<u64> {
        let mut skipped = 0;
        while skipped < count {
            if self.next_line().await?.is_none() {
                break;
            }
            skipped += 1;
        }
        Ok(skipped)
    }

    /// Lines consumed so far, skipped lines included
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// Decompressed bytes consumed so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Size of the source in bytes when it is read uncompressed
    pub fn total_bytes(&self) -> Option<u64> {
        self.total_bytes
    }

    async fn next_line(&mut self) -> Result<Option<Vec<u8>>> {
        let limit = MAX_LINE_BYTES as u64 + 1;
        let mut line = Vec::new();
        let n = (&mut self.reader).take(limit).read_until(b'\n', &mut line).await?;
        if n == 0 {
            return Ok(None);
        }
        let mut consumed = n as u64;
        if n as u64 == limit && line.last() != Some(&b'\n') {
            let discarded = self.discard_rest_of_line().await?;
            debug!(
                line = self.lines_read + 1,
                discarded, "Truncated overlong line"
            );
            consumed += discarded;
        }
        self.bytes_read += consumed;
        self.lines_read += 1;

        if line.last() == Some(&b'\n') {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }

    /// Consume bytes up to and including the next `\n`
    async fn discard_rest_of_line(&mut self) -> Result<u64> {
        let mut discarded = 0u64;
        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                return Ok(discarded);
            }
            let (used, done) = match buf.iter().position(|&b| b == b'\n') {
                Some(i) => (i + 1, true),
                None => (buf.len(), false),
            };
            self.reader.consume(used);
            discarded += used as u64;
            if done {
                return Ok(discarded);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(text: &str) -> SourceReader {
        SourceReader::new(Cursor::new(text.as_bytes().to_vec()))
    }

    #[tokio::test]
    async fn test_read_chunk_strips_terminators() {
        let mut source = reader("BH one\r\n01 two\n05 three");
        let lines = source.read_chunk(10).await.unwrap();
        assert_eq!(lines, vec![b"BH one".to_vec(), b"01 two".to_vec(), b"05 three".to_vec()]);
        assert_eq!(source.lines_read(), 3);
        assert_eq!(source.bytes_read(), 23);
        assert!(source.read_chunk(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_chunk_is_bounded() {
        let mut source = reader("a\nb\nc\nd\ne\n");
        assert_eq!(source.read_chunk(2).await.unwrap().len(), 2);
        assert_eq!(source.read_chunk(2).await.unwrap().len(), 2);
        assert_eq!(source.read_chunk(2).await.unwrap(), vec![b"e".to_vec()]);
        assert!(source.read_chunk(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_lines_are_kept() {
        let mut source = reader("a\n\nb\n");
        let lines = source.read_chunk(10).await.unwrap();
        assert_eq!(lines, vec![b"a".to_vec(), Vec::new(), b"b".to_vec()]);
    }

    #[tokio::test]
    async fn test_overlong_line_is_bounded() {
        let mut text = "X".repeat(MAX_LINE_BYTES + 100);
        text.push_str("\n05 next\n");
        let mut source = reader(&text);

        let lines = source.read_chunk(10).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), MAX_LINE_BYTES + 1);
        assert_eq!(lines[1], b"05 next".to_vec());
        assert_eq!(source.lines_read(), 2);
        assert_eq!(source.bytes_read(), text.len() as u64);
    }

    #[tokio::test]
    async fn test_line_at_limit_is_whole() {
        let mut text = "X".repeat(MAX_LINE_BYTES);
        text.push('\n');
        let mut source = reader(&text);

        let lines = source.read_chunk(10).await.unwrap();
        assert_eq!(lines, vec![vec![b'X'; MAX_LINE_BYTES]]);
    }

    #[tokio::test]
    async fn test_skip_lines_past_end() {
        let mut source = reader("a\nb\n");
        assert_eq!(source.skip_lines(5).await.unwrap(), 2);
        assert_eq!(source.lines_read(), 2);
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let err = SourceReader::open("/no/such/master.txt").await.err().unwrap();
        assert!(matches!(err, NibrsError::SourceOpen { .. }));
    }

    #[tokio::test]
    async fn test_open_gzip_file() {
        use async_compression::tokio::write::GzipEncoder;
        use tokio::io::AsyncWriteExt;

        let mut encoder = GzipEncoder::new(Vec::new());
        encoder.write_all(b"BH header\r\n05 offender\n").await.unwrap();
        encoder.shutdown().await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master.txt.gz");
        std::fs::write(&path, encoder.into_inner()).unwrap();

        let mut source = SourceReader::open(&path).await.unwrap();
        assert_eq!(source.total_bytes(), None);
        let lines = source.read_chunk(10).await.unwrap();
        assert_eq!(lines, vec![b"BH header".to_vec(), b"05 offender".to_vec()]);
    }

    #[tokio::test]
    async fn test_open_plain_file_reports_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master.txt");
        std::fs::write(&path, b"BH\n01\n").unwrap();

        let mut source = SourceReader::open(&path).await.unwrap();
        assert_eq!(source.total_bytes(), Some(6));
        assert_eq!(source.read_chunk(10).await.unwrap().len(), 2);
    }
}
