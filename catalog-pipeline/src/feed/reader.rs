//! Streaming reader for cached feed payloads.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::PipelineError;

/// Longest accepted line, in decompressed bytes.
pub const MAX_LINE_BYTES: usize = 8 * 1024 * 1024;

/// A non-blank line of a feed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedLine {
    /// 1-based physical line number in the decompressed payload.
    pub number: usize,
    /// Raw line bytes without the trailing newline.
    pub bytes: Vec<u8>,
}

/// Yields the lines of a gzip payload one at a time.
///
/// Decompression runs on the blocking pool and hands lines over a bounded
/// channel, so a slow consumer holds back the decoder instead of buffering
/// the whole file.
pub struct FeedReader {
    lines: mpsc::Receiver<Result<FeedLine, PipelineError>>,
}

impl FeedReader {
    /// Start reading `path`. Must be called from within a tokio runtime.
    pub fn open(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self::with_line_limit(path, capacity, MAX_LINE_BYTES)
    }

    /// Like [`FeedReader::open`], but a line longer than `max_line_bytes`
    /// ends the feed with a read error.
    pub fn with_line_limit(
        path: impl Into<PathBuf>,
        capacity: usize,
        max_line_bytes: usize,
    ) -> Self {
        let path = path.into();
        let (tx, rx) = mpsc::channel(capacity.max(1));
        tokio::task::spawn_blocking(move || read_lines(&path, tx, max_line_bytes));
        Self { lines: rx }
    }

    /// Next line, an error that ends the feed, or `None` at end of file.
    pub async fn next(&mut self) -> Option<Result<FeedLine, PipelineError>> {
        self.lines.recv().await
    }
}

fn read_lines(
    path: &Path,
    tx: mpsc::Sender<Result<FeedLine, PipelineError>>,
    max_line_bytes: usize,
) {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            let _ = tx.blocking_send(Err(PipelineError::read(format!(
                "{}: {}",
                path.display(),
                e
            ))));
            return;
        }
    };

    let mut reader = BufReader::new(MultiGzDecoder::new(file));
    let mut number = 0;
    loop {
        let mut bytes = Vec::new();
        let limit = max_line_bytes as u64 + 1;
        match (&mut reader).take(limit).read_until(b'\n', &mut bytes) {
            Ok(0) => break,
            Ok(_) if bytes.len() > max_line_bytes && bytes.last() != Some(&b'\n') => {
                let _ = tx.blocking_send(Err(PipelineError::read(format!(
                    "{}: line {} exceeds {} bytes",
                    path.display(),
                    number + 1,
                    max_line_bytes
                ))));
                return;
            }
            Ok(_) => {
                number += 1;
                while matches!(bytes.last(), Some(b'\n' | b'\r')) {
                    bytes.pop();
                }
                if bytes.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                if tx.blocking_send(Ok(FeedLine { number, bytes })).is_err() {
                    // Consumer went away.
                    return;
                }
            }
            Err(e) => {
                let _ = tx.blocking_send(Err(PipelineError::read(format!(
                    "{} after line {}: {}",
                    path.display(),
                    number,
                    e
                ))));
                return;
            }
        }
    }
    debug!(path = %path.display(), lines = number, "Finished reading feed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn gzip(text: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    async fn collect(reader: &mut FeedReader) -> Vec<Result<FeedLine, PipelineError>> {
        let mut out = Vec::new();
        while let Some(item) = reader.next().await {
            out.push(item);
        }
        out
    }

    #[tokio::test]
    async fn test_reads_lines_and_skips_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.ljson.gz");
        std::fs::write(&path, gzip("{\"id\":1}\n\n  \r\n{\"id\":2}\r\n{\"id\":3}")).unwrap();

        let mut reader = FeedReader::open(&path, 1);
        let lines: Vec<FeedLine> = collect(&mut reader)
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].number, 1);
        assert_eq!(lines[0].bytes, b"{\"id\":1}");
        assert_eq!(lines[1].number, 4);
        assert_eq!(lines[1].bytes, b"{\"id\":2}");
        assert_eq!(lines[2].number, 5);
        assert_eq!(lines[2].bytes, b"{\"id\":3}");
    }

    #[tokio::test]
    async fn test_reads_concatenated_members() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.ljson.gz");
        let mut payload = gzip("{\"id\":1}\n");
        payload.extend(gzip("{\"id\":2}\n"));
        std::fs::write(&path, payload).unwrap();

        let mut reader = FeedReader::open(&path, 4);
        let lines = collect(&mut reader).await;

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].as_ref().unwrap().bytes, b"{\"id\":2}");
    }

    #[tokio::test]
    async fn test_corrupt_payload_ends_with_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.ljson.gz");
        std::fs::write(&path, b"this is not gzip at all\n").unwrap();

        let mut reader = FeedReader::open(&path, 4);
        let items = collect(&mut reader).await;

        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(PipelineError::ReadError(_))));
    }

    #[tokio::test]
    async fn test_truncated_payload_ends_with_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.ljson.gz");
        let text: String = (0..500).map(|i| format!("{{\"id\":{}}}\n", i)).collect();
        let payload = gzip(&text);
        std::fs::write(&path, &payload[..payload.len() / 2]).unwrap();

        let mut reader = FeedReader::open(&path, 4);
        let items = collect(&mut reader).await;

        assert!(matches!(items.last(), Some(Err(PipelineError::ReadError(_)))));
        assert!(items[..items.len() - 1].iter().all(Result::is_ok));
    }

    #[tokio::test]
    async fn test_oversized_line_ends_with_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.ljson.gz");
        let long = "x".repeat(64);
        std::fs::write(&path, gzip(&format!("{{\"id\":1}}\n{}\n{{\"id\":2}}\n", long))).unwrap();

        let mut reader = FeedReader::with_line_limit(&path, 4, 32);
        let items = collect(&mut reader).await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().bytes, b"{\"id\":1}");
        match &items[1] {
            Err(PipelineError::ReadError(msg)) => assert!(msg.contains("line 2 exceeds 32 bytes")),
            other => panic!("expected a read error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_line_at_the_limit_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.ljson.gz");
        let exact = "y".repeat(32);
        std::fs::write(&path, gzip(&format!("{}\n{}", exact, exact))).unwrap();

        let mut reader = FeedReader::with_line_limit(&path, 4, 32);
        let items = collect(&mut reader).await;

        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|item| item.as_ref().unwrap().bytes.len() == 32));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = FeedReader::open(dir.path().join("absent.gz"), 4);

        assert!(matches!(
            reader.next().await,
            Some(Err(PipelineError::ReadError(_)))
        ));
        assert!(reader.next().await.is_none());
    }
}
