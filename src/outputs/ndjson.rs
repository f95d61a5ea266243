//! Gzip NDJSON sink.
//!
//! Each post becomes one line: compact JSON with keys sorted
//! lexicographically, then `\n`. The file is created or truncated, never
//! appended to, and compressed at level 9.

use crate::error::ScrapeError;
use crate::models::Post;
use flate2::Compression;
use flate2::write::GzEncoder;
use futures::{Stream, TryStreamExt};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument};

/// Writer for a gzip-compressed NDJSON dump file.
///
/// Owns the output file for the whole run. Call [`NdjsonGzWriter::finish`]
/// to write the gzip trailer; dropping the writer without it leaves the
/// trailer to `flate2`'s best-effort drop.
pub struct NdjsonGzWriter {
    encoder: GzEncoder<BufWriter<File>>,
    path: PathBuf,
    records: usize,
}

impl NdjsonGzWriter {
    /// Create (or truncate) `path` for writing at compression level 9.
    ///
    /// # Arguments
    ///
    /// * `path` - Destination file; its parent directory must exist
    ///
    /// # Errors
    ///
    /// [`ScrapeError::Io`] if the file cannot be created.
    pub fn create(path: &Path) -> Result<Self, ScrapeError> {
        let file = File::create(path)?;
        Ok(Self {
            encoder: GzEncoder::new(BufWriter::new(file), Compression::best()),
            path: path.to_path_buf(),
            records: 0,
        })
    }

    /// Append one post as a sorted-key JSON line.
    ///
    /// # Arguments
    ///
    /// * `post` - The record to serialize, unmodified
    ///
    /// # Errors
    ///
    /// [`ScrapeError::Encode`] if the post cannot be serialized,
    /// [`ScrapeError::Io`] if the compressed write fails.
    pub fn write_post(&mut self, post: &Post) -> Result<(), ScrapeError> {
        let line = post.to_sorted_json().map_err(ScrapeError::Encode)?;
        self.encoder.write_all(line.as_bytes())?;
        self.encoder.write_all(b"\n")?;
        self.records += 1;
        Ok(())
    }

    /// Number of posts written so far.
    pub fn records(&self) -> usize {
        self.records
    }

    /// Write the gzip trailer and flush to disk. Returns the record count.
    pub fn finish(self) -> Result<usize, ScrapeError> {
        let mut inner = self.encoder.finish()?;
        inner.flush()?;
        debug!(path = %self.path.display(), records = self.records, "Closed dump file");
        Ok(self.records)
    }
}

/// Drain `posts` into a fresh dump file at `path`.
///
/// # Arguments
///
/// * `posts` - The lazy post stream produced by the pagination driver
/// * `path` - The dump file, created or truncated
///
/// # Returns
///
/// The number of posts written, or the first error from the stream or the
/// file.
///
/// On a stream error the file is still finished so that everything written
/// so far stays readable, then the error is returned.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_posts<St>(posts: St, path: &Path) -> Result<usize, ScrapeError>
where
    St: Stream<Item = Result<Post, ScrapeError>>,
{
    let mut writer = NdjsonGzWriter::create(path)?;
    let mut posts = std::pin::pin!(posts);

    loop {
        match posts.try_next().await {
            Ok(Some(post)) => writer.write_post(&post)?,
            Ok(None) => break,
            Err(e) => {
                let written = writer.records();
                if let Err(close_err) = writer.finish() {
                    error!(error = %close_err, "Could not finish dump file after failure");
                }
                error!(records = written, error = %e, "Download aborted; dump file is truncated");
                return Err(e);
            }
        }
    }

    let records = writer.finish()?;
    info!(records, "Wrote dump file");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use futures::stream;
    use serde_json::{Value, json};
    use std::io::{BufRead, BufReader, Read};

    fn post(value: Value) -> Post {
        serde_json::from_value(value).unwrap()
    }

    fn read_lines(path: &Path) -> Vec<String> {
        let file = File::open(path).unwrap();
        BufReader::new(GzDecoder::new(file))
            .lines()
            .map(|l| l.unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_writes_sorted_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ndjson.gz");
        let posts = vec![
            Ok(post(json!({"title": "b", "id": "2", "created_utc": 2, "author": "x"}))),
            Ok(post(json!({"score": 10, "id": "1", "created_utc": 1}))),
        ];

        let written = write_posts(stream::iter(posts), &path).await.unwrap();
        assert_eq!(written, 2);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"author":"x","created_utc":2,"id":"2","title":"b"}"#);
        for line in &lines {
            let raw: Vec<String> = match serde_json::from_str::<Value>(line).unwrap() {
                Value::Object(map) => map.keys().cloned().collect(),
                other => panic!("not an object: {other}"),
            };
            let mut sorted = raw.clone();
            sorted.sort();
            assert_eq!(raw, sorted);
        }
    }

    #[tokio::test]
    async fn test_file_ends_with_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ndjson.gz");
        write_posts(stream::iter(vec![Ok(post(json!({"id": "a"})))]), &path)
            .await
            .unwrap();

        let mut raw = String::new();
        GzDecoder::new(File::open(&path).unwrap())
            .read_to_string(&mut raw)
            .unwrap();
        assert_eq!(raw, "{\"id\":\"a\"}\n");
    }

    #[tokio::test]
    async fn test_truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ndjson.gz");
        std::fs::write(&path, b"stale bytes that are not gzip").unwrap();

        let written = write_posts(stream::iter(Vec::<Result<Post, ScrapeError>>::new()), &path)
            .await
            .unwrap();

        assert_eq!(written, 0);
        assert!(read_lines(&path).is_empty());
    }

    #[tokio::test]
    async fn test_error_leaves_valid_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ndjson.gz");
        let posts = vec![
            Ok(post(json!({"id": "a", "created_utc": 1}))),
            Err(ScrapeError::Config("upstream went away".to_string())),
            Ok(post(json!({"id": "never", "created_utc": 2}))),
        ];

        let err = write_posts(stream::iter(posts), &path).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Config(_)));

        let lines = read_lines(&path);
        assert_eq!(lines, vec![r#"{"created_utc":1,"id":"a"}"#.to_string()]);
    }

    #[test]
    fn test_create_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no/such/dir/out.gz");
        assert!(matches!(NdjsonGzWriter::create(&path), Err(ScrapeError::Io(_))));
    }
}
