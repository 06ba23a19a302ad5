//! Batch reading of selected files and the statistics derived from them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use super::ScanProgress;
use crate::utils::file_detection::dotted_extension;

/// Number of files read concurrently before yielding.
pub const BATCH_SIZE: usize = 50;

/// Histogram key for files without an extension.
pub const NO_EXTENSION: &str = "no extension";

/// One file read for the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Path relative to the project root.
    pub relative_path: String,
    pub content: String,
    /// Size on disk in bytes.
    pub size: u64,
    pub lines: usize,
    /// Extension with its leading dot, or empty.
    pub extension: String,
}

/// Aggregate statistics over a set of [`FileRecord`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusStats {
    pub total_files: usize,
    pub total_size: u64,
    pub total_lines: usize,
    pub estimated_tokens: u64,
    pub files_by_type: HashMap<String, usize>,
}

impl CorpusStats {
    /// The `limit` most common extensions, most frequent first.
    /// Equal counts are ordered by extension name.
    pub fn top_file_types(&self, limit: usize) -> Vec<(&str, usize)> {
        let mut types: Vec<(&str, usize)> = self
            .files_by_type
            .iter()
            .map(|(ext, count)| (ext.as_str(), *count))
            .collect();
        types.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        types.truncate(limit);
        types
    }
}

pub struct FileHandler;

impl FileHandler {
    /// Reads `files` in batches of [`BATCH_SIZE`] concurrent reads.
    ///
    /// The cancel flag is checked before every batch and once more after the
    /// last one; a cancelled run returns `None`. Files that cannot be read are
    /// skipped with a warning. Records are sorted by relative path.
    pub async fn read_in_batches(
        files: &[PathBuf],
        root_path: &Path,
        progress_sender: &mpsc::UnboundedSender<ScanProgress>,
        cancel_flag: &AtomicBool,
    ) -> Option<Vec<FileRecord>> {
        let total = files.len();
        let mut processed = 0;
        let mut records = Vec::with_capacity(total);

        for batch in files.chunks(BATCH_SIZE) {
            if cancel_flag.load(Ordering::Relaxed) {
                tracing::info!("File processing cancelled after {}/{} files", processed, total);
                return None;
            }

            let mut set = JoinSet::new();
            for path in batch {
                let path = path.clone();
                let root = root_path.to_path_buf();
                set.spawn(async move { Self::read_record(&path, &root).await });
            }

            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok(Some(record)) => records.push(record),
                    Ok(None) => {}
                    Err(e) => tracing::warn!("File read task failed: {}", e),
                }
            }

            processed += batch.len();
            progress_sender
                .send(ScanProgress::new(
                    processed,
                    total,
                    format!("Processed {processed}/{total} files..."),
                ))
                .ok();

            tokio::task::yield_now().await;
        }

        if cancel_flag.load(Ordering::Relaxed) {
            tracing::info!("File processing cancelled after the last batch");
            return None;
        }

        records.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Some(records)
    }

    async fn read_record(path: &Path, root_path: &Path) -> Option<FileRecord> {
        let read = async {
            let bytes = tokio::fs::read(path).await?;
            let metadata = tokio::fs::metadata(path).await?;
            Ok::<_, std::io::Error>((bytes, metadata.len()))
        };

        match read.await {
            Ok((bytes, size)) => {
                let content = String::from_utf8_lossy(&bytes).into_owned();
                let relative_path = path
                    .strip_prefix(root_path)
                    .unwrap_or(path)
                    .to_string_lossy()
                    .into_owned();
                Some(FileRecord {
                    lines: line_count(&content),
                    extension: dotted_extension(path),
                    relative_path,
                    content,
                    size,
                })
            }
            Err(e) => {
                tracing::warn!("Skipped file due to read error: {} - {}", path.display(), e);
                None
            }
        }
    }
}

/// Number of `\n`-separated segments, so `""` has one line and a trailing
/// newline adds an empty last line.
pub fn line_count(content: &str) -> usize {
    content.split('\n').count()
}

/// Roughly four characters per token, rounded up. Characters are counted in
/// UTF-16 code units.
pub fn estimate_tokens(content: &str) -> u64 {
    let units = content.encode_utf16().count() as u64;
    units.div_ceil(4)
}

pub fn calculate_stats(records: &[FileRecord]) -> CorpusStats {
    let mut stats = CorpusStats {
        total_files: records.len(),
        ..CorpusStats::default()
    };

    for record in records {
        stats.total_size += record.size;
        stats.total_lines += record.lines;
        stats.estimated_tokens += estimate_tokens(&record.content);

        let key = if record.extension.is_empty() {
            NO_EXTENSION.to_string()
        } else {
            record.extension.clone()
        };
        *stats.files_by_type.entry(key).or_insert(0) += 1;
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;
    use tracing_test::traced_test;

    fn record(path: &str, content: &str) -> FileRecord {
        FileRecord {
            relative_path: path.to_string(),
            content: content.to_string(),
            size: content.len() as u64,
            lines: line_count(content),
            extension: dotted_extension(Path::new(path)),
        }
    }

    #[test]
    fn test_line_count_convention() {
        assert_eq!(line_count(""), 1);
        assert_eq!(line_count("a"), 1);
        assert_eq!(line_count("a\nb"), 2);
        assert_eq!(line_count("a\nb\n"), 3);
    }

    #[test]
    fn test_estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        // One astral character is two UTF-16 units.
        assert_eq!(estimate_tokens("🦀🦀🦀"), 2);
    }

    #[test]
    fn test_calculate_stats_sums_per_file_estimates() {
        let records = vec![record("a.ts", "x"), record("b.ts", "x"), record("README", "hello")];
        let stats = calculate_stats(&records);

        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.total_size, 7);
        assert_eq!(stats.total_lines, 3);
        // ceil(1/4) + ceil(1/4) + ceil(5/4), not ceil(7/4).
        assert_eq!(stats.estimated_tokens, 4);
        assert_eq!(stats.files_by_type.get(".ts"), Some(&2));
        assert_eq!(stats.files_by_type.get(NO_EXTENSION), Some(&1));
    }

    #[test]
    fn test_top_file_types_ranking() {
        let records: Vec<FileRecord> = ["a.ts", "b.ts", "c.ts", "d.md", "e.md", "f.json"]
            .iter()
            .map(|p| record(p, ""))
            .collect();
        let stats = calculate_stats(&records);

        assert_eq!(stats.top_file_types(10), vec![(".ts", 3), (".md", 2), (".json", 1)]);
        assert_eq!(stats.top_file_types(1), vec![(".ts", 3)]);
    }

    #[tokio::test]
    async fn test_read_in_batches_sorts_and_reports_progress() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut files = Vec::new();
        for i in (0..120).rev() {
            let path = root.join(format!("f{i:03}.txt"));
            fs::write(&path, format!("line {i}\n")).unwrap();
            files.push(path);
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = AtomicBool::new(false);
        let records = FileHandler::read_in_batches(&files, root, &tx, &cancel)
            .await
            .unwrap();

        assert_eq!(records.len(), 120);
        assert_eq!(records[0].relative_path, "f000.txt");
        assert_eq!(records[119].relative_path, "f119.txt");
        assert_eq!(records[5].lines, 2);
        assert_eq!(records[5].extension, ".txt");

        let mut messages = Vec::new();
        while let Ok(progress) = rx.try_recv() {
            messages.push(progress.message);
        }
        assert_eq!(
            messages,
            vec![
                "Processed 50/120 files...",
                "Processed 100/120 files...",
                "Processed 120/120 files...",
            ]
        );
    }

    #[tokio::test]
    async fn test_read_in_batches_cancelled_before_first_batch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "a").unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = AtomicBool::new(true);
        let result = FileHandler::read_in_batches(&[path], dir.path(), &tx, &cancel).await;

        assert!(result.is_none());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_read_in_batches_empty_selection() {
        let dir = tempdir().unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let result = FileHandler::read_in_batches(&[], dir.path(), &tx, &AtomicBool::new(false)).await;
        assert_eq!(result, Some(Vec::new()));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_unreadable_file_is_skipped_with_warning() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good.rs");
        fs::write(&good, "fn main() {}").unwrap();
        let missing = dir.path().join("gone.rs");

        let (tx, _rx) = mpsc::unbounded_channel();
        let records =
            FileHandler::read_in_batches(&[good, missing], dir.path(), &tx, &AtomicBool::new(false))
                .await
                .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].relative_path, "good.rs");
        assert!(logs_contain("Skipped file due to read error"));
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_decoded_lossily() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin1.txt");
        fs::write(&path, [b'c', b'a', b'f', 0xe9]).unwrap();

        let (tx, _rx) = mpsc::unbounded_channel();
        let records = FileHandler::read_in_batches(&[path], dir.path(), &tx, &AtomicBool::new(false))
            .await
            .unwrap();

        assert_eq!(records[0].content, "caf\u{FFFD}");
        assert_eq!(records[0].size, 4);
    }
}
