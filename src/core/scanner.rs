//! File discovery: walks a project root and returns the files eligible for packing.

use super::error::CoreError;
use super::ignore::{build_globset_from_patterns, merged_ignore_patterns, SYSTEM_IGNORED_DIRS};
use crate::utils::file_detection::is_text_file;
use globset::GlobSet;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Default cap on the size of a single discovered file (1 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Child name used to test whether a `dir/**` pattern swallows a whole directory.
const PRUNE_PROBE: &str = "\u{0}";

/// Walks a root directory and applies ignore patterns, the size cap and text detection.
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    ignore_set: GlobSet,
    max_file_size: u64,
}

impl FileDiscovery {
    /// Creates a discovery pass from user patterns (merged with the defaults) and a size cap.
    pub fn new(user_patterns: &[String], max_file_size: u64) -> Self {
        let patterns = merged_ignore_patterns(user_patterns);
        Self {
            ignore_set: build_globset_from_patterns(&patterns),
            max_file_size,
        }
    }

    /// Returns the absolute paths of all eligible text files under `root`.
    ///
    /// The walk is sorted by file name, so the result is stable for an unchanged
    /// file system. Entries that cannot be read are skipped with a warning.
    pub fn discover(&self, root: &Path) -> Result<Vec<PathBuf>, CoreError> {
        if !root.is_dir() {
            return Err(CoreError::NotADirectory(root.to_path_buf()));
        }

        let mut candidates = Vec::new();
        let mut oversized = 0usize;

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| self.keep_entry(entry, root));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping inaccessible entry during discovery: {}", e);
                    continue;
                }
            };

            // Symlinks report their own type because links are not followed.
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry.path().strip_prefix(root)?;
            if self.ignore_set.is_match(relative) {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(md) => md,
                Err(e) => {
                    tracing::warn!("Skipping inaccessible file: {} - {}", entry.path().display(), e);
                    continue;
                }
            };

            if metadata.len() > self.max_file_size {
                tracing::debug!(
                    "Skipping {} ({} bytes exceeds the {} byte cap)",
                    relative.display(),
                    metadata.len(),
                    self.max_file_size
                );
                oversized += 1;
                continue;
            }

            candidates.push(entry.into_path());
        }

        let eligible: Vec<PathBuf> = candidates
            .into_par_iter()
            .filter(|path| is_text_file(path))
            .collect();

        tracing::info!(
            "Discovery found {} eligible files under {} ({} over the size cap)",
            eligible.len(),
            root.display(),
            oversized
        );

        Ok(eligible)
    }

    /// Runs [`FileDiscovery::discover`] on the blocking thread pool.
    pub async fn discover_async(&self, root: &Path) -> Result<Vec<PathBuf>, CoreError> {
        let discovery = self.clone();
        let root = root.to_path_buf();
        tokio::task::spawn_blocking(move || discovery.discover(&root)).await?
    }

    /// Lists every directory under `root` (relative paths) for full-tree rendering.
    ///
    /// Only the fixed system directories and hidden directories are skipped;
    /// user ignore patterns do not apply here.
    pub fn list_directories(root: &Path) -> BTreeSet<PathBuf> {
        WalkDir::new(root)
            .follow_links(false)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                entry.file_type().is_dir()
                    && !is_hidden(entry)
                    && !SYSTEM_IGNORED_DIRS.iter().any(|ignored| *ignored == name)
            })
            .filter_map(|entry| match entry {
                Ok(entry) => entry.path().strip_prefix(root).ok().map(Path::to_path_buf),
                Err(e) => {
                    tracing::debug!("Skipping unreadable directory: {}", e);
                    None
                }
            })
            .collect()
    }

    fn keep_entry(&self, entry: &DirEntry, root: &Path) -> bool {
        if entry.depth() == 0 {
            return true;
        }
        if is_hidden(entry) {
            return false;
        }
        // A directory is pruned only when a pattern swallows everything below it.
        // File-name globs such as `**/*token*` must not hide `src/tokenizer/`.
        if entry.file_type().is_dir() {
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            return !self.ignore_set.is_match(relative.join(PRUNE_PROBE));
        }
        true
    }
}

impl Default for FileDiscovery {
    fn default() -> Self {
        Self::new(&[], DEFAULT_MAX_FILE_SIZE)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}
