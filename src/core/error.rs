//! Defines the custom error type for the `core` module.

use std::path::{PathBuf, StripPrefixError};
use thiserror::Error;

/// The primary error type for the `core` module.
///
/// Only whole-operation failures are represented here. A single unreadable
/// file during discovery or batch reading is skipped and logged instead of
/// being turned into a `CoreError`.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Represents an error that occurred when a Tokio task was joined.
    /// This is often due to a task panicking or being cancelled.
    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// The project root does not exist or is not a directory.
    #[error("Path is not a valid directory: {0}")]
    NotADirectory(PathBuf),

    /// Represents a failure to strip a path prefix.
    #[error("Failed to strip prefix from path: {0}")]
    PathStrip(#[from] StripPrefixError),
}
