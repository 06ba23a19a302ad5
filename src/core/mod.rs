pub mod error;
pub mod file_handler;
pub mod formatter;
pub mod ignore;
pub mod scanner;
pub mod selection;
pub mod tree_generator;

/// A progress milestone emitted while a corpus is being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanProgress {
    pub processed: usize,
    pub total: usize,
    pub message: String,
}

impl ScanProgress {
    pub fn new(processed: usize, total: usize, message: impl Into<String>) -> Self {
        Self {
            processed,
            total,
            message: message.into(),
        }
    }
}

pub use error::CoreError;
pub use file_handler::{CorpusStats, FileHandler, FileRecord};
pub use formatter::{Corpus, CorpusBuilder, FormatOptions, OutputFormat};
pub use ignore::build_globset_from_patterns;
pub use scanner::FileDiscovery;
pub use selection::{CheckState, NodeId, SelectionTree};
pub use tree_generator::{TreeGenerator, TreeMode};
