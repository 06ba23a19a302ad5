//! Defines the central, mutable state of a packing session.

use crate::config::AppConfig;
use crate::core::{CorpusBuilder, FileDiscovery, SelectionTree};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

/// Holds the complete, mutable state of one session.
///
/// This struct is wrapped in an `Arc<Mutex<...>>` and only mutated by the
/// command handlers and the tasks they spawn.
pub struct AppState {
    /// The session's configuration settings.
    pub config: AppConfig,
    /// Where `config` is saved; `None` means the platform default location.
    pub config_path: Option<PathBuf>,
    /// The project root, once one has been loaded.
    pub root_path: Option<PathBuf>,
    /// Checkbox state mirroring the eligible files.
    pub tree: SelectionTree,
    /// Render every directory in generated documents, not just selected ones.
    pub show_full_tree: bool,
    /// `true` while discovery for a refresh is running.
    pub is_scanning: bool,
    /// `true` if a generation is currently running.
    pub is_generating: bool,
    /// A short status line for the host.
    pub status_message: String,
    /// A handle to the currently running generation task.
    pub generation_task: Option<JoinHandle<()>>,
    /// A flag used to signal cancellation to the generation task.
    pub generation_cancellation_flag: Arc<AtomicBool>,
    /// The pending debounced selection notification, if any.
    pub selection_debounce: Option<JoinHandle<()>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            config_path: None,
            root_path: None,
            tree: SelectionTree::new(PathBuf::new()),
            show_full_tree: false,
            is_scanning: false,
            is_generating: false,
            status_message: "Ready.".to_string(),
            generation_task: None,
            generation_cancellation_flag: Arc::new(AtomicBool::new(false)),
            selection_debounce: None,
        }
    }

    /// Points the session at a new root. The tree stays empty until the next refresh.
    pub fn set_root(&mut self, root: PathBuf) {
        self.cancel_current_generation();
        self.tree = SelectionTree::new(root.clone());
        self.root_path = Some(root);
    }

    pub fn discovery(&self) -> FileDiscovery {
        FileDiscovery::new(&self.config.ignore_patterns, self.config.max_file_size)
    }

    pub fn corpus_builder(&self) -> Option<CorpusBuilder> {
        self.root_path.as_ref().map(|root| {
            CorpusBuilder::new(root.clone(), self.discovery(), self.config.format_options())
        })
    }

    /// Signals the running generation to stop at its next batch boundary.
    ///
    /// In-flight reads complete; the task notices the flag and returns without
    /// delivering anything.
    pub fn cancel_current_generation(&mut self) {
        if self.generation_task.take().is_some() {
            tracing::info!("Cancelling the running generation");
        }
        self.generation_cancellation_flag
            .store(true, Ordering::SeqCst);
        self.is_generating = false;
    }

    /// Installs a fresh cancellation flag for a new generation and returns it.
    pub fn begin_generation(&mut self) -> Arc<AtomicBool> {
        self.cancel_current_generation();
        let flag = Arc::new(AtomicBool::new(false));
        self.generation_cancellation_flag = flag.clone();
        self.is_generating = true;
        flag
    }

    /// `true` if `flag` still belongs to the most recent generation.
    pub fn is_current_generation(&self, flag: &Arc<AtomicBool>) -> bool {
        Arc::ptr_eq(&self.generation_cancellation_flag, flag)
    }
}

/// Locks the shared state, recovering the guard if a previous holder panicked.
pub fn lock_state(state: &Arc<Mutex<AppState>>) -> MutexGuard<'_, AppState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
