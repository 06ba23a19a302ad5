//! Long-running and deferred work spawned by the command handlers.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use super::events::UserEvent;
use super::helpers::{with_selection_and_notify, with_state_and_notify};
use super::proxy::EventProxy;
use super::sinks::OutputSink;
use super::state::{lock_state, AppState};
use super::view_model::SelectionStats;
use crate::core::{CorpusBuilder, ScanProgress};
use crate::utils::format_size;

/// Quiet period before a selection change is announced.
pub const SELECTION_DEBOUNCE: Duration = Duration::from_millis(50);

/// What happens with a finished document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationTarget {
    Clipboard,
    Preview,
}

/// Everything a generation run needs, captured while the state is locked.
pub struct GenerationJob {
    pub builder: CorpusBuilder,
    pub files: Vec<PathBuf>,
    pub full_tree: bool,
    pub target: GenerationTarget,
    pub cancel_flag: Arc<AtomicBool>,
}

/// Waits out the debounce window, then announces the latest selection.
///
/// Rescheduling aborts this task while it sleeps, so only the last mutation in
/// a burst produces events.
pub async fn debounced_selection_task<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    tokio::time::sleep(SELECTION_DEBOUNCE).await;

    let (files, full_tree) = {
        let state_guard = lock_state(&state);
        (state_guard.tree.selected_files(), state_guard.show_full_tree)
    };

    proxy.send_event(UserEvent::SelectionChanged {
        files: files.clone(),
        full_tree,
    });
    proxy.send_event(UserEvent::StatsUpdate(
        selection_stats(&files, full_tree).await,
    ));
}

/// Sums the on-disk sizes of `files`. Files that vanished count as empty.
pub async fn selection_stats(files: &[PathBuf], full_tree: bool) -> SelectionStats {
    let mut sizes = Vec::with_capacity(files.len());
    for file in files {
        let size = match tokio::fs::metadata(file).await {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                tracing::debug!("No size for {}: {}", file.display(), e);
                0
            }
        };
        sizes.push(size);
    }
    SelectionStats::from_sizes(&sizes, full_tree)
}

/// Re-discovers the project and rebuilds the selection tree (all checked).
pub async fn refresh_tree_task<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    let (root, discovery) = {
        let mut state_guard = lock_state(&state);
        let Some(root) = state_guard.root_path.clone() else {
            proxy.send_event(UserEvent::ShowError(
                "No project folder loaded.".to_string(),
            ));
            return;
        };
        state_guard.is_scanning = true;
        state_guard.status_message = "Scanning...".to_string();
        proxy.send_event(UserEvent::StateUpdate(Box::new(
            super::view_model::generate_ui_state(&state_guard),
        )));
        (root, state_guard.discovery())
    };

    match discovery.discover_async(&root).await {
        Ok(files) => {
            tracing::info!("Refreshed tree with {} files", files.len());
            with_selection_and_notify(&state, &proxy, |s| {
                s.is_scanning = false;
                if s.root_path.as_ref() != Some(&root) {
                    tracing::warn!("Root changed during refresh; discarding results");
                    return;
                }
                s.tree.build(&files);
                s.status_message = format!("Found {} eligible files.", files.len());
            });
        }
        Err(e) => {
            tracing::error!("Discovery failed for {}: {}", root.display(), e);
            with_state_and_notify(&state, &proxy, |s| {
                s.is_scanning = false;
                s.status_message = format!("Scan failed: {e}");
            });
            proxy.send_event(UserEvent::ShowError(format!("Error scanning project: {e}")));
        }
    }
}

/// Builds a document and hands it to the sink.
pub async fn generation_task<P: EventProxy>(
    proxy: P,
    state: Arc<Mutex<AppState>>,
    job: GenerationJob,
    sink: Arc<dyn OutputSink>,
) {
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<ScanProgress>();
    let progress_proxy = proxy.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(progress) = progress_rx.recv().await {
            progress_proxy.send_event(UserEvent::Progress(progress.message));
        }
    });

    let result = job
        .builder
        .build(&job.files, job.full_tree, &progress_tx, &job.cancel_flag)
        .await;
    drop(progress_tx);
    if let Err(e) = forwarder.await {
        tracing::warn!("Progress forwarder ended abnormally: {}", e);
    }

    match result {
        Ok(Some(corpus)) if !job.cancel_flag.load(Ordering::SeqCst) => {
            deliver(&proxy, sink.as_ref(), job.target, &corpus.document, corpus.stats.total_files)
                .await;
        }
        Ok(_) => {
            proxy.send_event(UserEvent::ShowInfo("File processing cancelled.".to_string()));
        }
        Err(e) => {
            tracing::error!("Generation failed: {}", e);
            proxy.send_event(UserEvent::ShowError(format!("Error packing files: {e}")));
        }
    }

    let mut state_guard = lock_state(&state);
    if state_guard.is_current_generation(&job.cancel_flag) {
        state_guard.is_generating = false;
        state_guard.generation_task = None;
    }
    proxy.send_event(UserEvent::StateUpdate(Box::new(
        super::view_model::generate_ui_state(&state_guard),
    )));
}

async fn deliver<P: EventProxy>(
    proxy: &P,
    sink: &dyn OutputSink,
    target: GenerationTarget,
    document: &str,
    file_count: usize,
) {
    match target {
        GenerationTarget::Clipboard => match sink.copy_text(document).await {
            Ok(()) => proxy.send_event(UserEvent::ShowInfo(format!(
                "✅ {} files packed to clipboard! (Approx. size: {})",
                file_count,
                format_size(document.len() as u64)
            ))),
            Err(e) => {
                tracing::error!("Clipboard delivery failed: {:#}", e);
                proxy.send_event(UserEvent::ShowError(format!("Error packing files: {e}")));
            }
        },
        GenerationTarget::Preview => match sink.present_markdown(document).await {
            Ok(()) => proxy.send_event(UserEvent::ShowInfo(
                "🔎 Preview generated.".to_string(),
            )),
            Err(e) => {
                tracing::error!("Preview delivery failed: {:#}", e);
                proxy.send_event(UserEvent::ShowError(format!(
                    "Error generating preview: {e}"
                )));
            }
        },
    }
}

/// Copies the full, unannotated project tree.
pub async fn copy_tree_task<P: EventProxy>(
    proxy: P,
    builder: CorpusBuilder,
    sink: Arc<dyn OutputSink>,
) {
    let result = match builder.build_tree_only().await {
        Ok(tree) => sink.copy_text(&tree).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => proxy.send_event(UserEvent::ShowInfo(
            "📁 Directory tree copied to clipboard!".to_string(),
        )),
        Err(e) => {
            tracing::error!("Copying the tree failed: {:#}", e);
            proxy.send_event(UserEvent::ShowError(format!(
                "Error copying directory tree: {e}"
            )));
        }
    }
}
