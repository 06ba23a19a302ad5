//! Contains all the command handlers that are callable from the host via IPC.
//!
//! Each function in this module corresponds to a specific `IpcMessage::command`.
//! These handlers are responsible for interacting with the `AppState` and the `core`
//! logic, and for sending `UserEvent`s back to the host.

use super::events::UserEvent;
use super::helpers::{with_selection_and_notify, with_state_and_notify};
use super::proxy::EventProxy;
use super::sinks::OutputSink;
use super::state::{lock_state, AppState};
use super::tasks::{self, GenerationJob, GenerationTarget};
use super::view_model::generate_ui_state;
use crate::config::{self, AppConfig};
use crate::core::CheckState;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// One checkbox transition reported by the host widget.
#[derive(Debug, Deserialize)]
pub struct CheckboxChange {
    pub path: PathBuf,
    pub checked: bool,
}

/// `checkboxChanged` accepts a single change or a batch.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CheckboxPayload {
    One(CheckboxChange),
    Many(Vec<CheckboxChange>),
}

/// Points the session at `path` and starts the first discovery.
pub fn load_project<P: EventProxy>(path: PathBuf, proxy: P, state: Arc<Mutex<AppState>>) {
    if !path.is_dir() {
        proxy.send_event(UserEvent::ShowError(format!(
            "{} is not a directory.",
            path.display()
        )));
        return;
    }
    tracing::info!("Loading project {}", path.display());
    lock_state(&state).set_root(path);
    tokio::spawn(tasks::refresh_tree_task(proxy, state));
}

/// Sends the current view and pushes fresh panel numbers.
pub async fn initialize<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |_| {});
    refresh_stats(proxy, state).await;
}

/// Re-discovers the project. Every rebuilt node starts out checked.
pub async fn refresh<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    tasks::refresh_tree_task(proxy, state).await;
}

/// Toggles the node at the absolute path given as payload.
pub fn toggle<P: EventProxy>(payload: serde_json::Value, proxy: P, state: Arc<Mutex<AppState>>) {
    let Ok(path) = serde_json::from_value::<PathBuf>(payload.clone()) else {
        tracing::warn!(
            "Failed to deserialize path string from payload: {:?}",
            payload
        );
        return;
    };

    with_selection_and_notify(&state, &proxy, |s| {
        if !s.tree.toggle_path(&path) {
            tracing::warn!("Toggle for unknown path {}", path.display());
        }
    });
}

/// Applies one or more checkbox states, then notifies once.
pub fn checkbox_changed<P: EventProxy>(
    payload: serde_json::Value,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    let changes = match serde_json::from_value::<CheckboxPayload>(payload.clone()) {
        Ok(CheckboxPayload::One(change)) => vec![change],
        Ok(CheckboxPayload::Many(changes)) => changes,
        Err(e) => {
            tracing::warn!("Invalid checkbox payload {:?}: {}", payload, e);
            return;
        }
    };

    with_selection_and_notify(&state, &proxy, |s| {
        let events: Vec<_> = changes
            .iter()
            .filter_map(|change| {
                let id = s.tree.find(&change.path);
                if id.is_none() {
                    tracing::warn!("Checkbox event for unknown path {}", change.path.display());
                }
                let check = if change.checked {
                    CheckState::Checked
                } else {
                    CheckState::Unchecked
                };
                id.map(|id| (id, check))
            })
            .collect();
        s.tree.apply_checkbox_events(&events);
    });
}

pub fn select_all<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    with_selection_and_notify(&state, &proxy, |s| s.tree.select_all());
}

pub fn deselect_all<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    with_selection_and_notify(&state, &proxy, |s| s.tree.deselect_all());
}

/// Switches between the selected-only and the full project diagram.
pub fn toggle_full_tree<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    with_selection_and_notify(&state, &proxy, |s| {
        s.show_full_tree = !s.show_full_tree;
        tracing::info!("Full tree mode: {}", s.show_full_tree);
    });
}

/// Recomputes the panel numbers, e.g. when the host view becomes visible again.
pub async fn refresh_stats<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    let (files, full_tree) = {
        let state_guard = lock_state(&state);
        (state_guard.tree.selected_files(), state_guard.show_full_tree)
    };
    let stats = tasks::selection_stats(&files, full_tree).await;
    proxy.send_event(UserEvent::StatsUpdate(stats));
}

/// Packs the selection and copies it to the clipboard.
pub fn copy_prompt<P: EventProxy>(
    sink: Arc<dyn OutputSink>,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    start_generation(GenerationTarget::Clipboard, sink, proxy, state);
}

/// Packs the selection and opens it in a read-only viewer.
pub fn preview_prompt<P: EventProxy>(
    sink: Arc<dyn OutputSink>,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    let has_selection = !lock_state(&state).tree.selected_files().is_empty();
    if !has_selection {
        proxy.send_event(UserEvent::ShowInfo(
            "No files selected to preview. Please select files in the sidebar.".to_string(),
        ));
        return;
    }
    start_generation(GenerationTarget::Preview, sink, proxy, state);
}

fn start_generation<P: EventProxy>(
    target: GenerationTarget,
    sink: Arc<dyn OutputSink>,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    let mut state_guard = lock_state(&state);
    let Some(builder) = state_guard.corpus_builder() else {
        proxy.send_event(UserEvent::ShowError("No project folder loaded.".to_string()));
        return;
    };

    let job = GenerationJob {
        builder,
        files: state_guard.tree.selected_files(),
        full_tree: state_guard.show_full_tree,
        target,
        cancel_flag: state_guard.begin_generation(),
    };
    tracing::info!("Starting {:?} generation for {} files", target, job.files.len());

    // Show the 'generating' state before any progress arrives.
    proxy.send_event(UserEvent::StateUpdate(Box::new(generate_ui_state(
        &state_guard,
    ))));

    let handle = tokio::spawn(tasks::generation_task(
        proxy.clone(),
        state.clone(),
        job,
        sink,
    ));
    state_guard.generation_task = Some(handle);
}

/// Copies the full project tree without annotations.
pub fn copy_tree_only<P: EventProxy>(
    sink: Arc<dyn OutputSink>,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    let Some(builder) = lock_state(&state).corpus_builder() else {
        proxy.send_event(UserEvent::ShowError("No project folder loaded.".to_string()));
        return;
    };
    tokio::spawn(tasks::copy_tree_task(proxy, builder, sink));
}

/// Cancels the ongoing generation at its next batch boundary.
pub fn cancel_generation<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |s| s.cancel_current_generation());
}

/// Replaces and persists the configuration.
///
/// A change to the ignore patterns or the size cap changes which files are
/// eligible, so it triggers a refresh.
pub fn update_config<P: EventProxy>(
    payload: serde_json::Value,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    let new_config = match serde_json::from_value::<AppConfig>(payload) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Failed to deserialize AppConfig from payload: {}", e);
            proxy.send_event(UserEvent::ShowError(format!("Invalid settings: {e}")));
            return;
        }
    };

    let mut needs_refresh = false;
    with_state_and_notify(&state, &proxy, |s| {
        needs_refresh = s.root_path.is_some()
            && (s.config.ignore_patterns != new_config.ignore_patterns
                || s.config.max_file_size != new_config.max_file_size);
        s.config = new_config;
        if let Err(e) = config::settings::save_config(&s.config, s.config_path.as_deref()) {
            tracing::warn!("Failed to save config on update: {}", e);
        }
    });

    if needs_refresh {
        tokio::spawn(tasks::refresh_tree_task(proxy, state));
    }
}
