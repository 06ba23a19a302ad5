//! The session layer: command handlers, background tasks and the events sent to the host.

pub mod commands;
pub mod events;
pub mod helpers;
pub mod proxy;
pub mod sinks;
pub mod state;
pub mod tasks;
pub mod view_model;

use std::sync::{Arc, Mutex};

use events::IpcMessage;
use proxy::EventProxy;
use sinks::OutputSink;
use state::AppState;

/// Parses one host message and routes it to its command handler.
///
/// Must be called from within a tokio runtime; async handlers are spawned.
pub fn handle_ipc_message<P: EventProxy>(
    message: String,
    sink: Arc<dyn OutputSink>,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    let msg = match serde_json::from_str::<IpcMessage>(&message) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!("Failed to parse IPC message: {} ({})", message, e);
            return;
        }
    };
    tracing::debug!("IPC command: {}", msg.command);

    match msg.command.as_str() {
        "initialize" => {
            tokio::spawn(commands::initialize(proxy, state));
        }
        "refresh" => {
            tokio::spawn(commands::refresh(proxy, state));
        }
        "toggle" => commands::toggle(msg.payload, proxy, state),
        "checkboxChanged" => commands::checkbox_changed(msg.payload, proxy, state),
        "selectAll" => commands::select_all(proxy, state),
        "deselectAll" => commands::deselect_all(proxy, state),
        "toggleFullTree" => commands::toggle_full_tree(proxy, state),
        "refreshStats" => {
            tokio::spawn(commands::refresh_stats(proxy, state));
        }
        "copyPrompt" => commands::copy_prompt(sink, proxy, state),
        "previewPrompt" => commands::preview_prompt(sink, proxy, state),
        "copyTreeOnly" => commands::copy_tree_only(sink, proxy, state),
        "cancelGeneration" => commands::cancel_generation(proxy, state),
        "updateConfig" => commands::update_config(msg.payload, proxy, state),
        _ => tracing::warn!("Unknown IPC command: {}", msg.command),
    }
}
