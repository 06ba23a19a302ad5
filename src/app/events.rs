//! Defines the event and message structures exchanged with the host.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::view_model::{SelectionStats, UiState};

/// Events pushed from the session to the host.
///
/// Serialized as `{"event": "<name>", "data": ...}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum UserEvent {
    /// The checkbox tree changed and should be re-rendered.
    StateUpdate(Box<UiState>),
    /// Debounced notification carrying the current selection.
    SelectionChanged {
        files: Vec<PathBuf>,
        full_tree: bool,
    },
    /// Aggregate numbers for the action panel.
    StatsUpdate(SelectionStats),
    /// A progress milestone of a running generation.
    Progress(String),
    /// An informational notice for the user.
    ShowInfo(String),
    /// An error message to be displayed to the user.
    ShowError(String),
}

/// A message received from the host.
#[derive(Deserialize, Debug)]
pub struct IpcMessage {
    /// The name of the command to execute.
    pub command: String,
    /// The payload associated with the command, as a JSON value.
    #[serde(default)]
    pub payload: serde_json::Value,
}
