//! Responsible for transforming the `AppState` into serializable view models.
//!
//! The selection tree stores only checked/unchecked. The tri-state shown by a
//! checkbox widget ("full", "partial", "none") is derived here from the files
//! below each directory.

use serde::Serialize;
use std::path::{Path, PathBuf};

use super::state::AppState;
use crate::config::AppConfig;
use crate::core::{CheckState, NodeId, SelectionTree};
use crate::utils::{format_size, format_with_commas};

/// A serializable representation of the session for the host.
#[derive(Serialize, Clone, Debug)]
pub struct UiState {
    pub config: AppConfig,
    pub root_path: Option<PathBuf>,
    pub tree: Vec<TreeNode>,
    pub total_files_found: usize,
    pub selected_files_count: usize,
    pub show_full_tree: bool,
    pub is_scanning: bool,
    pub is_generating: bool,
    pub status_message: String,
}

/// A serializable representation of a single node in the checkbox tree.
#[derive(Serialize, Clone, Debug)]
pub struct TreeNode {
    pub name: String,
    pub path: PathBuf,
    pub is_directory: bool,
    pub checked: CheckState,
    /// `"full"`, `"partial"` or `"none"`.
    pub selection_state: String,
    pub children: Vec<TreeNode>,
}

/// Numbers shown in the action panel.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SelectionStats {
    pub file_count: usize,
    pub total_size: String,
    pub total_tokens: String,
    pub show_full_tree: bool,
}

impl SelectionStats {
    /// Builds the panel numbers from the on-disk sizes of the selected files.
    pub fn from_sizes(sizes: &[u64], show_full_tree: bool) -> Self {
        let total: u64 = sizes.iter().sum();
        Self {
            file_count: sizes.len(),
            total_size: format_size(total),
            total_tokens: format!("~{}", format_with_commas(total.div_ceil(4))),
            show_full_tree,
        }
    }
}

/// Creates the complete `UiState` from the current `AppState`.
pub fn generate_ui_state(state: &AppState) -> UiState {
    let tree = if state.is_scanning {
        Vec::new()
    } else {
        build_tree_nodes(&state.tree)
    };

    UiState {
        config: state.config.clone(),
        root_path: state.root_path.clone(),
        tree,
        total_files_found: state.tree.file_count(),
        selected_files_count: state.tree.selected_files().len(),
        show_full_tree: state.show_full_tree,
        is_scanning: state.is_scanning,
        is_generating: state.is_generating,
        status_message: state.status_message.clone(),
    }
}

fn build_tree_nodes(tree: &SelectionTree) -> Vec<TreeNode> {
    tree.roots()
        .iter()
        .filter_map(|id| build_node(tree, *id).map(|(node, _, _)| node))
        .collect()
}

/// Returns the node plus the number of files below it and how many are checked.
fn build_node(tree: &SelectionTree, id: NodeId) -> Option<(TreeNode, usize, usize)> {
    let node = tree.node(id)?;

    if !node.is_directory {
        let checked = usize::from(node.checked.is_checked());
        let view = TreeNode {
            name: node.name.clone(),
            path: node.path.clone(),
            is_directory: false,
            checked: node.checked,
            selection_state: if checked == 1 { "full" } else { "none" }.to_string(),
            children: Vec::new(),
        };
        return Some((view, 1, checked));
    }

    let mut children = Vec::with_capacity(node.children.len());
    let (mut files, mut checked) = (0, 0);
    for child in &node.children {
        if let Some((view, child_files, child_checked)) = build_node(tree, *child) {
            files += child_files;
            checked += child_checked;
            children.push(view);
        }
    }

    let view = TreeNode {
        name: node.name.clone(),
        path: node.path.clone(),
        is_directory: true,
        checked: node.checked,
        selection_state: selection_state(files, checked).to_string(),
        children,
    };
    Some((view, files, checked))
}

fn selection_state(files: usize, checked: usize) -> &'static str {
    if checked == 0 {
        "none"
    } else if checked == files {
        "full"
    } else {
        "partial"
    }
}

/// Finds the view node for `path` in a rendered tree.
pub fn find_node<'a>(nodes: &'a [TreeNode], path: &Path) -> Option<&'a TreeNode> {
    for node in nodes {
        if node.path == path {
            return Some(node);
        }
        if path.starts_with(&node.path) {
            return find_node(&node.children, path);
        }
    }
    None
}
