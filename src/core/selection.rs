//! The checkbox tree mirroring the discovered files.
//!
//! Nodes live in an arena (`Vec<Node>`) and refer to each other by index, so a
//! child's link to its parent never owns anything. Every node stores exactly one
//! of two states. A directory is `Checked` as soon as *any* child is checked;
//! there is no stored "partial" state, which is computed by the presentation
//! layer when needed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

/// Index of a node inside a [`SelectionTree`].
pub type NodeId = usize;

/// The stored checkbox state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    Checked,
    Unchecked,
}

impl CheckState {
    pub fn flipped(self) -> Self {
        match self {
            CheckState::Checked => CheckState::Unchecked,
            CheckState::Unchecked => CheckState::Checked,
        }
    }

    pub fn is_checked(self) -> bool {
        self == CheckState::Checked
    }
}

/// One file or directory in the selection tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub path: PathBuf,
    pub name: String,
    pub is_directory: bool,
    pub checked: CheckState,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
}

/// In-memory selection state for one project root.
#[derive(Debug, Clone)]
pub struct SelectionTree {
    root_path: PathBuf,
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    index: HashMap<PathBuf, NodeId>,
}

impl SelectionTree {
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            nodes: Vec::new(),
            roots: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Discards all nodes and rebuilds the tree from absolute file paths.
    ///
    /// Every node starts out `Checked`; earlier manual selections are not kept.
    /// Paths outside the root are skipped.
    pub fn build(&mut self, paths: &[PathBuf]) {
        self.nodes.clear();
        self.roots.clear();
        self.index.clear();

        for path in paths {
            let Ok(relative) = path.strip_prefix(&self.root_path) else {
                tracing::warn!("Ignoring path outside of {}: {}", self.root_path.display(), path.display());
                continue;
            };

            let parts: Vec<&std::ffi::OsStr> = relative
                .components()
                .filter_map(|c| match c {
                    Component::Normal(part) => Some(part),
                    _ => None,
                })
                .collect();

            let mut parent: Option<NodeId> = None;
            let mut accumulated = self.root_path.clone();

            for (i, part) in parts.iter().enumerate() {
                accumulated.push(part);
                let id = match self.index.get(&accumulated) {
                    Some(&id) => id,
                    None => {
                        let is_directory = i < parts.len() - 1;
                        self.insert_node(accumulated.clone(), is_directory, parent)
                    }
                };
                parent = Some(id);
            }
        }

        self.sort_children();
        tracing::debug!("Selection tree rebuilt with {} nodes", self.nodes.len());
    }

    fn insert_node(&mut self, path: PathBuf, is_directory: bool, parent: Option<NodeId>) -> NodeId {
        let id = self.nodes.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        self.nodes.push(Node {
            path: path.clone(),
            name,
            is_directory,
            checked: CheckState::Checked,
            children: Vec::new(),
            parent,
        });
        self.index.insert(path, id);

        match parent {
            Some(parent_id) => self.nodes[parent_id].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// Directories before files, then by name, at every level.
    fn sort_children(&mut self) {
        let nodes = &self.nodes;
        let order = |a: &NodeId, b: &NodeId| {
            let (a, b) = (&nodes[*a], &nodes[*b]);
            b.is_directory
                .cmp(&a.is_directory)
                .then_with(|| a.name.cmp(&b.name))
        };

        let mut roots = std::mem::take(&mut self.roots);
        roots.sort_by(order);

        let mut sorted_children: Vec<Vec<NodeId>> = self
            .nodes
            .iter()
            .map(|node| {
                let mut children = node.children.clone();
                children.sort_by(order);
                children
            })
            .collect();

        for (node, children) in self.nodes.iter_mut().zip(sorted_children.drain(..)) {
            node.children = children;
        }
        self.roots = roots;
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn find(&self, path: &Path) -> Option<NodeId> {
        self.index.get(path).copied()
    }

    pub fn state(&self, id: NodeId) -> Option<CheckState> {
        self.nodes.get(id).map(|n| n.checked)
    }

    /// Top-down: sets `id` and, for directories, every descendant to `state`.
    ///
    /// This does not touch ancestors; callers follow up with
    /// [`SelectionTree::recompute_ancestors`].
    pub fn set_subtree(&mut self, id: NodeId, state: CheckState) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get_mut(current) else {
                continue;
            };
            node.checked = state;
            stack.extend(node.children.iter().copied());
        }
    }

    /// Bottom-up: walks from the parent of `id` to the root, checking each
    /// directory if any of its children is checked.
    pub fn recompute_ancestors(&mut self, id: NodeId) {
        let mut current = self.nodes.get(id).and_then(|n| n.parent);
        while let Some(dir_id) = current {
            let any_checked = self.nodes[dir_id]
                .children
                .iter()
                .any(|child| self.nodes[*child].checked.is_checked());
            let dir = &mut self.nodes[dir_id];
            dir.checked = if any_checked {
                CheckState::Checked
            } else {
                CheckState::Unchecked
            };
            current = dir.parent;
        }
    }

    /// Flips a node (and its subtree for directories), then fixes up the ancestors.
    pub fn toggle(&mut self, id: NodeId) {
        if let Some(current) = self.state(id) {
            self.apply_checkbox_event(id, current.flipped());
        }
    }

    /// Toggles the node at `path`. Returns `false` if no such node exists.
    pub fn toggle_path(&mut self, path: &Path) -> bool {
        match self.find(path) {
            Some(id) => {
                self.toggle(id);
                true
            }
            None => false,
        }
    }

    /// Applies a state supplied by the host's checkbox widget.
    pub fn apply_checkbox_event(&mut self, id: NodeId, state: CheckState) {
        if id >= self.nodes.len() {
            return;
        }
        // set_subtree on a file only touches the file itself.
        self.set_subtree(id, state);
        self.recompute_ancestors(id);
    }

    /// Applies several widget states in order, e.g. from a multi-select.
    pub fn apply_checkbox_events(&mut self, events: &[(NodeId, CheckState)]) {
        for (id, state) in events {
            self.apply_checkbox_event(*id, *state);
        }
    }

    pub fn select_all(&mut self) {
        for root in self.roots.clone() {
            self.set_subtree(root, CheckState::Checked);
        }
    }

    pub fn deselect_all(&mut self) {
        for root in self.roots.clone() {
            self.set_subtree(root, CheckState::Unchecked);
        }
    }

    /// Checked file nodes in tree order (directories first, then by name).
    pub fn selected_files(&self) -> Vec<PathBuf> {
        let mut selected = Vec::new();
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if node.is_directory {
                stack.extend(node.children.iter().rev().copied());
            } else if node.checked.is_checked() {
                selected.push(node.path.clone());
            }
        }
        selected
    }

    /// Number of file (non-directory) nodes.
    pub fn file_count(&self) -> usize {
        self.nodes.iter().filter(|n| !n.is_directory).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ROOT: &str = "/work/project";

    fn paths(rel: &[&str]) -> Vec<PathBuf> {
        rel.iter().map(|r| Path::new(ROOT).join(r)).collect()
    }

    fn tree(rel: &[&str]) -> SelectionTree {
        let mut tree = SelectionTree::new(ROOT);
        tree.build(&paths(rel));
        tree
    }

    fn id(tree: &SelectionTree, rel: &str) -> NodeId {
        tree.find(&Path::new(ROOT).join(rel)).expect("node exists")
    }

    fn state(tree: &SelectionTree, rel: &str) -> CheckState {
        tree.state(id(tree, rel)).unwrap()
    }

    fn sample() -> SelectionTree {
        tree(&["src/main.rs", "src/core/a.rs", "src/core/b.rs", "README.md", "docs/guide.md"])
    }

    #[test]
    fn test_build_creates_checked_nodes_with_parent_links() {
        let tree = sample();

        assert_eq!(tree.len(), 8);
        assert_eq!(tree.file_count(), 5);
        assert!(tree.nodes.iter().all(|n| n.checked == CheckState::Checked));

        let core = id(&tree, "src/core");
        let a = id(&tree, "src/core/a.rs");
        assert_eq!(tree.node(a).unwrap().parent, Some(core));
        assert_eq!(tree.node(core).unwrap().parent, Some(id(&tree, "src")));
        assert_eq!(tree.node(id(&tree, "src")).unwrap().parent, None);
        assert!(tree.node(core).unwrap().is_directory);
        assert!(!tree.node(a).unwrap().is_directory);
    }

    #[test]
    fn test_build_sorts_directories_first_then_by_name() {
        let tree = sample();
        let names = |ids: &[NodeId]| -> Vec<String> {
            ids.iter().map(|i| tree.node(*i).unwrap().name.clone()).collect()
        };

        assert_eq!(names(tree.roots()), vec!["docs", "src", "README.md"]);
        let src = tree.node(id(&tree, "src")).unwrap();
        assert_eq!(names(&src.children), vec!["core", "main.rs"]);
    }

    #[test]
    fn test_build_skips_paths_outside_root() {
        let mut tree = SelectionTree::new(ROOT);
        tree.build(&[PathBuf::from("/elsewhere/x.rs"), Path::new(ROOT).join("in.rs")]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.selected_files(), paths(&["in.rs"]));
    }

    #[test]
    fn test_toggle_file_updates_ancestors_with_any_child_policy() {
        let mut tree = sample();

        tree.toggle(id(&tree, "src/core/a.rs"));
        assert_eq!(state(&tree, "src/core/a.rs"), CheckState::Unchecked);
        // b.rs is still checked, so the directory stays checked.
        assert_eq!(state(&tree, "src/core"), CheckState::Checked);

        tree.toggle(id(&tree, "src/core/b.rs"));
        assert_eq!(state(&tree, "src/core"), CheckState::Unchecked);
        // main.rs keeps src checked.
        assert_eq!(state(&tree, "src"), CheckState::Checked);
    }

    #[test]
    fn test_toggle_directory_propagates_down() {
        let mut tree = sample();

        tree.toggle(id(&tree, "src"));
        for rel in ["src", "src/core", "src/core/a.rs", "src/core/b.rs", "src/main.rs"] {
            assert_eq!(state(&tree, rel), CheckState::Unchecked, "{rel}");
        }
        assert_eq!(state(&tree, "docs/guide.md"), CheckState::Checked);

        tree.toggle(id(&tree, "src"));
        assert_eq!(state(&tree, "src/core/b.rs"), CheckState::Checked);
    }

    #[test]
    fn test_checking_single_file_after_deselect_checks_ancestor_chain() {
        let mut tree = sample();
        tree.deselect_all();
        assert!(tree.selected_files().is_empty());

        let a = id(&tree, "src/core/a.rs");
        tree.apply_checkbox_event(a, CheckState::Checked);

        assert_eq!(state(&tree, "src/core"), CheckState::Checked);
        assert_eq!(state(&tree, "src"), CheckState::Checked);
        assert_eq!(state(&tree, "src/core/b.rs"), CheckState::Unchecked);
        assert_eq!(state(&tree, "docs"), CheckState::Unchecked);
        assert_eq!(tree.selected_files(), paths(&["src/core/a.rs"]));
    }

    #[test]
    fn test_checkbox_event_on_directory_sets_descendants() {
        let mut tree = sample();
        tree.apply_checkbox_event(id(&tree, "src/core"), CheckState::Unchecked);

        assert_eq!(state(&tree, "src/core/a.rs"), CheckState::Unchecked);
        assert_eq!(state(&tree, "src/core/b.rs"), CheckState::Unchecked);
        assert_eq!(state(&tree, "src"), CheckState::Checked);
    }

    #[test]
    fn test_batch_checkbox_events() {
        let mut tree = sample();
        let events = [
            (id(&tree, "src"), CheckState::Unchecked),
            (id(&tree, "src/core/b.rs"), CheckState::Checked),
        ];
        tree.apply_checkbox_events(&events);

        assert_eq!(state(&tree, "src/core/a.rs"), CheckState::Unchecked);
        assert_eq!(state(&tree, "src/main.rs"), CheckState::Unchecked);
        assert_eq!(state(&tree, "src/core"), CheckState::Checked);
        assert_eq!(state(&tree, "src"), CheckState::Checked);
    }

    #[test]
    fn test_toggle_path_reports_unknown_paths() {
        let mut tree = sample();
        assert!(tree.toggle_path(&Path::new(ROOT).join("README.md")));
        assert_eq!(state(&tree, "README.md"), CheckState::Unchecked);
        assert!(!tree.toggle_path(Path::new("/nope")));
    }

    #[test]
    fn test_selected_files_are_in_tree_order() {
        let tree = sample();
        assert_eq!(
            tree.selected_files(),
            paths(&["docs/guide.md", "src/core/a.rs", "src/core/b.rs", "src/main.rs", "README.md"])
        );
    }

    #[test]
    fn test_rebuild_resets_selection() {
        let mut tree = sample();
        tree.deselect_all();
        tree.build(&paths(&["src/main.rs", "README.md"]));
        assert!(tree.nodes.iter().all(|n| n.checked.is_checked()));
        assert_eq!(tree.selected_files().len(), 2);
    }

    fn relative_path_strategy() -> impl Strategy<Value = String> {
        prop::collection::vec(prop::sample::select(vec!["a", "b", "c"]), 1..4).prop_map(|dirs| {
            let mut parts: Vec<String> = dirs.iter().map(|d| d.to_string()).collect();
            let last = parts.pop().unwrap_or_default();
            parts.push(format!("{last}.txt"));
            parts.join("/")
        })
    }

    fn arbitrary_tree() -> impl Strategy<Value = SelectionTree> {
        prop::collection::vec(relative_path_strategy(), 1..12).prop_map(|rels| {
            let refs: Vec<&str> = rels.iter().map(String::as_str).collect();
            tree(&refs)
        })
    }

    proptest! {
        #[test]
        fn prop_checking_a_leaf_checks_all_ancestors(
            tree in arbitrary_tree(),
            pick in any::<prop::sample::Index>(),
        ) {
            let mut tree = tree;
            tree.deselect_all();
            let files: Vec<NodeId> = (0..tree.len()).filter(|i| !tree.nodes[*i].is_directory).collect();
            let leaf = files[pick.index(files.len())];

            tree.set_subtree(leaf, CheckState::Checked);
            tree.recompute_ancestors(leaf);

            let mut current = tree.nodes[leaf].parent;
            while let Some(parent) = current {
                prop_assert_eq!(tree.nodes[parent].checked, CheckState::Checked);
                current = tree.nodes[parent].parent;
            }

            tree.deselect_all();
            prop_assert!(tree.nodes.iter().all(|n| n.checked == CheckState::Unchecked));
        }

        #[test]
        fn prop_set_subtree_reaches_every_descendant(
            tree in arbitrary_tree(),
            pick in any::<prop::sample::Index>(),
            checked in any::<bool>(),
        ) {
            let mut tree = tree;
            let target = pick.index(tree.len());
            let wanted = if checked { CheckState::Checked } else { CheckState::Unchecked };

            tree.set_subtree(target, wanted);

            let target_path = tree.nodes[target].path.clone();
            for node in tree.nodes.iter().filter(|n| n.path.starts_with(&target_path)) {
                prop_assert_eq!(node.checked, wanted);
            }
        }

        #[test]
        fn prop_selected_files_match_checked_file_nodes(
            tree in arbitrary_tree(),
            toggles in prop::collection::vec(any::<prop::sample::Index>(), 0..20),
        ) {
            let mut tree = tree;
            for pick in toggles {
                let target = pick.index(tree.len());
                tree.toggle(target);
            }

            let mut expected: Vec<PathBuf> = tree
                .nodes
                .iter()
                .filter(|n| !n.is_directory && n.checked.is_checked())
                .map(|n| n.path.clone())
                .collect();
            let mut actual = tree.selected_files();
            expected.sort();
            actual.sort();
            prop_assert_eq!(actual, expected);
        }

        #[test]
        fn prop_rebuild_always_resets_to_checked(
            tree in arbitrary_tree(),
            toggles in prop::collection::vec(any::<prop::sample::Index>(), 0..10),
        ) {
            let mut tree = tree;
            let files = tree.selected_files();
            for pick in toggles {
                let target = pick.index(tree.len());
                tree.toggle(target);
            }
            tree.build(&files);
            prop_assert!(tree.nodes.iter().all(|n| n.checked.is_checked()));
        }
    }
}
