//! Renders the box-drawing directory diagram embedded in the packed document.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use super::error::CoreError;
use super::FileDiscovery;
use crate::utils::file_detection::is_text_file;

const SELECTED_SYMBOL: &str = "✓";
const NOT_SELECTED_SYMBOL: &str = "✗";
const DIR_EMOJI: &str = "📂";

/// How much of the project the diagram shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeMode {
    /// Only the ancestors of the given files.
    Selected,
    /// The given files plus every existing directory under the root.
    Full,
}

/// A utility struct for generating the project structure diagram.
pub struct TreeGenerator;

impl TreeGenerator {
    /// Renders `files` (absolute paths) below a `rootName/` line.
    ///
    /// When `selected` (relative paths) is given, entries are annotated with
    /// `✓`/`✗` and directories get the `📂` glyph. Lines are joined with `\n`
    /// without a trailing newline.
    pub fn generate_tree(
        files: &[PathBuf],
        root_path: &Path,
        selected: Option<&HashSet<PathBuf>>,
        mode: TreeMode,
    ) -> String {
        let mut layout = Layout::default();
        for file in files {
            match file.strip_prefix(root_path) {
                Ok(relative) => layout.insert_file(relative),
                Err(_) => tracing::debug!("Not rendering path outside the root: {}", file.display()),
            }
        }

        if mode == TreeMode::Full {
            for dir in FileDiscovery::list_directories(root_path) {
                layout.insert_directory(&dir);
            }
        }

        let renderer = Renderer {
            layout: &layout,
            root_path,
            selected,
            show_all: mode == TreeMode::Full,
        };

        let mut lines = vec![format!(
            "{}/",
            root_path.file_name().unwrap_or_default().to_string_lossy()
        )];
        let mut visited = HashSet::new();
        renderer.render_level(Path::new(""), "", &mut visited, &mut lines);
        lines.join("\n")
    }

    /// Runs [`TreeGenerator::generate_tree`] on the blocking thread pool.
    ///
    /// Full mode walks the directory tree and inspects directory contents.
    pub async fn generate_tree_async(
        files: Vec<PathBuf>,
        root_path: PathBuf,
        selected: Option<HashSet<PathBuf>>,
        mode: TreeMode,
    ) -> Result<String, CoreError> {
        let tree = tokio::task::spawn_blocking(move || {
            Self::generate_tree(&files, &root_path, selected.as_ref(), mode)
        })
        .await?;
        Ok(tree)
    }
}

/// Parent → children relation of relative paths; the root is the empty path.
#[derive(Debug, Default)]
struct Layout {
    children: BTreeMap<PathBuf, BTreeSet<PathBuf>>,
    dirs: HashSet<PathBuf>,
    files: HashSet<PathBuf>,
}

impl Layout {
    fn insert_file(&mut self, relative: &Path) {
        if let Some(parent) = relative.parent() {
            self.insert_directory(parent);
        }
        let parent = relative.parent().map(Path::to_path_buf).unwrap_or_default();
        self.children
            .entry(parent)
            .or_default()
            .insert(relative.to_path_buf());
        self.files.insert(relative.to_path_buf());
    }

    /// Adds `dir` and all its ancestors as directories.
    fn insert_directory(&mut self, dir: &Path) {
        let mut current = PathBuf::new();
        for component in dir.components() {
            let parent = current.clone();
            current.push(component);
            self.dirs.insert(current.clone());
            self.children.entry(parent).or_default().insert(current.clone());
        }
    }

    fn has_file_under(&self, dir: &Path) -> bool {
        self.files.iter().any(|file| file.starts_with(dir))
    }
}

struct Renderer<'a> {
    layout: &'a Layout,
    root_path: &'a Path,
    selected: Option<&'a HashSet<PathBuf>>,
    show_all: bool,
}

impl Renderer<'_> {
    fn render_level(
        &self,
        dir: &Path,
        prefix: &str,
        visited: &mut HashSet<PathBuf>,
        lines: &mut Vec<String>,
    ) {
        if !visited.insert(dir.to_path_buf()) {
            return;
        }
        let Some(children) = self.layout.children.get(dir) else {
            return;
        };

        let mut items: Vec<&PathBuf> = children.iter().collect();
        items.sort_by(|a, b| {
            let a_dir = self.layout.dirs.contains(*a);
            let b_dir = self.layout.dirs.contains(*b);
            b_dir.cmp(&a_dir).then_with(|| a.cmp(b))
        });

        for (i, item) in items.iter().enumerate() {
            let is_last = i == items.len() - 1;
            let is_directory = self.layout.dirs.contains(*item);
            let connector = if is_last { "└── " } else { "├── " };

            lines.push(format!("{prefix}{connector}{}", self.display_name(item, is_directory)));

            if is_directory {
                let next_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
                self.render_level(item, &next_prefix, visited, lines);
            }
        }
    }

    fn display_name(&self, item: &Path, is_directory: bool) -> String {
        let name = item.file_name().unwrap_or_default().to_string_lossy();
        let mut display = if is_directory {
            format!("{name}/")
        } else {
            name.to_string()
        };

        if is_directory && !self.layout.has_file_under(item) {
            display.push_str(directory_marker(&self.root_path.join(item)));
        }

        let Some(selected) = self.selected else {
            return display;
        };

        if is_directory {
            if self.show_all {
                let has_selected = selected.iter().any(|s| s.starts_with(item));
                let symbol = if has_selected { SELECTED_SYMBOL } else { NOT_SELECTED_SYMBOL };
                format!("{DIR_EMOJI} {display} {symbol}")
            } else {
                format!("{DIR_EMOJI} {display}")
            }
        } else if selected.contains(item) {
            format!("{display} {SELECTED_SYMBOL}")
        } else if self.show_all {
            format!("{display} {NOT_SELECTED_SYMBOL}")
        } else {
            display
        }
    }
}

/// Explains why a directory has no listed files. Read errors yield no marker.
fn directory_marker(dir: &Path) -> &'static str {
    let entries: Vec<fs::DirEntry> = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir.filter_map(Result::ok).collect(),
        Err(e) => {
            tracing::debug!("Cannot inspect {} for the tree marker: {}", dir.display(), e);
            return "";
        }
    };

    let files: Vec<PathBuf> = entries
        .iter()
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(fs::DirEntry::path)
        .collect();

    if !files.is_empty() {
        if files.iter().any(|file| is_text_file(file)) {
            " 📁 (contains text files but not selected)"
        } else {
            " 📁 (contains non-text or ignored files)"
        }
    } else if entries.is_empty() {
        " (empty)"
    } else {
        ""
    }
}
