//! Assembles the packed document and drives a full corpus build.

use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use tokio::sync::mpsc;

use super::error::CoreError;
use super::file_handler::{calculate_stats, CorpusStats, FileHandler, FileRecord, NO_EXTENSION};
use super::tree_generator::{TreeGenerator, TreeMode};
use super::{FileDiscovery, ScanProgress};
use crate::utils::{format_size, format_with_commas};

const SEPARATOR_WIDTH: usize = 80;
const TOP_FILE_TYPES: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Xml,
}

/// Switches that shape the generated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    pub include_file_stats: bool,
    pub estimate_tokens: bool,
    pub output_format: OutputFormat,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            include_file_stats: true,
            estimate_tokens: true,
            output_format: OutputFormat::Markdown,
        }
    }
}

/// Fence language for a dotted extension, or `""` when unknown.
pub fn language_for_extension(ext: &str) -> &'static str {
    match ext.to_lowercase().as_str() {
        ".js" => "javascript",
        ".ts" => "typescript",
        ".jsx" => "jsx",
        ".tsx" => "tsx",
        ".py" => "python",
        ".java" => "java",
        ".c" | ".h" => "c",
        ".cpp" | ".cc" | ".hpp" => "cpp",
        ".cs" => "csharp",
        ".php" => "php",
        ".rb" => "ruby",
        ".go" => "go",
        ".rs" => "rust",
        ".swift" => "swift",
        ".kt" => "kotlin",
        ".scala" => "scala",
        ".html" | ".htm" => "html",
        ".css" => "css",
        ".scss" => "scss",
        ".sass" => "sass",
        ".json" => "json",
        ".yaml" | ".yml" => "yaml",
        ".xml" | ".svg" => "xml",
        ".md" | ".mdx" => "markdown",
        ".sh" | ".bash" => "bash",
        ".sql" => "sql",
        ".dockerfile" => "dockerfile",
        ".makefile" => "makefile",
        ".graphql" | ".gql" => "graphql",
        ".vue" => "vue",
        ".svelte" => "svelte",
        ".env" => "plaintext",
        _ => "",
    }
}

/// Builds the Markdown document, wrapped in XML when requested.
pub fn format_document(
    records: &[FileRecord],
    stats: &CorpusStats,
    project_name: &str,
    tree: &str,
    options: &FormatOptions,
    generated_at: DateTime<Local>,
) -> String {
    let mut md = String::new();

    md.push_str(&format!("# 📁 Project: {project_name}\n\n"));

    md.push_str("**📊 Project Overview (Selected Files):**\n");
    md.push_str(&format!("- Total Files: {}\n", stats.total_files));
    md.push_str(&format!("- Total Size: {}\n", format_size(stats.total_size)));
    md.push_str(&format!(
        "- Total Lines: {}\n",
        format_with_commas(stats.total_lines as u64)
    ));
    if options.estimate_tokens {
        md.push_str(&format!(
            "- Estimated Tokens: ~{} (approx. for LLMs)\n\n",
            format_with_commas(stats.estimated_tokens)
        ));
    } else {
        md.push('\n');
    }

    if !stats.files_by_type.is_empty() {
        md.push_str("**📋 Top File Types:**\n");
        for (ext, count) in stats.top_file_types(TOP_FILE_TYPES) {
            let display = if ext == NO_EXTENSION { "(no ext)" } else { ext };
            md.push_str(&format!("- {display}: {count}\n"));
        }
        md.push_str("\n🔖 Legend: ✓=included · ✗=excluded · 📂=folder\n\n");
    }

    md.push_str("## 🌳 Project Structure\n\n");
    md.push_str(&format!("```\n{tree}\n```\n\n"));

    md.push_str("## 📄 Files Content\n\n");
    md.push_str("*Files are listed in alphabetical order by path.*\n\n");

    let separator = "=".repeat(SEPARATOR_WIDTH);
    for record in records {
        let lang = language_for_extension(&record.extension);
        md.push_str(&format!("{separator}\n📄 **{}**\n", record.relative_path));
        if options.include_file_stats {
            md.push_str(&format!(
                "Size: {} | Lines: {}\n",
                format_size(record.size),
                record.lines
            ));
        }
        md.push_str(&format!("{separator}\n\n"));
        md.push_str(&format!("```{lang}\n{}\n```\n\n", record.content));
    }

    md.push_str("---\n");
    md.push_str("*Generated by Codebase Prompt Packer*\n");
    md.push_str(&format!(
        "*Total files processed: {} | Generated on: {}*\n",
        stats.total_files,
        generated_at.format("%Y-%m-%d %H:%M:%S")
    ));

    match options.output_format {
        OutputFormat::Markdown => md,
        OutputFormat::Xml => wrap_xml(project_name, &md, generated_at.with_timezone(&Utc)),
    }
}

/// Wraps a document in the `<project>` envelope with its body in one CDATA section.
pub fn wrap_xml(project_name: &str, body: &str, generated_at: DateTime<Utc>) -> String {
    format!(
        "<project name=\"{}\">\n  <generatedAt>{}</generatedAt>\n  <content><![CDATA[\n{}\n]]></content>\n</project>",
        escape_attribute(project_name),
        generated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        body.replace("]]>", "]]]]><![CDATA[>")
    )
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// A finished document together with the statistics it was built from.
#[derive(Debug, Clone)]
pub struct Corpus {
    pub document: String,
    pub stats: CorpusStats,
}

/// Turns a selection into a [`Corpus`] for one project root.
#[derive(Debug, Clone)]
pub struct CorpusBuilder {
    root_path: PathBuf,
    discovery: FileDiscovery,
    options: FormatOptions,
}

impl CorpusBuilder {
    pub fn new(root_path: impl Into<PathBuf>, discovery: FileDiscovery, options: FormatOptions) -> Self {
        Self {
            root_path: root_path.into(),
            discovery,
            options,
        }
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    fn project_name(&self) -> String {
        self.root_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    /// Reads the selected files and renders the document.
    ///
    /// Returns `Ok(None)` when `cancel_flag` is raised while reading. In full
    /// tree mode the diagram covers every eligible file under the root plus all
    /// existing directories; if discovery finds nothing it falls back to the
    /// selected files.
    pub async fn build(
        &self,
        selected_files: &[PathBuf],
        full_tree: bool,
        progress_sender: &mpsc::UnboundedSender<ScanProgress>,
        cancel_flag: &AtomicBool,
    ) -> Result<Option<Corpus>, CoreError> {
        let total = selected_files.len();
        progress_sender
            .send(ScanProgress::new(0, total, "Processing files..."))
            .ok();

        let Some(records) =
            FileHandler::read_in_batches(selected_files, &self.root_path, progress_sender, cancel_flag)
                .await
        else {
            return Ok(None);
        };

        progress_sender
            .send(ScanProgress::new(total, total, "Generating output..."))
            .ok();
        let stats = calculate_stats(&records);

        let tree = self.render_tree(&records, full_tree).await?;
        let document = format_document(
            &records,
            &stats,
            &self.project_name(),
            &tree,
            &self.options,
            Local::now(),
        );

        progress_sender
            .send(ScanProgress::new(total, total, "Finalizing..."))
            .ok();
        tracing::info!(
            "Built corpus of {} files ({} bytes of output)",
            stats.total_files,
            document.len()
        );

        Ok(Some(Corpus { document, stats }))
    }

    async fn render_tree(&self, records: &[FileRecord], full_tree: bool) -> Result<String, CoreError> {
        let selected: HashSet<PathBuf> = records
            .iter()
            .map(|r| PathBuf::from(&r.relative_path))
            .collect();

        if full_tree {
            let all_files = self.discovery.discover_async(&self.root_path).await?;
            if !all_files.is_empty() {
                return TreeGenerator::generate_tree_async(
                    all_files,
                    self.root_path.clone(),
                    Some(selected),
                    TreeMode::Full,
                )
                .await;
            }
        }

        let files: Vec<PathBuf> = records
            .iter()
            .map(|r| self.root_path.join(&r.relative_path))
            .collect();
        TreeGenerator::generate_tree_async(
            files,
            self.root_path.clone(),
            Some(selected),
            TreeMode::Selected,
        )
        .await
    }

    /// The full filtered tree with every existing directory and no annotations.
    pub async fn build_tree_only(&self) -> Result<String, CoreError> {
        let files = self.discovery.discover_async(&self.root_path).await?;
        TreeGenerator::generate_tree_async(files, self.root_path.clone(), None, TreeMode::Full).await
    }
}
