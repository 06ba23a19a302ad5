pub mod settings;

use serde::{Deserialize, Serialize};

use crate::core::scanner::DEFAULT_MAX_FILE_SIZE;
use crate::core::{FormatOptions, OutputFormat};

/// User-tunable settings. Missing fields take their defaults when loading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Extra ignore globs, added on top of the built-in defaults.
    pub ignore_patterns: Vec<String>,
    pub max_file_size: u64,
    pub include_file_stats: bool,
    pub estimate_tokens: bool,
    pub output_format: OutputFormat,
}

impl AppConfig {
    pub fn format_options(&self) -> FormatOptions {
        FormatOptions {
            include_file_stats: self.include_file_stats,
            estimate_tokens: self.estimate_tokens,
            output_format: self.output_format,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: Vec::new(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            include_file_stats: true,
            estimate_tokens: true,
            output_format: OutputFormat::Markdown,
        }
    }
}
