//! Ignore-pattern handling shared by discovery and tree rendering.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::collections::BTreeSet;

/// Patterns that are always applied on top of the user's configuration.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    // Version control and dependencies
    "**/.git/**",
    "**/node_modules/**",
    // Build output
    "**/dist/**",
    "**/build/**",
    "**/out/**",
    "**/target/**",
    // Caches and temp folders
    "**/tmp/**",
    "**/temp/**",
    "**/.cache/**",
    "**/coverage/**",
    "**/.nyc_output/**",
    // IDE folders
    "**/.vscode/**",
    "**/.idea/**",
    // Images
    "**/*.png", "**/*.jpg", "**/*.jpeg", "**/*.gif", "**/*.bmp", "**/*.tiff", "**/*.tif",
    "**/*.webp", "**/*.ico",
    // Video and audio
    "**/*.mp4", "**/*.avi", "**/*.mov", "**/*.wmv", "**/*.flv", "**/*.webm", "**/*.mkv",
    "**/*.m4v", "**/*.mp3", "**/*.wav", "**/*.flac", "**/*.aac", "**/*.ogg", "**/*.m4a",
    "**/*.wma",
    // Documents and archives
    "**/*.pdf", "**/*.doc", "**/*.docx", "**/*.xls", "**/*.xlsx", "**/*.ppt", "**/*.pptx",
    "**/*.zip", "**/*.rar", "**/*.7z", "**/*.tar", "**/*.gz", "**/*.bz2", "**/*.xz",
    // Executables and databases
    "**/*.exe", "**/*.dll", "**/*.so", "**/*.dylib", "**/*.app", "**/*.deb", "**/*.rpm",
    "**/*.dmg", "**/*.pkg", "**/*.bin", "**/*.dat", "**/*.db", "**/*.sqlite", "**/*.sqlite3",
    // Lockfiles and minified assets
    "**/package-lock.json",
    "**/yarn.lock",
    "**/pnpm-lock.yaml",
    "**/*.min.js",
    "**/*.min.css",
    // Logs
    "**/*.log",
    // Secrets and credentials
    "**/.env",
    "**/.env.*",
    "**/.ssh/**",
    "**/id_rsa",
    "**/id_dsa",
    "**/known_hosts",
    "**/*.pem", "**/*.key", "**/*.crt", "**/*.cer", "**/*.der", "**/*.p12", "**/*.pfx",
    "**/*credentials*",
    "**/*credential*",
    "**/*secret*",
    "**/*token*",
    "**/*apikey*",
    "**/*api-key*",
];

/// Directory names skipped by the directory listing used for full-tree rendering.
pub const SYSTEM_IGNORED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "dist",
    "build",
    "out",
    "target",
    "tmp",
    "temp",
    ".cache",
    "coverage",
    ".nyc_output",
    ".vscode",
    ".idea",
];

/// Merges user patterns with the defaults, dropping blanks, comments and duplicates.
pub fn merged_ignore_patterns(user_patterns: &[String]) -> BTreeSet<String> {
    user_patterns
        .iter()
        .map(|p| p.trim().to_string())
        .chain(DEFAULT_IGNORE_PATTERNS.iter().map(|p| p.to_string()))
        .filter(|p| !p.is_empty() && !p.starts_with('#'))
        .collect()
}

/// Builds a `GlobSet` from a set of `.gitignore`-style patterns.
///
/// Patterns are matched against paths relative to the project root.
/// `*` never crosses a path separator, only `**` does.
pub fn build_globset_from_patterns<'a, I>(patterns: I) -> GlobSet
where
    I: IntoIterator<Item = &'a String>,
{
    let mut builder = GlobSetBuilder::new();

    for pattern in patterns {
        let trimmed_pattern = pattern.trim();
        if trimmed_pattern.is_empty() || trimmed_pattern.starts_with('#') {
            continue;
        }

        let expanded: Vec<String> = if let Some(dir_pattern) = trimmed_pattern.strip_suffix('/') {
            // "target/" means the directory itself and everything inside it.
            vec![format!("**/{dir_pattern}"), format!("**/{dir_pattern}/**")]
        } else if trimmed_pattern.contains('/') {
            vec![trimmed_pattern.to_string()]
        } else {
            // Bare names ("*.log", ".DS_Store") match at any depth.
            vec![format!("**/{trimmed_pattern}")]
        };

        for glob_str in expanded {
            match GlobBuilder::new(&glob_str).literal_separator(true).build() {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => tracing::warn!("Skipping invalid ignore pattern '{}': {}", pattern, e),
            }
        }
    }

    builder.build().unwrap_or_else(|e| {
        tracing::error!("Failed to build glob set from patterns: {}", e);
        GlobSet::empty()
    })
}
