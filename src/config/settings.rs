use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use super::AppConfig;

const APP_NAME: &str = "PromptPacker";
const CONFIG_FILE: &str = "config.json";

/// Overrides the platform config directory when set.
pub const CONFIG_DIR_ENV: &str = "PROMPT_PACKER_CONFIG_DIR";

/// Key prefix used by editor-style settings documents.
const EDITOR_SETTINGS_PREFIX: &str = "codebasePromptPacker.";

/// Editor setting names and their `AppConfig` field names.
const EDITOR_KEYS: &[(&str, &str)] = &[
    ("ignorePatterns", "ignore_patterns"),
    ("maxFileSize", "max_file_size"),
    ("includeFileStats", "include_file_stats"),
    ("estimateTokens", "estimate_tokens"),
    ("outputFormat", "output_format"),
];

/// Returns the platform-specific configuration directory for the application.
pub fn get_config_directory() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        return Some(PathBuf::from(dir));
    }
    ProjectDirs::from("com", "promptpacker", APP_NAME)
        .map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
}

/// Returns the full path to the configuration file.
pub fn get_config_file_path() -> Option<PathBuf> {
    get_config_directory().map(|dir| dir.join(CONFIG_FILE))
}

fn resolve_path(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path.to_path_buf()),
        None => get_config_file_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory")),
    }
}

/// Loads the configuration from `path`, or from the default location.
///
/// A missing file is created with defaults. A file that cannot be parsed is
/// logged and replaced by defaults in memory; the file itself is left alone.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config_path = resolve_path(path)?;

    if !config_path.exists() {
        tracing::info!(
            "Config file not found, creating default config at {:?}",
            config_path
        );
        let default_config = AppConfig::default();
        save_config(&default_config, Some(&config_path))?;
        return Ok(default_config);
    }

    let config_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file {}", config_path.display()))?;

    match parse_config(&config_content) {
        Ok(config) => {
            tracing::info!("Loaded config from {:?}", config_path);
            Ok(config)
        }
        Err(e) => {
            tracing::warn!(
                "Failed to parse config file at {:?}: {}. Falling back to default config.",
                config_path,
                e
            );
            Ok(AppConfig::default())
        }
    }
}

/// Parses a config document, translating editor-style keys first if present.
pub fn parse_config(config_content: &str) -> Result<AppConfig> {
    let value: Value = serde_json::from_str(config_content)?;
    let is_editor_document = value
        .as_object()
        .is_some_and(|obj| obj.keys().any(|k| k.starts_with(EDITOR_SETTINGS_PREFIX)));

    if is_editor_document {
        return migrate_editor_settings(value);
    }
    Ok(serde_json::from_value(value)?)
}

/// Converts `{"codebasePromptPacker.maxFileSize": 2048, ...}` into an `AppConfig`.
/// Unknown keys are ignored; absent keys keep their defaults.
fn migrate_editor_settings(value: Value) -> Result<AppConfig> {
    let Value::Object(obj) = value else {
        anyhow::bail!("Config is not a JSON object");
    };

    let mut migrated = Map::new();
    for (key, val) in obj {
        let Some(name) = key.strip_prefix(EDITOR_SETTINGS_PREFIX) else {
            continue;
        };
        match EDITOR_KEYS.iter().find(|(editor, _)| *editor == name) {
            Some((_, field)) if !val.is_null() => {
                migrated.insert((*field).to_string(), val);
            }
            Some(_) => {}
            None => tracing::debug!("Ignoring unknown editor setting {}", key),
        }
    }

    let config: AppConfig = serde_json::from_value(Value::Object(migrated))?;
    tracing::info!("Successfully migrated editor-style settings");
    Ok(config)
}

/// Saves the configuration to `path`, or to the default location.
pub fn save_config(config: &AppConfig, path: Option<&Path>) -> Result<()> {
    let config_path = resolve_path(path)?;

    if let Some(config_dir) = config_path.parent() {
        if !config_dir.as_os_str().is_empty() && !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            tracing::info!("Created config directory: {:?}", config_dir);
        }
    }

    let config_json = serde_json::to_string_pretty(config)?;
    fs::write(&config_path, config_json)?;
    tracing::info!("Saved config to {:?}", config_path);

    Ok(())
}

/// Exports the current configuration to a user-specified JSON file.
pub fn export_config(config: &AppConfig, export_path: &Path) -> Result<()> {
    let config_json = serde_json::to_string_pretty(config)?;
    fs::write(export_path, config_json)?;
    tracing::info!("Exported config to {:?}", export_path);
    Ok(())
}

/// Imports a configuration file; unlike loading, a malformed file is an error.
pub fn import_config(import_path: &Path) -> Result<AppConfig> {
    let config_content = fs::read_to_string(import_path)
        .with_context(|| format!("Failed to read {}", import_path.display()))?;
    let config = parse_config(&config_content)
        .with_context(|| format!("Invalid config file {}", import_path.display()))?;
    tracing::info!("Imported config from {:?}", import_path);
    Ok(config)
}
