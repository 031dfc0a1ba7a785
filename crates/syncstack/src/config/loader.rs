use std::path::{Path, PathBuf};

use crate::config::EngineConfig;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/engine-config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<EngineConfig, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: EngineConfig = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

/// `<config dir>/syncstack/config.json`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("syncstack").join("config.json"))
}

/// Loads `explicit` if given, else the default config file if it exists,
/// else the built-in defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<EngineConfig, ConfigError> {
    if let Some(path) = explicit {
        log::debug!("Loading config from {}", path.display());
        return load_config(path);
    }

    match default_config_path() {
        Some(path) if path.is_file() => {
            log::debug!("Loading config from {}", path.display());
            load_config(path)
        }
        _ => Ok(EngineConfig::default()),
    }
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &EngineConfig) -> Result<(), ConfigError> {
    if config.batch_parallelism == 0 {
        return Err(ConfigError::Validation {
            message: "batchParallelism must be at least 1".to_string(),
        });
    }

    if config.api_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "apiTimeoutSecs must be at least 1".to_string(),
        });
    }

    validate_snapshot_prefix(&config.snapshot_prefix)?;

    if config.workspace_root.as_os_str().is_empty() {
        return Err(ConfigError::Validation {
            message: "workspaceRoot must not be empty".to_string(),
        });
    }

    Ok(())
}

/// The prefix becomes part of a branch name, so it must be a valid ref
/// component on its own.
fn validate_snapshot_prefix(prefix: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::Validation {
        message: format!("Invalid snapshotPrefix '{}': {}", prefix, reason),
    };

    if prefix.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if !prefix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(invalid("only letters, digits, '-', '_' and '.' are allowed"));
    }
    if prefix.starts_with('-') || prefix.starts_with('.') {
        return Err(invalid("must not start with '-' or '.'"));
    }
    if prefix.contains("..") {
        return Err(invalid("must not contain '..'"));
    }

    Ok(())
}
