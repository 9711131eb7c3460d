// Configuration loading and parsing (raffle.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::raffle::model::RaffleModel;
use crate::raffle::rounds::{Round, RoundSchedule};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    /// Display name of the raffle.
    pub name: String,
    /// The drawing model for interactive and batch sessions.
    pub model: RaffleModel,
    /// Validated round schedule.
    pub schedule: RoundSchedule,
    /// Paths to ingestion data.
    pub data_paths: DataPaths,
    /// SQLite database path for session snapshots and the audit trail.
    pub db_path: String,
}

// ---------------------------------------------------------------------------
// raffle.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire raffle.toml file.
#[derive(Debug, Clone, Deserialize)]
struct RaffleFile {
    raffle: RaffleSection,
    rounds: Vec<Round>,
    data_paths: DataPaths,
    database: DatabaseSection,
}

#[derive(Debug, Clone, Deserialize)]
struct RaffleSection {
    name: String,
    model: String,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub participants: String,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/raffle.toml` relative to the
/// given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy
/// defaults. Prefer `load_config()` which handles default initialization
/// automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let raffle_path = base_dir.join("config").join("raffle.toml");
    let raffle_text = read_file(&raffle_path)?;
    let raffle_file: RaffleFile =
        toml::from_str(&raffle_text).map_err(|e| ConfigError::ParseError {
            path: raffle_path.clone(),
            source: e,
        })?;

    validate(&raffle_file)?;

    let model = RaffleModel::from_name(&raffle_file.raffle.model).ok_or_else(|| {
        ConfigError::ValidationError {
            field: "raffle.model".into(),
            message: format!("unknown model `{}`", raffle_file.raffle.model),
        }
    })?;
    let schedule =
        RoundSchedule::new(raffle_file.rounds).map_err(|e| ConfigError::ValidationError {
            field: "rounds".into(),
            message: e.to_string(),
        })?;

    Ok(Config {
        name: raffle_file.raffle.name,
        model,
        schedule,
        data_paths: raffle_file.data_paths,
        db_path: raffle_file.database.path,
    })
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);
        if target.exists() {
            continue;
        }

        std::fs::copy(&path, &target).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to copy {} to {}: {e}", path.display(), target.display()),
        })?;
        copied.push(target);
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working
/// directory. Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(file: &RaffleFile) -> Result<(), ConfigError> {
    if file.raffle.name.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "raffle.name".into(),
            message: "must not be empty".into(),
        });
    }

    if file.data_paths.participants.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "data_paths.participants".into(),
            message: "must not be empty".into(),
        });
    }

    if file.database.path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "database.path".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
