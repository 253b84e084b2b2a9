// Configuration loading and validation (config/gapwatch.toml).

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use gapwatch_core::{OutcomeBounds, PipelineConfig};
use serde::Deserialize;
use thiserror::Error;

use crate::season::SeasonSchedule;

/// File name of the configuration under `config/` and `defaults/`.
pub const CONFIG_FILE: &str = "gapwatch.toml";

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
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub season: SeasonConfig,
    pub pipeline: PipelineSettings,
    pub paths: DataPaths,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeasonConfig {
    pub year: i32,
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSettings {
    pub window: usize,
    pub leaderboard_size: usize,
    #[serde(default = "default_countable_only")]
    pub countable_only: bool,
    #[serde(default)]
    pub bounds: OutcomeBounds,
}

fn default_countable_only() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub plots_dir: PathBuf,
    pub reports_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Config {
    /// The core pipeline tunables carried by this config.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            window: self.pipeline.window,
            leaderboard_size: self.pipeline.leaderboard_size,
            bounds: self.pipeline.bounds,
        }
    }

    /// Season calendar, filling unset dates with the March 20 / September 30
    /// defaults.
    pub fn schedule(&self) -> SeasonSchedule {
        let defaults = SeasonSchedule::for_year(self.season.year);
        SeasonSchedule {
            start: self.season.start.unwrap_or(defaults.start),
            end: self.season.end.unwrap_or(defaults.end),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/gapwatch.toml` relative to `base_dir`.
///
/// Does not copy defaults; `load_config()` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = std::fs::read_to_string(&path).map_err(|_| ConfigError::FileNotFound {
        path: path.clone(),
    })?;
    let config: Config = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    validate(&config)?;
    Ok(config)
}

/// Seed `config/gapwatch.toml` from `defaults/gapwatch.toml` when it is
/// missing. Returns the new file, or `None` when a config was already there.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(CONFIG_FILE);
    if target.exists() {
        return Ok(None);
    }

    let source = base_dir.join("defaults").join(CONFIG_FILE);
    if !source.is_file() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "neither config/{CONFIG_FILE} nor defaults/{CONFIG_FILE} found in {}",
                base_dir.display()
            ),
        });
    }

    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to create {}: {e}", dir.display()),
        })?;
    }
    std::fs::copy(&source, &target).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to copy {} to {}: {e}", source.display(), target.display()),
    })?;
    Ok(Some(target))
}

/// Load config relative to the current working directory, copying defaults
/// first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_file(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.pipeline.window == 0 {
        return Err(invalid("pipeline.window", "must be greater than 0"));
    }
    if config.pipeline.leaderboard_size == 0 {
        return Err(invalid("pipeline.leaderboard_size", "must be greater than 0"));
    }

    let bounds = config.pipeline.bounds;
    if !bounds.min.is_finite() || !bounds.max.is_finite() || bounds.min >= bounds.max {
        return Err(invalid(
            "pipeline.bounds",
            format!("min must be below max, got [{}, {}]", bounds.min, bounds.max),
        ));
    }

    let schedule = config.schedule();
    if schedule.start > schedule.end {
        return Err(invalid(
            "season",
            format!("start {} is after end {}", schedule.start, schedule.end),
        ));
    }

    if config.server.port == 0 {
        return Err(invalid("server.port", "must be greater than 0"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
