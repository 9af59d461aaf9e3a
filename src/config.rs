//! Export configuration.
//!
//! Environment variables:
//! - `FLOW_SNAPSHOT`: snapshot file to export (required unless given as the
//!   first command-line argument)
//! - `OUTPUT_DIR`: output root (default: `./output`)
//! - `EXPORT_PLATFORM`: target platform (default: `generic`)
//! - `EXPORT_LANGUAGE`: language code (default: `en`)
//! - `EXPORT_MAX_CONCURRENCY`: write slots (default: available parallelism)
//! - `LOG_FORMAT`: `json` or `pretty` (default: `json`)

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::convert::ConvertOptions;
use crate::render::Platform;

/// Error type for configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No snapshot path was given.
    #[error("FLOW_SNAPSHOT is not set and no snapshot path was given")]
    MissingSnapshot,

    /// Unknown platform name.
    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    /// A variable has an invalid value.
    #[error("Invalid value for {name}: {value}")]
    InvalidValue {
        /// Variable name.
        name: String,
        /// Offending value.
        value: String,
    },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Structured JSON lines.
    #[default]
    Json,
    /// Human-readable output.
    Pretty,
}

/// Configuration of one export run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Snapshot file.
    pub snapshot: PathBuf,
    /// Output root.
    pub output_dir: PathBuf,
    /// Target platform.
    pub platform: Platform,
    /// Language code.
    pub language: String,
    /// Write slots; `None` sizes the pool from the unit count.
    pub max_concurrency: Option<usize>,
    /// Log output format.
    pub log_format: LogFormat,
}

impl ExportConfig {
    /// Load from the process environment. `cli_snapshot` overrides `FLOW_SNAPSHOT`.
    pub fn from_env(cli_snapshot: Option<String>) -> Result<Self, ConfigError> {
        Self::from_lookup(cli_snapshot, |name| std::env::var(name).ok())
    }

    /// Load using `lookup` to read variables.
    pub fn from_lookup<F>(cli_snapshot: Option<String>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let snapshot = cli_snapshot
            .filter(|s| !s.is_empty())
            .or_else(|| var("FLOW_SNAPSHOT"))
            .ok_or(ConfigError::MissingSnapshot)?;

        let platform = match var("EXPORT_PLATFORM") {
            Some(name) => Platform::from_str(&name).ok_or(ConfigError::UnknownPlatform(name))?,
            None => Platform::default(),
        };

        let max_concurrency = match var("EXPORT_MAX_CONCURRENCY") {
            Some(value) => match value.trim().parse::<usize>() {
                Ok(slots) if slots > 0 => Some(slots),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "EXPORT_MAX_CONCURRENCY".into(),
                        value,
                    })
                }
            },
            None => None,
        };

        let log_format = match var("LOG_FORMAT").as_deref() {
            None | Some("json") => LogFormat::Json,
            Some("pretty") => LogFormat::Pretty,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: "LOG_FORMAT".into(),
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            snapshot: PathBuf::from(snapshot),
            output_dir: var("OUTPUT_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("./output")),
            platform,
            language: var("EXPORT_LANGUAGE").unwrap_or_else(|| crate::DEFAULT_LANGUAGE.to_string()),
            max_concurrency,
            log_format,
        })
    }

    /// Conversion options for this run.
    pub fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            language: self.language.clone(),
            ..ConvertOptions::default()
        }
    }
}
