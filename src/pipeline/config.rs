// Pipeline configuration
// Cleanup thresholds and export options, loadable from JSON

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::export::MidiExportOptions;
use crate::notes::CleanupConfig;

/// Errors that can occur while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for a full raw-notes-to-MIDI run
///
/// Every field falls back to its default, so a partial JSON document is enough:
/// `{"cleanup": {"merge_gap_seconds": 0.08}}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Note cleanup thresholds
    pub cleanup: CleanupConfig,

    /// MIDI encoding options
    pub export: MidiExportOptions,

    /// Reject NaN or negative timing instead of filtering it out
    pub strict_input: bool,
}

impl PipelineConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a JSON configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Check thresholds and export options
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.cleanup;
        let thresholds = [
            ("min_duration_seconds", c.min_duration_seconds),
            ("min_amplitude", c.min_amplitude),
            ("merge_gap_seconds", c.merge_gap_seconds),
            ("post_merge_min_duration_seconds", c.post_merge_min_duration_seconds),
        ];

        for (name, value) in thresholds {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        if c.min_pitch > c.max_pitch {
            return Err(ConfigError::Invalid(format!(
                "min_pitch {} is above max_pitch {}",
                c.min_pitch, c.max_pitch
            )));
        }

        self.export
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}
