//! Configuration loading
//!
//! Decoder settings are resolved in priority order:
//! 1. Explicit config file path (command-line argument)
//! 2. Config file path from the `WILDCAT_CONFIG` environment variable
//! 3. Platform config file (`<config_dir>/wildcat/config.toml`)
//! 4. Compiled defaults
//!
//! Individual command-line flags are layered on top by the binary.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming a config file
pub const CONFIG_ENV_VAR: &str = "WILDCAT_CONFIG";

/// Decoder session configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecoderConfig {
    /// Output sample rate requested from the session (Hz)
    pub target_sample_rate: u32,

    /// Decode budget per read call (milliseconds of native-rate audio)
    pub buffer_duration_ms: u32,

    /// Maximum consecutive recoverable holes absorbed by one read.
    /// `None` retries without bound.
    pub hole_retry_limit: Option<u32>,

    /// Reset resampler filter history whenever the session seeks
    pub reset_resampler_on_seek: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 48000,
            buffer_duration_ms: 120,
            hole_retry_limit: None,
            reset_resampler_on_seek: true,
        }
    }
}

impl DecoderConfig {
    /// Parse configuration from TOML text. Missing keys take defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: DecoderConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Reject settings no session could open with.
    pub fn validate(&self) -> Result<()> {
        if self.target_sample_rate == 0 {
            return Err(Error::InvalidInput(
                "target_sample_rate must be positive".to_string(),
            ));
        }
        if self.buffer_duration_ms == 0 {
            return Err(Error::InvalidInput(
                "buffer_duration_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolve and load the decoder configuration.
///
/// An explicitly named file (argument or environment) must exist and parse;
/// the platform file is optional and falls back to defaults when absent.
pub fn load_config(cli_path: Option<&Path>) -> Result<DecoderConfig> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_path {
        debug!("Loading config from command line path {}", path.display());
        return DecoderConfig::from_file(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        debug!("Loading config from {}={}", CONFIG_ENV_VAR, path);
        return DecoderConfig::from_file(Path::new(&path));
    }

    // Priority 3: Platform config file
    if let Some(path) = default_config_path() {
        if path.exists() {
            debug!("Loading config from {}", path.display());
            return DecoderConfig::from_file(&path);
        }
    }

    // Priority 4: Compiled defaults
    debug!("No config file found, using defaults");
    Ok(DecoderConfig::default())
}

/// Get default configuration file path for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wildcat").join("config.toml"))
}
