//! Optional TOML configuration.
//!
//! ```toml
//! [analysis]
//! edge_threshold = 40
//! eps = 4.0
//! min_points = 4
//! subset = "clustered"          # or "isolated"
//! features = "position"         # or "position-intensity"
//!
//! [embedding]
//! percentile = 75
//! ```
//!
//! Missing keys keep their defaults. Command line flags override the file.
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::stego::{
    DEFAULT_VARIANCE_PERCENTILE, ParameterError, StegoParams,
    validate_percentile,
};

/// Errors that can be emitted while loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError
{
    /// The file could not be read
    #[error("failed to read config {path}")]
    Read
    {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`Config`]
    #[error("failed to parse config {path}")]
    Parse
    {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A value is out of range
    #[error("invalid value in config {path}")]
    Invalid
    {
        path: PathBuf,
        #[source]
        source: ParameterError,
    },
}

/// Settings for the embedding stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmbeddingConfig
{
    /// Percentile of the sampled variance used as the 2-bit cutoff.
    pub percentile: u8,
}

impl Default for EmbeddingConfig
{
    fn default() -> Self
    {
        Self {
            percentile: DEFAULT_VARIANCE_PERCENTILE,
        }
    }
}

/// Whole configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config
{
    pub analysis: StegoParams,
    pub embedding: EmbeddingConfig,
}

impl Config
{
    /// Checks every value that has a range.
    ///
    /// # Errors
    ///
    /// Returns the first [`ParameterError`] found.
    pub fn validate(&self) -> Result<(), ParameterError>
    {
        self.analysis.validate()?;
        validate_percentile(self.embedding.percentile)
    }
}

/// Loads and validates a configuration file.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file cannot be read, parsed or holds out
/// of range values.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError>
{
    let path = path.as_ref();
    let content =
        fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.into(),
            source,
        })?;
    let config: Config =
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.into(),
            source,
        })?;
    config.validate().map_err(|source| ConfigError::Invalid {
        path: path.into(),
        source,
    })?;
    Ok(config)
}
