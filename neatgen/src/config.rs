//! Loading of experiment configurations from TOML.
//!
//! A configuration file has a `[population]` table, read into a
//! [`PopulationConfig`], and a `[genome]` table, read into the
//! genome implementation's configuration type. Unknown keys
//! are rejected in both, and both sections are validated.
//!
//! ```
//! use neatgen::{ConfigError, GenomeConfig, NeatConfig};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! #[serde(deny_unknown_fields)]
//! struct MyGenomeConfig {
//!     inputs: usize,
//! }
//!
//! impl GenomeConfig for MyGenomeConfig {
//!     fn validate(&self) -> Result<(), ConfigError> {
//!         if self.inputs == 0 {
//!             return Err(ConfigError::invalid("inputs", "must be positive"));
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let config: NeatConfig<MyGenomeConfig> = NeatConfig::from_toml_str(r#"
//!     [population]
//!     pop_size = 50
//!     fitness_criterion = "max"
//!     elitism = 1
//!
//!     [genome]
//!     inputs = 3
//! "#).unwrap();
//!
//! assert_eq!(config.population.size.get(), 50);
//! assert_eq!(config.genome.inputs, 3);
//!
//! let typo = NeatConfig::<MyGenomeConfig>::from_toml_str(r#"
//!     [population]
//!     elitsm = 1
//!
//!     [genome]
//!     inputs = 3
//! "#);
//! assert!(typo.is_err());
//!
//! let no_inputs = NeatConfig::<MyGenomeConfig>::from_toml_str("[genome]\ninputs = 0");
//! assert!(matches!(no_inputs, Err(ConfigError::Invalid { field: "inputs", .. })));
//! ```
use crate::PopulationConfig;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::path::{Path, PathBuf};

/// Errors produced while loading or validating configurations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    /// Shorthand for an [`Invalid`](ConfigError::Invalid) error.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// A genome configuration that can be range-checked
/// after loading. The default accepts any value.
pub trait GenomeConfig {
    /// Returns an error naming the first out-of-range value.
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

/// A complete experiment configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NeatConfig<C> {
    #[serde(default)]
    pub population: PopulationConfig,
    pub genome: C,
}

impl<C: DeserializeOwned + GenomeConfig> NeatConfig<C> {
    /// Parses a configuration from TOML text, and
    /// validates both of its sections.
    ///
    /// # Errors
    /// Returns an error on malformed TOML, unknown keys,
    /// or out-of-range population or genome values.
    pub fn from_toml_str(text: &str) -> Result<NeatConfig<C>, ConfigError> {
        let config: NeatConfig<C> = toml::from_str(text)?;
        config.population.validate()?;
        config.genome.validate()?;
        tracing::debug!(population = ?config.population, "loaded population configuration");
        Ok(config)
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    /// As [`from_toml_str`](NeatConfig::from_toml_str), plus I/O errors.
    pub fn from_file(path: impl AsRef<Path>) -> Result<NeatConfig<C>, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
