use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::bencode::{DecodeOptions, DEFAULT_MAX_DEPTH};

/// Looked up in the working directory by [`Config::load`].
pub const CONFIG_PATH: &str = "rusbit-metainfo.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub max_depth: usize,      // deepest list/dict nesting accepted
    pub max_input_size: usize, // bytes
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error on config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_input_size: 16 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Reads `rusbit-metainfo.toml` when it exists, otherwise uses defaults.
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new(CONFIG_PATH).exists() {
            Self::from_path(CONFIG_PATH)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let toml = toml::to_string(self)?;
        fs::write(path, toml)?;
        Ok(())
    }

    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            max_depth: self.max_depth,
        }
    }
}
