use serde::{Deserialize, Serialize};
use std::fs;
use std::str::FromStr;
use tracing::level_filters::LevelFilter;

use crate::error::ConfigError;
use crate::store::DEFAULT_SHARDS;

/// Log configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LogConfig {
  /// Log level, default is "info". `RUST_LOG` takes precedence when set.
  #[serde(default = "default_log_level")]
  pub level: String,
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
    }
  }
}

/// Store configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StoreConfig {
  /// Number of lock shards, 1 serializes every operation behind one lock
  #[serde(default = "default_shards")]
  pub shards: usize,
}

fn default_shards() -> usize {
  DEFAULT_SHARDS
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      shards: default_shards(),
    }
  }
}

/// vcache configuration
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
  #[serde(default)]
  pub store: StoreConfig,

  /// Log configuration
  #[serde(default)]
  pub log: LogConfig,
}

/// Values given on the command line, applied over the file
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Overrides {
  pub shards: Option<usize>,
  pub log_level: Option<String>,
}

impl Config {
  /// Load the config file if one is given, apply command line overrides and
  /// validate the result
  pub fn load(path: Option<&str>, overrides: &Overrides) -> Result<Self, ConfigError> {
    let mut config = match path {
      Some(path) => Self::read_file(path)?,
      None => Config::default(),
    };
    config.apply(overrides);
    config.validate()?;
    Ok(config)
  }

  pub fn apply(&mut self, overrides: &Overrides) {
    if let Some(shards) = overrides.shards {
      self.store.shards = shards;
    }
    if let Some(level) = &overrides.log_level {
      self.log.level = level.clone();
    }
  }

  /// Load configuration from TOML file
  pub fn from_file(path: &str) -> Result<Self, ConfigError> {
    let config = Self::read_file(path)?;
    config.validate()?;
    Ok(config)
  }

  fn read_file(path: &str) -> Result<Self, ConfigError> {
    let config_str = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_string(),
      source,
    })?;

    let config: Config = toml::from_str(&config_str).map_err(|source| ConfigError::Parse {
      path: path.to_string(),
      source,
    })?;

    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.store.shards == 0 {
      return Err(ConfigError::Invalid(
        "store.shards must be at least 1".to_string(),
      ));
    }
    if LevelFilter::from_str(&self.log.level).is_err() {
      return Err(ConfigError::Invalid(format!(
        "log.level '{}' is not one of off, error, warn, info, debug, trace",
        self.log.level
      )));
    }
    Ok(())
  }
}
