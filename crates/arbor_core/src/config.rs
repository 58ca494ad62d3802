//! # World Configuration
//!
//! Loaded once at startup from TOML. Every field is optional.
//!
//! ```toml
//! initial_capacity = 4096
//! max_frame_delta = 0.1
//! start_paused = false
//! ```

use std::path::Path;

use arbor_shared::constants::{
    DEFAULT_ENTITY_CAPACITY, DEFAULT_MAX_FRAME_DELTA, MAX_INITIAL_CAPACITY,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Startup settings of a [`World`](crate::World).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldConfig {
    /// Entity slots reserved up front.
    pub initial_capacity: usize,
    /// Upper bound on the game-time step fed to one update, in seconds.
    pub max_frame_delta: f32,
    /// Start with the simulation paused.
    pub start_paused: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_ENTITY_CAPACITY,
            max_frame_delta: DEFAULT_MAX_FRAME_DELTA,
            start_paused: false,
        }
    }
}

impl WorldConfig {
    /// Parses and validates a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns error if the text is not valid TOML or a value is out of
    /// range.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or its content is invalid.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks every value is in range.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_capacity == 0 {
            return Err(ConfigError::Invalid(
                "initial_capacity must be greater than zero".into(),
            ));
        }
        if self.initial_capacity > MAX_INITIAL_CAPACITY {
            return Err(ConfigError::Invalid(format!(
                "initial_capacity must be at most {MAX_INITIAL_CAPACITY}, got {}",
                self.initial_capacity
            )));
        }
        if !self.max_frame_delta.is_finite() || self.max_frame_delta <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "max_frame_delta must be a positive number of seconds, got {}",
                self.max_frame_delta
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorldConfig::default();
        assert_eq!(config.initial_capacity, 1024);
        assert!((config.max_frame_delta - 0.1).abs() < f32::EPSILON);
        assert!(!config.start_paused);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = WorldConfig::from_toml_str("start_paused = true").unwrap();
        assert!(config.start_paused);
        assert_eq!(config.initial_capacity, DEFAULT_ENTITY_CAPACITY);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            WorldConfig::from_toml_str("initial_capacity = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            WorldConfig::from_toml_str("max_frame_delta = -1.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            WorldConfig::from_toml_str("unknown_field = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_rejects_oversized_capacity() {
        let text = format!("initial_capacity = {}", i64::MAX);
        assert!(matches!(
            WorldConfig::from_toml_str(&text),
            Err(ConfigError::Invalid(_))
        ));

        let at_limit = WorldConfig {
            initial_capacity: MAX_INITIAL_CAPACITY,
            ..WorldConfig::default()
        };
        assert!(at_limit.validate().is_ok());
        let over = WorldConfig {
            initial_capacity: MAX_INITIAL_CAPACITY + 1,
            ..WorldConfig::default()
        };
        assert!(over.validate().is_err());
    }

    #[test]
    fn test_rejects_nan_frame_delta() {
        let config = WorldConfig {
            max_frame_delta: f32::NAN,
            ..WorldConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = WorldConfig::load("/nonexistent/arbor.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
