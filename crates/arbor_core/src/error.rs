//! # Error Types
//!
//! Recoverable failures of the ECS layer. Misuse at the processor level is
//! logged and ignored instead; these errors surface where a caller can act
//! on them.

use std::path::PathBuf;

use thiserror::Error;

use crate::ecs::Entity;

/// Errors raised by component storage and processors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// The entity already owns data in this store.
    #[error("entity {0} already has this component")]
    ComponentExists(Entity),

    /// The entity owns no data in this store.
    #[error("entity {0} has no such component")]
    ComponentMissing(Entity),

    /// The handle is null, destroyed or stale.
    #[error("entity {0} is not alive")]
    DeadEntity(Entity),

    /// An externally authored world transform was sent to a child entity.
    #[error("entity {0} has a parent; only root entities accept a world transform")]
    NotRoot(Entity),

    /// A user processor of this type is already registered.
    #[error("processor already registered: {0}")]
    ProcessorExists(&'static str),
}

/// Errors raised while spawning entities from a description.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The description file could not be read.
    #[error("failed to read entity description {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The description is not valid TOML or does not match the schema.
    #[error("malformed entity description: {0}")]
    Parse(#[from] toml::de::Error),

    /// A component entry has no `data` block.
    #[error("component `{0}` has no data block")]
    MissingData(String),

    /// A component's data block has the wrong shape.
    #[error("invalid data for component `{component}`: {reason}")]
    InvalidData {
        /// Component type name.
        component: String,
        /// What was wrong.
        reason: String,
    },
}

/// Errors raised while loading a [`WorldConfig`](crate::config::WorldConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config is not valid TOML.
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;
