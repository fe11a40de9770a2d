use std::fmt;

use thiserror::Error;

use crate::physics::BodyHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Body,
    Link,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Body => write!(f, "body"),
            Resource::Link => write!(f, "link"),
        }
    }
}

/// Errors surfaced by rope building, splitting and lookups.
#[derive(Debug, Error)]
pub enum RopeError {
    #[error("physics world could not allocate a {0}")]
    ResourceExhausted(Resource),
    /// Rejected before any allocation happened.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("no rope segment owns body {0:?}")]
    ReferenceNotFound(BodyHandle),
}

/// Errors that can occur while loading a [`Config`](crate::config::Config).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] RopeError),
}
