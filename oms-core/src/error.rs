//! Error types for the facade.

use oms_policy::PolicyError;
use oms_resolver::ResolverError;
use oms_schema::{BackendKind, RegistryError};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for facade operations.
pub type FacadeResult<T> = Result<T, FacadeError>;

/// Failures of a facade call. Denials and missing records are not errors;
/// they come back as [`crate::Access::Denied`] and [`crate::Access::NotFound`].
#[derive(Debug, Error)]
pub enum FacadeError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Malformed subject context.
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// Backend failure, already redacted.
    #[error(transparent)]
    Resolver(#[from] ResolverError),

    #[error("unknown object type '{0}'")]
    UnknownObjectType(String),

    #[error("'{link}' is not a link from {object}")]
    UnknownLink { object: String, link: String },

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("invalid id for {object}: {message}")]
    InvalidKey { object: String, message: String },

    #[error("no {backend} resolver configured for {object}")]
    NoResolver { object: String, backend: BackendKind },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl FacadeError {
    /// Only backend failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Resolver(e) if e.is_retryable())
    }
}

/// Errors from loading [`crate::OmsConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("failed to parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}
