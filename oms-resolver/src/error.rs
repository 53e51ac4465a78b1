//! Error types for the resolver layer.

use crate::metrics::Operation;
use crate::redact::redact_credentials;
use oms_schema::BackendKind;
use std::fmt::Display;
use std::time::Duration;
use thiserror::Error;

/// Result type for resolver operations.
pub type ResolverResult<T> = Result<T, ResolverError>;

/// Errors from resolver calls. Messages that originate in a backend driver
/// are redacted before they are stored here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolverError {
    /// No backing file or partition exists for the object's locator.
    #[error("no data partition for {object} at '{locator}'")]
    PartitionNotFound { object: String, locator: String },

    /// The backend rejected or failed a query.
    #[error("query against {object} failed: {message}")]
    Query { object: String, message: String },

    /// Connection, I/O or driver failure.
    #[error("{backend} backend error: {message}")]
    Backend { backend: BackendKind, message: String },

    /// The call exceeded the configured timeout. Never cached.
    #[error("{operation} on {backend} backend timed out after {timeout:?}")]
    Timeout {
        backend: BackendKind,
        operation: Operation,
        timeout: Duration,
    },

    /// The batch exceeds `max_batch_size`; rejected, never truncated.
    #[error("batch of {requested} ids exceeds the maximum of {max}")]
    BatchTooLarge { requested: usize, max: usize },

    #[error("'{property}' is not a property of {object}")]
    UnknownProperty { object: String, property: String },

    #[error("invalid key for {object}: {message}")]
    InvalidKey { object: String, message: String },

    #[error("link '{link}' does not connect {from} to {to}")]
    LinkMismatch {
        link: String,
        from: String,
        to: String,
    },

    /// The blocking task running the backend call panicked or was cancelled.
    #[error("backend task failed: {0}")]
    TaskFailed(String),
}

impl ResolverError {
    pub(crate) fn query(object: &str, err: impl Display) -> Self {
        Self::Query {
            object: object.to_string(),
            message: redact_credentials(&err.to_string()),
        }
    }

    pub(crate) fn backend(backend: BackendKind, err: impl Display) -> Self {
        Self::Backend {
            backend,
            message: redact_credentials(&err.to_string()),
        }
    }

    /// True for [`ResolverError::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether a caller may reasonably retry. Client-caused errors are not
    /// retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Backend { .. } | Self::Query { .. } | Self::TaskFailed(_)
        )
    }
}
