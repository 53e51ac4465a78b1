//! Core type definitions for the ontology metadata service.
//!
//! This crate defines the vocabulary shared by the registry, the policy
//! engine, the resolvers and the facade:
//! - [`Record`]: one object instance as an ordered JSON map of properties
//! - [`FilterValue`] / [`Filters`]: typed filter values bound as query parameters
//! - [`RowFilter`]: the row predicate a policy decision attaches to a read
//! - [`Subject`] / [`Role`]: who is asking
//! - [`VersionId`], [`Timestamp`]
//!
//! Nothing here performs I/O.

mod filter;
mod ids;
mod subject;
mod timestamp;

pub use filter::{Condition, FilterValue, Filters, RowFilter, SortKey};
pub use ids::VersionId;
pub use subject::{Role, Subject};
pub use timestamp::Timestamp;

/// A single object instance: property name to JSON value.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unsupported filter value: {0}")]
    UnsupportedFilterValue(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
