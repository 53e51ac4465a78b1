//! Data resolvers for the ontology metadata service.
//!
//! A [`Resolver`] reads records of one object type from one backend. It owns
//! everything backends share: property validation, the row cap, batching
//! limits, the result cache, per-call timeouts and metrics. Backends only
//! translate an [`ObjectQuery`] into their own query language.
//!
//! # Backends
//!
//! - [`TabularResolver`]: DuckDB over partitioned Parquet or CSV files
//! - [`RelationalResolver`]: SQLite tables
//!
//! Both build parameterized SQL; values never appear in query text.

mod cache;
mod config;
mod error;
mod metrics;
mod query;
mod pool;
mod redact;
mod relational;
mod resolver;
mod sql;
mod tabular;

pub use cache::{CacheKey, CacheStore};
pub use config::ResolverConfig;
pub use error::{ResolverError, ResolverResult};
pub use metrics::{BackendSummary, MetricsSink, Operation, Outcome, QueryMetric};
pub use query::{FilterQuery, JoinQuery, ObjectQuery, ResolverBackend};
pub use redact::redact_credentials;
pub use relational::RelationalResolver;
pub use resolver::Resolver;
pub use tabular::TabularResolver;
