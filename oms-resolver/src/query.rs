//! Backend-facing query descriptions and the backend trait.

use crate::error::ResolverResult;
use oms_schema::{BackendKind, ObjectTypeDefinition};
use oms_types::{Condition, FilterValue, Record, SortKey};
use std::sync::Arc;

/// A read of one object type. Row filter conditions are already merged into
/// `conditions`; `projection` always starts with the primary key.
#[derive(Debug, Clone)]
pub struct ObjectQuery {
    pub object: Arc<ObjectTypeDefinition>,
    pub projection: Vec<String>,
    pub conditions: Vec<Condition>,
    pub sort: Option<SortKey>,
    pub limit: usize,
    pub offset: usize,
}

/// Target records reached through a join table, keyed by the source id.
/// Join table rows are never returned.
#[derive(Debug, Clone)]
pub struct JoinQuery {
    pub target: ObjectQuery,
    pub table_name: String,
    pub from_field: String,
    pub to_field: String,
    pub from_id: FilterValue,
}

/// Filtered read options for [`crate::Resolver::get_by_filter`].
#[derive(Debug, Clone, Default)]
pub struct FilterQuery {
    pub filters: oms_types::Filters,
    pub properties: Option<Vec<String>>,
    pub sort: Option<SortKey>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl FilterQuery {
    pub fn new(filters: oms_types::Filters) -> Self {
        Self {
            filters,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn properties(mut self, properties: Vec<String>) -> Self {
        self.properties = Some(properties);
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: SortKey) -> Self {
        self.sort = Some(sort);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// A storage backend. Calls block; the [`crate::Resolver`] runs them on the
/// blocking pool under a timeout. Implementations only read.
pub trait ResolverBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn fetch(&self, query: &ObjectQuery) -> ResolverResult<Vec<Record>>;

    fn fetch_joined(&self, query: &JoinQuery) -> ResolverResult<Vec<Record>>;
}
