//! The resolver base: validation, limits, caching, timeouts and metrics around
//! a [`ResolverBackend`].

use crate::cache::{CacheKey, CacheStore};
use crate::config::ResolverConfig;
use crate::error::{ResolverError, ResolverResult};
use crate::metrics::{MetricsSink, Operation, Outcome, QueryMetric};
use crate::query::{FilterQuery, JoinQuery, ObjectQuery, ResolverBackend};
use oms_schema::{BackendKind, LinkResolution, LinkTypeDefinition, ObjectTypeDefinition};
use oms_types::{Condition, FilterValue, Record, RowFilter, Timestamp};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

/// Executes reads against one backend.
///
/// Every public call appends exactly one [`QueryMetric`], whatever its
/// outcome, unless the calling future is dropped before the backend answers.
pub struct Resolver {
    backend: Arc<dyn ResolverBackend>,
    cache: Arc<CacheStore>,
    metrics: Arc<MetricsSink>,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(backend: Arc<dyn ResolverBackend>, config: ResolverConfig) -> Self {
        Self {
            backend,
            cache: Arc::new(CacheStore::new(config.cache_ttl)),
            metrics: Arc::new(MetricsSink::new()),
            config,
        }
    }

    /// Shares a cache with other resolvers.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<CacheStore>) -> Self {
        self.cache = cache;
        self
    }

    /// Shares a metrics sink with other resolvers.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn metrics(&self) -> &Arc<MetricsSink> {
        &self.metrics
    }

    /// Fetches one record by primary key. `Ok(None)` when it does not exist
    /// or the row filter hides it.
    pub async fn get_by_id(
        &self,
        object: &Arc<ObjectTypeDefinition>,
        id: &FilterValue,
        properties: Option<&[String]>,
        row_filter: &RowFilter,
    ) -> ResolverResult<Option<Record>> {
        let started = Instant::now();
        let query = match self.id_query(object, id, properties, row_filter) {
            Ok(query) => query,
            Err(e) => return Err(self.fail(Operation::GetById, &object.name, started, e)),
        };
        let rows = self
            .run(Operation::GetById, &object.name, started, row_filter, query, |b, q| {
                b.fetch(q)
            })
            .await?;
        Ok(rows.into_iter().next())
    }

    /// [`Self::get_by_id`] through the cache. Only found records are cached;
    /// errors and timeouts never are.
    pub async fn get_by_id_cached(
        &self,
        object: &Arc<ObjectTypeDefinition>,
        id: &FilterValue,
        properties: Option<&[String]>,
        row_filter: &RowFilter,
    ) -> ResolverResult<Option<Record>> {
        let started = Instant::now();
        let projection = match self.projection(object, properties) {
            Ok(p) => p,
            Err(e) => return Err(self.fail(Operation::GetById, &object.name, started, e)),
        };
        let key = CacheKey::new(&object.name, id, &projection, row_filter);
        if let Some(record) = self.cache.get(&key) {
            debug!(key = %key, "cache hit");
            self.record(Operation::GetById, &object.name, started, 1, true, Outcome::Success);
            return Ok(Some(record));
        }

        let found = self
            .get_by_id(object, id, Some(projection.as_slice()), row_filter)
            .await?;
        if let Some(record) = &found {
            self.cache.insert(key, record.clone());
        }
        Ok(found)
    }

    /// Conjunctive equality read. Never returns more than `max_rows` records.
    pub async fn get_by_filter(
        &self,
        object: &Arc<ObjectTypeDefinition>,
        request: &FilterQuery,
        row_filter: &RowFilter,
    ) -> ResolverResult<Vec<Record>> {
        let started = Instant::now();
        let query = match self.filter_query(object, request, row_filter) {
            Ok(query) => query,
            Err(e) => return Err(self.fail(Operation::GetByFilter, &object.name, started, e)),
        };
        self.run(Operation::GetByFilter, &object.name, started, row_filter, query, |b, q| {
            b.fetch(q)
        })
        .await
    }

    /// Batched primary-key lookup. Batches above `max_batch_size` are
    /// rejected outright.
    pub async fn get_by_ids(
        &self,
        object: &Arc<ObjectTypeDefinition>,
        ids: &[FilterValue],
        properties: Option<&[String]>,
        row_filter: &RowFilter,
    ) -> ResolverResult<Vec<Record>> {
        let started = Instant::now();
        if ids.len() > self.config.max_batch_size {
            let err = ResolverError::BatchTooLarge {
                requested: ids.len(),
                max: self.config.max_batch_size,
            };
            return Err(self.fail(Operation::GetByIds, &object.name, started, err));
        }
        if ids.is_empty() {
            self.record(Operation::GetByIds, &object.name, started, 0, false, Outcome::Success);
            return Ok(Vec::new());
        }
        let query = match self.ids_query(object, ids, properties, row_filter) {
            Ok(query) => query,
            Err(e) => return Err(self.fail(Operation::GetByIds, &object.name, started, e)),
        };
        self.run(Operation::GetByIds, &object.name, started, row_filter, query, |b, q| {
            b.fetch(q)
        })
        .await
    }

    /// Records of `to` linked from `from_id`. A foreign key becomes an
    /// equality filter on the target; a join table becomes a single join.
    pub async fn traverse_link(
        &self,
        from: &ObjectTypeDefinition,
        from_id: &FilterValue,
        link: &LinkTypeDefinition,
        to: &Arc<ObjectTypeDefinition>,
        properties: Option<&[String]>,
        row_filter: &RowFilter,
    ) -> ResolverResult<Vec<Record>> {
        let started = Instant::now();
        let op = Operation::TraverseLink;
        if link.from_type != from.name || link.to_type != to.name {
            let err = ResolverError::LinkMismatch {
                link: link.name.clone(),
                from: from.name.clone(),
                to: to.name.clone(),
            };
            return Err(self.fail(op, &to.name, started, err));
        }
        if let Err(e) = check_key(from, from_id) {
            return Err(self.fail(op, &to.name, started, e));
        }
        let request = FilterQuery {
            properties: properties.map(<[String]>::to_vec),
            ..FilterQuery::default()
        };
        let mut target = match self.filter_query(to, &request, row_filter) {
            Ok(query) => query,
            Err(e) => return Err(self.fail(op, &to.name, started, e)),
        };

        match &link.resolution {
            LinkResolution::ForeignKey { to_field } => {
                target
                    .conditions
                    .insert(0, Condition::new(to_field.clone(), from_id.clone()));
                self.run(op, &to.name, started, row_filter, target, |b, q| b.fetch(q))
                    .await
            }
            LinkResolution::JoinTable {
                table_name,
                from_field,
                to_field,
            } => {
                let query = JoinQuery {
                    target,
                    table_name: table_name.clone(),
                    from_field: from_field.clone(),
                    to_field: to_field.clone(),
                    from_id: from_id.clone(),
                };
                self.run(op, &to.name, started, row_filter, query, |b, q| {
                    b.fetch_joined(q)
                })
                .await
            }
        }
    }

    // ── query construction ───────────────────────────────────────

    /// Primary key first, then the requested (or all declared) properties.
    fn projection(
        &self,
        object: &ObjectTypeDefinition,
        properties: Option<&[String]>,
    ) -> ResolverResult<Vec<String>> {
        let mut out = vec![object.primary_key.clone()];
        match properties {
            Some(requested) => {
                for name in requested {
                    check_property(object, name)?;
                    if !out.contains(name) {
                        out.push(name.clone());
                    }
                }
            }
            None => out.extend(
                object
                    .property_names()
                    .filter(|p| *p != object.primary_key)
                    .map(String::from),
            ),
        }
        Ok(out)
    }

    fn base_query(
        &self,
        object: &Arc<ObjectTypeDefinition>,
        properties: Option<&[String]>,
        row_filter: &RowFilter,
    ) -> ResolverResult<ObjectQuery> {
        let mut conditions = Vec::new();
        for condition in row_filter.conditions() {
            check_property(object, &condition.field)?;
            conditions.push(condition.clone());
        }
        Ok(ObjectQuery {
            object: Arc::clone(object),
            projection: self.projection(object, properties)?,
            conditions,
            sort: None,
            limit: self.config.max_rows,
            offset: 0,
        })
    }

    fn id_query(
        &self,
        object: &Arc<ObjectTypeDefinition>,
        id: &FilterValue,
        properties: Option<&[String]>,
        row_filter: &RowFilter,
    ) -> ResolverResult<ObjectQuery> {
        check_key(object, id)?;
        let mut query = self.base_query(object, properties, row_filter)?;
        query
            .conditions
            .insert(0, Condition::new(object.primary_key.clone(), id.clone()));
        query.limit = 1;
        Ok(query)
    }

    fn ids_query(
        &self,
        object: &Arc<ObjectTypeDefinition>,
        ids: &[FilterValue],
        properties: Option<&[String]>,
        row_filter: &RowFilter,
    ) -> ResolverResult<ObjectQuery> {
        for id in ids {
            check_key(object, id)?;
        }
        let mut query = self.base_query(object, properties, row_filter)?;
        query.conditions.insert(
            0,
            Condition::new(object.primary_key.clone(), FilterValue::List(ids.to_vec())),
        );
        query.limit = ids.len().min(self.config.max_rows);
        Ok(query)
    }

    fn filter_query(
        &self,
        object: &Arc<ObjectTypeDefinition>,
        request: &FilterQuery,
        row_filter: &RowFilter,
    ) -> ResolverResult<ObjectQuery> {
        let mut query = self.base_query(object, request.properties.as_deref(), row_filter)?;
        for (field, value) in &request.filters {
            check_property(object, field)?;
            query.conditions.push(Condition::new(field.clone(), value.clone()));
        }
        if let Some(sort) = &request.sort {
            check_property(object, &sort.field)?;
            query.sort = Some(sort.clone());
        }
        query.limit = request
            .limit
            .map_or(self.config.max_rows, |l| l.min(self.config.max_rows));
        query.offset = request.offset;
        Ok(query)
    }

    // ── execution ────────────────────────────────────────────────

    /// Runs `call` on the blocking pool under the configured timeout, then
    /// records the metric. A deny row filter short-circuits to no rows.
    async fn run<Q, F>(
        &self,
        operation: Operation,
        object_type: &str,
        started: Instant,
        row_filter: &RowFilter,
        query: Q,
        call: F,
    ) -> ResolverResult<Vec<Record>>
    where
        Q: Send + 'static,
        F: FnOnce(&dyn ResolverBackend, &Q) -> ResolverResult<Vec<Record>> + Send + 'static,
    {
        if row_filter.is_deny() {
            let outcome = if operation == Operation::GetById {
                Outcome::NotFound
            } else {
                Outcome::Success
            };
            self.record(operation, object_type, started, 0, false, outcome);
            return Ok(Vec::new());
        }

        let backend = Arc::clone(&self.backend);
        let task = tokio::task::spawn_blocking(move || call(backend.as_ref(), &query));
        let result = match tokio::time::timeout(self.config.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                warn!("backend task failed for {object_type}: {join_err}");
                Err(ResolverError::TaskFailed(join_err.to_string()))
            }
            Err(_) => Err(ResolverError::Timeout {
                backend: self.kind(),
                operation,
                timeout: self.config.timeout,
            }),
        };

        match result {
            Ok(mut rows) => {
                if rows.len() > self.config.max_rows {
                    debug!(
                        object_type,
                        returned = rows.len(),
                        max_rows = self.config.max_rows,
                        "truncating result"
                    );
                    rows.truncate(self.config.max_rows);
                }
                let outcome = if rows.is_empty() && operation == Operation::GetById {
                    Outcome::NotFound
                } else {
                    Outcome::Success
                };
                self.record(operation, object_type, started, rows.len(), false, outcome);
                Ok(rows)
            }
            Err(e) => Err(self.fail(operation, object_type, started, e)),
        }
    }

    /// Records a failed call and hands the error back.
    fn fail(
        &self,
        operation: Operation,
        object_type: &str,
        started: Instant,
        err: ResolverError,
    ) -> ResolverError {
        let outcome = if err.is_timeout() {
            Outcome::Timeout
        } else {
            Outcome::Error
        };
        warn!(
            backend = %self.kind(),
            operation = %operation,
            object_type,
            error = %err,
            "resolver call failed"
        );
        self.record(operation, object_type, started, 0, false, outcome);
        err
    }

    fn record(
        &self,
        operation: Operation,
        object_type: &str,
        started: Instant,
        row_count: usize,
        cache_hit: bool,
        outcome: Outcome,
    ) {
        let elapsed = started.elapsed();
        self.metrics.record(QueryMetric {
            id: Uuid::now_v7(),
            backend: self.kind(),
            operation,
            object_type: object_type.to_string(),
            query_time_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            row_count,
            cache_hit,
            outcome,
            timestamp: Timestamp::now(),
        });
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("backend", &self.kind())
            .field("config", &self.config)
            .finish()
    }
}

fn check_property(object: &ObjectTypeDefinition, name: &str) -> ResolverResult<()> {
    if object.has_property(name) {
        Ok(())
    } else {
        Err(ResolverError::UnknownProperty {
            object: object.name.clone(),
            property: name.to_string(),
        })
    }
}

/// Keys must be scalar, non-null values.
fn check_key(object: &ObjectTypeDefinition, id: &FilterValue) -> ResolverResult<()> {
    match id {
        FilterValue::Null | FilterValue::List(_) => Err(ResolverError::InvalidKey {
            object: object.name.clone(),
            message: format!("{id} is not a scalar key"),
        }),
        _ => Ok(()),
    }
}
