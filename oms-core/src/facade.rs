//! The ontology facade: the only surface the transport layer talks to.
//!
//! Every read composes the same steps in the same order: schema lookup
//! against one active snapshot, a policy decision, a resolver call carrying
//! the decision's row filter, then column filtering of the results.

use crate::access::{Access, Denial};
use crate::audit::{AuditEvent, AuditSink, TracingAuditSink};
use crate::config::OmsConfig;
use crate::error::{FacadeError, FacadeResult};
use oms_policy::{PolicyDecision, PolicyEngine, RequestedAction};
use oms_resolver::{
    CacheStore, FilterQuery, MetricsSink, RelationalResolver, Resolver, TabularResolver,
};
use oms_schema::{
    ActionTypeDefinition, BackendKind, LinkTypeDefinition, ObjectTypeDefinition, SchemaRegistry,
    SchemaSnapshot, SchemaVersion,
};
use oms_types::{FilterValue, Record, Subject};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolvers, policy engine and audit sink around one schema registry.
pub struct OntologyFacade {
    registry: Arc<SchemaRegistry>,
    engine: PolicyEngine,
    by_backend: HashMap<BackendKind, Arc<Resolver>>,
    by_object: HashMap<String, Arc<Resolver>>,
    audit: Option<Arc<dyn AuditSink>>,
}

/// Wires resolvers into an [`OntologyFacade`].
///
/// Object types are routed to the resolver registered for their name, or
/// failing that to the one registered for their backend kind.
pub struct OntologyFacadeBuilder {
    registry: Arc<SchemaRegistry>,
    by_backend: HashMap<BackendKind, Arc<Resolver>>,
    by_object: HashMap<String, Arc<Resolver>>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl OntologyFacadeBuilder {
    /// Serves every object type on `resolver.kind()`.
    #[must_use]
    pub fn resolver(mut self, resolver: Arc<Resolver>) -> Self {
        self.by_backend.insert(resolver.kind(), resolver);
        self
    }

    /// Serves one object type, overriding the backend default.
    #[must_use]
    pub fn object_resolver(mut self, object_type: impl Into<String>, resolver: Arc<Resolver>) -> Self {
        self.by_object.insert(object_type.into(), resolver);
        self
    }

    #[must_use]
    pub fn audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    pub fn build(self) -> OntologyFacade {
        OntologyFacade {
            registry: self.registry,
            engine: PolicyEngine::new(),
            by_backend: self.by_backend,
            by_object: self.by_object,
            audit: self.audit,
        }
    }
}

/// Records of one source object and what its link leads to.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedRecords {
    pub source: Record,
    pub linked: Vec<Record>,
}

/// A traversal that failed for one source record.
#[derive(Debug)]
pub struct ExpansionError {
    pub source_id: serde_json::Value,
    pub error: FacadeError,
}

/// Result of [`OntologyFacade::expand_links`].
///
/// Every source record appears in `entries`. A source whose traversal failed
/// has no linked records and a matching entry in `errors`.
#[derive(Debug, Default)]
pub struct LinkExpansion {
    pub entries: Vec<LinkedRecords>,
    pub errors: Vec<ExpansionError>,
}

impl LinkExpansion {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Everything needed to traverse one link for a subject.
struct LinkPlan {
    from: Arc<ObjectTypeDefinition>,
    link: Arc<LinkTypeDefinition>,
    to: Arc<ObjectTypeDefinition>,
    decision: PolicyDecision,
    properties: Vec<String>,
    resolver: Arc<Resolver>,
}

impl OntologyFacade {
    pub fn builder(registry: Arc<SchemaRegistry>) -> OntologyFacadeBuilder {
        OntologyFacadeBuilder {
            registry,
            by_backend: HashMap::new(),
            by_object: HashMap::new(),
            audit: None,
        }
    }

    /// Opens the backends named in `config`. Both resolvers share one cache
    /// and one metrics sink.
    pub fn from_config(registry: Arc<SchemaRegistry>, config: &OmsConfig) -> FacadeResult<Self> {
        let resolver_config = config.resolver_config();
        let cache = Arc::new(CacheStore::new(resolver_config.cache_ttl));
        let metrics = Arc::new(MetricsSink::new());
        let wrap = |resolver: Resolver| {
            Arc::new(
                resolver
                    .with_cache(Arc::clone(&cache))
                    .with_metrics(Arc::clone(&metrics)),
            )
        };

        let mut builder = Self::builder(registry);
        if let Some(root) = &config.tabular.data_root {
            let backend = TabularResolver::new(root)?;
            builder = builder.resolver(wrap(Resolver::new(
                Arc::new(backend),
                resolver_config.clone(),
            )));
        }
        if let Some(path) = &config.relational.database_path {
            let backend = RelationalResolver::open(path)?;
            builder = builder.resolver(wrap(Resolver::new(
                Arc::new(backend),
                resolver_config.clone(),
            )));
        }
        if config.audit.enabled {
            builder = builder.audit_sink(Arc::new(TracingAuditSink));
        }
        Ok(builder.build())
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub fn get_active_schema_version(&self) -> Option<SchemaVersion> {
        self.registry
            .get_active_version()
            .map(|snapshot| snapshot.version().clone())
    }

    pub fn get_object_type(&self, name: &str) -> Option<Arc<ObjectTypeDefinition>> {
        self.registry.get_object_type(name)
    }

    pub fn get_link_type(&self, name: &str) -> Option<Arc<LinkTypeDefinition>> {
        self.registry.get_link_type(name)
    }

    pub fn get_action_type(&self, name: &str) -> Option<Arc<ActionTypeDefinition>> {
        self.registry.get_action_type(name)
    }

    /// One object by its raw id, as the subject may see it.
    pub async fn get_object(
        &self,
        object_type: &str,
        id: &str,
        subject: &Subject,
    ) -> FacadeResult<Access<Record>> {
        let snapshot = self.registry.active()?;
        let object = lookup_object(&snapshot, object_type)?;
        let key = parse_key(&object, id)?;

        let decision = self
            .decide(&snapshot, subject, object_type, RequestedAction::Read)
            .await?;
        if !decision.allowed {
            return Ok(Access::Denied(Denial::new(&decision, subject)));
        }

        let resolver = self.resolver_for(&object)?;
        let properties = decision.visible_properties(&object, None);
        debug!(object_type, id, backend = %resolver.kind(), "get_object");
        let found = resolver
            .get_by_id_cached(&object, &key, Some(properties.as_slice()), &decision.row_filter)
            .await?;

        Ok(match found {
            Some(mut record) => {
                decision.filter_record(&mut record, &object.primary_key);
                Access::Granted(record)
            }
            None => Access::NotFound,
        })
    }

    /// Objects matching `query`, as the subject may see them.
    pub async fn query_objects(
        &self,
        object_type: &str,
        query: &FilterQuery,
        subject: &Subject,
    ) -> FacadeResult<Access<Vec<Record>>> {
        let snapshot = self.registry.active()?;
        self.query_in(&snapshot, object_type, query, subject).await
    }

    /// Records linked from one object over `link_name`.
    ///
    /// The target type's policy decides rows and columns. A policy on the
    /// link itself, when present, must also allow the read.
    pub async fn traverse_link(
        &self,
        object_type: &str,
        id: &str,
        link_name: &str,
        subject: &Subject,
    ) -> FacadeResult<Access<Vec<Record>>> {
        let snapshot = self.registry.active()?;
        let from = lookup_object(&snapshot, object_type)?;
        let key = parse_key(&from, id)?;
        let plan = match self.plan_link(&snapshot, from, link_name, subject).await? {
            Access::Granted(plan) => plan,
            Access::Denied(denial) => return Ok(Access::Denied(denial)),
            Access::NotFound => return Ok(Access::NotFound),
        };
        Ok(Access::Granted(self.traverse(&plan, &key).await?))
    }

    /// Runs [`Self::query_objects`], then follows `link_name` from each
    /// result. Traversal failures are collected per source record instead
    /// of failing the whole expansion.
    pub async fn expand_links(
        &self,
        object_type: &str,
        query: &FilterQuery,
        link_name: &str,
        subject: &Subject,
    ) -> FacadeResult<Access<LinkExpansion>> {
        let snapshot = self.registry.active()?;
        let from = lookup_object(&snapshot, object_type)?;
        let sources = match self.query_in(&snapshot, object_type, query, subject).await? {
            Access::Granted(records) => records,
            Access::Denied(denial) => return Ok(Access::Denied(denial)),
            Access::NotFound => return Ok(Access::NotFound),
        };
        let plan = match self.plan_link(&snapshot, Arc::clone(&from), link_name, subject).await? {
            Access::Granted(plan) => plan,
            Access::Denied(denial) => return Ok(Access::Denied(denial)),
            Access::NotFound => return Ok(Access::NotFound),
        };

        let mut expansion = LinkExpansion::default();
        for source in sources {
            let source_id = source
                .get(&from.primary_key)
                .cloned()
                .unwrap_or(serde_json::Value::Null);
            let outcome = match FilterValue::from_json(&source_id) {
                Ok(key) => self.traverse(&plan, &key).await,
                Err(e) => Err(FacadeError::InvalidKey {
                    object: from.name.clone(),
                    message: e.to_string(),
                }),
            };
            match outcome {
                Ok(linked) => expansion.entries.push(LinkedRecords { source, linked }),
                Err(error) => {
                    warn!(
                        object_type,
                        link = link_name,
                        source = %source_id,
                        error = %error,
                        "link expansion failed for source"
                    );
                    expansion.entries.push(LinkedRecords {
                        source,
                        linked: Vec::new(),
                    });
                    expansion.errors.push(ExpansionError { source_id, error });
                }
            }
        }
        Ok(Access::Granted(expansion))
    }

    /// Whether the subject may execute an action. The action's own policy
    /// reference names the governing scope; without one the action name does.
    pub async fn authorize_action(
        &self,
        action_name: &str,
        subject: &Subject,
    ) -> FacadeResult<Access<Arc<ActionTypeDefinition>>> {
        let snapshot = self.registry.active()?;
        let action = snapshot
            .action_type(action_name)
            .cloned()
            .ok_or_else(|| FacadeError::UnknownAction(action_name.to_string()))?;
        let scope_key = action.policy.as_deref().unwrap_or(&action.name);
        let decision = self
            .decide(&snapshot, subject, scope_key, RequestedAction::Execute)
            .await?;
        if decision.allowed {
            Ok(Access::Granted(action))
        } else {
            Ok(Access::Denied(Denial::new(&decision, subject)))
        }
    }

    // ── internals ────────────────────────────────────────────────

    async fn query_in(
        &self,
        snapshot: &SchemaSnapshot,
        object_type: &str,
        query: &FilterQuery,
        subject: &Subject,
    ) -> FacadeResult<Access<Vec<Record>>> {
        let object = lookup_object(snapshot, object_type)?;
        let decision = self
            .decide(snapshot, subject, object_type, RequestedAction::Read)
            .await?;
        if !decision.allowed {
            return Ok(Access::Denied(Denial::new(&decision, subject)));
        }

        if let Some(field) = hidden_query_field(query, &decision, &object.primary_key) {
            debug!(object_type, field, "query references a hidden field");
            return Ok(Access::Denied(Denial::hidden_field(&decision, subject, field)));
        }

        let resolver = self.resolver_for(&object)?;
        let mut request = query.clone();
        request.properties = Some(decision.visible_properties(&object, query.properties.as_deref()));
        debug!(object_type, filters = request.filters.len(), backend = %resolver.kind(), "query_objects");
        let records = resolver
            .get_by_filter(&object, &request, &decision.row_filter)
            .await?;
        Ok(Access::Granted(self.engine.apply_column_filters(
            records,
            &decision,
            &object.primary_key,
        )))
    }

    async fn plan_link(
        &self,
        snapshot: &SchemaSnapshot,
        from: Arc<ObjectTypeDefinition>,
        link_name: &str,
        subject: &Subject,
    ) -> FacadeResult<Access<LinkPlan>> {
        let link = snapshot
            .link_type(link_name)
            .filter(|l| l.from_type == from.name)
            .cloned()
            .ok_or_else(|| FacadeError::UnknownLink {
                object: from.name.clone(),
                link: link_name.to_string(),
            })?;
        let to = lookup_object(snapshot, &link.to_type)?;

        let link_decision = if snapshot.security_policy(link_name).is_some() {
            let link_decision = self
                .decide(snapshot, subject, link_name, RequestedAction::Read)
                .await?;
            if !link_decision.allowed {
                return Ok(Access::Denied(Denial::new(&link_decision, subject)));
            }
            Some(link_decision)
        } else {
            None
        };
        let mut decision = self
            .decide(snapshot, subject, &to.name, RequestedAction::Read)
            .await?;
        if !decision.allowed {
            return Ok(Access::Denied(Denial::new(&decision, subject)));
        }
        // Columns hidden by the link policy stay hidden on the target.
        if let Some(link_decision) = &link_decision {
            decision.restrict_columns(link_decision);
        }

        let resolver = Arc::clone(self.resolver_for(&to)?);
        let properties = decision.visible_properties(&to, None);
        Ok(Access::Granted(LinkPlan {
            from,
            link,
            to,
            decision,
            properties,
            resolver,
        }))
    }

    async fn traverse(&self, plan: &LinkPlan, key: &FilterValue) -> FacadeResult<Vec<Record>> {
        debug!(link = %plan.link.name, key = %key, backend = %plan.resolver.kind(), "traverse_link");
        let records = plan
            .resolver
            .traverse_link(
                &plan.from,
                key,
                &plan.link,
                &plan.to,
                Some(plan.properties.as_slice()),
                &plan.decision.row_filter,
            )
            .await?;
        Ok(self
            .engine
            .apply_column_filters(records, &plan.decision, &plan.to.primary_key))
    }

    /// Evaluates and audits one decision.
    async fn decide(
        &self,
        snapshot: &SchemaSnapshot,
        subject: &Subject,
        scope_key: &str,
        action: RequestedAction,
    ) -> FacadeResult<PolicyDecision> {
        let decision = self
            .engine
            .evaluate_access(snapshot, subject, scope_key, action)?;
        if let Some(sink) = &self.audit {
            sink.record(AuditEvent::new(subject, &decision, &snapshot.version().id))
                .await;
        }
        Ok(decision)
    }

    fn resolver_for(&self, object: &ObjectTypeDefinition) -> FacadeResult<&Arc<Resolver>> {
        self.by_object
            .get(&object.name)
            .or_else(|| self.by_backend.get(&object.backend))
            .ok_or_else(|| FacadeError::NoResolver {
                object: object.name.clone(),
                backend: object.backend,
            })
    }
}

impl std::fmt::Debug for OntologyFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OntologyFacade")
            .field("backends", &self.by_backend.keys().collect::<Vec<_>>())
            .field("object_overrides", &self.by_object.keys().collect::<Vec<_>>())
            .field("audit", &self.audit.is_some())
            .finish()
    }
}

fn lookup_object(
    snapshot: &SchemaSnapshot,
    name: &str,
) -> FacadeResult<Arc<ObjectTypeDefinition>> {
    snapshot
        .object_type(name)
        .cloned()
        .ok_or_else(|| FacadeError::UnknownObjectType(name.to_string()))
}

/// First filter or sort field the decision hides. Filtering or ordering on
/// a hidden field would reveal its values through the result set. The
/// primary key is never hidden.
fn hidden_query_field<'q>(
    query: &'q FilterQuery,
    decision: &PolicyDecision,
    primary_key: &str,
) -> Option<&'q str> {
    query
        .filters
        .keys()
        .map(String::as_str)
        .chain(query.sort.as_ref().map(|s| s.field.as_str()))
        .find(|field| *field != primary_key && !decision.column_filter.permits(field))
}

fn parse_key(object: &ObjectTypeDefinition, raw: &str) -> FacadeResult<FilterValue> {
    object.parse_id(raw).map_err(|message| FacadeError::InvalidKey {
        object: object.name.clone(),
        message,
    })
}
