//! Audit emission for access decisions.
//!
//! The facade emits one [`AuditEvent`] per policy decision it takes. Storage
//! is up to the embedding service; the default sink only logs.

use async_trait::async_trait;
use oms_policy::{PolicyDecision, RequestedAction};
use oms_schema::{AccessLevel, Specificity};
use oms_types::{Subject, Timestamp, VersionId};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// One access decision, as seen by an auditor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub role: Option<String>,
    pub identity: Option<String>,
    pub team: Option<String>,
    pub scope_key: String,
    pub action: RequestedAction,
    pub allowed: bool,
    pub access_level: AccessLevel,
    /// Specificity of the deciding rule; `None` when no rule applied.
    pub specificity: Option<Specificity>,
    pub schema_version: VersionId,
    pub timestamp: Timestamp,
}

impl AuditEvent {
    pub fn new(subject: &Subject, decision: &PolicyDecision, schema_version: &VersionId) -> Self {
        Self {
            id: Uuid::now_v7(),
            role: subject.role().map(ToString::to_string),
            identity: subject.identity().map(String::from),
            team: subject.team().map(String::from),
            scope_key: decision.scope_key.clone(),
            action: decision.action,
            allowed: decision.allowed,
            access_level: decision.access_level,
            specificity: decision.specificity(),
            schema_version: schema_version.clone(),
            timestamp: Timestamp::now(),
        }
    }
}

/// Receives audit events. Implementations must not fail the request; errors
/// are theirs to handle.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent);
}

/// Writes each event as a structured log line on target `oms::audit`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: AuditEvent) {
        info!(
            target: "oms::audit",
            id = %event.id,
            role = event.role.as_deref().unwrap_or("-"),
            identity = event.identity.as_deref().unwrap_or("-"),
            team = event.team.as_deref().unwrap_or("-"),
            scope_key = %event.scope_key,
            action = %event.action,
            allowed = event.allowed,
            level = %event.access_level,
            specificity = ?event.specificity,
            version = %event.schema_version,
            "access decision"
        );
    }
}
