use crate::action::ActionTypeDefinition;
use crate::link::LinkTypeDefinition;
use crate::object::ObjectTypeDefinition;
use crate::policy::SecurityPolicy;
use oms_types::{Role, Timestamp, VersionId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    Draft,
    Published,
    Archived,
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        })
    }
}

/// Lifecycle metadata of one loaded schema version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaVersion {
    pub id: VersionId,
    pub namespace: String,
    pub status: VersionStatus,
    pub created_at: Timestamp,
    pub published_at: Option<Timestamp>,
    pub archived_at: Option<Timestamp>,
}

/// Name-indexed definitions of one version. Built once by validation and
/// never mutated.
#[derive(Debug, Default)]
pub(crate) struct Definitions {
    pub(crate) roles: BTreeSet<Role>,
    pub(crate) objects: HashMap<String, Arc<ObjectTypeDefinition>>,
    pub(crate) links: HashMap<String, Arc<LinkTypeDefinition>>,
    pub(crate) actions: HashMap<String, Arc<ActionTypeDefinition>>,
    pub(crate) policies: HashMap<String, Arc<SecurityPolicy>>,
}

/// An immutable view of one schema version.
///
/// Obtained from [`crate::SchemaRegistry::get_active_version`]. A holder keeps
/// seeing the same definitions even if another version is published meanwhile.
#[derive(Debug, Clone)]
pub struct SchemaSnapshot {
    version: SchemaVersion,
    defs: Arc<Definitions>,
}

impl SchemaSnapshot {
    pub(crate) fn new(version: SchemaVersion, defs: Arc<Definitions>) -> Self {
        Self { version, defs }
    }

    /// Version metadata as of the moment this snapshot was taken.
    pub fn version(&self) -> &SchemaVersion {
        &self.version
    }

    pub fn object_type(&self, name: &str) -> Option<&Arc<ObjectTypeDefinition>> {
        self.defs.objects.get(name)
    }

    pub fn link_type(&self, name: &str) -> Option<&Arc<LinkTypeDefinition>> {
        self.defs.links.get(name)
    }

    pub fn action_type(&self, name: &str) -> Option<&Arc<ActionTypeDefinition>> {
        self.defs.actions.get(name)
    }

    pub fn security_policy(&self, scope_key: &str) -> Option<&Arc<SecurityPolicy>> {
        self.defs.policies.get(scope_key)
    }

    pub fn is_known_role(&self, role: &Role) -> bool {
        self.defs.roles.contains(role)
    }

    /// Links leaving the given object type, sorted by name.
    pub fn links_from(&self, object_type: &str) -> Vec<&Arc<LinkTypeDefinition>> {
        let mut links: Vec<_> = self
            .defs
            .links
            .values()
            .filter(|l| l.from_type == object_type)
            .collect();
        links.sort_by(|a, b| a.name.cmp(&b.name));
        links
    }
}
