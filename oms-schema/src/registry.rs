//! Version lifecycle and active-snapshot publication.

use crate::action::ActionTypeDefinition;
use crate::document::SchemaDocument;
use crate::error::{RegistryError, RegistryResult, SchemaValidationError, SchemaViolation};
use crate::link::LinkTypeDefinition;
use crate::object::ObjectTypeDefinition;
use crate::policy::SecurityPolicy;
use crate::snapshot::{Definitions, SchemaSnapshot, SchemaVersion, VersionStatus};
use crate::validate::validate_document;
use oms_types::{Timestamp, VersionId};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info, warn};

struct VersionEntry {
    meta: SchemaVersion,
    defs: Arc<Definitions>,
}

/// Holds every loaded schema version and the currently published snapshot.
///
/// Readers take a cheap clone of the active `Arc<SchemaSnapshot>` under a lock
/// of its own. Loads and publishes update the version table under a separate
/// lock; a publish swaps the active snapshot as its last step.
#[derive(Default)]
pub struct SchemaRegistry {
    versions: RwLock<BTreeMap<VersionId, VersionEntry>>,
    active: RwLock<Option<Arc<SchemaSnapshot>>>,
    publish_lock: Mutex<()>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a document without loading it.
    pub fn validate(&self, doc: &SchemaDocument) -> Result<(), SchemaValidationError> {
        let mut violations = match validate_document(doc) {
            Ok(_) => Vec::new(),
            Err(e) => e.violations,
        };
        if self.contains_version(&doc.version) {
            violations.push(SchemaViolation::DuplicateVersion {
                version: doc.version.clone(),
            });
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaValidationError {
                version: doc.version.clone(),
                violations,
            })
        }
    }

    /// Validates a document and stores it as a draft version.
    ///
    /// Every violation is reported at once; nothing is stored on failure.
    pub fn load(&self, doc: SchemaDocument) -> Result<SchemaVersion, SchemaValidationError> {
        let defs = match validate_document(&doc) {
            Ok(defs) => defs,
            Err(mut e) => {
                if self.contains_version(&doc.version) {
                    e.violations.push(SchemaViolation::DuplicateVersion {
                        version: doc.version.clone(),
                    });
                }
                warn!(
                    version = %doc.version,
                    violations = e.violations.len(),
                    "schema document rejected"
                );
                return Err(e);
            }
        };

        let id = VersionId::new(doc.version.clone());
        let mut versions = self.versions.write().unwrap_or_else(PoisonError::into_inner);
        if versions.contains_key(&id) {
            return Err(SchemaValidationError {
                version: doc.version,
                violations: vec![SchemaViolation::DuplicateVersion {
                    version: id.to_string(),
                }],
            });
        }

        let meta = SchemaVersion {
            id: id.clone(),
            namespace: doc.namespace,
            status: VersionStatus::Draft,
            created_at: Timestamp::now(),
            published_at: None,
            archived_at: None,
        };
        debug!(
            version = %id,
            objects = defs.objects.len(),
            links = defs.links.len(),
            policies = defs.policies.len(),
            "schema version loaded"
        );
        versions.insert(
            id,
            VersionEntry {
                meta: meta.clone(),
                defs: Arc::new(defs),
            },
        );
        Ok(meta)
    }

    /// Makes a version the active one and archives the previous active version.
    ///
    /// Publishing the already active version is a no-op. Archived versions
    /// cannot be republished.
    pub fn publish(&self, id: &VersionId) -> RegistryResult<SchemaVersion> {
        let _guard = self.publish_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = self.get_active_version().map(|s| s.version().id.clone());
        let mut versions = self.versions.write().unwrap_or_else(PoisonError::into_inner);

        let entry = versions
            .get(id)
            .ok_or_else(|| RegistryError::VersionNotFound(id.clone()))?;
        match entry.meta.status {
            VersionStatus::Published => return Ok(entry.meta.clone()),
            VersionStatus::Archived => return Err(RegistryError::VersionArchived(id.clone())),
            VersionStatus::Draft => {}
        }

        let now = Timestamp::now();
        if let Some(prev) = previous.as_ref().and_then(|p| versions.get_mut(p)) {
            prev.meta.status = VersionStatus::Archived;
            prev.meta.archived_at = Some(now);
        }

        let entry = versions
            .get_mut(id)
            .ok_or_else(|| RegistryError::VersionNotFound(id.clone()))?;
        entry.meta.status = VersionStatus::Published;
        entry.meta.published_at = Some(now);
        let meta = entry.meta.clone();
        let snapshot = Arc::new(SchemaSnapshot::new(meta.clone(), Arc::clone(&entry.defs)));
        drop(versions);

        *self.active.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);

        info!(
            version = %id,
            previous = ?previous,
            "schema version published"
        );
        Ok(meta)
    }

    /// The active snapshot, or `None` before the first publish.
    pub fn get_active_version(&self) -> Option<Arc<SchemaSnapshot>> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Like [`Self::get_active_version`] but an error when nothing is published.
    pub fn active(&self) -> RegistryResult<Arc<SchemaSnapshot>> {
        self.get_active_version().ok_or(RegistryError::NoActiveVersion)
    }

    pub fn get_object_type(&self, name: &str) -> Option<Arc<ObjectTypeDefinition>> {
        self.get_active_version()?.object_type(name).cloned()
    }

    pub fn get_link_type(&self, name: &str) -> Option<Arc<LinkTypeDefinition>> {
        self.get_active_version()?.link_type(name).cloned()
    }

    pub fn get_action_type(&self, name: &str) -> Option<Arc<ActionTypeDefinition>> {
        self.get_active_version()?.action_type(name).cloned()
    }

    pub fn get_security_policy(&self, scope_key: &str) -> Option<Arc<SecurityPolicy>> {
        self.get_active_version()?.security_policy(scope_key).cloned()
    }

    /// Metadata of any loaded version, regardless of status.
    pub fn get_version(&self, id: &VersionId) -> Option<SchemaVersion> {
        self.versions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(|e| e.meta.clone())
    }

    /// A snapshot of any loaded version, e.g. to inspect a draft before
    /// publishing it.
    pub fn snapshot_of(&self, id: &VersionId) -> RegistryResult<SchemaSnapshot> {
        let versions = self.versions.read().unwrap_or_else(PoisonError::into_inner);
        let entry = versions
            .get(id)
            .ok_or_else(|| RegistryError::VersionNotFound(id.clone()))?;
        Ok(SchemaSnapshot::new(entry.meta.clone(), Arc::clone(&entry.defs)))
    }

    /// All loaded versions ordered by id.
    pub fn list_versions(&self) -> Vec<SchemaVersion> {
        self.versions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|e| e.meta.clone())
            .collect()
    }

    fn contains_version(&self, version: &str) -> bool {
        self.versions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&VersionId::new(version))
    }
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let versions = self.versions.read().unwrap_or_else(PoisonError::into_inner).len();
        f.debug_struct("SchemaRegistry")
            .field("versions", &versions)
            .field("active", &self.get_active_version().map(|s| s.version().id.clone()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(version: &str) -> SchemaDocument {
        SchemaDocument {
            namespace: "test".into(),
            version: version.into(),
            ..Default::default()
        }
    }

    #[test]
    fn publish_unknown_version() {
        let registry = SchemaRegistry::new();
        let err = registry.publish(&VersionId::new("9.9")).unwrap_err();
        assert!(matches!(err, RegistryError::VersionNotFound(_)));
    }

    #[test]
    fn publish_is_idempotent() {
        let registry = SchemaRegistry::new();
        let v = registry.load(doc("1")).unwrap();
        let first = registry.publish(&v.id).unwrap();
        let second = registry.publish(&v.id).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn archived_version_cannot_be_republished() {
        let registry = SchemaRegistry::new();
        let v1 = registry.load(doc("1")).unwrap();
        let v2 = registry.load(doc("2")).unwrap();
        registry.publish(&v1.id).unwrap();
        registry.publish(&v2.id).unwrap();
        assert_eq!(
            registry.get_version(&v1.id).unwrap().status,
            VersionStatus::Archived
        );
        assert!(matches!(
            registry.publish(&v1.id),
            Err(RegistryError::VersionArchived(_))
        ));
    }

    #[test]
    fn no_active_version_before_publish() {
        let registry = SchemaRegistry::new();
        registry.load(doc("1")).unwrap();
        assert!(registry.get_active_version().is_none());
        assert!(matches!(registry.active(), Err(RegistryError::NoActiveVersion)));
    }

    #[test]
    fn active_snapshot_is_readable_while_versions_are_locked() {
        let registry = Arc::new(SchemaRegistry::new());
        let v1 = registry.load(doc("1")).unwrap();
        registry.publish(&v1.id).unwrap();

        let held = registry.versions.write().unwrap();
        let (tx, rx) = std::sync::mpsc::channel();
        let reader = Arc::clone(&registry);
        std::thread::spawn(move || {
            let active = reader.get_active_version().map(|s| s.version().id.clone());
            tx.send(active).unwrap();
        });
        let active = rx.recv_timeout(std::time::Duration::from_secs(5));
        drop(held);
        assert_eq!(active.unwrap(), Some(VersionId::new("1")));
    }

    #[test]
    fn publish_swaps_active_after_archiving_previous() {
        let registry = SchemaRegistry::new();
        let v1 = registry.load(doc("1")).unwrap();
        let v2 = registry.load(doc("2")).unwrap();
        registry.publish(&v1.id).unwrap();
        let before = registry.active().unwrap();
        registry.publish(&v2.id).unwrap();

        // Readers holding the old snapshot keep it.
        assert_eq!(before.version().id, v1.id);
        assert_eq!(registry.active().unwrap().version().id, v2.id);
        let statuses: Vec<_> = registry.list_versions().into_iter().map(|v| v.status).collect();
        assert_eq!(statuses, vec![VersionStatus::Archived, VersionStatus::Published]);
    }
}
