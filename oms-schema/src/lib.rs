//! Versioned schema registry for the ontology metadata service.
//!
//! A schema document declares object types, link types, action types and
//! security policies. The registry turns a document into an immutable,
//! name-indexed [`SchemaSnapshot`] after validating it as a whole, and manages
//! the version lifecycle:
//!
//! ```text
//! load ──► draft ──publish──► published ──(next publish)──► archived
//! ```
//!
//! Exactly one version is published at a time. The active snapshot is
//! replaced wholesale on publish, so a reader holding an `Arc<SchemaSnapshot>`
//! keeps a consistent view for the rest of its request.
//!
//! # Example
//!
//! ```
//! use oms_schema::{SchemaDocument, SchemaRegistry};
//!
//! let doc = SchemaDocument::from_json_str(r#"{
//!     "namespace": "hockey",
//!     "version": "0.1",
//!     "objects": [{
//!         "name": "Player",
//!         "properties": [{"name": "playerId", "type": "integer"}],
//!         "primaryKeyProperty": "playerId",
//!         "resolverBackend": "relational",
//!         "backendLocator": "players"
//!     }]
//! }"#).unwrap();
//!
//! let registry = SchemaRegistry::new();
//! let version = registry.load(doc).unwrap();
//! registry.publish(&version.id).unwrap();
//! assert!(registry.get_object_type("Player").is_some());
//! ```

mod action;
mod document;
mod error;
mod link;
mod object;
mod policy;
mod registry;
mod snapshot;
mod validate;

pub use action::ActionTypeDefinition;
pub use document::{
    ActionDocument, LinkDocument, ObjectDocument, PolicyDocument, PropertyDocument,
    ResolutionDocument, RuleDocument, SchemaDocument,
};
pub use error::{
    DefinitionKind, DocumentError, RegistryError, RegistryResult, SchemaValidationError,
    SchemaViolation,
};
pub use link::{Cardinality, LinkResolution, LinkTypeDefinition};
pub use object::{BackendKind, ObjectTypeDefinition, PrimitiveType, PropertyDefinition};
pub use policy::{
    AccessLevel, ColumnRule, PolicyRule, RoleMatcher, ScopeBinding, ScopeKind, SecurityPolicy,
    Specificity, SubjectAttribute, DEFAULT_OWNER_FIELD, DEFAULT_ROLES, DEFAULT_TEAM_FIELD,
};
pub use registry::SchemaRegistry;
pub use snapshot::{SchemaSnapshot, SchemaVersion, VersionStatus};
