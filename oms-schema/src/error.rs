//! Error types for schema loading and version management.

use crate::link::Cardinality;
use oms_types::VersionId;
use std::fmt;
use thiserror::Error;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Which namespace a definition name lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
    Object,
    Link,
    Action,
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Object => "object",
            Self::Link => "link",
            Self::Action => "action",
        })
    }
}

/// A single problem found while validating a schema document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    #[error("{context}: {field} must not be empty")]
    MissingField { context: String, field: &'static str },

    #[error("duplicate name '{name}' (already declared as {existing})")]
    DuplicateName {
        kind: DefinitionKind,
        name: String,
        existing: DefinitionKind,
    },

    #[error("object '{object}' declares property '{property}' more than once")]
    DuplicateProperty { object: String, property: String },

    #[error("object '{object}': unknown primitive type '{type_name}' for property '{property}'")]
    UnknownPrimitiveType {
        object: String,
        property: String,
        type_name: String,
    },

    #[error("object '{object}': primary key '{property}' is not a declared property")]
    MissingPrimaryKey { object: String, property: String },

    #[error("object '{object}': unknown resolver backend '{backend}'")]
    UnknownBackend { object: String, backend: String },

    #[error("link '{link}': {endpoint} references unknown object type '{target}'")]
    DanglingLinkEndpoint {
        link: String,
        endpoint: &'static str,
        target: String,
    },

    #[error("link '{link}': unknown cardinality '{cardinality}'")]
    UnknownCardinality { link: String, cardinality: String },

    #[error("link '{link}': invalid resolution: {detail}")]
    InvalidResolution { link: String, detail: String },

    #[error("link '{link}': {cardinality} requires a {expected} resolution")]
    ResolutionMismatch {
        link: String,
        cardinality: Cardinality,
        expected: &'static str,
    },

    #[error("{owner}: '{property}' is not a property of object type '{object}'")]
    UnknownProperty {
        owner: String,
        object: String,
        property: String,
    },

    #[error("action '{action}' references unknown policy '{policy}'")]
    UnresolvedActionPolicy { action: String, policy: String },

    #[error("policy scope '{scope_key}' does not name an object, link or action")]
    UnresolvedScopeKey { scope_key: String },

    #[error("more than one policy governs '{scope_key}'")]
    DuplicatePolicy { scope_key: String },

    #[error("policy '{scope_key}' rule {rule}: unknown role '{role}'")]
    UnknownRole {
        scope_key: String,
        rule: usize,
        role: String,
    },

    #[error("policy '{scope_key}' rule {rule}: unknown access level '{level}'")]
    UnknownAccessLevel {
        scope_key: String,
        rule: usize,
        level: String,
    },

    #[error("policy '{scope_key}' rule {rule}: columnAllow and columnDeny are mutually exclusive")]
    ConflictingColumnFilter { scope_key: String, rule: usize },

    #[error("policy '{scope_key}' rule {rule}: access level '{level}' requires {flag}")]
    ScopeLevelMismatch {
        scope_key: String,
        rule: usize,
        level: String,
        flag: &'static str,
    },

    #[error("version '{version}' is already loaded")]
    DuplicateVersion { version: String },
}

/// Aggregated validation failure. Carries every violation found, not just
/// the first.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("schema version '{version}' failed validation: {}", summarize(.violations))]
pub struct SchemaValidationError {
    pub version: String,
    pub violations: Vec<SchemaViolation>,
}

impl SchemaValidationError {
    /// Returns true if any violation satisfies the predicate.
    pub fn contains(&self, predicate: impl Fn(&SchemaViolation) -> bool) -> bool {
        self.violations.iter().any(predicate)
    }
}

fn summarize(violations: &[SchemaViolation]) -> String {
    let parts: Vec<String> = violations.iter().map(ToString::to_string).collect();
    format!("{} violation(s): {}", violations.len(), parts.join("; "))
}

/// Errors from parsing a schema document's text.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid JSON schema document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML schema document: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Errors from version lifecycle operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Validation(#[from] SchemaValidationError),

    #[error("schema version not found: {0}")]
    VersionNotFound(VersionId),

    #[error("schema version {0} is archived and cannot be republished")]
    VersionArchived(VersionId),

    #[error("no schema version has been published")]
    NoActiveVersion,
}
