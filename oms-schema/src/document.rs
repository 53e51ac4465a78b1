//! Raw schema document as supplied by the loader.
//!
//! Field types here are deliberately loose (`String` for enums, optional
//! resolution fields) so that validation can report every problem in one pass
//! instead of failing on the first bad token.

use crate::error::DocumentError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDocument {
    pub namespace: String,
    pub version: String,
    /// Role enumeration. Falls back to [`crate::DEFAULT_ROLES`] when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    #[serde(default)]
    pub objects: Vec<ObjectDocument>,
    #[serde(default)]
    pub links: Vec<LinkDocument>,
    #[serde(default)]
    pub actions: Vec<ActionDocument>,
    #[serde(default)]
    pub policies: Vec<PolicyDocument>,
}

impl SchemaDocument {
    /// Parses a JSON schema document.
    pub fn from_json_str(json: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parses a TOML schema document (`[[objects]]`, `[[links]]`, ... tables).
    pub fn from_toml_str(text: &str) -> Result<Self, DocumentError> {
        Ok(toml::from_str(text)?)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDocument {
    pub name: String,
    /// Declaration order is preserved and becomes the default projection order.
    #[serde(default)]
    pub properties: Vec<PropertyDocument>,
    #[serde(default)]
    pub primary_key_property: String,
    #[serde(default)]
    pub resolver_backend: String,
    #[serde(default)]
    pub backend_locator: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyDocument {
    pub name: String,
    #[serde(rename = "type")]
    pub property_type: String,
    #[serde(default)]
    pub nullable: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkDocument {
    pub name: String,
    pub from_type: String,
    pub to_type: String,
    #[serde(default)]
    pub cardinality: String,
    #[serde(default)]
    pub resolution: ResolutionDocument,
}

/// `{"kind": "foreignKey", "toField": ..}` or
/// `{"kind": "joinTable", "tableName": .., "fromField": .., "toField": ..}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionDocument {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_field: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDocument {
    pub name: String,
    #[serde(default)]
    pub input_schema: serde_json::Value,
    #[serde(default)]
    pub preconditions: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDocument {
    pub scope_key: String,
    #[serde(default)]
    pub rules: Vec<RuleDocument>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDocument {
    /// A role from the enumeration, or `*` for an explicit default rule.
    pub role: String,
    #[serde(default)]
    pub self_scope: bool,
    #[serde(default)]
    pub team_scope: bool,
    #[serde(default)]
    pub access_level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_allow: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_deny: Option<Vec<String>>,
    /// Property bound to `subject.identity` by self scoping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_field: Option<String>,
    /// Property bound to `subject.team` by team scoping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_field: Option<String>,
}
