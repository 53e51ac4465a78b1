//! Shared fixtures for schema registry tests.

#![allow(dead_code)]

use oms_schema::{SchemaDocument, SchemaRegistry};

/// A small hockey-operations schema exercising every definition kind.
pub const HOCKEY_SCHEMA: &str = r#"{
    "namespace": "hockey",
    "version": "0.1",
    "objects": [
        {
            "name": "Player",
            "properties": [
                {"name": "playerId", "type": "integer"},
                {"name": "name", "type": "string"},
                {"name": "position", "type": "string"},
                {"name": "teamId", "type": "string"},
                {"name": "capHit", "type": "float", "nullable": true},
                {"name": "ownerId", "type": "string", "nullable": true}
            ],
            "primaryKeyProperty": "playerId",
            "resolverBackend": "tabular",
            "backendLocator": "players"
        },
        {
            "name": "Team",
            "properties": [
                {"name": "teamId", "type": "string"},
                {"name": "name", "type": "string"},
                {"name": "city", "type": "string"}
            ],
            "primaryKeyProperty": "teamId",
            "resolverBackend": "relational",
            "backendLocator": "teams"
        },
        {
            "name": "Scout",
            "properties": [
                {"name": "scoutId", "type": "string"},
                {"name": "name", "type": "string"},
                {"name": "teamId", "type": "string"}
            ],
            "primaryKeyProperty": "scoutId",
            "resolverBackend": "relational",
            "backendLocator": "scouts"
        },
        {
            "name": "Prospect",
            "properties": [
                {"name": "prospectId", "type": "integer"},
                {"name": "name", "type": "string"},
                {"name": "draftYear", "type": "integer"},
                {"name": "ownerId", "type": "string", "nullable": true}
            ],
            "primaryKeyProperty": "prospectId",
            "resolverBackend": "tabular",
            "backendLocator": "prospects"
        }
    ],
    "links": [
        {
            "name": "teamPlayers",
            "fromType": "Team",
            "toType": "Player",
            "cardinality": "one-to-many",
            "resolution": {"kind": "foreignKey", "toField": "teamId"}
        },
        {
            "name": "scoutProspects",
            "fromType": "Scout",
            "toType": "Prospect",
            "cardinality": "many-to-many",
            "resolution": {
                "kind": "joinTable",
                "tableName": "scout_prospects",
                "fromField": "scoutId",
                "toField": "prospectId"
            }
        }
    ],
    "actions": [
        {
            "name": "signPlayer",
            "inputSchema": {"type": "object", "required": ["playerId"]},
            "preconditions": [{"check": "capSpace"}],
            "policy": "signPlayer"
        }
    ],
    "policies": [
        {
            "scopeKey": "Player",
            "rules": [
                {"role": "manager", "accessLevel": "read"},
                {"role": "scout", "accessLevel": "read", "columnDeny": ["capHit"]},
                {"role": "analyst", "teamScope": true, "accessLevel": "team"},
                {"role": "admin", "accessLevel": "full"}
            ]
        },
        {
            "scopeKey": "Prospect",
            "rules": [
                {"role": "scout", "selfScope": true, "accessLevel": "self"},
                {"role": "manager", "accessLevel": "read"}
            ]
        },
        {"scopeKey": "Team", "rules": [{"role": "*", "accessLevel": "read"}]},
        {"scopeKey": "Scout", "rules": [{"role": "*", "accessLevel": "read"}]},
        {"scopeKey": "scoutProspects", "rules": [{"role": "scout", "accessLevel": "read"}]},
        {"scopeKey": "signPlayer", "rules": [{"role": "manager", "accessLevel": "full"}]}
    ]
}"#;

pub fn hockey_document() -> SchemaDocument {
    SchemaDocument::from_json_str(HOCKEY_SCHEMA).expect("fixture parses")
}

pub fn hockey_document_version(version: &str) -> SchemaDocument {
    let mut doc = hockey_document();
    doc.version = version.to_string();
    doc
}

/// Registry with the fixture loaded and published as `0.1`.
pub fn published_registry() -> SchemaRegistry {
    let registry = SchemaRegistry::new();
    let version = registry.load(hockey_document()).expect("fixture validates");
    registry.publish(&version.id).expect("fixture publishes");
    registry
}
