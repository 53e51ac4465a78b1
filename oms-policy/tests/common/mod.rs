#![allow(dead_code)]

use oms_schema::{SchemaDocument, SchemaRegistry, SchemaSnapshot};
use oms_types::Record;
use serde_json::json;
use std::sync::Arc;

pub const PLAYER_SCHEMA: &str = r#"{
    "namespace": "hockey",
    "version": "1",
    "objects": [
        {
            "name": "Player",
            "properties": [
                {"name": "playerId", "type": "integer"},
                {"name": "name", "type": "string"},
                {"name": "position", "type": "string"},
                {"name": "teamId", "type": "string"},
                {"name": "capHit", "type": "float"},
                {"name": "agentNotes", "type": "string"},
                {"name": "ownerId", "type": "string"}
            ],
            "primaryKeyProperty": "playerId",
            "resolverBackend": "tabular",
            "backendLocator": "players"
        },
        {
            "name": "Contract",
            "properties": [
                {"name": "contractId", "type": "string"},
                {"name": "teamId", "type": "string"}
            ],
            "primaryKeyProperty": "contractId",
            "resolverBackend": "relational",
            "backendLocator": "contracts"
        }
    ],
    "actions": [
        {"name": "tradePlayer", "policy": "tradePlayer"}
    ],
    "policies": [
        {
            "scopeKey": "Player",
            "rules": [
                {"role": "manager", "accessLevel": "read"},
                {"role": "scout", "accessLevel": "read", "columnDeny": ["capHit"]},
                {"role": "scout", "selfScope": true, "accessLevel": "self",
                 "columnAllow": ["name", "capHit", "agentNotes"]},
                {"role": "analyst", "teamScope": true, "accessLevel": "team",
                 "columnAllow": ["name", "position", "capHit"]},
                {"role": "analyst", "teamScope": true, "accessLevel": "none"},
                {"role": "viewer", "accessLevel": "read", "columnAllow": ["name"]},
                {"role": "admin", "accessLevel": "full"}
            ]
        },
        {
            "scopeKey": "tradePlayer",
            "rules": [
                {"role": "manager", "accessLevel": "full"},
                {"role": "*", "accessLevel": "read"}
            ]
        }
    ]
}"#;

pub fn snapshot() -> Arc<SchemaSnapshot> {
    let registry = SchemaRegistry::new();
    let doc = SchemaDocument::from_json_str(PLAYER_SCHEMA).expect("fixture parses");
    let version = registry.load(doc).expect("fixture validates");
    registry.publish(&version.id).expect("fixture publishes");
    registry.get_active_version().expect("active version")
}

pub fn player_record() -> Record {
    match json!({
        "playerId": 8479318,
        "name": "Auston Matthews",
        "position": "C",
        "teamId": "TOR",
        "capHit": 13250000.0,
        "agentNotes": "extension talks",
        "ownerId": "u-17"
    }) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    }
}
