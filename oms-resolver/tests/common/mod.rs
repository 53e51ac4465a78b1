//! Shared fixtures: a small hockey schema, Parquet/CSV files for the tabular
//! backend and a SQLite database for the relational one.

#![allow(dead_code)]

use oms_resolver::{RelationalResolver, Resolver, ResolverConfig, TabularResolver};
use oms_schema::{LinkTypeDefinition, ObjectTypeDefinition, SchemaDocument, SchemaRegistry};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const RESOLVER_SCHEMA: &str = r#"{
    "namespace": "hockey",
    "version": "1.0",
    "objects": [
        {
            "name": "Player",
            "properties": [
                {"name": "playerId", "type": "integer"},
                {"name": "name", "type": "string"},
                {"name": "position", "type": "string"},
                {"name": "teamId", "type": "string"},
                {"name": "capHit", "type": "float", "nullable": true},
                {"name": "active", "type": "boolean"},
                {"name": "ownerId", "type": "string", "nullable": true}
            ],
            "primaryKeyProperty": "playerId",
            "resolverBackend": "tabular",
            "backendLocator": "players"
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
                {"name": "teamId", "type": "string"},
                {"name": "active", "type": "boolean"}
            ],
            "primaryKeyProperty": "scoutId",
            "resolverBackend": "relational",
            "backendLocator": "scouts"
        },
        {
            "name": "Region",
            "properties": [
                {"name": "regionId", "type": "string"},
                {"name": "name", "type": "string"}
            ],
            "primaryKeyProperty": "regionId",
            "resolverBackend": "relational",
            "backendLocator": "regions"
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
            "name": "teamScouts",
            "fromType": "Team",
            "toType": "Scout",
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
        },
        {
            "name": "scoutRegions",
            "fromType": "Scout",
            "toType": "Region",
            "cardinality": "many-to-many",
            "resolution": {
                "kind": "joinTable",
                "tableName": "scout_regions",
                "fromField": "scoutId",
                "toField": "regionId"
            }
        }
    ]
}"#;

pub const INJECTION_NAME: &str = "Robert'); DROP TABLE teams;--";

pub fn registry() -> SchemaRegistry {
    let registry = SchemaRegistry::new();
    let doc = SchemaDocument::from_json_str(RESOLVER_SCHEMA).expect("fixture parses");
    let version = registry.load(doc).expect("fixture validates");
    registry.publish(&version.id).expect("fixture publishes");
    registry
}

pub fn object(registry: &SchemaRegistry, name: &str) -> Arc<ObjectTypeDefinition> {
    registry.get_object_type(name).expect("object type exists")
}

pub fn link(registry: &SchemaRegistry, name: &str) -> Arc<LinkTypeDefinition> {
    registry.get_link_type(name).expect("link type exists")
}

/// Players as hive-partitioned Parquet (`players/teamId=EDM/...`), prospects
/// and the scout/prospect join table as CSV.
pub fn write_tabular_fixtures(root: &Path) {
    let conn = duckdb::Connection::open_in_memory().expect("duckdb opens");
    let players = root.join("players");
    conn.execute_batch(&format!(
        "COPY (
            SELECT
                CAST(playerId AS BIGINT) AS playerId,
                name,
                position,
                teamId,
                CAST(capHit AS DOUBLE) AS capHit,
                active,
                ownerId
            FROM (VALUES
                (8478402, 'Connor McDavid', 'C', 'EDM', 12.5, true, 'u-mcdavid'),
                (8477934, 'Leon Draisaitl', 'C', 'EDM', 14.0, true, NULL),
                (8479318, 'Auston Matthews', 'C', 'TOR', 13.25, true, 'u-matthews'),
                (8478483, 'Mitch Marner', 'RW', 'TOR', 10.903, true, NULL),
                (8480069, 'Cale Makar', 'D', 'COL', 9.0, true, NULL),
                (8477492, 'Nathan MacKinnon', 'C', 'COL', NULL, true, NULL),
                (8471675, 'Sidney Crosby', 'C', 'PIT', 8.7, false, NULL)
            ) AS v(playerId, name, position, teamId, capHit, active, ownerId)
        ) TO '{}' (FORMAT PARQUET, PARTITION_BY (teamId))",
        players.display()
    ))
    .expect("players written");

    std::fs::write(
        root.join("prospects.csv"),
        "prospectId,name,draftYear,ownerId\n\
         1001,Ivan Demidov,2024,s-1\n\
         1002,Macklin Celebrini,2024,s-1\n\
         1003,Artyom Levshunov,2024,s-2\n\
         1004,Zeev Buium,2024,\n",
    )
    .expect("prospects written");

    std::fs::write(
        root.join("scout_prospects.csv"),
        "scoutId,prospectId\n\
         s-1,1001\n\
         s-1,1002\n\
         s-2,1003\n\
         s-2,1001\n",
    )
    .expect("join table written");
}

pub fn seed_relational(conn: &rusqlite::Connection) {
    conn.execute_batch(
        "CREATE TABLE teams (teamId TEXT PRIMARY KEY, name TEXT NOT NULL, city TEXT NOT NULL);
         CREATE TABLE scouts (scoutId TEXT PRIMARY KEY, name TEXT NOT NULL, teamId TEXT, active INTEGER NOT NULL);
         CREATE TABLE regions (regionId TEXT PRIMARY KEY, name TEXT NOT NULL);
         CREATE TABLE scout_regions (scoutId TEXT NOT NULL, regionId TEXT NOT NULL);

         INSERT INTO teams VALUES
            ('EDM', 'Oilers', 'Edmonton'),
            ('TOR', 'Maple Leafs', 'Toronto'),
            ('COL', 'Avalanche', 'Denver');
         INSERT INTO scouts VALUES
            ('s-1', 'Ada Park', 'TOR', 1),
            ('s-2', 'Ben Ortiz', 'TOR', 0),
            ('s-3', 'Cy Young', 'EDM', 1);
         INSERT INTO regions VALUES
            ('qc', 'Quebec'),
            ('on', 'Ontario'),
            ('se', 'Sweden');
         INSERT INTO scout_regions VALUES
            ('s-1', 'qc'),
            ('s-1', 'se'),
            ('s-2', 'on');",
    )
    .expect("relational fixture seeds");
    conn.execute(
        "INSERT INTO teams VALUES ('XXX', ?1, 'Nowhere')",
        [INJECTION_NAME],
    )
    .expect("injection row inserted");
}

pub fn tabular_resolver(root: &Path, config: ResolverConfig) -> Resolver {
    let backend = TabularResolver::new(root).expect("duckdb opens");
    Resolver::new(Arc::new(backend), config)
}

/// Writes the seeded SQLite database under `dir`.
pub fn seeded_database(dir: &Path) -> PathBuf {
    let path = dir.join("hockey.db");
    let conn = rusqlite::Connection::open(&path).expect("sqlite opens");
    seed_relational(&conn);
    path
}

pub fn relational_resolver(dir: &Path, config: ResolverConfig) -> Resolver {
    let backend = RelationalResolver::open(seeded_database(dir)).expect("database opens");
    Resolver::new(Arc::new(backend), config)
}

/// Integer primary keys of `records`, in order.
pub fn int_keys(records: &[oms_types::Record], key: &str) -> Vec<i64> {
    records
        .iter()
        .map(|r| r.get(key).and_then(serde_json::Value::as_i64).expect("integer key"))
        .collect()
}

/// String primary keys of `records`, in order.
pub fn str_keys(records: &[oms_types::Record], key: &str) -> Vec<String> {
    records
        .iter()
        .map(|r| {
            r.get(key)
                .and_then(serde_json::Value::as_str)
                .expect("string key")
                .to_string()
        })
        .collect()
}
