//! Facade fixture: hockey schema, Parquet/CSV data for the tabular backend,
//! a SQLite database file for the relational one, and an audit sink
//! that keeps every event.

#![allow(dead_code)]

use async_trait::async_trait;
use oms_core::{AuditEvent, AuditSink, OntologyFacade};
use oms_resolver::{RelationalResolver, Resolver, ResolverConfig, TabularResolver};
use oms_schema::{SchemaDocument, SchemaRegistry};
use oms_types::Subject;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

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
                {"name": "teamId", "type": "string"}
            ],
            "primaryKeyProperty": "scoutId",
            "resolverBackend": "relational",
            "backendLocator": "scouts"
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
        {
            "scopeKey": "scoutProspects",
            "rules": [{"role": "scout", "accessLevel": "read", "columnDeny": ["draftYear"]}]
        },
        {"scopeKey": "signPlayer", "rules": [{"role": "manager", "accessLevel": "full"}]}
    ]
}"#;

const SCOUT_PLAYER_RULE: &str =
    r#"{"role": "scout", "accessLevel": "read", "columnDeny": ["capHit"]},"#;

pub fn hockey_document() -> SchemaDocument {
    SchemaDocument::from_json_str(HOCKEY_SCHEMA).expect("fixture parses")
}

/// Version `0.2`: scouts lose access to players altogether.
pub fn hockey_document_v2() -> SchemaDocument {
    let text = HOCKEY_SCHEMA
        .replace(r#""version": "0.1""#, r#""version": "0.2""#)
        .replace(SCOUT_PLAYER_RULE, "");
    SchemaDocument::from_json_str(&text).expect("fixture parses")
}

pub fn published_registry() -> Arc<SchemaRegistry> {
    let registry = SchemaRegistry::new();
    let version = registry.load(hockey_document()).expect("fixture validates");
    registry.publish(&version.id).expect("fixture publishes");
    Arc::new(registry)
}

pub fn write_tabular_fixtures(root: &Path) {
    let conn = duckdb::Connection::open_in_memory().expect("duckdb opens");
    conn.execute_batch(&format!(
        "COPY (
            SELECT
                CAST(playerId AS BIGINT) AS playerId,
                name,
                position,
                teamId,
                CAST(capHit AS DOUBLE) AS capHit,
                ownerId
            FROM (VALUES
                (8478402, 'Connor McDavid', 'C', 'EDM', 12.5, 'u-mcdavid'),
                (8477934, 'Leon Draisaitl', 'C', 'EDM', 14.0, NULL),
                (8479318, 'Auston Matthews', 'C', 'TOR', 13.25, 'u-matthews'),
                (8478483, 'Mitch Marner', 'RW', 'TOR', 10.903, NULL),
                (8480069, 'Cale Makar', 'D', 'COL', 9.0, NULL),
                (8477492, 'Nathan MacKinnon', 'C', 'COL', 12.6, NULL)
            ) AS v(playerId, name, position, teamId, capHit, ownerId)
        ) TO '{}' (FORMAT PARQUET, PARTITION_BY (teamId))",
        root.join("players").display()
    ))
    .expect("players written");

    std::fs::write(
        root.join("prospects.csv"),
        "prospectId,name,draftYear,ownerId\n\
         1001,Ivan Demidov,2024,S1\n\
         1002,Macklin Celebrini,2024,S1\n\
         1003,Artyom Levshunov,2024,S2\n\
         1004,Zeev Buium,2024,S2\n",
    )
    .expect("prospects written");

    std::fs::write(
        root.join("scout_prospects.csv"),
        "scoutId,prospectId\n\
         S1,1001\n\
         S1,1002\n\
         S1,1003\n\
         S2,1004\n",
    )
    .expect("join table written");
}

pub fn seed_relational(conn: &rusqlite::Connection) {
    conn.execute_batch(
        "CREATE TABLE teams (teamId TEXT PRIMARY KEY, name TEXT NOT NULL, city TEXT NOT NULL);
         CREATE TABLE scouts (scoutId TEXT PRIMARY KEY, name TEXT NOT NULL, teamId TEXT);
         INSERT INTO teams VALUES
            ('COL', 'Avalanche', 'Denver'),
            ('EDM', 'Oilers', 'Edmonton'),
            ('TOR', 'Maple Leafs', 'Toronto');
         INSERT INTO scouts VALUES
            ('S1', 'Ada Park', 'TOR'),
            ('S2', 'Ben Ortiz', 'EDM');",
    )
    .expect("relational fixture seeds");
}

/// Keeps every audit event for inspection.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for RecordingSink {
    async fn record(&self, event: AuditEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub struct Fixture {
    pub dir: TempDir,
    pub registry: Arc<SchemaRegistry>,
    pub tabular: Arc<Resolver>,
    pub relational: Arc<Resolver>,
    pub audit: Arc<RecordingSink>,
    pub facade: OntologyFacade,
}

pub fn fixture() -> Fixture {
    let dir = TempDir::new().expect("tempdir");
    write_tabular_fixtures(dir.path());
    let registry = published_registry();

    let tabular = Arc::new(Resolver::new(
        Arc::new(TabularResolver::new(dir.path()).expect("duckdb opens")),
        ResolverConfig::default(),
    ));
    let db_path = dir.path().join("hockey.db");
    seed_relational(&rusqlite::Connection::open(&db_path).expect("sqlite opens"));
    let relational = Arc::new(Resolver::new(
        Arc::new(RelationalResolver::open(&db_path).expect("database opens")),
        ResolverConfig::default(),
    ));
    let audit = Arc::new(RecordingSink::default());

    let facade = OntologyFacade::builder(Arc::clone(&registry))
        .resolver(Arc::clone(&tabular))
        .resolver(Arc::clone(&relational))
        .audit_sink(Arc::clone(&audit) as Arc<dyn AuditSink>)
        .build();

    Fixture {
        dir,
        registry,
        tabular,
        relational,
        audit,
        facade,
    }
}

pub fn manager() -> Subject {
    Subject::new("manager").with_identity("gm-1")
}

pub fn scout(identity: &str) -> Subject {
    Subject::new("scout").with_identity(identity)
}

pub fn analyst(team: &str) -> Subject {
    Subject::new("analyst").with_identity("an-1").with_team(team)
}
