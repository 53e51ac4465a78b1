//! SQL backend on SQLite.
//!
//! Every value reaches the database as a bound parameter. Column values are
//! decoded using the property's declared type, since SQLite stores booleans
//! as integers and has no date type.

use crate::error::{ResolverError, ResolverResult};
use crate::pool::{ConnectionPool, MAX_IDLE};
use crate::query::{JoinQuery, ObjectQuery, ResolverBackend};
use crate::sql::{apply_query, qualified, quote_ident, typed_columns, Select};
use oms_schema::{BackendKind, PrimitiveType};
use oms_types::{Condition, FilterValue, Record};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, OpenFlags};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolver over a SQLite database file. Object locators are table names.
///
/// Each call runs on its own read-only connection, so a slow query does not
/// hold up other calls.
pub struct RelationalResolver {
    path: PathBuf,
    pool: ConnectionPool<Connection>,
}

impl RelationalResolver {
    /// Opens an existing database read-only.
    pub fn open(path: impl AsRef<Path>) -> ResolverResult<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Self::connect(&path)?;
        let pool = ConnectionPool::new(MAX_IDLE);
        pool.put(conn);
        Ok(Self { path, pool })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(path: &Path) -> ResolverResult<Connection> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Connection::open_with_flags(path, flags)
            .map_err(|e| ResolverError::backend(BackendKind::Relational, e))
    }

    fn select_columns(select: &mut Select, query: &ObjectQuery) -> Vec<(String, PrimitiveType)> {
        let columns = typed_columns(query);
        for (name, _) in &columns {
            select.column(format!("{} AS {}", qualified("t", name), quote_ident(name)));
        }
        columns
    }

    fn execute(
        &self,
        object: &str,
        sql: &str,
        params: Vec<FilterValue>,
        columns: &[(String, PrimitiveType)],
    ) -> ResolverResult<Vec<Record>> {
        debug!(object, sql, params = params.len(), "relational query");
        self.pool.with(
            || Self::connect(&self.path),
            |conn| Self::run(conn, object, sql, &params, columns),
        )
    }

    fn run(
        conn: &Connection,
        object: &str,
        sql: &str,
        params: &[FilterValue],
        columns: &[(String, PrimitiveType)],
    ) -> ResolverResult<Vec<Record>> {
        let mut stmt = conn.prepare(sql).map_err(|e| ResolverError::query(object, e))?;
        let values: Vec<SqlValue> = params.iter().map(to_sql).collect();
        let mut rows = stmt
            .query(rusqlite::params_from_iter(values))
            .map_err(|e| ResolverError::query(object, e))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(|e| ResolverError::query(object, e))? {
            let mut record = Record::new();
            for (i, (name, primitive)) in columns.iter().enumerate() {
                let value = row.get_ref(i).map_err(|e| ResolverError::query(object, e))?;
                record.insert(name.clone(), from_sql(value, *primitive));
            }
            out.push(record);
        }
        Ok(out)
    }
}

impl ResolverBackend for RelationalResolver {
    fn kind(&self) -> BackendKind {
        BackendKind::Relational
    }

    fn fetch(&self, query: &ObjectQuery) -> ResolverResult<Vec<Record>> {
        let object = &query.object;
        let mut select = Select::from(format!("{} AS t", quote_ident(&object.locator)));
        let columns = Self::select_columns(&mut select, query);
        apply_query(&mut select, "t", query);
        let (sql, params) = select.build();
        self.execute(&object.name, &sql, params, &columns)
    }

    fn fetch_joined(&self, query: &JoinQuery) -> ResolverResult<Vec<Record>> {
        let target = &query.target.object;
        let mut select = Select::from(format!("{} AS t", quote_ident(&target.locator)));
        let columns = Self::select_columns(&mut select, &query.target);
        select
            .join(format!(
                "JOIN {} AS j ON {} = {}",
                quote_ident(&query.table_name),
                qualified("t", &target.primary_key),
                qualified("j", &query.to_field)
            ))
            .condition(
                "j",
                &Condition::new(query.from_field.clone(), query.from_id.clone()),
            );
        apply_query(&mut select, "t", &query.target);
        let (sql, params) = select.build();
        self.execute(&target.name, &sql, params, &columns)
    }
}

impl std::fmt::Debug for RelationalResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationalResolver")
            .field("path", &self.path)
            .field("idle", &self.pool.idle_len())
            .finish()
    }
}

fn to_sql(value: &FilterValue) -> SqlValue {
    match value {
        FilterValue::Null | FilterValue::List(_) => SqlValue::Null,
        FilterValue::Boolean(b) => SqlValue::Integer(i64::from(*b)),
        FilterValue::Integer(i) => SqlValue::Integer(*i),
        FilterValue::Float(x) => SqlValue::Real(*x),
        FilterValue::Text(s) => SqlValue::Text(s.clone()),
    }
}

fn from_sql(value: ValueRef<'_>, primitive: PrimitiveType) -> JsonValue {
    match (value, primitive) {
        (ValueRef::Null, _) => JsonValue::Null,
        (ValueRef::Integer(i), PrimitiveType::Boolean) => JsonValue::Bool(i != 0),
        (ValueRef::Integer(i), PrimitiveType::Float) => float(i as f64),
        (ValueRef::Integer(i), PrimitiveType::String) => JsonValue::String(i.to_string()),
        (ValueRef::Integer(i), _) => JsonValue::from(i),
        (ValueRef::Real(x), PrimitiveType::Integer) if x.fract() == 0.0 => JsonValue::from(x as i64),
        (ValueRef::Real(x), _) => float(x),
        (ValueRef::Text(bytes), PrimitiveType::Boolean) => {
            let text = String::from_utf8_lossy(bytes);
            match text.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "1" | "yes" => JsonValue::Bool(true),
                "false" | "f" | "0" | "no" => JsonValue::Bool(false),
                _ => JsonValue::String(text.into_owned()),
            }
        }
        (ValueRef::Text(bytes), _) | (ValueRef::Blob(bytes), _) => {
            JsonValue::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

fn float(x: f64) -> JsonValue {
    serde_json::Number::from_f64(x).map_or(JsonValue::Null, JsonValue::Number)
}
