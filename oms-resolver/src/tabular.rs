//! Columnar file backend on DuckDB.
//!
//! An object's locator names a file or a directory under the data root.
//! Directories are read as hive-partitioned Parquet (or CSV) datasets, so a
//! filter on a partition column only touches matching partitions. Filters are
//! pushed into the read and only projected columns are materialized.

use crate::error::{ResolverError, ResolverResult};
use crate::pool::{ConnectionPool, MAX_IDLE};
use crate::query::{JoinQuery, ObjectQuery, ResolverBackend};
use crate::sql::{apply_query, qualified, quote_ident, quote_literal, typed_columns, Select};
use duckdb::types::Value as DuckValue;
use oms_schema::{BackendKind, PrimitiveType};
use oms_types::{Condition, FilterValue, Record};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Parquet,
    Csv,
}

impl FileFormat {
    const ALL: [Self; 2] = [Self::Parquet, Self::Csv];

    fn extension(self) -> &'static str {
        match self {
            Self::Parquet => "parquet",
            Self::Csv => "csv",
        }
    }

    fn of(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::ALL
            .into_iter()
            .find(|f| f.extension().eq_ignore_ascii_case(ext))
    }

    fn reader(self, pattern: &str, partitioned: bool) -> String {
        let hive = if partitioned {
            ", hive_partitioning = true, union_by_name = true"
        } else {
            ""
        };
        match self {
            Self::Parquet => format!("read_parquet({}{hive})", quote_literal(pattern)),
            Self::Csv => format!("read_csv_auto({}, header = true{hive})", quote_literal(pattern)),
        }
    }
}

/// DuckDB-backed resolver over partitioned Parquet/CSV files.
///
/// Calls run on clones of one in-memory database, each on its own
/// connection.
pub struct TabularResolver {
    data_root: PathBuf,
    database: Mutex<duckdb::Connection>,
    pool: ConnectionPool<duckdb::Connection>,
}

impl TabularResolver {
    /// Resolves locators relative to `data_root`.
    pub fn new(data_root: impl Into<PathBuf>) -> ResolverResult<Self> {
        let database = duckdb::Connection::open_in_memory()
            .map_err(|e| ResolverError::backend(BackendKind::Tabular, e))?;
        Ok(Self {
            data_root: data_root.into(),
            database: Mutex::new(database),
            pool: ConnectionPool::new(MAX_IDLE),
        })
    }

    /// A new connection to the shared database. The lock covers the clone only.
    fn connect(&self) -> ResolverResult<duckdb::Connection> {
        self.database
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_clone()
            .map_err(|e| ResolverError::backend(BackendKind::Tabular, e))
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// Table function reading the files behind `locator`.
    fn source(&self, object: &str, locator: &str) -> ResolverResult<String> {
        let path = self.data_root.join(locator);
        let not_found = || ResolverError::PartitionNotFound {
            object: object.to_string(),
            locator: locator.to_string(),
        };

        if path.is_dir() {
            let format = FileFormat::ALL
                .into_iter()
                .find(|f| contains_files(&path, f.extension()))
                .ok_or_else(not_found)?;
            let pattern = format!("{}/**/*.{}", display_path(&path), format.extension());
            return Ok(format.reader(&pattern, true));
        }
        if path.is_file() {
            let format = FileFormat::of(&path).ok_or_else(not_found)?;
            return Ok(format.reader(&display_path(&path), false));
        }
        // `players` may name `players.parquet` or `players.csv`.
        FileFormat::ALL
            .into_iter()
            .map(|f| (f, path.with_extension(f.extension())))
            .find(|(_, p)| p.is_file())
            .map(|(f, p)| f.reader(&display_path(&p), false))
            .ok_or_else(not_found)
    }

    fn select_columns(select: &mut Select, query: &ObjectQuery) -> Vec<(String, PrimitiveType)> {
        let columns = typed_columns(query);
        for (name, primitive) in &columns {
            select.column(format!(
                "CAST({} AS {}) AS {}",
                qualified("t", name),
                duck_type(*primitive),
                quote_ident(name)
            ));
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
        debug!(object, sql, params = params.len(), "tabular query");
        self.pool.with(
            || self.connect(),
            |conn| Self::run(conn, object, sql, &params, columns),
        )
    }

    fn run(
        conn: &duckdb::Connection,
        object: &str,
        sql: &str,
        params: &[FilterValue],
        columns: &[(String, PrimitiveType)],
    ) -> ResolverResult<Vec<Record>> {
        let mut stmt = conn.prepare(sql).map_err(|e| ResolverError::query(object, e))?;
        let values: Vec<DuckValue> = params.iter().map(to_duck).collect();
        let mut rows = stmt
            .query(duckdb::params_from_iter(values))
            .map_err(|e| ResolverError::query(object, e))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(|e| ResolverError::query(object, e))? {
            let mut record = Record::new();
            for (i, (name, _)) in columns.iter().enumerate() {
                let value: DuckValue = row.get(i).map_err(|e| ResolverError::query(object, e))?;
                record.insert(name.clone(), from_duck(value));
            }
            out.push(record);
        }
        Ok(out)
    }
}

impl ResolverBackend for TabularResolver {
    fn kind(&self) -> BackendKind {
        BackendKind::Tabular
    }

    fn fetch(&self, query: &ObjectQuery) -> ResolverResult<Vec<Record>> {
        let object = &query.object;
        let source = self.source(&object.name, &object.locator)?;
        let mut select = Select::from(format!("{source} AS t"));
        let columns = Self::select_columns(&mut select, query);
        apply_query(&mut select, "t", query);
        let (sql, params) = select.build();
        self.execute(&object.name, &sql, params, &columns)
    }

    fn fetch_joined(&self, query: &JoinQuery) -> ResolverResult<Vec<Record>> {
        let target = &query.target.object;
        let source = self.source(&target.name, &target.locator)?;
        let join_source = self.source(&query.table_name, &query.table_name)?;

        let mut select = Select::from(format!("{source} AS t"));
        let columns = Self::select_columns(&mut select, &query.target);
        select
            .join(format!(
                "JOIN {join_source} AS j ON {} = {}",
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

impl std::fmt::Debug for TabularResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabularResolver")
            .field("data_root", &self.data_root)
            .field("idle", &self.pool.idle_len())
            .finish()
    }
}

fn duck_type(primitive: PrimitiveType) -> &'static str {
    match primitive {
        PrimitiveType::Integer => "BIGINT",
        PrimitiveType::Float => "DOUBLE",
        PrimitiveType::Boolean => "BOOLEAN",
        // Dates and timestamps are served as ISO text.
        PrimitiveType::String | PrimitiveType::Date | PrimitiveType::Timestamp => "VARCHAR",
    }
}

fn contains_files(dir: &Path, extension: &str) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries.flatten().any(|entry| {
        let path = entry.path();
        if path.is_dir() {
            contains_files(&path, extension)
        } else {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(extension))
        }
    })
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn to_duck(value: &FilterValue) -> DuckValue {
    match value {
        FilterValue::Null | FilterValue::List(_) => DuckValue::Null,
        FilterValue::Boolean(b) => DuckValue::Boolean(*b),
        FilterValue::Integer(i) => DuckValue::BigInt(*i),
        FilterValue::Float(x) => DuckValue::Double(*x),
        FilterValue::Text(s) => DuckValue::Text(s.clone()),
    }
}

fn from_duck(value: DuckValue) -> JsonValue {
    match value {
        DuckValue::Null => JsonValue::Null,
        DuckValue::Boolean(b) => JsonValue::Bool(b),
        DuckValue::TinyInt(i) => JsonValue::from(i),
        DuckValue::SmallInt(i) => JsonValue::from(i),
        DuckValue::Int(i) => JsonValue::from(i),
        DuckValue::BigInt(i) => JsonValue::from(i),
        DuckValue::UTinyInt(i) => JsonValue::from(i),
        DuckValue::USmallInt(i) => JsonValue::from(i),
        DuckValue::UInt(i) => JsonValue::from(i),
        DuckValue::UBigInt(i) => JsonValue::from(i),
        DuckValue::Float(x) => float(f64::from(x)),
        DuckValue::Double(x) => float(x),
        DuckValue::Text(s) => JsonValue::String(s),
        other => JsonValue::String(format!("{other:?}")),
    }
}

/// Non-finite floats have no JSON form.
fn float(x: f64) -> JsonValue {
    serde_json::Number::from_f64(x).map_or(JsonValue::Null, JsonValue::Number)
}
