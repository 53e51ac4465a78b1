//! Per-call performance records.

use oms_schema::BackendKind;
use oms_types::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    GetById,
    GetByFilter,
    GetByIds,
    TraverseLink,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::GetById => "get_by_id",
            Self::GetByFilter => "get_by_filter",
            Self::GetByIds => "get_by_ids",
            Self::TraverseLink => "traverse_link",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    NotFound,
    Error,
    Timeout,
}

/// One resolver call. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryMetric {
    pub id: Uuid,
    pub backend: BackendKind,
    pub operation: Operation,
    pub object_type: String,
    pub query_time_ms: u64,
    pub row_count: usize,
    pub cache_hit: bool,
    pub outcome: Outcome,
    pub timestamp: Timestamp,
}

/// Aggregate of all metrics recorded for one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSummary {
    pub backend: BackendKind,
    pub calls: usize,
    pub cache_hits: usize,
    pub errors: usize,
    pub timeouts: usize,
    pub total_rows: usize,
    pub total_time_ms: u64,
}

impl BackendSummary {
    fn empty(backend: BackendKind) -> Self {
        Self {
            backend,
            calls: 0,
            cache_hits: 0,
            errors: 0,
            timeouts: 0,
            total_rows: 0,
            total_time_ms: 0,
        }
    }

    pub fn mean_time_ms(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.total_time_ms as f64 / self.calls as f64
        }
    }
}

/// Append-only recorder of [`QueryMetric`]s, shared by resolvers.
#[derive(Debug, Default)]
pub struct MetricsSink {
    records: Mutex<Vec<QueryMetric>>,
}

impl MetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, metric: QueryMetric) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(metric);
    }

    /// A copy of every record so far, in recording order.
    pub fn snapshot(&self) -> Vec<QueryMetric> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Per-backend totals, ordered by backend name.
    pub fn summary(&self) -> Vec<BackendSummary> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let mut by_backend: HashMap<BackendKind, BackendSummary> = HashMap::new();
        for m in records.iter() {
            let s = by_backend
                .entry(m.backend)
                .or_insert_with(|| BackendSummary::empty(m.backend));
            s.calls += 1;
            s.total_rows += m.row_count;
            s.total_time_ms += m.query_time_ms;
            if m.cache_hit {
                s.cache_hits += 1;
            }
            match m.outcome {
                Outcome::Error => s.errors += 1,
                Outcome::Timeout => s.timeouts += 1,
                Outcome::Success | Outcome::NotFound => {}
            }
        }
        let mut out: Vec<BackendSummary> = by_backend.into_values().collect();
        out.sort_by(|a, b| a.backend.as_str().cmp(b.backend.as_str()));
        out
    }
}
