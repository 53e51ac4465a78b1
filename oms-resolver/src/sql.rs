//! Parameterized SELECT construction shared by both SQL-speaking backends.
//!
//! Identifiers are always double-quoted; values are always `?` parameters.
//! Both DuckDB and SQLite accept this dialect.

use crate::query::ObjectQuery;
use oms_schema::PrimitiveType;
use oms_types::{Condition, FilterValue, SortKey};

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `'text'` with embedded quotes doubled. Only used for file paths, which
/// table functions do not accept as parameters.
pub(crate) fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

pub(crate) fn qualified(qualifier: &str, field: &str) -> String {
    format!("{qualifier}.{}", quote_ident(field))
}

#[derive(Debug, Default)]
pub(crate) struct Select {
    columns: Vec<String>,
    from: String,
    joins: Vec<String>,
    predicates: Vec<String>,
    params: Vec<FilterValue>,
    order_by: Option<String>,
    limit: Option<usize>,
    offset: usize,
}

impl Select {
    pub(crate) fn from(source: impl Into<String>) -> Self {
        Self {
            from: source.into(),
            ..Self::default()
        }
    }

    pub(crate) fn column(&mut self, expr: String) -> &mut Self {
        self.columns.push(expr);
        self
    }

    pub(crate) fn join(&mut self, clause: String) -> &mut Self {
        self.joins.push(clause);
        self
    }

    /// Adds `field = ?`, `field IN (?, ..)` or `field IS NULL`. An empty list
    /// matches nothing.
    pub(crate) fn condition(&mut self, qualifier: &str, condition: &Condition) -> &mut Self {
        let column = qualified(qualifier, &condition.field);
        match &condition.value {
            FilterValue::Null => self.predicates.push(format!("{column} IS NULL")),
            FilterValue::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                flatten(items, &mut values);
                if values.is_empty() {
                    self.predicates.push("1 = 0".to_string());
                } else {
                    let marks = vec!["?"; values.len()].join(", ");
                    self.predicates.push(format!("{column} IN ({marks})"));
                    self.params.extend(values);
                }
            }
            value => {
                self.predicates.push(format!("{column} = ?"));
                self.params.push(value.clone());
            }
        }
        self
    }

    pub(crate) fn order_by(&mut self, qualifier: &str, sort: &SortKey) -> &mut Self {
        let direction = if sort.descending { "DESC" } else { "ASC" };
        self.order_by = Some(format!("{} {direction}", qualified(qualifier, &sort.field)));
        self
    }

    pub(crate) fn limit(&mut self, limit: usize) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    pub(crate) fn offset(&mut self, offset: usize) -> &mut Self {
        self.offset = offset;
        self
    }

    pub(crate) fn build(self) -> (String, Vec<FilterValue>) {
        let mut sql = format!("SELECT {} FROM {}", self.columns.join(", "), self.from);
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        if !self.predicates.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.predicates.join(" AND "));
        }
        if let Some(order) = &self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if self.offset > 0 {
            sql.push_str(&format!(" OFFSET {}", self.offset));
        }
        (sql, self.params)
    }
}

fn flatten(items: &[FilterValue], out: &mut Vec<FilterValue>) {
    for item in items {
        match item {
            FilterValue::List(inner) => flatten(inner, out),
            other => out.push(other.clone()),
        }
    }
}

/// Output columns of a query with their declared types, in projection order.
pub(crate) fn typed_columns(query: &ObjectQuery) -> Vec<(String, PrimitiveType)> {
    query
        .projection
        .iter()
        .map(|name| {
            let primitive = query
                .object
                .property(name)
                .map(|p| p.primitive)
                .unwrap_or(PrimitiveType::String);
            (name.clone(), primitive)
        })
        .collect()
}

/// Applies conditions, ordering and paging of `query` to `select`, all
/// qualified by `qualifier`. Without an explicit sort rows come in primary
/// key order so paging is stable.
pub(crate) fn apply_query(select: &mut Select, qualifier: &str, query: &ObjectQuery) {
    for condition in &query.conditions {
        select.condition(qualifier, condition);
    }
    let sort = query
        .sort
        .clone()
        .unwrap_or_else(|| SortKey::ascending(query.object.primary_key.clone()));
    select
        .order_by(qualifier, &sort)
        .limit(query.limit)
        .offset(query.offset);
}
