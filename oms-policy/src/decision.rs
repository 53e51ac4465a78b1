use oms_schema::{AccessLevel, ObjectTypeDefinition, PolicyRule, RoleMatcher, Specificity};
use oms_types::{Record, RowFilter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// What the caller intends to do with the governed scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestedAction {
    Read,
    Write,
    Execute,
}

impl RequestedAction {
    /// Whether a rule granting `level` permits this action.
    pub fn permitted_by(self, level: AccessLevel) -> bool {
        match self {
            Self::Read => level >= AccessLevel::SelfOnly,
            Self::Write | Self::Execute => level == AccessLevel::Full,
        }
    }
}

impl fmt::Display for RequestedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Execute => "execute",
        })
    }
}

/// Field-level restriction of a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnFilter {
    /// Only these fields are visible.
    Allow(BTreeSet<String>),
    /// Every field except these is visible.
    Deny(BTreeSet<String>),
}

impl ColumnFilter {
    /// A filter that hides nothing.
    pub fn unrestricted() -> Self {
        Self::Deny(BTreeSet::new())
    }

    /// A filter that hides everything.
    pub fn nothing() -> Self {
        Self::Allow(BTreeSet::new())
    }

    pub fn permits(&self, field: &str) -> bool {
        match self {
            Self::Allow(fields) => fields.contains(field),
            Self::Deny(fields) => !fields.contains(field),
        }
    }

    /// True for an empty allow-set.
    pub fn is_empty_allow(&self) -> bool {
        matches!(self, Self::Allow(fields) if fields.is_empty())
    }

    /// Fields visible under both filters.
    #[must_use]
    pub fn intersect(self, other: &ColumnFilter) -> Self {
        match (self, other) {
            (Self::Allow(a), Self::Allow(b)) => Self::Allow(a.intersection(b).cloned().collect()),
            (Self::Allow(a), Self::Deny(d)) => Self::Allow(a.difference(d).cloned().collect()),
            (Self::Deny(d), Self::Allow(b)) => Self::Allow(b.difference(&d).cloned().collect()),
            (Self::Deny(a), Self::Deny(b)) => Self::Deny(a.union(b).cloned().collect()),
        }
    }

    /// Removes every field in `denied` from the visible set.
    pub(crate) fn subtract(self, denied: &BTreeSet<String>) -> Self {
        match self {
            Self::Allow(fields) => Self::Allow(fields.difference(denied).cloned().collect()),
            Self::Deny(fields) => Self::Deny(fields.union(denied).cloned().collect()),
        }
    }
}

/// The rule a decision was taken from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedRule {
    pub position: usize,
    pub role: RoleMatcher,
    pub specificity: Specificity,
    pub access_level: AccessLevel,
    pub implicit: bool,
}

impl From<&PolicyRule> for MatchedRule {
    fn from(rule: &PolicyRule) -> Self {
        Self {
            position: rule.position,
            role: rule.role.clone(),
            specificity: rule.specificity(),
            access_level: rule.access_level,
            implicit: rule.implicit,
        }
    }
}

/// Outcome of one access evaluation. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub scope_key: String,
    pub action: RequestedAction,
    pub allowed: bool,
    pub access_level: AccessLevel,
    pub row_filter: RowFilter,
    pub column_filter: ColumnFilter,
    /// `None` when the scope has no policy at all.
    pub matched_rule: Option<MatchedRule>,
}

impl PolicyDecision {
    /// Deny decision: always-false rows, empty allow-set.
    pub fn deny(
        scope_key: impl Into<String>,
        action: RequestedAction,
        matched_rule: Option<MatchedRule>,
    ) -> Self {
        Self {
            scope_key: scope_key.into(),
            action,
            allowed: false,
            access_level: AccessLevel::None,
            row_filter: RowFilter::Deny,
            column_filter: ColumnFilter::nothing(),
            matched_rule,
        }
    }

    pub fn specificity(&self) -> Option<Specificity> {
        self.matched_rule.as_ref().map(|r| r.specificity)
    }

    /// Properties to fetch for `object`: the requested set (or every declared
    /// property) narrowed by the column filter. The primary key is always
    /// included and comes first.
    pub fn visible_properties(
        &self,
        object: &ObjectTypeDefinition,
        requested: Option<&[String]>,
    ) -> Vec<String> {
        let mut out = vec![object.primary_key.clone()];
        let candidates: Vec<&str> = match requested {
            Some(fields) => fields.iter().map(String::as_str).collect(),
            None => object.property_names().collect(),
        };
        for field in candidates {
            if field != object.primary_key
                && object.has_property(field)
                && self.column_filter.permits(field)
                && !out.iter().any(|f| f == field)
            {
                out.push(field.to_string());
            }
        }
        out
    }

    /// Narrows this decision's columns by another decision covering the same
    /// records, such as a link policy over its target type.
    pub fn restrict_columns(&mut self, other: &PolicyDecision) {
        let current = std::mem::replace(&mut self.column_filter, ColumnFilter::nothing());
        self.column_filter = current.intersect(&other.column_filter);
    }

    /// Removes fields the decision does not permit. `primary_key` survives.
    pub fn filter_record(&self, record: &mut Record, primary_key: &str) {
        record.retain(|field, _| field == primary_key || self.column_filter.permits(field));
    }
}
