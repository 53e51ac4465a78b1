//! Access evaluation.

use crate::decision::{ColumnFilter, MatchedRule, PolicyDecision, RequestedAction};
use crate::error::{PolicyError, PolicyResult};
use oms_schema::{ColumnRule, PolicyRule, SchemaSnapshot, SubjectAttribute};
use oms_types::{Condition, Record, Role, RowFilter, Subject};
use std::cmp::Reverse;
use std::collections::BTreeSet;
use tracing::debug;

/// Stateless evaluator of security policies.
///
/// Every call is a pure function of the subject, the scope key and the policy
/// set of the snapshot passed in, so one engine can be shared freely across
/// threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyEngine;

impl PolicyEngine {
    pub fn new() -> Self {
        Self
    }

    /// Evaluates `action` on `scope_key` for `subject`.
    ///
    /// A scope without a policy, or a role outside the schema's role
    /// enumeration, is denied. A subject without a role is a caller error.
    pub fn evaluate_access(
        &self,
        schema: &SchemaSnapshot,
        subject: &Subject,
        scope_key: &str,
        action: RequestedAction,
    ) -> PolicyResult<PolicyDecision> {
        let role = subject
            .role()
            .ok_or_else(|| PolicyError::InvalidSubject("subject has no role".into()))?;

        let Some(policy) = schema.security_policy(scope_key) else {
            debug!(scope_key, "no policy for scope, denying");
            return Ok(PolicyDecision::deny(scope_key, action, None));
        };

        if !schema.is_known_role(role) {
            debug!(scope_key, role = %role, "role outside enumeration, denying");
            return Ok(PolicyDecision::deny(scope_key, action, None));
        }

        let candidates: Vec<&PolicyRule> = policy
            .rules
            .iter()
            .filter(|r| applies(r, role, subject))
            .collect();

        let ranked = rank_rules(candidates.iter().copied());
        let Some(winner) = ranked.first().copied() else {
            return Ok(PolicyDecision::deny(scope_key, action, None));
        };

        let matched = MatchedRule::from(winner);
        if !action.permitted_by(winner.access_level) {
            debug!(
                scope_key,
                role = %role,
                action = %action,
                level = %winner.access_level,
                rule = winner.position,
                "access denied"
            );
            return Ok(PolicyDecision::deny(scope_key, action, Some(matched)));
        }

        let row_filter = match row_filter(winner, subject) {
            Some(filter) => filter,
            None => return Ok(PolicyDecision::deny(scope_key, action, Some(matched))),
        };

        // Deny always wins: fields denied by any matching rule stay hidden
        // even when the winning rule allows them.
        let denied: BTreeSet<String> = candidates
            .iter()
            .filter_map(|r| match &r.columns {
                Some(ColumnRule::Deny(fields)) => Some(fields.iter().cloned()),
                _ => None,
            })
            .flatten()
            .collect();
        let column_filter = match &winner.columns {
            Some(ColumnRule::Allow(fields)) => ColumnFilter::Allow(fields.clone()),
            Some(ColumnRule::Deny(_)) | None => ColumnFilter::unrestricted(),
        }
        .subtract(&denied);

        debug!(
            scope_key,
            role = %role,
            action = %action,
            level = %winner.access_level,
            rule = winner.position,
            "access granted"
        );
        Ok(PolicyDecision {
            scope_key: scope_key.to_string(),
            action,
            allowed: true,
            access_level: winner.access_level,
            row_filter,
            column_filter,
            matched_rule: Some(matched),
        })
    }

    /// Removes denied fields from every record. The primary key is always kept.
    pub fn apply_column_filters(
        &self,
        records: Vec<Record>,
        decision: &PolicyDecision,
        primary_key: &str,
    ) -> Vec<Record> {
        records
            .into_iter()
            .map(|mut record| {
                decision.filter_record(&mut record, primary_key);
                record
            })
            .collect()
    }
}

/// Orders rules from most to least applicable.
///
/// Higher specificity first. Among equal specificity the lower access level
/// comes first, then storage order.
pub fn rank_rules<'a>(rules: impl IntoIterator<Item = &'a PolicyRule>) -> Vec<&'a PolicyRule> {
    let mut ranked: Vec<&PolicyRule> = rules.into_iter().collect();
    ranked.sort_by_key(|r| (Reverse(r.specificity()), r.access_level, r.position));
    ranked
}

/// Whether `rule` applies to a subject holding `role`.
fn applies(rule: &PolicyRule, role: &Role, subject: &Subject) -> bool {
    rule.role.matches(role)
        && (!rule.self_scope || subject.identity().is_some())
        && (!rule.team_scope || subject.team().is_some())
}

/// Fills the rule's template from the subject. `None` when a binding has no
/// value, which `applies` rules out for matched rules.
fn row_filter(rule: &PolicyRule, subject: &Subject) -> Option<RowFilter> {
    if rule.row_template.is_empty() {
        return Some(RowFilter::Unrestricted);
    }
    rule.row_template
        .iter()
        .map(|binding| {
            let value = match binding.source {
                SubjectAttribute::Identity => subject.identity()?,
                SubjectAttribute::Team => subject.team()?,
            };
            Some(Condition::new(binding.field.clone(), value))
        })
        .collect::<Option<Vec<_>>>()
        .map(RowFilter::Match)
}
