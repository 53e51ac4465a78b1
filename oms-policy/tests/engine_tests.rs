//! Tests for engine.rs: rule selection, row filters and column filters.

mod common;

use common::{player_record, snapshot};
use oms_policy::{ColumnFilter, PolicyEngine, PolicyError, RequestedAction};
use oms_schema::{AccessLevel, Specificity};
use oms_types::{Condition, RowFilter, Subject};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;

fn set(fields: &[&str]) -> BTreeSet<String> {
    fields.iter().map(|f| f.to_string()).collect()
}

fn read(subject: &Subject, scope: &str) -> oms_policy::PolicyDecision {
    PolicyEngine::new()
        .evaluate_access(&snapshot(), subject, scope, RequestedAction::Read)
        .unwrap()
}

// ── player capHit scenario ──────────────────────────────────────

#[test]
fn scout_does_not_see_cap_hit() {
    let decision = read(&Subject::new("Scout"), "Player");
    assert!(decision.allowed);
    assert_eq!(decision.row_filter, RowFilter::Unrestricted);
    assert_eq!(decision.column_filter, ColumnFilter::Deny(set(&["capHit"])));

    let records = PolicyEngine::new().apply_column_filters(vec![player_record()], &decision, "playerId");
    let record = &records[0];
    assert_eq!(record["playerId"], 8479318);
    assert_eq!(record["name"], "Auston Matthews");
    assert_eq!(record["position"], "C");
    assert!(!record.contains_key("capHit"));
}

#[test]
fn manager_sees_cap_hit() {
    let decision = read(&Subject::new("manager"), "Player");
    assert!(decision.allowed);
    assert_eq!(decision.column_filter, ColumnFilter::unrestricted());

    let records = PolicyEngine::new().apply_column_filters(vec![player_record()], &decision, "playerId");
    assert_eq!(records[0]["capHit"], 13250000.0);
}

// ── specificity ─────────────────────────────────────────────────

#[test]
fn self_scope_outranks_role_rule() {
    let subject = Subject::new("scout").with_identity("u-17");
    let decision = read(&subject, "Player");
    let matched = decision.matched_rule.as_ref().unwrap();
    assert_eq!(matched.specificity, Specificity::SelfScoped);
    assert_eq!(decision.access_level, AccessLevel::SelfOnly);
    assert_eq!(
        decision.row_filter,
        RowFilter::Match(vec![Condition::new("ownerId", "u-17")])
    );
    // The role rule's deny on capHit still applies to the self-scoped allow.
    assert_eq!(decision.column_filter, ColumnFilter::Allow(set(&["agentNotes", "name"])));
}

#[test]
fn self_scope_without_identity_falls_back_to_role_rule() {
    let decision = read(&Subject::new("scout").with_identity("   "), "Player");
    assert_eq!(decision.specificity(), Some(Specificity::Role));
    assert_eq!(decision.row_filter, RowFilter::Unrestricted);
}

#[test]
fn equal_specificity_tie_is_deny_wins() {
    let decision = read(&Subject::new("analyst").with_team("TOR"), "Player");
    assert!(!decision.allowed);
    assert_eq!(decision.access_level, AccessLevel::None);
    assert_eq!(decision.matched_rule.unwrap().position, 4);
}

#[test]
fn team_scoped_rule_without_team_falls_to_default() {
    let decision = read(&Subject::new("analyst"), "Player");
    assert!(!decision.allowed);
    let matched = decision.matched_rule.unwrap();
    assert!(matched.implicit);
    assert_eq!(matched.specificity, Specificity::Default);
}

#[test]
fn allow_set_restricts_columns() {
    let decision = read(&Subject::new("viewer"), "Player");
    assert_eq!(decision.column_filter, ColumnFilter::Allow(set(&["name"])));
    let records = PolicyEngine::new().apply_column_filters(vec![player_record()], &decision, "playerId");
    let keys: Vec<&String> = records[0].keys().collect();
    assert_eq!(keys, vec!["name", "playerId"]);
}

// ── default deny ────────────────────────────────────────────────

#[test]
fn role_without_rules_is_denied() {
    let decision = read(&Subject::new("analyst"), "Player");
    assert!(!decision.allowed);
    assert_eq!(decision.row_filter, RowFilter::Deny);
    assert!(decision.column_filter.is_empty_allow());
}

#[test]
fn scope_without_policy_is_denied() {
    let decision = read(&Subject::new("admin"), "Contract");
    assert!(!decision.allowed);
    assert!(decision.matched_rule.is_none());
    assert!(decision.column_filter.is_empty_allow());
}

#[test]
fn role_outside_enumeration_is_denied() {
    // Not even the wildcard default applies to an undeclared role.
    let decision = read(&Subject::new("goalie"), "tradePlayer");
    assert!(!decision.allowed);
    assert!(decision.matched_rule.is_none());
}

// ── actions and subjects ────────────────────────────────────────

#[test]
fn write_requires_full() {
    let engine = PolicyEngine::new();
    let schema = snapshot();
    let manager = Subject::new("manager");
    let admin = Subject::new("admin");
    assert!(!engine.evaluate_access(&schema, &manager, "Player", RequestedAction::Write).unwrap().allowed);
    assert!(engine.evaluate_access(&schema, &admin, "Player", RequestedAction::Write).unwrap().allowed);
}

#[test]
fn execute_action_policy() {
    let engine = PolicyEngine::new();
    let schema = snapshot();
    let manager = engine
        .evaluate_access(&schema, &Subject::new("manager"), "tradePlayer", RequestedAction::Execute)
        .unwrap();
    assert!(manager.allowed);
    // The explicit default grants read only.
    let scout = engine
        .evaluate_access(&schema, &Subject::new("scout"), "tradePlayer", RequestedAction::Execute)
        .unwrap();
    assert!(!scout.allowed);
    assert_eq!(scout.specificity(), Some(Specificity::Default));
}

#[test]
fn missing_role_is_caller_error() {
    let engine = PolicyEngine::new();
    let err = engine
        .evaluate_access(&snapshot(), &Subject::default(), "Player", RequestedAction::Read)
        .unwrap_err();
    assert!(matches!(err, PolicyError::InvalidSubject(_)));

    let blank = Subject::new("  ");
    assert!(engine
        .evaluate_access(&snapshot(), &blank, "Player", RequestedAction::Read)
        .is_err());
}

// ── projection ──────────────────────────────────────────────────

#[test]
fn visible_properties_keep_primary_key() {
    let schema = snapshot();
    let player = schema.object_type("Player").unwrap();
    let decision = read(&Subject::new("scout"), "Player");

    let all = decision.visible_properties(player, None);
    assert_eq!(all, vec!["playerId", "name", "position", "teamId", "agentNotes", "ownerId"]);

    let requested = vec!["capHit".to_string(), "name".to_string(), "bogus".to_string()];
    assert_eq!(decision.visible_properties(player, Some(requested.as_slice())), vec!["playerId", "name"]);
}

// ── combining decisions ─────────────────────────────────────────

#[test]
fn intersecting_filters_keeps_every_deny() {
    let allow = ColumnFilter::Allow(set(&["name", "capHit", "position"]));
    let deny = ColumnFilter::Deny(set(&["capHit"]));

    assert_eq!(allow.clone().intersect(&deny), ColumnFilter::Allow(set(&["name", "position"])));
    assert_eq!(deny.clone().intersect(&allow), ColumnFilter::Allow(set(&["name", "position"])));
    assert_eq!(
        deny.clone().intersect(&ColumnFilter::Deny(set(&["agentNotes"]))),
        ColumnFilter::Deny(set(&["agentNotes", "capHit"]))
    );
    assert_eq!(
        allow.intersect(&ColumnFilter::Allow(set(&["name", "teamId"]))),
        ColumnFilter::Allow(set(&["name"]))
    );
}

#[test]
fn restricting_by_another_decision_hides_its_denied_fields() {
    let mut manager = read(&Subject::new("manager"), "Player");
    let scout = read(&Subject::new("scout"), "Player");
    assert!(manager.column_filter.permits("capHit"));

    manager.restrict_columns(&scout);
    assert!(!manager.column_filter.permits("capHit"));
    assert!(manager.column_filter.permits("name"));

    let mut record = player_record();
    manager.filter_record(&mut record, "playerId");
    assert!(!record.contains_key("capHit"));
    assert!(record.contains_key("playerId"));
}
