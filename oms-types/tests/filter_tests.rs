use oms_types::{Condition, FilterValue, RowFilter, SortKey};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

// ── FilterValue::from_json ───────────────────────────────────────

#[test]
fn from_json_scalars() {
    assert_eq!(FilterValue::from_json(&json!(null)).unwrap(), FilterValue::Null);
    assert_eq!(FilterValue::from_json(&json!(true)).unwrap(), FilterValue::Boolean(true));
    assert_eq!(FilterValue::from_json(&json!(42)).unwrap(), FilterValue::Integer(42));
    assert_eq!(FilterValue::from_json(&json!(1.5)).unwrap(), FilterValue::Float(1.5));
    assert_eq!(FilterValue::from_json(&json!("C")).unwrap(), FilterValue::Text("C".into()));
}

#[test]
fn from_json_list() {
    let value = FilterValue::from_json(&json!(["C", "LW"])).unwrap();
    assert_eq!(value, FilterValue::from(vec!["C", "LW"]));
    assert!(value.is_list());
}

#[test]
fn from_json_rejects_objects() {
    let err = FilterValue::from_json(&json!({"a": 1})).unwrap_err();
    assert!(err.to_string().contains("object"));
}

#[test]
fn to_json_inverts_from_json() {
    let original = json!([1, "two", false, null]);
    let value = FilterValue::from_json(&original).unwrap();
    assert_eq!(value.to_json(), original);
}

#[test]
fn untagged_deserialize_picks_runtime_type() {
    let value: FilterValue = serde_json::from_str("8479318").unwrap();
    assert_eq!(value, FilterValue::Integer(8_479_318));
    let value: FilterValue = serde_json::from_str("\"8479318\"").unwrap();
    assert_eq!(value, FilterValue::Text("8479318".into()));
}

// ── Display ──────────────────────────────────────────────────────

#[test]
fn display_quotes_text_only() {
    assert_eq!(FilterValue::from("x").to_string(), "\"x\"");
    assert_eq!(FilterValue::from(7i64).to_string(), "7");
    assert_eq!(FilterValue::from(vec![1i64, 2]).to_string(), "[1,2]");
}

// ── RowFilter ────────────────────────────────────────────────────

#[test]
fn row_filter_default_is_unrestricted() {
    let filter = RowFilter::default();
    assert!(!filter.is_deny());
    assert!(filter.conditions().is_empty());
    assert_eq!(filter.signature(), "*");
}

#[test]
fn row_filter_deny_signature() {
    assert!(RowFilter::Deny.is_deny());
    assert_eq!(RowFilter::Deny.signature(), "!");
}

#[test]
fn row_filter_signature_is_order_independent() {
    let a = RowFilter::Match(vec![Condition::new("teamId", "T1"), Condition::new("ownerId", "u1")]);
    let b = RowFilter::Match(vec![Condition::new("ownerId", "u1"), Condition::new("teamId", "T1")]);
    assert_eq!(a.signature(), b.signature());
    assert_eq!(a.conditions().len(), 2);
}

#[test]
fn row_filter_serde_shape() {
    let filter = RowFilter::Match(vec![Condition::new("teamId", "T1")]);
    let json = serde_json::to_value(&filter).unwrap();
    assert_eq!(json["kind"], "match");
    assert_eq!(json["conditions"][0]["field"], "teamId");
    let back: RowFilter = serde_json::from_value(json).unwrap();
    assert_eq!(back, filter);
}

#[test]
fn sort_key_constructors() {
    assert!(!SortKey::ascending("name").descending);
    assert!(SortKey::descending("capHit").descending);
}

proptest! {
    #[test]
    fn integer_filters_survive_json(i in any::<i64>()) {
        let value = FilterValue::from(i);
        prop_assert_eq!(FilterValue::from_json(&value.to_json()).unwrap(), value);
    }
}
