//! Route preview tests for branch rule evaluation.
mod common;
use common::*;
use flowspec::branch::{Condition, rule_matches};
use flowspec::error::ResolveError;
use flowspec::prelude::*;
use serde_json::{Value, json};

fn rule(op: BranchOp, value: Option<&str>) -> BranchRule {
    BranchRule::new("field", op, value, None)
}

fn matches(op: BranchOp, value: Option<&str>, answer: Option<Value>) -> bool {
    rule_matches(&rule(op, value), answer.as_ref())
}

#[test]
fn test_default_route_when_nothing_matches() {
    let spec = branching_spec();
    let input = answers(&[("plan", json!("basic")), ("age", json!(30))]);

    let resolution = RouteResolver::new(&spec).resolve("SCREEN_A", &input).unwrap();
    assert_eq!(resolution.next.as_deref(), Some("SCREEN_B"));
    assert_eq!(resolution.matched_rule, None);
    assert_eq!(resolution.reason, "no rule matched; default next is SCREEN_B");
}

#[test]
fn test_second_rule_matches() {
    let spec = branching_spec();
    let input = answers(&[("plan", json!("basic")), ("age", json!("70"))]);

    let resolution = RouteResolver::new(&spec).resolve("SCREEN_A", &input).unwrap();
    assert_eq!(resolution.next.as_deref(), Some("SCREEN_D"));
    assert_eq!(resolution.matched_rule, Some(2));
    assert_eq!(resolution.reason, "rule #2 matched: age > '65' (was \"70\") -> SCREEN_D");
}

#[test]
fn test_no_default_completes() {
    let mut spec = branching_spec();
    spec.set_successor("SCREEN_A", None);
    let spec = normalize_spec(spec, FLOW_NAME);

    let resolution = RouteResolver::new(&spec)
        .resolve("SCREEN_A", &Answers::default())
        .unwrap();
    assert_eq!(resolution.next, None);
    assert_eq!(resolution.reason, "no rule matched and no default; flow completes");
}

#[test]
fn test_terminal_screen_completes() {
    let spec = branching_spec();
    let resolution = RouteResolver::new(&spec)
        .resolve("SCREEN_B", &Answers::default())
        .unwrap();
    assert_eq!(resolution.next, None);
    assert!(resolution.reason.contains("terminal"));
}

#[test]
fn test_unknown_screen_is_an_error() {
    let spec = branching_spec();
    let err = RouteResolver::new(&spec)
        .resolve("SCREEN_Q", &Answers::default())
        .unwrap_err();
    assert_eq!(err, ResolveError::UnknownScreen("SCREEN_Q".to_string()));
}

#[test]
fn test_filled_and_empty() {
    assert!(matches(BranchOp::IsFilled, None, Some(json!("x"))));
    assert!(matches(BranchOp::IsFilled, None, Some(json!(0))));
    assert!(matches(BranchOp::IsFilled, None, Some(json!(false))));
    assert!(matches(BranchOp::IsFilled, None, Some(json!(["a"]))));
    assert!(!matches(BranchOp::IsFilled, None, Some(json!("   "))));
    assert!(!matches(BranchOp::IsFilled, None, Some(json!([]))));
    assert!(!matches(BranchOp::IsFilled, None, Some(Value::Null)));
    assert!(!matches(BranchOp::IsFilled, None, None));
    assert!(matches(BranchOp::IsEmpty, None, None));
    assert!(matches(BranchOp::IsEmpty, None, Some(json!(""))));
}

#[test]
fn test_equals_is_exact() {
    assert!(matches(BranchOp::Equals, Some("Pro"), Some(json!("Pro"))));
    assert!(!matches(BranchOp::Equals, Some("Pro"), Some(json!("pro"))));
    assert!(!matches(BranchOp::Equals, Some("Pro"), Some(json!(" Pro "))));
    assert!(matches(BranchOp::Equals, Some("42"), Some(json!(42))));
    assert!(matches(BranchOp::Equals, Some("42"), Some(json!(42.0))));
    assert!(!matches(BranchOp::Equals, Some("42"), Some(json!("42.0"))));
    assert!(!matches(BranchOp::Equals, Some("42"), Some(json!(43))));
    assert!(!matches(BranchOp::Equals, Some("pro"), None));
}

#[test]
fn test_contains_on_lists_and_text() {
    assert!(matches(BranchOp::Contains, Some("wifi"), Some(json!(["parking", "wifi"]))));
    assert!(!matches(BranchOp::Contains, Some("pool"), Some(json!(["parking", "wifi"]))));
    assert!(!matches(BranchOp::Contains, Some("WIFI"), Some(json!(["parking", "wifi"]))));
    assert!(matches(BranchOp::Contains, Some("URGENT"), Some(json!("Very URGENT request"))));
    assert!(!matches(BranchOp::Contains, Some("urgent"), Some(json!("Very URGENT request"))));
}

/// Preview routing must agree with the condition the compiled flow evaluates.
#[test]
fn test_preview_agrees_with_compiled_conditions() {
    let mut spec = FlowSpec {
        screens: vec![
            screen(
                "SCREEN_A",
                "Survey",
                vec![
                    Block::short_text("answer", "Answer", true),
                    dropdown("plan", "Plan", &[("pro", "Pro"), ("pro_plus", "Pro Plus")]),
                ],
            ),
            screen("SCREEN_B", "Default", vec![Block::body("Default")]),
            screen("SCREEN_C", "Agreed", vec![Block::body("Agreed")]),
            screen("SCREEN_D", "Pro", vec![Block::body("Pro")]),
        ],
        ..FlowSpec::default()
    };
    spec.set_successor("SCREEN_A", Some("SCREEN_B".to_string()));
    spec.branches_by_screen.insert(
        "SCREEN_A".to_string(),
        vec![
            BranchRule::new("answer", BranchOp::Equals, Some("Yes"), Some("SCREEN_C")),
            BranchRule::new("plan", BranchOp::Contains, Some("pro"), Some("SCREEN_D")),
        ],
    );
    let spec = normalize_spec(spec, FLOW_NAME);
    let rules = spec.branches("SCREEN_A");
    let screen_a = spec.screen("SCREEN_A").unwrap();
    assert_eq!(
        Condition::lower(&rules[0], screen_a).to_string(),
        "${form.answer} == 'Yes'"
    );
    assert_eq!(
        Condition::lower(&rules[1], screen_a).to_string(),
        "${form.plan} == 'pro'"
    );

    let resolver = RouteResolver::new(&spec);
    let next = |pairs: &[(&str, Value)]| resolver.resolve("SCREEN_A", &answers(pairs)).unwrap().next;

    assert_eq!(next(&[("answer", json!("Yes"))]).as_deref(), Some("SCREEN_C"));
    assert_eq!(next(&[("answer", json!("yes"))]).as_deref(), Some("SCREEN_B"));
    assert_eq!(next(&[("answer", json!("Yes "))]).as_deref(), Some("SCREEN_B"));
    assert_eq!(next(&[("plan", json!("pro"))]).as_deref(), Some("SCREEN_D"));
    assert_eq!(next(&[("plan", json!("pro_plus"))]).as_deref(), Some("SCREEN_B"));
}

#[test]
fn test_numeric_comparisons() {
    assert!(matches(BranchOp::Gt, Some("18"), Some(json!(21))));
    assert!(!matches(BranchOp::Gt, Some("18"), Some(json!(18))));
    assert!(matches(BranchOp::Lt, Some("10"), Some(json!("9.5"))));
    assert!(!matches(BranchOp::Lt, Some("10"), Some(json!("nine"))));
    assert!(!matches(BranchOp::Gt, Some("many"), Some(json!(5))));
}

#[test]
fn test_truthiness() {
    assert!(matches(BranchOp::IsTrue, None, Some(json!(true))));
    assert!(matches(BranchOp::IsTrue, None, Some(json!("TRUE"))));
    assert!(!matches(BranchOp::IsTrue, None, Some(json!("yes"))));
    assert!(matches(BranchOp::IsFalse, None, Some(json!(false))));
    assert!(matches(BranchOp::IsFalse, None, Some(json!("false"))));
    assert!(matches(BranchOp::IsFalse, None, None));
    assert!(!matches(BranchOp::IsFalse, None, Some(json!(true))));
}
