use crate::error::ResolveError;
use crate::spec::{Block, BranchOp, BranchRule, FlowSpec, Screen, ScreenAction};
use ahash::AHashMap;
use serde_json::Value;

/// Submitted field values keyed by block name.
pub type Answers = AHashMap<String, Value>;

/// Where a screen's Continue goes for one set of answers, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The next screen, or `None` when the flow completes.
    pub next: Option<String>,
    /// One-based index of the rule that decided the route.
    pub matched_rule: Option<usize>,
    /// A human-readable explanation of the decision.
    pub reason: String,
}

/// Evaluates branch rules for live preview, with first-match-wins semantics.
pub struct RouteResolver<'a> {
    spec: &'a FlowSpec,
}

impl<'a> RouteResolver<'a> {
    pub fn new(spec: &'a FlowSpec) -> Self {
        Self { spec }
    }

    pub fn resolve(&self, screen_id: &str, answers: &Answers) -> Result<Resolution, ResolveError> {
        let screen = self
            .spec
            .screen(screen_id)
            .ok_or_else(|| ResolveError::UnknownScreen(screen_id.to_string()))?;

        if screen.terminal {
            return Ok(Resolution {
                next: None,
                matched_rule: None,
                reason: format!("{} is terminal; flow completes", screen.id),
            });
        }

        let default_next = self.spec.default_next(screen_id).map(str::to_string);
        if matches!(screen.action, ScreenAction::DataExchange { .. }) {
            return Ok(Resolution {
                reason: format!(
                    "{} hands routing to the data endpoint; planned next is {}",
                    screen.id,
                    describe_target(default_next.as_deref())
                ),
                next: default_next,
                matched_rule: None,
            });
        }

        for (index, rule) in self.spec.branches(screen_id).iter().enumerate() {
            let answer = answers.get(&rule.field);
            if matches_on_screen(screen, rule, answer) {
                return Ok(Resolution {
                    next: rule.next.clone(),
                    matched_rule: Some(index + 1),
                    reason: format!(
                        "rule #{} matched: {} (was {}) -> {}",
                        index + 1,
                        describe_rule(rule),
                        describe_answer(answer),
                        describe_target(rule.next.as_deref())
                    ),
                });
            }
        }

        let reason = match &default_next {
            Some(target) => format!("no rule matched; default next is {}", target),
            None => "no rule matched and no default; flow completes".to_string(),
        };
        Ok(Resolution {
            next: default_next,
            matched_rule: None,
            reason,
        })
    }
}

/// Tests a single rule against the submitted value of its field.
///
/// Text comparisons are exact and case-sensitive, matching the conditions the
/// compiler emits. Numbers compare numerically when the answer is a number.
pub fn rule_matches(rule: &BranchRule, answer: Option<&Value>) -> bool {
    let raw = rule.value.as_deref().unwrap_or_default();
    let comparand = raw.trim();
    match rule.op {
        BranchOp::IsFilled => is_filled(answer),
        BranchOp::IsEmpty => !is_filled(answer),
        BranchOp::Equals => answer.is_some_and(|v| exactly_equals(v, raw)),
        BranchOp::Contains => answer.is_some_and(|v| match v {
            Value::Array(items) => items.iter().any(|item| exactly_equals(item, raw)),
            other => as_text(other).contains(raw),
        }),
        BranchOp::Gt => numeric_pair(answer, comparand).is_some_and(|(a, b)| a > b),
        BranchOp::Lt => numeric_pair(answer, comparand).is_some_and(|(a, b)| a < b),
        BranchOp::IsTrue => matches!(truthiness(answer), Some(true)),
        BranchOp::IsFalse => !matches!(truthiness(answer), Some(true)),
    }
}

/// A `contains` rule on a single-valued choice compiles to equality, so it is
/// evaluated that way here too.
fn matches_on_screen(screen: &Screen, rule: &BranchRule, answer: Option<&Value>) -> bool {
    let single_choice = screen
        .input(&rule.field)
        .is_some_and(Block::is_single_valued_choice);
    if rule.op == BranchOp::Contains && single_choice {
        let as_equals = BranchRule {
            op: BranchOp::Equals,
            ..rule.clone()
        };
        return rule_matches(&as_equals, answer);
    }
    rule_matches(rule, answer)
}

fn is_filled(answer: Option<&Value>) -> bool {
    match answer {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Bool(_)) | Some(Value::Number(_)) => true,
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn exactly_equals(value: &Value, raw: &str) -> bool {
    if let (Value::Number(n), Ok(b)) = (value, raw.trim().parse::<f64>()) {
        return n.as_f64() == Some(b);
    }
    as_text(value) == raw
}

fn numeric_pair(answer: Option<&Value>, comparand: &str) -> Option<(f64, f64)> {
    let a = answer.and_then(as_number)?;
    let b = comparand.parse::<f64>().ok()?;
    Some((a, b))
}

/// `None` for values that are neither boolean nor a boolean-looking string.
fn truthiness(answer: Option<&Value>) -> Option<bool> {
    match answer? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn describe_rule(rule: &BranchRule) -> String {
    match &rule.value {
        Some(value) if rule.op.needs_value() => format!("{} {} '{}'", rule.field, rule.op, value),
        _ => format!("{} {}", rule.field, rule.op),
    }
}

fn describe_answer(answer: Option<&Value>) -> String {
    match answer {
        None => "missing".to_string(),
        Some(value) => value.to_string(),
    }
}

fn describe_target(target: Option<&str>) -> String {
    match target {
        Some(id) => id.to_string(),
        None => "completion".to_string(),
    }
}
