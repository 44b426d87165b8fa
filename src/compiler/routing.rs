use crate::branch::Condition;
use crate::spec::{FlowSpec, Screen, ScreenAction};
use itertools::Itertools;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// The vendor routing table: each screen's route followed by its distinct
/// branch targets in rule order.
pub(super) fn routing_table(spec: &FlowSpec) -> BTreeMap<String, Vec<String>> {
    spec.screens
        .iter()
        .map(|screen| {
            let route = spec
                .routing_model
                .get(&screen.id)
                .into_iter()
                .flatten()
                .cloned();
            let branch_targets = spec
                .branches(&screen.id)
                .iter()
                .filter_map(|rule| rule.next.clone());
            let targets = route
                .chain(branch_targets)
                .filter(|target| spec.has_screen(target))
                .unique()
                .collect();
            (screen.id.clone(), targets)
        })
        .collect()
}

/// True when some path out of the screen ends the flow.
pub(super) fn can_complete(spec: &FlowSpec, screen: &Screen) -> bool {
    if screen.terminal {
        return true;
    }
    let default_next = spec.default_next(&screen.id);
    match screen.action {
        ScreenAction::DataExchange { .. } => default_next.is_none(),
        _ => default_next.is_none() || spec.branches(&screen.id).iter().any(|r| r.next.is_none()),
    }
}

/// Builds the footer for a screen: a plain `Footer`, or a nested `If` chain
/// that tries branch rules top to bottom before falling back to the default.
pub(super) fn footer_tree(spec: &FlowSpec, screen: &Screen) -> Value {
    let label = screen.footer_label();

    if let ScreenAction::DataExchange { payload } = &screen.action {
        let payload: Map<String, Value> = payload
            .iter()
            .map(|(k, v)| (k.clone(), json!(v)))
            .collect();
        return footer(label, json!({ "name": "data_exchange", "payload": payload }));
    }

    let fallback = footer(label, navigation_action(spec, screen, spec.default_next(&screen.id)));
    spec.branches(&screen.id)
        .iter()
        .rev()
        .fold(fallback, |otherwise, rule| {
            let then = footer(label, navigation_action(spec, screen, rule.next.as_deref()));
            json!({
                "type": "If",
                "condition": Condition::lower(rule, screen).to_string(),
                "then": [then],
                "else": [otherwise],
            })
        })
}

fn footer(label: &str, action: Value) -> Value {
    json!({
        "type": "Footer",
        "label": label,
        "on-click-action": action,
    })
}

fn navigation_action(spec: &FlowSpec, screen: &Screen, target: Option<&str>) -> Value {
    match target {
        Some(next) => json!({
            "name": "navigate",
            "next": { "type": "screen", "name": next },
            "payload": {},
        }),
        None => json!({
            "name": "complete",
            "payload": complete_payload(spec, screen),
        }),
    }
}

/// Collects every input of the flow for the completion payload. Fields of the
/// current screen are read from `form`, the rest through the global
/// `screen.<ID>.form` reference. Keys that collide with an earlier one are
/// prefixed by the lowercase screen id.
pub(super) fn complete_payload(spec: &FlowSpec, current: &Screen) -> Map<String, Value> {
    let mut payload = Map::new();
    let ordered = std::iter::once(current).chain(spec.screens.iter().filter(|s| s.id != current.id));
    for screen in ordered {
        for block in screen.inputs() {
            let Some(name) = block.name() else {
                continue;
            };
            let reference = if screen.id == current.id {
                format!("${{form.{}}}", name)
            } else {
                format!("${{screen.{}.form.{}}}", screen.id, name)
            };
            let key = if payload.contains_key(name) {
                format!("{}_{}", screen.id.to_lowercase(), name)
            } else {
                name.to_string()
            };
            payload.insert(key, Value::String(reference));
        }
    }
    payload
}
