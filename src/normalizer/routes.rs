use crate::spec::{BranchRule, FlowSpec, ScreenAction};
use ahash::AHashSet;
use std::collections::BTreeMap;

/// Derives every screen's successor in one place and rewrites action, route and
/// default-next from it, so the three never disagree.
///
/// The routing entry is authoritative. For a non-terminal screen the first of
/// routing entry, navigate target and default-next that names another existing
/// screen wins.
/// Terminal screens have no successor and no branch rules. Data exchange
/// screens keep their successor but never branch rules, since the endpoint
/// decides the route.
pub(super) fn reconcile(spec: &mut FlowSpec) {
    let valid: AHashSet<String> = spec.screens.iter().map(|s| s.id.clone()).collect();

    let mut routing_model = BTreeMap::new();
    let mut default_next_by_screen = BTreeMap::new();
    let mut branches_by_screen = BTreeMap::new();

    for screen in spec.screens.iter_mut() {
        let id = screen.id.clone();
        let is_target = |candidate: &str| candidate != id && valid.contains(candidate);

        let mut rules: Vec<BranchRule> = spec
            .branches_by_screen
            .remove(&id)
            .unwrap_or_default()
            .into_iter()
            .map(|mut rule| {
                if rule.next.as_deref().is_some_and(|n| !is_target(n)) {
                    tracing::debug!(screen = %id, next = ?rule.next, "nulled dangling branch target");
                    rule.next = None;
                }
                if !rule.op.needs_value() {
                    rule.value = None;
                }
                rule
            })
            .collect();

        let server_routed = matches!(screen.action, ScreenAction::DataExchange { .. });
        if server_routed && !rules.is_empty() {
            tracing::debug!(screen = %id, dropped = rules.len(), "branch rules dropped on data exchange screen");
            rules.clear();
        }

        let successor = if screen.terminal {
            None
        } else {
            let candidates = [
                spec.routing_model
                    .get(&id)
                    .and_then(|targets| targets.first().cloned()),
                screen.action.navigate_target().map(str::to_string),
                spec.default_next_by_screen.get(&id).cloned().flatten(),
            ];
            candidates
                .into_iter()
                .flatten()
                .find(|c| is_target(c.as_str()))
        };

        if screen.terminal {
            if !matches!(screen.action, ScreenAction::Complete) || !rules.is_empty() {
                tracing::debug!(screen = %id, "terminal screen forced to complete");
            }
            screen.action = ScreenAction::Complete;
        } else {
            match &successor {
                Some(target) => {
                    if !matches!(screen.action, ScreenAction::DataExchange { .. }) {
                        screen.action = ScreenAction::Navigate {
                            screen: Some(target.clone()),
                        };
                    }
                }
                None if !rules.is_empty()
                    || matches!(screen.action, ScreenAction::DataExchange { .. }) =>
                {
                    if !matches!(screen.action, ScreenAction::DataExchange { .. }) {
                        screen.action = ScreenAction::Navigate { screen: None };
                    }
                }
                None => {
                    tracing::debug!(screen = %id, "screen without successor made terminal");
                    screen.terminal = true;
                    screen.action = ScreenAction::Complete;
                }
            }
        }

        if !screen.terminal && !rules.is_empty() {
            branches_by_screen.insert(id.clone(), rules);
        }
        routing_model.insert(id.clone(), successor.iter().cloned().collect::<Vec<_>>());
        default_next_by_screen.insert(id, successor);
    }

    spec.routing_model = routing_model;
    spec.default_next_by_screen = default_next_by_screen;
    spec.branches_by_screen = branches_by_screen;
}
