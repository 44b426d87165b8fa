//! Advisory structural checks over a flow spec.
//!
//! Issues never stop editing; they gate compilation through
//! [`crate::compiler::compile_checked`] and saving through the editor.

use crate::spec::{BranchOp, FlowSpec, Screen, ScreenAction};
use ahash::AHashSet;
use itertools::Itertools;
use thiserror::Error;

/// One structural problem found in a spec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    #[error("Flow has no screens")]
    EmptyFlow,

    #[error("Screen id '{0}' is used by more than one screen")]
    DuplicateScreenId(String),

    #[error("Screen '{screen_id}': {location} points to unknown screen '{target}'")]
    DanglingReference {
        screen_id: String,
        location: String,
        target: String,
    },

    #[error("Screen '{0}' has more than one routing target")]
    MultipleRoutes(String),

    #[error("Screen '{0}' is terminal but still has a successor or a non-complete action")]
    TerminalWithSuccessor(String),

    #[error("Screen '{screen_id}' navigates to '{action_target}' but routes to '{route_target}'")]
    RouteMismatch {
        screen_id: String,
        action_target: String,
        route_target: String,
    },

    #[error("Screen '{0}' has no next destination: set a default next screen or add a branch")]
    NoNextDestination(String),

    #[error("Screen '{screen_id}': field name '{name}' is used more than once")]
    DuplicateBlockName { screen_id: String, name: String },

    #[error("Screen '{screen_id}': {kind} block #{index} has no name")]
    UnnamedInput {
        screen_id: String,
        kind: String,
        index: usize,
    },

    #[error("Screen '{screen_id}': field '{name}' has no label")]
    MissingLabel { screen_id: String, name: String },

    #[error("Screen '{screen_id}': choice field '{name}' has no options")]
    EmptyChoices { screen_id: String, name: String },

    #[error("Screen '{screen_id}': choice field '{name}' repeats option id '{option_id}'")]
    DuplicateOptionId {
        screen_id: String,
        name: String,
        option_id: String,
    },

    #[error("Screen '{screen_id}': branch rule #{rule} uses unknown field '{field}'")]
    UnknownBranchField {
        screen_id: String,
        rule: usize,
        field: String,
    },

    #[error("Screen '{screen_id}': branch rule #{rule} ('{op}') needs a value")]
    MissingBranchValue {
        screen_id: String,
        rule: usize,
        op: BranchOp,
    },

    #[error("Screen '{screen_id}': branch rule #{rule} compares against non-numeric '{value}'")]
    NonNumericBranchValue {
        screen_id: String,
        rule: usize,
        value: String,
    },

    #[error("Screen '{screen_id}': data exchange payload '{key}' references unknown field '{field}'")]
    UnknownPayloadField {
        screen_id: String,
        key: String,
        field: String,
    },

    #[error("Flow never completes: mark a screen as terminal or route a branch to completion")]
    NoCompletion,
}

/// Runs every check over a spec.
pub struct Validator<'a> {
    spec: &'a FlowSpec,
    screen_ids: AHashSet<&'a str>,
}

impl<'a> Validator<'a> {
    pub fn new(spec: &'a FlowSpec) -> Self {
        Self {
            spec,
            screen_ids: spec.screen_ids().collect(),
        }
    }

    /// Every issue in a stable order: flow-level first, then per screen.
    pub fn issues(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if self.spec.screens.is_empty() {
            issues.push(ValidationIssue::EmptyFlow);
            return issues;
        }

        issues.extend(
            self.spec
                .screens
                .iter()
                .map(|s| s.id.as_str())
                .duplicates()
                .map(|id| ValidationIssue::DuplicateScreenId(id.to_string())),
        );

        for screen in &self.spec.screens {
            self.check_routes(screen, &mut issues);
            self.check_blocks(screen, &mut issues);
            self.check_branches(screen, &mut issues);
            self.check_payload(screen, &mut issues);
        }

        if !self.can_complete() {
            issues.push(ValidationIssue::NoCompletion);
        }

        self.log_orphans();
        issues
    }

    fn dangling(&self, screen: &Screen, location: &str, target: &str) -> Option<ValidationIssue> {
        (!self.screen_ids.contains(target)).then(|| ValidationIssue::DanglingReference {
            screen_id: screen.id.clone(),
            location: location.to_string(),
            target: target.to_string(),
        })
    }

    fn check_routes(&self, screen: &Screen, issues: &mut Vec<ValidationIssue>) {
        let route = self
            .spec
            .routing_model
            .get(&screen.id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let default_next = self.spec.default_next(&screen.id);
        let action_target = screen.action.navigate_target();

        issues.extend(
            route
                .iter()
                .filter_map(|t| self.dangling(screen, "routing entry", t)),
        );
        issues.extend(default_next.and_then(|t| self.dangling(screen, "default next", t)));
        issues.extend(action_target.and_then(|t| self.dangling(screen, "navigate action", t)));

        if route.len() > 1 {
            issues.push(ValidationIssue::MultipleRoutes(screen.id.clone()));
        }

        if screen.terminal {
            if !route.is_empty()
                || default_next.is_some()
                || !matches!(screen.action, ScreenAction::Complete)
            {
                issues.push(ValidationIssue::TerminalWithSuccessor(screen.id.clone()));
            }
            return;
        }

        if let (Some(action_target), Some(route_target)) = (action_target, route.first()) {
            if action_target != route_target.as_str() {
                issues.push(ValidationIssue::RouteMismatch {
                    screen_id: screen.id.clone(),
                    action_target: action_target.to_string(),
                    route_target: route_target.clone(),
                });
            }
        }

        let has_default = default_next.is_some() || !route.is_empty() || action_target.is_some();
        let has_branch_target = self
            .spec
            .branches(&screen.id)
            .iter()
            .any(|rule| rule.next.is_some());
        let server_routed = matches!(screen.action, ScreenAction::DataExchange { .. });
        if !has_default && !has_branch_target && !server_routed {
            issues.push(ValidationIssue::NoNextDestination(screen.id.clone()));
        }
    }

    fn check_blocks(&self, screen: &Screen, issues: &mut Vec<ValidationIssue>) {
        let inputs = screen.inputs();

        for (index, block) in inputs.iter().enumerate() {
            let name = block.name().unwrap_or_default();
            if name.trim().is_empty() {
                issues.push(ValidationIssue::UnnamedInput {
                    screen_id: screen.id.clone(),
                    kind: block.kind().to_string(),
                    index,
                });
                continue;
            }
            if block.label().is_some_and(|l| l.trim().is_empty()) {
                issues.push(ValidationIssue::MissingLabel {
                    screen_id: screen.id.clone(),
                    name: name.to_string(),
                });
            }
            if let Some(options) = block.options() {
                if options.is_empty() {
                    issues.push(ValidationIssue::EmptyChoices {
                        screen_id: screen.id.clone(),
                        name: name.to_string(),
                    });
                }
                issues.extend(options.iter().map(|o| o.id.as_str()).duplicates().map(
                    |option_id| ValidationIssue::DuplicateOptionId {
                        screen_id: screen.id.clone(),
                        name: name.to_string(),
                        option_id: option_id.to_string(),
                    },
                ));
            }
        }

        issues.extend(
            inputs
                .iter()
                .filter_map(|b| b.name())
                .filter(|n| !n.trim().is_empty())
                .duplicates()
                .map(|name| ValidationIssue::DuplicateBlockName {
                    screen_id: screen.id.clone(),
                    name: name.to_string(),
                }),
        );
    }

    fn check_branches(&self, screen: &Screen, issues: &mut Vec<ValidationIssue>) {
        let location = |i: usize| format!("branch rule #{}", i + 1);
        for (i, rule) in self.spec.branches(&screen.id).iter().enumerate() {
            if screen.input(&rule.field).is_none() {
                issues.push(ValidationIssue::UnknownBranchField {
                    screen_id: screen.id.clone(),
                    rule: i + 1,
                    field: rule.field.clone(),
                });
            }
            if let Some(next) = &rule.next {
                issues.extend(self.dangling(screen, &location(i), next));
            }
            if !rule.op.needs_value() {
                continue;
            }
            match rule.value.as_deref().map(str::trim) {
                None | Some("") => issues.push(ValidationIssue::MissingBranchValue {
                    screen_id: screen.id.clone(),
                    rule: i + 1,
                    op: rule.op,
                }),
                Some(value) if rule.op.is_numeric() && value.parse::<f64>().is_err() => {
                    issues.push(ValidationIssue::NonNumericBranchValue {
                        screen_id: screen.id.clone(),
                        rule: i + 1,
                        value: value.to_string(),
                    })
                }
                Some(_) => {}
            }
        }
    }

    fn check_payload(&self, screen: &Screen, issues: &mut Vec<ValidationIssue>) {
        let ScreenAction::DataExchange { payload } = &screen.action else {
            return;
        };
        for (key, reference) in payload {
            let Some(field) = form_reference(reference) else {
                continue;
            };
            if screen.input(field).is_none() {
                issues.push(ValidationIssue::UnknownPayloadField {
                    screen_id: screen.id.clone(),
                    key: key.clone(),
                    field: field.to_string(),
                });
            }
        }
    }

    /// True if some screen ends the flow, some branch routes to completion or
    /// some branching screen completes when no rule matches.
    fn can_complete(&self) -> bool {
        self.spec.screens.iter().any(|s| {
            s.terminal
                || matches!(s.action, ScreenAction::DataExchange { .. })
                || self.spec.default_next(&s.id).is_none()
                || self.spec.branches(&s.id).iter().any(|r| r.next.is_none())
        })
    }

    fn log_orphans(&self) {
        let mut referenced: AHashSet<&str> = AHashSet::new();
        for targets in self.spec.routing_model.values() {
            referenced.extend(targets.iter().map(String::as_str));
        }
        for rules in self.spec.branches_by_screen.values() {
            referenced.extend(rules.iter().filter_map(|r| r.next.as_deref()));
        }
        for screen in self.spec.screens.iter().skip(1) {
            if !referenced.contains(screen.id.as_str()) {
                tracing::debug!(screen = %screen.id, "screen is not reachable from any route");
            }
        }
    }
}

/// Extracts `x` from a `${form.x}` reference.
pub fn form_reference(reference: &str) -> Option<&str> {
    reference
        .trim()
        .strip_prefix("${form.")?
        .strip_suffix('}')
        .filter(|f| !f.is_empty())
}

/// Returns the human-readable issue list for a spec; empty means valid.
pub fn validate(spec: &FlowSpec) -> Vec<String> {
    Validator::new(spec)
        .issues()
        .iter()
        .map(ToString::to_string)
        .collect()
}
