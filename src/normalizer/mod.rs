//! Repairs a possibly partial or legacy-shaped flow into a canonical [`FlowSpec`].
//!
//! Normalization is pure and total: malformed input never produces an error,
//! it degrades to the single default screen. Running it on its own output
//! returns an equal spec.

use crate::spec::ids::{next_screen_id, sanitize_name, unique_name};
use crate::spec::{FlowSpec, convert};
use ahash::AHashSet;
use serde_json::Value;

mod blocks;
mod routes;

pub(crate) use blocks::repaired_name;

/// Name used when neither the caller nor the config provides one.
pub const FALLBACK_FLOW_NAME: &str = "Untitled flow";

/// Normalizes specs on behalf of one named flow.
#[derive(Debug, Clone)]
pub struct Normalizer {
    flow_name: String,
}

impl Normalizer {
    pub fn new(flow_name: &str) -> Self {
        let flow_name = match flow_name.trim() {
            "" => FALLBACK_FLOW_NAME.to_string(),
            trimmed => trimmed.to_string(),
        };
        Self { flow_name }
    }

    pub fn flow_name(&self) -> &str {
        &self.flow_name
    }

    /// Detects the input shape, converts it and normalizes the result.
    pub fn normalize(&self, raw: &Value) -> FlowSpec {
        match convert(raw, &self.flow_name) {
            Ok(spec) => self.normalize_spec(spec),
            Err(e) => {
                tracing::debug!(error = %e, "falling back to the default spec");
                FlowSpec::single_screen(&self.flow_name)
            }
        }
    }

    pub fn normalize_spec(&self, mut spec: FlowSpec) -> FlowSpec {
        if spec.screens.is_empty() {
            let mut fallback = FlowSpec::single_screen(&self.flow_name);
            fallback.services = spec.services;
            fallback.date_component = spec.date_component;
            spec = fallback;
        }

        self.repair_screen_ids(&mut spec);

        for screen in spec.screens.iter_mut() {
            if screen.title.trim().is_empty() {
                screen.title = self.flow_name.clone();
            }
            blocks::wrap_in_single_form(screen);
            let renames = blocks::repair_names(screen);
            if !renames.is_empty() {
                blocks::rename_payload_refs(screen, &renames);
                if let Some(rules) = spec.branches_by_screen.get_mut(&screen.id) {
                    for rule in rules.iter_mut() {
                        if let Some(new) = renames.get(&rule.field) {
                            rule.field = new.clone();
                        }
                    }
                }
            }
            blocks::ensure_data_bindings(screen);
        }

        routes::reconcile(&mut spec);
        repair_services(&mut spec);
        spec
    }

    /// Trims ids and regenerates empty or duplicated ones. References to a
    /// duplicated id keep pointing at its first holder.
    fn repair_screen_ids(&self, spec: &mut FlowSpec) {
        let mut taken: AHashSet<String> = AHashSet::new();
        let mut needs_id = Vec::new();
        for (index, screen) in spec.screens.iter_mut().enumerate() {
            let trimmed = screen.id.trim().to_string();
            if trimmed.is_empty() || taken.contains(&trimmed) {
                needs_id.push(index);
            } else {
                screen.id = trimmed.clone();
                taken.insert(trimmed);
            }
        }
        for index in needs_id {
            let fresh = next_screen_id(taken.iter().map(String::as_str));
            tracing::debug!(from = %spec.screens[index].id, to = %fresh, "regenerated screen id");
            spec.screens[index].id = fresh.clone();
            taken.insert(fresh);
        }
    }
}

fn repair_services(spec: &mut FlowSpec) {
    let mut taken: AHashSet<String> = AHashSet::new();
    for service in spec.services.iter_mut() {
        let mut base = sanitize_name(&service.id);
        if base.is_empty() {
            base = sanitize_name(&service.title);
        }
        if base.is_empty() {
            base = "service".to_string();
        }
        let fixed = unique_name(&base, &taken);
        service.id = fixed.clone();
        taken.insert(fixed);
    }
}

/// Normalizes any accepted raw input shape. See [`Normalizer::normalize`].
pub fn normalize(raw: &Value, flow_name: &str) -> FlowSpec {
    Normalizer::new(flow_name).normalize(raw)
}

/// Normalizes an already typed spec. See [`Normalizer::normalize_spec`].
pub fn normalize_spec(spec: FlowSpec, flow_name: &str) -> FlowSpec {
    Normalizer::new(flow_name).normalize_spec(spec)
}
