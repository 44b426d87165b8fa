use super::block::{Block, FormBlock, input_blocks};
use super::ids::screen_id_for_index;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The canonical, normalized representation of one interactive flow.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSpec {
    #[serde(default)]
    pub screens: Vec<Screen>,
    #[serde(default)]
    pub routing_model: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub default_next_by_screen: BTreeMap<String, Option<String>>,
    #[serde(default)]
    pub branches_by_screen: BTreeMap<String, Vec<BranchRule>>,
    #[serde(default)]
    pub services: Vec<BookingService>,
    #[serde(default)]
    pub date_component: DateComponent,
}

impl FlowSpec {
    /// The fallback spec: one terminal screen titled after the flow.
    pub fn single_screen(flow_name: &str) -> Self {
        let id = screen_id_for_index(0);
        let mut spec = FlowSpec {
            screens: vec![Screen::new(&id, flow_name)],
            ..FlowSpec::default()
        };
        spec.routing_model.insert(id.clone(), Vec::new());
        spec.default_next_by_screen.insert(id, None);
        spec
    }

    pub fn screen(&self, id: &str) -> Option<&Screen> {
        self.screens.iter().find(|s| s.id == id)
    }

    pub fn screen_mut(&mut self, id: &str) -> Option<&mut Screen> {
        self.screens.iter_mut().find(|s| s.id == id)
    }

    pub fn screen_index(&self, id: &str) -> Option<usize> {
        self.screens.iter().position(|s| s.id == id)
    }

    pub fn has_screen(&self, id: &str) -> bool {
        self.screen(id).is_some()
    }

    pub fn screen_ids(&self) -> impl Iterator<Item = &str> {
        self.screens.iter().map(|s| s.id.as_str())
    }

    /// Branch rules of a screen, empty when none are configured.
    pub fn branches(&self, screen_id: &str) -> &[BranchRule] {
        self.branches_by_screen
            .get(screen_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The configured "Continue" destination of a screen.
    pub fn default_next(&self, screen_id: &str) -> Option<&str> {
        self.default_next_by_screen
            .get(screen_id)
            .and_then(|n| n.as_deref())
    }

    /// Points a screen at `next` (or at nothing), keeping action, route and
    /// default-next in agreement. Clears `terminal` when a successor is set.
    pub fn set_successor(&mut self, screen_id: &str, next: Option<String>) {
        let Some(screen) = self.screen_mut(screen_id) else {
            return;
        };
        match &next {
            Some(target) => {
                screen.terminal = false;
                if !matches!(screen.action, ScreenAction::DataExchange { .. }) {
                    screen.action = ScreenAction::Navigate {
                        screen: Some(target.clone()),
                    };
                }
            }
            None => {
                if let ScreenAction::Navigate { screen: target } = &mut screen.action {
                    *target = None;
                }
            }
        }
        self.routing_model
            .insert(screen_id.to_string(), next.iter().cloned().collect());
        self.default_next_by_screen
            .insert(screen_id.to_string(), next);
    }
}

/// One page of the flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Screen {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub terminal: bool,
    #[serde(default)]
    pub components: Vec<Block>,
    #[serde(default)]
    pub action: ScreenAction,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, DataBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta_label: Option<String>,
}

impl Screen {
    /// A terminal screen holding a single empty form.
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            terminal: true,
            components: vec![Block::Form(FormBlock::default())],
            action: ScreenAction::Complete,
            data: BTreeMap::new(),
            cta_label: None,
        }
    }

    /// The blocks inside the screen's form, or the top-level blocks if there is none.
    pub fn form_children(&self) -> &[Block] {
        match self.components.first() {
            Some(Block::Form(form)) => &form.children,
            _ => &self.components,
        }
    }

    /// Mutable access to the form's children. `None` until the screen is normalized.
    pub fn form_children_mut(&mut self) -> Option<&mut Vec<Block>> {
        match self.components.first_mut() {
            Some(Block::Form(form)) => Some(&mut form.children),
            _ => None,
        }
    }

    /// Every input block on the screen, in document order.
    pub fn inputs(&self) -> Vec<&Block> {
        input_blocks(&self.components)
    }

    pub fn input(&self, name: &str) -> Option<&Block> {
        self.inputs().into_iter().find(|b| b.name() == Some(name))
    }

    pub fn footer_label(&self) -> &str {
        match &self.cta_label {
            Some(label) if !label.trim().is_empty() => label,
            _ if self.terminal => "Submit",
            _ => "Continue",
        }
    }
}

/// The call-to-action of a screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScreenAction {
    Navigate {
        #[serde(default)]
        screen: Option<String>,
    },
    DataExchange {
        #[serde(default)]
        payload: BTreeMap<String, String>,
    },
    #[default]
    Complete,
}

impl ScreenAction {
    pub fn type_name(&self) -> &'static str {
        match self {
            ScreenAction::Navigate { .. } => "navigate",
            ScreenAction::DataExchange { .. } => "data_exchange",
            ScreenAction::Complete => "complete",
        }
    }

    pub fn navigate_target(&self) -> Option<&str> {
        match self {
            ScreenAction::Navigate { screen } => screen.as_deref(),
            _ => None,
        }
    }
}

/// Schema descriptor plus preview literal for a `${data.<key>}` binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataBinding {
    #[serde(rename = "type", default = "default_binding_type")]
    pub schema_type: String,
    #[serde(rename = "__example__", default)]
    pub example: serde_json::Value,
}

fn default_binding_type() -> String {
    "string".to_string()
}

impl DataBinding {
    pub fn string(example: &str) -> Self {
        Self {
            schema_type: default_binding_type(),
            example: serde_json::Value::String(example.to_string()),
        }
    }
}

/// A conditional routing decision evaluated against a submitted field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRule {
    pub field: String,
    pub op: BranchOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default)]
    pub next: Option<String>,
}

impl BranchRule {
    pub fn new(field: &str, op: BranchOp, value: Option<&str>, next: Option<&str>) -> Self {
        Self {
            field: field.to_string(),
            op,
            value: value.map(str::to_string),
            next: next.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchOp {
    IsFilled,
    IsEmpty,
    Equals,
    Contains,
    Gt,
    Lt,
    IsTrue,
    IsFalse,
}

impl BranchOp {
    /// Operators that compare against `BranchRule::value`.
    pub fn needs_value(&self) -> bool {
        matches!(
            self,
            BranchOp::Equals | BranchOp::Contains | BranchOp::Gt | BranchOp::Lt
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, BranchOp::Gt | BranchOp::Lt)
    }
}

impl fmt::Display for BranchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BranchOp::IsFilled => "is filled",
            BranchOp::IsEmpty => "is empty",
            BranchOp::Equals => "equals",
            BranchOp::Contains => "contains",
            BranchOp::Gt => ">",
            BranchOp::Lt => "<",
            BranchOp::IsTrue => "is true",
            BranchOp::IsFalse => "is false",
        };
        f.write_str(s)
    }
}

/// A bookable service offered by the booking specialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingService {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateComponent {
    #[serde(default)]
    pub mode: DateMode,
    #[serde(default = "default_date_label")]
    pub label: String,
}

fn default_date_label() -> String {
    "Date".to_string()
}

impl Default for DateComponent {
    fn default() -> Self {
        Self {
            mode: DateMode::default(),
            label: default_date_label(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateMode {
    Calendar,
    #[default]
    DatePicker,
}
