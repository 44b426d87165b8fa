use super::block::{Block, ChoiceBlock, ChoiceOption, FormBlock, InputBlock, TextBlock};
use super::ids::screen_id_for_index;
use super::model::{
    BookingService, BranchRule, DataBinding, DateComponent, DateMode, FlowSpec, Screen,
    ScreenAction,
};
use crate::compiler::components::block_kind_for_vendor;
use crate::error::ConversionError;
use crate::spec::BlockKind;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// A trait for stored or foreign shapes that can be turned into a `FlowSpec`.
///
/// Conversions are lossy: they keep what maps onto the canonical model and drop
/// the rest. The result is not yet normalized; run it through
/// [`crate::normalizer::normalize_spec`] before use.
///
/// # Example
///
/// ```rust,no_run
/// use flowspec::prelude::*;
/// use flowspec::error::ConversionError;
///
/// struct Survey { questions: Vec<String> }
///
/// impl IntoFlowSpec for Survey {
///     fn into_flow_spec(self, flow_name: &str) -> Result<FlowSpec, ConversionError> {
///         let mut spec = FlowSpec::single_screen(flow_name);
///         let fields = spec.screens[0].form_children_mut().expect("default screen has a form");
///         for (i, q) in self.questions.iter().enumerate() {
///             fields.push(Block::short_text(&format!("q{}", i + 1), q, true));
///         }
///         Ok(spec)
///     }
/// }
/// ```
pub trait IntoFlowSpec {
    fn into_flow_spec(self, flow_name: &str) -> Result<FlowSpec, ConversionError>;
}

/// The input shapes the normalizer recognizes, in detection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecShape {
    Canonical,
    LegacyForm,
    LegacyBooking,
    Vendor,
    Unknown,
}

impl SpecShape {
    pub fn detect(raw: &Value) -> Self {
        let Some(obj) = raw.as_object() else {
            return SpecShape::Unknown;
        };
        if obj.contains_key("dynamicFlow") {
            return SpecShape::Canonical;
        }
        let canonical_screens = obj
            .get("screens")
            .and_then(Value::as_array)
            .is_some_and(|screens| {
                !screens.is_empty()
                    && screens
                        .iter()
                        .all(|s| s.get("components").is_some() || s.get("layout").is_none())
            });
        if obj.contains_key("routingModel")
            || obj.contains_key("defaultNextByScreen")
            || obj.contains_key("branchesByScreen")
            || (canonical_screens && !obj.contains_key("version"))
        {
            return SpecShape::Canonical;
        }
        if obj.contains_key("form") || obj.get("fields").is_some_and(Value::is_array) {
            return SpecShape::LegacyForm;
        }
        if obj.contains_key("booking") || obj.get("services").is_some_and(Value::is_array) {
            return SpecShape::LegacyBooking;
        }
        if obj.contains_key("routing_model") || obj.contains_key("version") {
            return SpecShape::Vendor;
        }
        SpecShape::Unknown
    }
}

/// Detects the shape of `raw` and converts it into an unnormalized `FlowSpec`.
pub fn convert(raw: &Value, flow_name: &str) -> Result<FlowSpec, ConversionError> {
    match SpecShape::detect(raw) {
        SpecShape::Canonical => {
            let body = raw.get("dynamicFlow").unwrap_or(raw);
            parse::<CanonicalDraft>(body, "dynamicFlow")?.into_flow_spec(flow_name)
        }
        SpecShape::LegacyForm => {
            let body = raw.get("form").unwrap_or(raw);
            parse::<LegacyForm>(body, "form")?.into_flow_spec(flow_name)
        }
        SpecShape::LegacyBooking => {
            let body = raw.get("booking").unwrap_or(raw);
            parse::<LegacyBooking>(body, "booking")?.into_flow_spec(flow_name)
        }
        SpecShape::Vendor => parse::<VendorFlow>(raw, "vendor flow")?.into_flow_spec(flow_name),
        SpecShape::Unknown => Err(ConversionError::UnrecognizedShape),
    }
}

fn parse<T: for<'de> Deserialize<'de>>(value: &Value, shape: &str) -> Result<T, ConversionError> {
    T::deserialize(value).map_err(|e| ConversionError::Malformed {
        shape: shape.to_string(),
        message: e.to_string(),
    })
}

/// Parses a block, recovering the valid children of a form whose siblings are broken.
fn lenient_block(value: &Value) -> Option<Block> {
    if value.get("type").and_then(Value::as_str) == Some("form") {
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("form")
            .to_string();
        let children = lenient_blocks(value.get("children"));
        return Some(Block::Form(FormBlock { name, children }));
    }
    match Block::deserialize(value) {
        Ok(block) => Some(block),
        Err(e) => {
            tracing::debug!(error = %e, "dropping unreadable block");
            None
        }
    }
}

fn lenient_blocks(value: Option<&Value>) -> Vec<Block> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(lenient_block).collect())
        .unwrap_or_default()
}

// --- Canonical ---

/// Every field is read as raw JSON so a malformed entry only loses itself.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalDraft {
    #[serde(default)]
    screens: Option<Value>,
    #[serde(default)]
    routing_model: Option<Value>,
    #[serde(default)]
    default_next_by_screen: Option<Value>,
    #[serde(default)]
    branches_by_screen: Option<Value>,
    #[serde(default)]
    services: Option<Value>,
    #[serde(default)]
    date_component: Option<Value>,
}

fn array_items<'a>(value: Option<&'a Value>) -> &'a [Value] {
    value.and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
}

fn object_entries<'a>(
    value: Option<&'a Value>,
) -> impl Iterator<Item = (&'a String, &'a Value)> {
    value.and_then(Value::as_object).into_iter().flatten()
}

/// Route entries that are not arrays are dropped, as are non-string targets.
fn lenient_routes(value: Option<&Value>) -> BTreeMap<String, Vec<String>> {
    object_entries(value)
        .filter_map(|(id, targets)| {
            let Some(targets) = targets.as_array() else {
                tracing::debug!(screen = %id, "dropping malformed routing entry");
                return None;
            };
            let targets = targets
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
            Some((id.clone(), targets))
        })
        .collect()
}

fn lenient_defaults(value: Option<&Value>) -> BTreeMap<String, Option<String>> {
    object_entries(value)
        .filter_map(|(id, next)| next.as_str().map(|n| (id.clone(), Some(n.to_string()))))
        .collect()
}

fn lenient_branches(value: Option<&Value>) -> BTreeMap<String, Vec<BranchRule>> {
    object_entries(value)
        .filter_map(|(id, rules)| {
            let rules = rules
                .as_array()?
                .iter()
                .filter_map(|r| BranchRule::deserialize(r).ok())
                .collect();
            Some((id.clone(), rules))
        })
        .collect()
}

impl IntoFlowSpec for CanonicalDraft {
    fn into_flow_spec(self, _flow_name: &str) -> Result<FlowSpec, ConversionError> {
        let screens = array_items(self.screens.as_ref())
            .iter()
            .filter(|s| s.is_object())
            .map(|s| Screen {
                id: str_field(s, "id"),
                title: str_field(s, "title"),
                terminal: s.get("terminal").and_then(Value::as_bool).unwrap_or(false),
                components: lenient_blocks(s.get("components")),
                action: s
                    .get("action")
                    .and_then(|a| ScreenAction::deserialize(a).ok())
                    .unwrap_or_default(),
                data: s
                    .get("data")
                    .and_then(Value::as_object)
                    .map(|data| {
                        data.iter()
                            .filter_map(|(k, v)| {
                                DataBinding::deserialize(v).ok().map(|b| (k.clone(), b))
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
                cta_label: s
                    .get("ctaLabel")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
            .collect();

        Ok(FlowSpec {
            screens,
            routing_model: lenient_routes(self.routing_model.as_ref()),
            default_next_by_screen: lenient_defaults(self.default_next_by_screen.as_ref()),
            branches_by_screen: lenient_branches(self.branches_by_screen.as_ref()),
            services: array_items(self.services.as_ref())
                .iter()
                .filter_map(|s| BookingService::deserialize(s).ok())
                .collect(),
            date_component: self
                .date_component
                .and_then(|d| DateComponent::deserialize(&d).ok())
                .unwrap_or_default(),
        })
    }
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

// --- Legacy form ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyForm {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    fields: Vec<LegacyField>,
    #[serde(default)]
    submit_label: Option<String>,
}

#[derive(Deserialize)]
struct LegacyField {
    #[serde(rename = "type", default)]
    field_type: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    options: Vec<LegacyOption>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LegacyOption {
    Plain(String),
    Pair(ChoiceOption),
}

impl From<LegacyOption> for ChoiceOption {
    fn from(option: LegacyOption) -> Self {
        match option {
            LegacyOption::Plain(title) => ChoiceOption {
                id: String::new(),
                title,
            },
            LegacyOption::Pair(pair) => pair,
        }
    }
}

impl LegacyField {
    fn into_block(self) -> Option<Block> {
        let text = || TextBlock {
            text: self.text.clone().unwrap_or_else(|| self.label.clone()),
        };
        let input = || InputBlock {
            name: self.name.clone(),
            label: self.label.clone(),
            required: self.required,
        };
        let block = match self.field_type.as_str() {
            "heading" | "title" => Block::Heading(text()),
            "subheading" => Block::Subheading(text()),
            "paragraph" | "body" | "text_body" => Block::Body(text()),
            "caption" => Block::Caption(text()),
            "" | "text" | "short_text" => Block::ShortText(input()),
            "textarea" | "long_text" => Block::LongText(input()),
            "email" => Block::Email(input()),
            "phone" | "tel" => Block::Phone(input()),
            "number" => Block::Number(input()),
            "date" => Block::Date(input()),
            "optin" | "opt_in" | "consent" => Block::OptIn(input()),
            "select" | "dropdown" | "radio" | "single_choice" | "checkbox" | "multi_choice" => {
                let choice = ChoiceBlock {
                    name: self.name.clone(),
                    label: self.label.clone(),
                    required: self.required,
                    options: self.options.into_iter().map(ChoiceOption::from).collect(),
                };
                match self.field_type.as_str() {
                    "select" | "dropdown" => Block::Dropdown(choice),
                    "radio" | "single_choice" => Block::SingleChoice(choice),
                    _ => Block::MultiChoice(choice),
                }
            }
            other => {
                tracing::debug!(field_type = other, "skipping unsupported legacy field");
                return None;
            }
        };
        Some(block)
    }
}

impl IntoFlowSpec for LegacyForm {
    fn into_flow_spec(self, flow_name: &str) -> Result<FlowSpec, ConversionError> {
        let title = self
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| flow_name.to_string());
        let mut children = Vec::new();
        if let Some(description) = self.description.filter(|d| !d.trim().is_empty()) {
            children.push(Block::body(&description));
        }
        children.extend(self.fields.into_iter().filter_map(LegacyField::into_block));

        let mut screen = Screen::new(&screen_id_for_index(0), &title);
        screen.components = vec![Block::form(children)];
        screen.cta_label = self.submit_label;
        Ok(FlowSpec {
            screens: vec![screen],
            ..FlowSpec::default()
        })
    }
}

// --- Legacy booking ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyBooking {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    services: Vec<LegacyService>,
    #[serde(default)]
    date_component: Option<DateMode>,
    #[serde(default)]
    date_label: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LegacyService {
    Plain(String),
    Full(BookingService),
}

impl From<LegacyService> for BookingService {
    fn from(service: LegacyService) -> Self {
        match service {
            LegacyService::Plain(title) => BookingService {
                id: String::new(),
                title,
                description: None,
            },
            LegacyService::Full(service) => service,
        }
    }
}

impl IntoFlowSpec for LegacyBooking {
    fn into_flow_spec(self, flow_name: &str) -> Result<FlowSpec, ConversionError> {
        let services: Vec<BookingService> =
            self.services.into_iter().map(BookingService::from).collect();
        let date_component = DateComponent {
            mode: self.date_component.unwrap_or_default(),
            label: self
                .date_label
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| DateComponent::default().label),
        };
        let title = self
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| flow_name.to_string());

        let booking_id = screen_id_for_index(0);
        let details_id = screen_id_for_index(1);

        let mut booking = Screen::new(&booking_id, &title);
        booking.terminal = false;
        booking.action = ScreenAction::Navigate {
            screen: Some(details_id.clone()),
        };
        booking.components = vec![Block::form(vec![
            Block::Dropdown(ChoiceBlock {
                name: "service".to_string(),
                label: "Service".to_string(),
                required: true,
                options: services
                    .iter()
                    .map(|s| ChoiceOption {
                        id: s.id.clone(),
                        title: s.title.clone(),
                    })
                    .collect(),
            }),
            Block::Date(InputBlock {
                name: "date".to_string(),
                label: date_component.label.clone(),
                required: true,
            }),
        ])];

        let mut details = Screen::new(&details_id, "Your details");
        details.components = vec![Block::form(vec![
            Block::short_text("name", "Name", true),
            Block::Phone(InputBlock {
                name: "phone".to_string(),
                label: "Phone".to_string(),
                required: false,
            }),
        ])];

        Ok(FlowSpec {
            screens: vec![booking, details],
            services,
            date_component,
            ..FlowSpec::default()
        })
    }
}

// --- Vendor flow JSON ---

#[derive(Deserialize)]
struct VendorFlow {
    #[serde(default)]
    routing_model: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    screens: Vec<VendorScreen>,
}

#[derive(Deserialize)]
struct VendorScreen {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    terminal: bool,
    #[serde(default)]
    data: BTreeMap<String, Value>,
    #[serde(default)]
    layout: Option<VendorLayout>,
}

#[derive(Deserialize)]
struct VendorLayout {
    #[serde(default)]
    children: Vec<Value>,
}

/// Blocks and footer recovered from a vendor component tree.
#[derive(Default)]
struct VendorScreenParts {
    blocks: Vec<Block>,
    footer_label: Option<String>,
    action: Option<ScreenAction>,
}

impl VendorScreenParts {
    fn collect(&mut self, components: &[Value]) {
        for component in components {
            let tag = component.get("type").and_then(Value::as_str).unwrap_or("");
            match tag {
                "Form" => {
                    let mut inner = VendorScreenParts::default();
                    inner.collect(array_field(component, "children"));
                    self.blocks.push(Block::Form(FormBlock {
                        name: component
                            .get("name")
                            .and_then(Value::as_str)
                            .unwrap_or("form")
                            .to_string(),
                        children: inner.blocks,
                    }));
                    self.footer_label = self.footer_label.take().or(inner.footer_label);
                    self.action = self.action.take().or(inner.action);
                }
                "Footer" => {
                    self.footer_label = component
                        .get("label")
                        .and_then(Value::as_str)
                        .map(str::to_string);
                    self.action = component.get("on-click-action").map(vendor_action);
                }
                // Conditional footers: keep the final fallback, drop the conditions.
                "If" => self.collect(array_field(component, "else")),
                _ => {
                    let input_type = component.get("input-type").and_then(Value::as_str);
                    match block_kind_for_vendor(tag, input_type) {
                        Some(kind) => {
                            if let Some(block) = vendor_block(kind, component) {
                                self.blocks.push(block);
                            }
                        }
                        None => tracing::debug!(component = tag, "skipping vendor component"),
                    }
                }
            }
        }
    }
}

fn array_field<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn vendor_action(action: &Value) -> ScreenAction {
    match action.get("name").and_then(Value::as_str) {
        Some("navigate") => ScreenAction::Navigate {
            screen: action
                .pointer("/next/name")
                .and_then(Value::as_str)
                .map(str::to_string),
        },
        Some("data_exchange") => ScreenAction::DataExchange {
            payload: action
                .get("payload")
                .and_then(Value::as_object)
                .map(|p| {
                    p.iter()
                        .map(|(k, v)| {
                            let reference = v.as_str().map(str::to_string);
                            (k.clone(), reference.unwrap_or_else(|| v.to_string()))
                        })
                        .collect()
                })
                .unwrap_or_default(),
        },
        _ => ScreenAction::Complete,
    }
}

fn vendor_block(kind: BlockKind, component: &Value) -> Option<Block> {
    let text = || TextBlock {
        text: str_field(component, "text"),
    };
    let input = || InputBlock {
        name: str_field(component, "name"),
        label: str_field(component, "label"),
        required: component
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    };
    let choice = || ChoiceBlock {
        name: str_field(component, "name"),
        label: str_field(component, "label"),
        required: component
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        options: array_field(component, "data-source")
            .iter()
            .filter_map(|o| ChoiceOption::deserialize(o).ok())
            .collect(),
    };
    let block = match kind {
        BlockKind::Heading => Block::Heading(text()),
        BlockKind::Subheading => Block::Subheading(text()),
        BlockKind::Body => Block::Body(text()),
        BlockKind::Caption => Block::Caption(text()),
        BlockKind::ShortText => Block::ShortText(input()),
        BlockKind::LongText => Block::LongText(input()),
        BlockKind::Email => Block::Email(input()),
        BlockKind::Phone => Block::Phone(input()),
        BlockKind::Number => Block::Number(input()),
        BlockKind::Date => Block::Date(input()),
        BlockKind::OptIn => Block::OptIn(input()),
        BlockKind::Dropdown => Block::Dropdown(choice()),
        BlockKind::SingleChoice => Block::SingleChoice(choice()),
        BlockKind::MultiChoice => Block::MultiChoice(choice()),
        BlockKind::Form => return None,
    };
    Some(block)
}

impl IntoFlowSpec for VendorFlow {
    fn into_flow_spec(self, _flow_name: &str) -> Result<FlowSpec, ConversionError> {
        let mut spec = FlowSpec::default();
        for vendor in self.screens {
            let mut parts = VendorScreenParts::default();
            if let Some(layout) = &vendor.layout {
                parts.collect(&layout.children);
            }
            let routed = self
                .routing_model
                .get(&vendor.id)
                .and_then(|targets| targets.first().cloned());
            let action = match parts.action {
                Some(ScreenAction::Navigate { screen }) => ScreenAction::Navigate {
                    screen: screen.or_else(|| routed.clone()),
                },
                Some(other) => other,
                None if routed.is_some() => ScreenAction::Navigate {
                    screen: routed.clone(),
                },
                None => ScreenAction::Complete,
            };
            if let Some(next) = routed {
                spec.routing_model.insert(vendor.id.clone(), vec![next]);
            }
            spec.screens.push(Screen {
                id: vendor.id,
                title: vendor.title,
                terminal: vendor.terminal,
                components: parts.blocks,
                action,
                data: vendor
                    .data
                    .iter()
                    .filter_map(|(k, v)| DataBinding::deserialize(v).ok().map(|b| (k.clone(), b)))
                    .collect(),
                cta_label: parts.footer_label,
            });
        }
        Ok(spec)
    }
}
