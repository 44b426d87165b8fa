//! Common test utilities for building flow specs.
use flowspec::prelude::*;
use flowspec::spec::{ChoiceBlock, InputBlock};
use serde_json::{Value, json};

pub const FLOW_NAME: &str = "Test flow";

/// A screen with the given blocks wrapped in its form. Terminal, like `Screen::new`.
#[allow(dead_code)]
pub fn screen(id: &str, title: &str, blocks: Vec<Block>) -> Screen {
    let mut screen = Screen::new(id, title);
    screen.components = vec![Block::form(blocks)];
    screen
}

#[allow(dead_code)]
pub fn number(name: &str, label: &str) -> Block {
    Block::Number(InputBlock {
        name: name.to_string(),
        label: label.to_string(),
        required: true,
    })
}

#[allow(dead_code)]
pub fn dropdown(name: &str, label: &str, options: &[(&str, &str)]) -> Block {
    Block::Dropdown(ChoiceBlock {
        name: name.to_string(),
        label: label.to_string(),
        required: true,
        options: options
            .iter()
            .map(|(id, title)| ChoiceOption::new(id, title))
            .collect(),
    })
}

#[allow(dead_code)]
pub fn checkboxes(name: &str, label: &str, options: &[(&str, &str)]) -> Block {
    Block::MultiChoice(ChoiceBlock {
        name: name.to_string(),
        label: label.to_string(),
        required: false,
        options: options
            .iter()
            .map(|(id, title)| ChoiceOption::new(id, title))
            .collect(),
    })
}

/// `SCREEN_A` (name) navigates to terminal `SCREEN_B` (thank-you text).
///
/// Normalized and valid.
#[allow(dead_code)]
pub fn linear_spec() -> FlowSpec {
    let mut spec = FlowSpec {
        screens: vec![
            screen(
                "SCREEN_A",
                "Welcome",
                vec![Block::short_text("name", "Your name", true)],
            ),
            screen("SCREEN_B", "Done", vec![Block::body("Thanks!")]),
        ],
        ..FlowSpec::default()
    };
    spec.set_successor("SCREEN_A", Some("SCREEN_B".to_string()));
    normalize_spec(spec, FLOW_NAME)
}

/// `SCREEN_A` asks for age and plan, then branches:
///
/// 1. `plan equals pro` -> `SCREEN_C`
/// 2. `age gt 65` -> `SCREEN_D`
///
/// and otherwise continues to `SCREEN_B`. B, C and D are terminal.
#[allow(dead_code)]
pub fn branching_spec() -> FlowSpec {
    let mut spec = FlowSpec {
        screens: vec![
            screen(
                "SCREEN_A",
                "Profile",
                vec![
                    number("age", "Age"),
                    dropdown("plan", "Plan", &[("basic", "Basic"), ("pro", "Pro")]),
                ],
            ),
            screen("SCREEN_B", "Standard", vec![Block::body("Standard offer")]),
            screen("SCREEN_C", "Premium", vec![Block::body("Premium offer")]),
            screen("SCREEN_D", "Senior", vec![Block::body("Senior offer")]),
        ],
        ..FlowSpec::default()
    };
    spec.set_successor("SCREEN_A", Some("SCREEN_B".to_string()));
    spec.branches_by_screen.insert(
        "SCREEN_A".to_string(),
        vec![
            BranchRule::new("plan", BranchOp::Equals, Some("pro"), Some("SCREEN_C")),
            BranchRule::new("age", BranchOp::Gt, Some("65"), Some("SCREEN_D")),
        ],
    );
    normalize_spec(spec, FLOW_NAME)
}

/// The raw canonical JSON of a two-screen flow, as the editor stores it.
#[allow(dead_code)]
pub fn canonical_raw() -> Value {
    json!({
        "screens": [
            {
                "id": "SCREEN_A",
                "title": "Welcome",
                "terminal": false,
                "components": [
                    { "type": "form", "name": "form", "children": [
                        { "type": "short_text", "name": "name", "label": "Your name", "required": true }
                    ]}
                ],
                "action": { "type": "navigate", "screen": "SCREEN_B" }
            },
            {
                "id": "SCREEN_B",
                "title": "Done",
                "terminal": true,
                "components": [
                    { "type": "form", "name": "form", "children": [
                        { "type": "body", "text": "Thanks!" }
                    ]}
                ],
                "action": { "type": "complete" }
            }
        ],
        "routingModel": { "SCREEN_A": ["SCREEN_B"], "SCREEN_B": [] },
        "defaultNextByScreen": { "SCREEN_A": "SCREEN_B", "SCREEN_B": null }
    })
}

/// Answers keyed by field name, for route previews.
#[allow(dead_code)]
pub fn answers(pairs: &[(&str, Value)]) -> Answers {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}
