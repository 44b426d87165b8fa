use crate::spec::{Block, BlockKind};
use serde_json::{Map, Value, json};

/// Master macro for the block-kind <-> vendor component table. Generates the
/// forward lookup used by the compiler and the reverse lookup used when
/// importing vendor JSON, so the two can never drift apart.
macro_rules! define_component_table {
    ( $( ($kind:ident, $tag:expr, $input_type:expr) ),* $(,)? ) => {
        /// Vendor component tag and optional `input-type` for a block kind.
        pub fn vendor_type(kind: BlockKind) -> (&'static str, Option<&'static str>) {
            match kind {
                $( BlockKind::$kind => ($tag, $input_type), )*
            }
        }

        /// Maps a vendor component back to a block kind. A `TextInput` without
        /// a recognized `input-type` is read as plain short text.
        pub fn block_kind_for_vendor(tag: &str, input_type: Option<&str>) -> Option<BlockKind> {
            $(
                {
                    let expected: Option<&str> = $input_type;
                    if tag == $tag && (expected.is_none() || expected == input_type) {
                        return Some(BlockKind::$kind);
                    }
                }
            )*
            (tag == "TextInput").then_some(BlockKind::ShortText)
        }
    };
}

define_component_table! {
    (Form, "Form", None),
    (Heading, "TextHeading", None),
    (Subheading, "TextSubheading", None),
    (Body, "TextBody", None),
    (Caption, "TextCaption", None),
    (ShortText, "TextInput", Some("text")),
    (Email, "TextInput", Some("email")),
    (Phone, "TextInput", Some("phone")),
    (Number, "TextInput", Some("number")),
    (LongText, "TextArea", None),
    (Date, "DatePicker", None),
    (Dropdown, "Dropdown", None),
    (SingleChoice, "RadioButtonsGroup", None),
    (MultiChoice, "CheckboxGroup", None),
    (OptIn, "OptIn", None),
}

/// Emits the vendor component for a block. Form children are emitted
/// recursively; the footer is appended by the caller.
pub(crate) fn emit_block(block: &Block) -> Value {
    let (tag, input_type) = vendor_type(block.kind());
    let mut component = Map::new();
    component.insert("type".to_string(), json!(tag));

    match block {
        Block::Form(form) => {
            component.insert("name".to_string(), json!(form.name));
            component.insert(
                "children".to_string(),
                Value::Array(form.children.iter().map(emit_block).collect()),
            );
        }
        Block::Heading(t) | Block::Subheading(t) | Block::Body(t) | Block::Caption(t) => {
            component.insert("text".to_string(), json!(t.text));
        }
        Block::ShortText(input)
        | Block::LongText(input)
        | Block::Email(input)
        | Block::Phone(input)
        | Block::Number(input)
        | Block::Date(input)
        | Block::OptIn(input) => {
            component.insert("name".to_string(), json!(input.name));
            component.insert("label".to_string(), json!(input.label));
            component.insert("required".to_string(), json!(input.required));
        }
        Block::Dropdown(choice) | Block::SingleChoice(choice) | Block::MultiChoice(choice) => {
            component.insert("name".to_string(), json!(choice.name));
            component.insert("label".to_string(), json!(choice.label));
            component.insert("required".to_string(), json!(choice.required));
            component.insert(
                "data-source".to_string(),
                Value::Array(
                    choice
                        .options
                        .iter()
                        .map(|o| json!({ "id": o.id, "title": o.title }))
                        .collect(),
                ),
            );
        }
    }

    if let Some(input_type) = input_type {
        component.insert("input-type".to_string(), json!(input_type));
    }
    Value::Object(component)
}
