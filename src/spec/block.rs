use serde::{Deserialize, Serialize};
use std::fmt;

/// One selectable entry of a dropdown or choice list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    #[serde(default)]
    pub id: String,
    pub title: String,
}

impl ChoiceOption {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
        }
    }
}

/// Static text shown on a screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
}

/// A single-value input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputBlock {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub required: bool,
}

/// An input backed by a list of options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceBlock {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<ChoiceOption>,
}

/// The container that groups a screen's blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormBlock {
    #[serde(default = "default_form_name")]
    pub name: String,
    #[serde(default)]
    pub children: Vec<Block>,
}

fn default_form_name() -> String {
    "form".to_string()
}

impl Default for FormBlock {
    fn default() -> Self {
        Self {
            name: default_form_name(),
            children: Vec::new(),
        }
    }
}

/// One UI unit of a screen. Closed set of variants, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Form(FormBlock),
    Heading(TextBlock),
    Subheading(TextBlock),
    Body(TextBlock),
    Caption(TextBlock),
    ShortText(InputBlock),
    LongText(InputBlock),
    Email(InputBlock),
    Phone(InputBlock),
    Number(InputBlock),
    Date(InputBlock),
    Dropdown(ChoiceBlock),
    SingleChoice(ChoiceBlock),
    MultiChoice(ChoiceBlock),
    OptIn(InputBlock),
}

/// Discriminant of [`Block`], used for lookups and vendor mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockKind {
    Form,
    Heading,
    Subheading,
    Body,
    Caption,
    ShortText,
    LongText,
    Email,
    Phone,
    Number,
    Date,
    Dropdown,
    SingleChoice,
    MultiChoice,
    OptIn,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Form => "form",
            BlockKind::Heading => "heading",
            BlockKind::Subheading => "subheading",
            BlockKind::Body => "body",
            BlockKind::Caption => "caption",
            BlockKind::ShortText => "short_text",
            BlockKind::LongText => "long_text",
            BlockKind::Email => "email",
            BlockKind::Phone => "phone",
            BlockKind::Number => "number",
            BlockKind::Date => "date",
            BlockKind::Dropdown => "dropdown",
            BlockKind::SingleChoice => "single_choice",
            BlockKind::MultiChoice => "multi_choice",
            BlockKind::OptIn => "opt_in",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Block {
    pub fn kind(&self) -> BlockKind {
        match self {
            Block::Form(_) => BlockKind::Form,
            Block::Heading(_) => BlockKind::Heading,
            Block::Subheading(_) => BlockKind::Subheading,
            Block::Body(_) => BlockKind::Body,
            Block::Caption(_) => BlockKind::Caption,
            Block::ShortText(_) => BlockKind::ShortText,
            Block::LongText(_) => BlockKind::LongText,
            Block::Email(_) => BlockKind::Email,
            Block::Phone(_) => BlockKind::Phone,
            Block::Number(_) => BlockKind::Number,
            Block::Date(_) => BlockKind::Date,
            Block::Dropdown(_) => BlockKind::Dropdown,
            Block::SingleChoice(_) => BlockKind::SingleChoice,
            Block::MultiChoice(_) => BlockKind::MultiChoice,
            Block::OptIn(_) => BlockKind::OptIn,
        }
    }

    /// Shorthand constructors used by conversions and tests.
    pub fn heading(text: &str) -> Self {
        Block::Heading(TextBlock {
            text: text.to_string(),
        })
    }

    pub fn body(text: &str) -> Self {
        Block::Body(TextBlock {
            text: text.to_string(),
        })
    }

    pub fn short_text(name: &str, label: &str, required: bool) -> Self {
        Block::ShortText(InputBlock {
            name: name.to_string(),
            label: label.to_string(),
            required,
        })
    }

    pub fn form(children: Vec<Block>) -> Self {
        Block::Form(FormBlock {
            children,
            ..FormBlock::default()
        })
    }

    /// True for blocks that submit a value under a `name`.
    pub fn is_input(&self) -> bool {
        self.name().is_some()
    }

    /// The data key of an input block; `None` for text and containers.
    pub fn name(&self) -> Option<&str> {
        match self {
            Block::ShortText(b)
            | Block::LongText(b)
            | Block::Email(b)
            | Block::Phone(b)
            | Block::Number(b)
            | Block::Date(b)
            | Block::OptIn(b) => Some(&b.name),
            Block::Dropdown(c) | Block::SingleChoice(c) | Block::MultiChoice(c) => Some(&c.name),
            _ => None,
        }
    }

    pub fn name_mut(&mut self) -> Option<&mut String> {
        match self {
            Block::ShortText(b)
            | Block::LongText(b)
            | Block::Email(b)
            | Block::Phone(b)
            | Block::Number(b)
            | Block::Date(b)
            | Block::OptIn(b) => Some(&mut b.name),
            Block::Dropdown(c) | Block::SingleChoice(c) | Block::MultiChoice(c) => {
                Some(&mut c.name)
            }
            _ => None,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Block::ShortText(b)
            | Block::LongText(b)
            | Block::Email(b)
            | Block::Phone(b)
            | Block::Number(b)
            | Block::Date(b)
            | Block::OptIn(b) => Some(&b.label),
            Block::Dropdown(c) | Block::SingleChoice(c) | Block::MultiChoice(c) => Some(&c.label),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Block::Heading(t) | Block::Subheading(t) | Block::Body(t) | Block::Caption(t) => {
                Some(&t.text)
            }
            _ => None,
        }
    }

    pub fn options(&self) -> Option<&[ChoiceOption]> {
        match self {
            Block::Dropdown(c) | Block::SingleChoice(c) | Block::MultiChoice(c) => {
                Some(&c.options)
            }
            _ => None,
        }
    }

    pub fn options_mut(&mut self) -> Option<&mut Vec<ChoiceOption>> {
        match self {
            Block::Dropdown(c) | Block::SingleChoice(c) | Block::MultiChoice(c) => {
                Some(&mut c.options)
            }
            _ => None,
        }
    }

    /// Choice blocks whose submitted value is a single option id.
    pub fn is_single_valued_choice(&self) -> bool {
        matches!(self, Block::Dropdown(_) | Block::SingleChoice(_))
    }
}

/// Depth-first walk over every non-container block of a tree.
pub fn for_each_leaf<'a>(blocks: &'a [Block], visit: &mut impl FnMut(&'a Block)) {
    for block in blocks {
        match block {
            Block::Form(form) => for_each_leaf(&form.children, visit),
            other => visit(other),
        }
    }
}

/// Collects every input block of a tree in document order.
pub fn input_blocks(blocks: &[Block]) -> Vec<&Block> {
    let mut inputs = Vec::new();
    for_each_leaf(blocks, &mut |b| {
        if b.is_input() {
            inputs.push(b);
        }
    });
    inputs
}
