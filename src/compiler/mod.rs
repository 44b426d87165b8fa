use crate::config::EditorConfig;
use crate::error::CompileError;
use crate::spec::{Block, FlowSpec, Screen, ScreenAction};
use crate::validator::validate;
use serde_json::{Map, Value, json};

pub mod components;
mod routing;

pub const DEFAULT_FLOW_VERSION: &str = "7.2";
pub const DEFAULT_DATA_API_VERSION: &str = "3.0";

/// Compiles a normalized [`FlowSpec`] into the vendor Flow JSON document.
///
/// Compilation is pure and deterministic: the same spec always yields the
/// same document, byte for byte once serialized.
pub struct Compiler<'a> {
    spec: &'a FlowSpec,
    version: String,
    data_api_version: String,
}

pub struct CompilerBuilder<'a> {
    spec: &'a FlowSpec,
    version: String,
    data_api_version: String,
}

impl<'a> CompilerBuilder<'a> {
    pub fn new(spec: &'a FlowSpec) -> Self {
        Self {
            spec,
            version: DEFAULT_FLOW_VERSION.to_string(),
            data_api_version: DEFAULT_DATA_API_VERSION.to_string(),
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn data_api_version(mut self, data_api_version: &str) -> Self {
        self.data_api_version = data_api_version.to_string();
        self
    }

    pub fn with_config(self, config: &EditorConfig) -> Self {
        self.version(&config.flow_version)
            .data_api_version(&config.data_api_version)
    }

    pub fn build(self) -> Compiler<'a> {
        Compiler {
            spec: self.spec,
            version: self.version,
            data_api_version: self.data_api_version,
        }
    }
}

impl<'a> Compiler<'a> {
    pub fn builder(spec: &'a FlowSpec) -> CompilerBuilder<'a> {
        CompilerBuilder::new(spec)
    }

    pub fn compile(&self) -> Value {
        let spec = self.spec;
        let mut document = Map::new();
        document.insert("version".to_string(), json!(self.version));

        let uses_data_exchange = spec
            .screens
            .iter()
            .any(|s| matches!(s.action, ScreenAction::DataExchange { .. }));
        if uses_data_exchange {
            document.insert(
                "data_api_version".to_string(),
                json!(self.data_api_version),
            );
        }

        document.insert(
            "routing_model".to_string(),
            json!(routing::routing_table(spec)),
        );
        document.insert(
            "screens".to_string(),
            Value::Array(spec.screens.iter().map(|s| self.compile_screen(s)).collect()),
        );

        tracing::debug!(screens = spec.screens.len(), version = %self.version, "compiled flow");
        Value::Object(document)
    }

    fn compile_screen(&self, screen: &Screen) -> Value {
        let mut compiled = Map::new();
        compiled.insert("id".to_string(), json!(screen.id));
        compiled.insert("title".to_string(), json!(screen.title));
        if routing::can_complete(self.spec, screen) {
            compiled.insert("terminal".to_string(), json!(true));
        }
        if !screen.data.is_empty() {
            compiled.insert("data".to_string(), json!(screen.data));
        }

        let form = match screen.components.as_slice() {
            [Block::Form(form)] => form.clone(),
            _ => crate::spec::FormBlock {
                children: screen.form_children().to_vec(),
                ..Default::default()
            },
        };
        let mut form_component = components::emit_block(&Block::Form(form));
        if let Some(Value::Array(children)) = form_component.get_mut("children") {
            children.push(routing::footer_tree(self.spec, screen));
        }

        compiled.insert(
            "layout".to_string(),
            json!({
                "type": "SingleColumnLayout",
                "children": [form_component],
            }),
        );
        Value::Object(compiled)
    }

    /// Pretty-printed JSON of [`Compiler::compile`].
    pub fn compile_to_string(&self) -> Result<String, CompileError> {
        serde_json::to_string_pretty(&self.compile())
            .map_err(|e| CompileError::Serialization(e.to_string()))
    }
}

/// Compiles with the default versions.
pub fn compile(spec: &FlowSpec) -> Value {
    Compiler::builder(spec).build().compile()
}

pub fn compile_to_string(spec: &FlowSpec) -> Result<String, CompileError> {
    Compiler::builder(spec).build().compile_to_string()
}

/// Compiles only when the validator reports no issues.
pub fn compile_checked(spec: &FlowSpec) -> Result<Value, CompileError> {
    let issues = validate(spec);
    if !issues.is_empty() {
        return Err(CompileError::InvalidSpec(issues));
    }
    Ok(compile(spec))
}
