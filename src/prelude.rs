//! Prelude module for convenient imports
//!
//! Re-exports the types most sessions need: the spec model, the normalizer,
//! validator and compiler entry points, and the editor.
//!
//! # Example
//!
//! ```rust,no_run
//! use flowspec::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let raw: serde_json::Value =
//!     serde_json::from_str(&std::fs::read_to_string("path/to/flow.json")?)?;
//! let spec = normalize(&raw, "Onboarding");
//!
//! for issue in validate(&spec) {
//!     println!("- {}", issue);
//! }
//! let compiled = Compiler::builder(&spec).version("7.2").build().compile();
//! println!("{}", compiled);
//! # Ok(())
//! # }
//! ```

// Spec model
pub use crate::spec::{
    Block, BlockKind, BranchOp, BranchRule, ChoiceOption, FlowSpec, IntoFlowSpec, Screen,
    ScreenAction,
};

// Pipeline entry points
pub use crate::compiler::{Compiler, compile, compile_checked};
pub use crate::normalizer::{Normalizer, normalize, normalize_spec};
pub use crate::validator::validate;

// Routing preview
pub use crate::branch::{Answers, Resolution, RouteResolver};

// Editing sessions
pub use crate::config::EditorConfig;
pub use crate::editor::{EditorState, FlowEditor, FlowStore, HostBridge, SaveStatus};

// Error types
pub use crate::error::{CompileError, EditorError, StoreError};

// Result type alias for convenience
pub type Result<T, E = Box<dyn std::error::Error>> = std::result::Result<T, E>;
