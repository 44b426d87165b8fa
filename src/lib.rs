//! # flowspec - Flow Spec Normalization, Validation and Compilation
//!
//! **flowspec** is the core of a form-flow builder for the WhatsApp Flows
//! platform. It keeps an editable, block-based description of a multi-screen
//! flow (a [`FlowSpec`](spec::FlowSpec)), repairs whatever shape it is loaded
//! from, reports what is still wrong with it and compiles it into the vendor
//! Flow JSON document.
//!
//! ## Core Workflow
//!
//! 1.  **Load**: Stored specs come in several shapes (canonical, legacy form,
//!     legacy booking, vendor JSON). The [`normalizer`] detects the shape and
//!     produces a canonical spec. It never fails; unusable input becomes the
//!     single default screen.
//! 2.  **Edit**: [`editor::EditorState`] applies block and screen mutations,
//!     re-normalizing after each one. [`editor::FlowEditor`] adds the
//!     debounced autosave and the messaging host bridge.
//! 3.  **Validate**: [`validator::validate`] lists human-readable issues.
//! 4.  **Compile**: [`compiler::Compiler`] emits the vendor JSON, turning
//!     branch rules into nested `If` components.
//! 5.  **Preview**: [`branch::RouteResolver`] answers which screen follows for
//!     a given set of answers.
//!
//! ## Quick Start
//!
//! ```rust
//! use flowspec::prelude::*;
//! use serde_json::json;
//!
//! fn main() -> Result<()> {
//!     // A legacy single-form spec, as older tools stored it.
//!     let raw = json!({
//!         "form": {
//!             "title": "Contact us",
//!             "fields": [
//!                 { "type": "text", "label": "Full name", "required": true },
//!                 { "type": "email", "label": "Email" }
//!             ]
//!         }
//!     });
//!
//!     let spec = normalize(&raw, "Contact");
//!     assert_eq!(spec.screens.len(), 1);
//!     assert!(validate(&spec).is_empty());
//!
//!     let compiled = compile_checked(&spec)?;
//!     println!("{}", serde_json::to_string_pretty(&compiled)?);
//!     Ok(())
//! }
//! ```

pub mod branch;
pub mod compiler;
pub mod config;
pub mod editor;
pub mod error;
pub mod normalizer;
pub mod prelude;
pub mod spec;
pub mod validator;
