//! Branch rules: lowering to vendor conditions and preview-time resolution.

pub mod condition;
pub mod resolver;

pub use condition::{Comparison, Condition, Literal};
pub use resolver::{Answers, Resolution, RouteResolver, rule_matches};
