//! Formula documents for gt.
//!
//! Formulas are named workflow definitions. They resolve from a project
//! directory, the town directory, or the built-in set compiled into gt, and
//! are parsed tolerantly: a formula file never fails to load because of its
//! content. Convoy formulas carry parallel legs, a synthesis step, prompt
//! templates, and an output policy.

pub mod builtin;
pub mod diff;
pub mod extract;
pub mod idgen;
pub mod parser;
pub mod resolve;
pub mod scaffold;
pub mod template;
pub mod types;

pub use builtin::BuiltinSet;
pub use resolve::Resolver;
pub use types::{
    FormulaDocument, FormulaError, FormulaLocation, FormulaSource, FormulaType, Leg, Output,
    Synthesis,
};
