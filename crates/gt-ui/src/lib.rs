//! Terminal styling for gt.
//!
//! Colour is applied only when the terminal supports it; with `NO_COLOR`
//! set or output piped, every helper returns its input unchanged.

pub mod styles;
pub mod terminal;
