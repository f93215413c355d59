//! Generic utility primitives with zero domain knowledge.
//!
//! - `shell` - Shell quoting for displaying command lines
//! - `validation` - Input validation helpers

pub mod shell;
pub mod validation;
