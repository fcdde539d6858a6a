//! Shared helpers for the Mirror compiler front end.
//!
//! - [`span`]: byte offset to line/column conversion for error reporting
//! - [`names`]: class name derivation and dotted/internal name conversion

pub mod names;
pub mod span;

pub use names::{classname_from_filename, QualifiedName};
pub use span::{LineCol, LineIndex};
