//! Syntax tree consumed by the Mirror type resolver.
//!
//! The parser is not part of this workspace. Whatever produces source trees
//! hands the type resolver a [`Script`] built from these owned nodes; each
//! node carries the byte range it was parsed from.
//!
//! - [`node`]: node types
//! - [`build`]: a span-allocating builder for assembling trees by hand

pub mod build;
pub mod node;

pub use build::AstBuilder;
pub use node::{ClassDef, Literal, MethodDef, MethodKind, Node, Param, Script, TypeRef};
pub use rowan::TextRange;
