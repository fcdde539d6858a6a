//! Mirror type resolver: JVM type mirrors and incremental inference.
//!
//! This crate assigns a JVM type to every expression of a script, picks the
//! overload every call site invokes, and reports what it could not resolve.
//! Types can be referenced before they are defined; every type question is
//! answered through a future that is resolved, errored, or still pending,
//! and dependents re-evaluate as their inputs change.
//!
//! # Architecture
//!
//! - [`ty`]: Host types, primitives and members (the type arena entries)
//! - [`descriptor`]: JVM field and method descriptors
//! - [`future`]: Type futures, observers and the propagation queue
//! - [`registry`]: The [`TypeSystem`]: type arena, definitions, lookups
//! - [`builtins`]: The embedded class library and primitive operators
//! - [`scope`]: Lexical scopes: packages, imports, self type, context
//! - [`resolve`]: Type-name resolution against a scope
//! - [`subtype`]: Assignability between mirrors
//! - [`cell`]: Assignable cells for locals, fields and return types
//! - [`call`]: Call sites and overload resolution
//! - [`infer`]: The fixpoint driver over a whole script
//! - [`error`]: Type errors with provenance
//! - [`diagnostics`]: Rendering errors for humans
//! - [`config`]: TOML-loadable inference settings

pub mod builtins;
pub mod call;
pub mod cell;
pub mod config;
pub mod descriptor;
pub mod diagnostics;
pub mod error;
pub mod future;
pub mod infer;
pub mod registry;
pub mod resolve;
pub mod scope;
pub mod subtype;
pub mod ty;

use mirror_ast::Script;
use mirror_common::LineIndex;
use rowan::TextRange;
use rustc_hash::FxHashMap;

pub use crate::call::{CallId, ResolvedCall};
pub use crate::cell::CellId;
pub use crate::config::{ConfigError, TyperConfig};
pub use crate::error::TypeError;
pub use crate::future::{FutureId, FutureState};
pub use crate::infer::{Phase, Typer};
pub use crate::registry::{MethodDef, TypeSystem};
pub use crate::scope::{ScopeContext, ScopeId};
pub use crate::ty::{HostType, Member, MemberId, MemberKind, Primitive, TypeId};

/// The result of resolving a Mirror script.
///
/// Contains the types of every expression that resolved, the member every
/// resolved call site selected, and one batch of errors sorted by position.
pub struct TypeckResult {
    /// Map from source ranges to their inferred types.
    pub types: FxHashMap<TextRange, TypeId>,
    /// Map from call-site ranges to the member they invoke.
    pub calls: FxHashMap<TextRange, ResolvedCall>,
    /// Every error found, deduplicated and ordered by position.
    pub errors: Vec<TypeError>,
    /// The script's implicit main class.
    pub main_type: Option<TypeId>,
    /// The type system the script was resolved against, for lookups of the
    /// ids above.
    pub type_system: TypeSystem,
}

impl TypeckResult {
    pub fn type_of(&self, range: TextRange) -> Option<TypeId> {
        self.types.get(&range).copied()
    }

    /// Display name of the type at `range`, e.g. `java.lang.String`.
    pub fn type_name_at(&self, range: TextRange) -> Option<String> {
        self.type_of(range).map(|ty| self.type_system.type_name(ty))
    }

    /// JVM descriptor of the type at `range`.
    pub fn descriptor_at(&self, range: TextRange) -> Option<&str> {
        self.type_of(range).map(|ty| self.type_system.descriptor(ty))
    }

    pub fn call_at(&self, range: TextRange) -> Option<&ResolvedCall> {
        self.calls.get(&range)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Render every error in `file:line: message` form, one block per error.
    pub fn render_errors(&self, source: &str, filename: &str) -> Vec<String> {
        let index = LineIndex::new(source);
        self.errors
            .iter()
            .map(|error| diagnostics::render_plain(error, source, filename, &index))
            .collect()
    }
}

/// Resolve a script with the default configuration.
///
/// This is the main entry point of the resolver: it defines every class and
/// member the script declares, infers every expression, settles what remains
/// and reports errors.
pub fn check(script: &Script) -> TypeckResult {
    check_with_config(script, TyperConfig::default())
}

pub fn check_with_config(script: &Script, config: TyperConfig) -> TypeckResult {
    infer::infer(script, config)
}
