//! Type name resolution.
//!
//! A bare name is looked up, in order:
//!
//! 1. the scope's explicit imports (innermost scope first)
//! 2. the current package, which may be the unnamed package
//! 3. packages imported with a wildcard
//! 4. the default library packages
//!
//! As a last resort a type registered in the unnamed package is found from
//! any package. Dotted names are looked up as written before these steps.

use mirror_ast::TypeRef;
use tracing::{debug, trace};

use crate::error::TypeError;
use crate::future::FutureId;
use crate::registry::TypeSystem;
use crate::scope::ScopeId;
use crate::ty::TypeId;

impl TypeSystem {
    /// Resolve a syntactic type reference. Unknown names give a failed
    /// future rather than an `Err`; callers see the error marker.
    pub fn get(&mut self, scope: ScopeId, type_ref: &TypeRef) -> FutureId {
        let mut name = type_ref.name.as_str();
        let mut dimensions = usize::from(type_ref.is_array);
        while let Some(component) = name.strip_suffix("[]") {
            name = component;
            dimensions += 1;
        }

        let Some(mut ty) = self.find_type(scope, name) else {
            debug!(name = %type_ref.name, "unresolved type");
            return self.error_future(TypeError::UnresolvedType {
                name: type_ref.name.clone(),
                span: Some(type_ref.span),
            });
        };
        for _ in 0..dimensions {
            ty = self.array_of(ty);
        }
        if ty.is_error() {
            return self.error_future(TypeError::UnresolvedType {
                name: format!("{}{}", type_ref.name, if type_ref.is_array { "[]" } else { "" }),
                span: Some(type_ref.span),
            });
        }
        if type_ref.is_static {
            ty = self.meta_type(ty);
        }
        self.type_future(ty)
    }

    /// The type a name denotes in `scope`, if any.
    pub fn find_type(&self, scope: ScopeId, name: &str) -> Option<TypeId> {
        if let Some(p) = self.primitive_named(name) {
            return Some(p);
        }

        for s in self.scope_chain(scope) {
            if let Some(full) = s.imports.get(name) {
                trace!(name, full = %full, "found via import");
                return self.lookup_type(full);
            }
        }

        if name.contains('.') {
            return self.lookup_type(name);
        }

        let local = self.qualify(scope, name).to_string();
        if let Some(ty) = self.lookup_type(&local) {
            return Some(ty);
        }

        for s in self.scope_chain(scope) {
            for package in &s.search_packages {
                if let Some(ty) = self.lookup_type(&format!("{}.{}", package, name)) {
                    trace!(name, package = %package, "found via wildcard import");
                    return Some(ty);
                }
            }
        }

        for s in self.scope_chain(scope) {
            for package in &s.default_packages {
                if let Some(ty) = self.lookup_type(&format!("{}.{}", package, name)) {
                    return Some(ty);
                }
            }
        }

        self.lookup_type(name)
    }
}
