//! Lexical scopes.
//!
//! Scopes live in an arena owned by the [`TypeSystem`] and nest through
//! parent links. Each one records the current package, its imports, the
//! type of `self` and what kind of body it belongs to. Lookups of package,
//! self type and context walk outward until a scope that sets them.

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::cell::CellId;
use crate::future::FutureId;
use crate::registry::TypeSystem;

/// Handle to a [`Scope`] in the scope arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(pub(crate) u32);

impl ScopeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// The kind of body a scope belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScopeContext {
    Script,
    Class,
    Method { name: String },
    StaticMethod { name: String },
    /// `initialize`; `super` here chains to a superclass constructor.
    Constructor,
}

#[derive(Clone, Debug)]
pub struct Scope {
    pub id: ScopeId,
    pub parent: Option<ScopeId>,
    pub package: Option<String>,
    /// Simple (or aliased) name to fully-qualified name.
    pub imports: FxHashMap<String, String>,
    /// Packages imported with a wildcard, in import order.
    pub search_packages: Vec<String>,
    /// Always-visible library packages.
    pub default_packages: Vec<String>,
    pub self_type: Option<FutureId>,
    pub context: Option<ScopeContext>,
    pub(crate) locals: FxHashMap<String, CellId>,
}

impl TypeSystem {
    /// A new scope. Children inherit package, imports, self type and
    /// context from their parents unless they set their own.
    pub fn new_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            id,
            parent,
            package: None,
            imports: FxHashMap::default(),
            search_packages: Vec::new(),
            default_packages: Vec::new(),
            self_type: None,
            context: None,
            locals: FxHashMap::default(),
        });
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }

    /// The scope and its ancestors, innermost first.
    pub(crate) fn scope_chain(&self, id: ScopeId) -> impl Iterator<Item = &Scope> + '_ {
        std::iter::successors(Some(self.scope(id)), move |scope| {
            scope.parent.map(|parent| self.scope(parent))
        })
    }

    pub fn set_package(&mut self, scope: ScopeId, package: Option<&str>) {
        self.scope_mut(scope).package = package.filter(|p| !p.is_empty()).map(str::to_string);
    }

    /// The innermost package declaration in effect.
    pub fn package_of(&self, scope: ScopeId) -> Option<&str> {
        self.scope_chain(scope).find_map(|s| s.package.as_deref())
    }

    pub fn set_self_type(&mut self, scope: ScopeId, self_type: FutureId) {
        self.scope_mut(scope).self_type = Some(self_type);
    }

    pub fn self_type_of(&self, scope: ScopeId) -> Option<FutureId> {
        self.scope_chain(scope).find_map(|s| s.self_type)
    }

    pub fn set_context(&mut self, scope: ScopeId, context: ScopeContext) {
        self.scope_mut(scope).context = Some(context);
    }

    pub fn context_of(&self, scope: ScopeId) -> Option<&ScopeContext> {
        self.scope_chain(scope).find_map(|s| s.context.as_ref())
    }

    /// Record an import. `import("java.util.List", "List")` makes `List`
    /// name the full class; an alias renames it. `import("java.util.*",
    /// "*")` searches the whole package.
    pub fn import(&mut self, scope: ScopeId, full_name: &str, alias: &str) {
        let scope = self.scope_mut(scope);
        if alias == "*" {
            let package = full_name.strip_suffix(".*").unwrap_or(full_name);
            if !scope.search_packages.iter().any(|p| p == package) {
                scope.search_packages.push(package.to_string());
            }
        } else {
            scope.imports.insert(alias.to_string(), full_name.to_string());
        }
        trace!(full_name, alias, "import");
    }

    /// Seed the scope with the always-visible library packages.
    pub fn add_default_imports(&mut self, scope: ScopeId) {
        let defaults = self.config.default_imports.clone();
        let scope = self.scope_mut(scope);
        for package in defaults {
            if !scope.default_packages.contains(&package) {
                scope.default_packages.push(package);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_and_self_type_are_inherited() {
        let mut ts = TypeSystem::new();
        let outer = ts.new_scope(None);
        ts.set_package(outer, Some("foo.bar"));
        let object = ts.type_future(ts.object_type());
        ts.set_self_type(outer, object);
        let inner = ts.new_scope(Some(outer));
        assert_eq!(ts.package_of(inner), Some("foo.bar"));
        assert_eq!(ts.self_type_of(inner), Some(object));

        ts.set_package(inner, Some("baz"));
        assert_eq!(ts.package_of(inner), Some("baz"));
        assert_eq!(ts.package_of(outer), Some("foo.bar"));
    }

    #[test]
    fn empty_package_means_none() {
        let mut ts = TypeSystem::new();
        let scope = ts.new_scope(None);
        ts.set_package(scope, Some(""));
        assert_eq!(ts.package_of(scope), None);
    }

    #[test]
    fn wildcard_and_alias_imports() {
        let mut ts = TypeSystem::new();
        let scope = ts.new_scope(None);
        ts.import(scope, "java.util.*", "*");
        ts.import(scope, "java.util.*", "*");
        ts.import(scope, "java.util.ArrayList", "AL");
        let s = ts.scope(scope);
        assert_eq!(s.search_packages, vec!["java.util".to_string()]);
        assert_eq!(s.imports.get("AL").map(String::as_str), Some("java.util.ArrayList"));
    }

    #[test]
    fn default_imports_follow_config() {
        let mut ts = TypeSystem::new();
        let scope = ts.new_scope(None);
        ts.add_default_imports(scope);
        ts.add_default_imports(scope);
        assert_eq!(ts.scope(scope).default_packages, vec!["java.lang".to_string()]);
    }

    #[test]
    fn context_lookup_walks_outward() {
        let mut ts = TypeSystem::new();
        let method = ts.new_scope(None);
        ts.set_context(method, ScopeContext::Constructor);
        let block = ts.new_scope(Some(method));
        assert_eq!(ts.context_of(block), Some(&ScopeContext::Constructor));
    }
}
