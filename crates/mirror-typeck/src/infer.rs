//! The fixpoint driver.
//!
//! Inference runs in three phases:
//!
//! - `Inferring`: walk the script, define every class and member, then
//!   attach a future to every expression and a call site to every call.
//! - `Settling`: re-run call sites that have not resolved until a whole pass
//!   changes nothing, or the pass budget runs out.
//! - `Finalized`: anything still unresolved becomes an `Uninferred` error at
//!   its node's position, and every error is collected into one batch.

use mirror_ast::{ClassDef, Literal, MethodDef, MethodKind, Node, Script, TypeRef};
use rowan::TextRange;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::call::CallId;
use crate::cell::CellId;
use crate::config::TyperConfig;
use crate::error::TypeError;
use crate::future::{FutureId, FutureState};
use crate::registry::TypeSystem;
use crate::scope::{ScopeContext, ScopeId};
use crate::ty::Primitive;
use crate::TypeckResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Inferring,
    Settling,
    Finalized,
}

/// A typed node awaiting finalization.
struct NodeType {
    future: FutureId,
    what: String,
}

/// A class found by the declaration pass.
struct DeclaredClass<'a> {
    def: &'a ClassDef,
    scope: ScopeId,
    instance: FutureId,
    superclass: Option<(FutureId, &'a TypeRef)>,
    interfaces: Vec<(FutureId, &'a TypeRef)>,
}

/// A method body to infer once every signature is known.
struct PendingBody<'a> {
    def: &'a MethodDef,
    scope: ScopeId,
    return_cell: CellId,
    infer_return: bool,
}

pub struct Typer {
    ts: TypeSystem,
    phase: Phase,
    nodes: FxHashMap<TextRange, NodeType>,
    call_sites: FxHashMap<TextRange, CallId>,
    errors: Vec<TypeError>,
    return_cells: Vec<CellId>,
    main_type: Option<FutureId>,
    passes: usize,
}

/// Infer types for a whole script.
pub fn infer(script: &Script, config: TyperConfig) -> TypeckResult {
    let mut typer = Typer::new(config);
    typer.infer_script(script);
    typer.settle();
    typer.finalize()
}

impl Typer {
    pub fn new(config: TyperConfig) -> Self {
        Typer {
            ts: TypeSystem::with_config(config),
            phase: Phase::Inferring,
            nodes: FxHashMap::default(),
            call_sites: FxHashMap::default(),
            errors: Vec::new(),
            return_cells: Vec::new(),
            main_type: None,
            passes: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn type_system(&self) -> &TypeSystem {
        &self.ts
    }

    /// Settling passes run so far.
    pub fn passes(&self) -> usize {
        self.passes
    }

    // ── Inferring ───────────────────────────────────────────────────────

    pub fn infer_script(&mut self, script: &Script) {
        debug!(file = %script.filename, "inferring script");
        let scope = self.ts.new_scope(None);
        self.ts.set_context(scope, ScopeContext::Script);
        self.ts.add_default_imports(scope);

        for node in &script.body {
            match node {
                Node::Package { name, .. } => self.ts.set_package(scope, Some(name)),
                Node::Import { full_name, alias, .. } => self.ts.import(scope, full_name, alias),
                _ => {}
            }
        }

        let main = self.ts.get_main_type(scope, &script.filename);
        self.ts.set_self_type(scope, main);
        self.main_type = Some(main);

        let mut classes = Vec::new();
        self.declare_classes(scope, &script.body, &mut classes);
        for class in &classes {
            self.link_supertypes(class);
        }

        let mut bodies = Vec::new();
        for node in &script.body {
            match node {
                Node::MethodDef(method) => self.declare_method(scope, main, method, &mut bodies),
                Node::FieldDecl { name, ty, span, .. } => {
                    self.declare_field(scope, main, name, ty, true, *span);
                }
                _ => {}
            }
        }
        for class in &classes {
            self.declare_members(class, &mut bodies);
        }

        let main_scope = self.ts.new_scope(Some(scope));
        self.ts.set_context(main_scope, ScopeContext::StaticMethod { name: "main".to_string() });
        self.infer_body(main_scope, &script.body);

        for class in &classes {
            self.infer_body(class.scope, &class.def.body);
        }
        for body in bodies {
            self.infer_method_body(body);
        }
    }

    fn declare_classes<'a>(&mut self, scope: ScopeId, nodes: &'a [Node], out: &mut Vec<DeclaredClass<'a>>) {
        for node in nodes {
            let Node::ClassDef(def) = node else {
                continue;
            };
            let superclass = def
                .superclass
                .as_ref()
                .map(|sup| (self.ts.new_future(), sup));
            let interfaces: Vec<(FutureId, &TypeRef)> = def
                .interfaces
                .iter()
                .map(|iface| (self.ts.new_future(), iface))
                .collect();
            let iface_futures: Vec<FutureId> = interfaces.iter().map(|(f, _)| *f).collect();
            let instance = if def.is_interface {
                self.ts.define_interface(scope, &def.name, &iface_futures)
            } else {
                self.ts
                    .define_type(scope, &def.name, superclass.map(|(f, _)| f), &iface_futures)
            };

            let class_scope = self.ts.new_scope(Some(scope));
            self.ts.set_context(class_scope, ScopeContext::Class);
            let meta = self.ts.meta_future(instance);
            self.ts.set_self_type(class_scope, meta);
            self.record(def.span, instance, format!("class `{}`", def.name));

            out.push(DeclaredClass {
                def,
                scope: class_scope,
                instance,
                superclass,
                interfaces,
            });
            self.declare_classes(class_scope, &def.body, out);
        }
    }

    /// Resolve the pending supertype futures of a declared class now that
    /// every class name is known.
    fn link_supertypes(&mut self, class: &DeclaredClass<'_>) {
        let links = class.superclass.iter().chain(class.interfaces.iter());
        for &(pending, type_ref) in links {
            let found = self.ts.get(class.scope, type_ref);
            let outcome = match self.ts.state(found).clone() {
                FutureState::Resolved(ty) => self.ts.resolved(pending, ty),
                FutureState::Error(error) => self.ts.fail(pending, error),
                FutureState::Unresolved => Ok(()),
            };
            if let Err(error) = outcome {
                self.errors.push(error);
            }
        }
    }

    fn declare_members<'a>(&mut self, class: &DeclaredClass<'a>, bodies: &mut Vec<PendingBody<'a>>) {
        for node in &class.def.body {
            match node {
                Node::MethodDef(method) => {
                    let target = match method.kind {
                        MethodKind::Static => self.ts.meta_future(class.instance),
                        MethodKind::Instance | MethodKind::Constructor => class.instance,
                    };
                    self.declare_method(class.scope, target, method, bodies);
                }
                Node::FieldDecl {
                    name,
                    ty,
                    is_static,
                    span,
                } => {
                    self.declare_field(class.scope, class.instance, name, ty, *is_static, *span);
                }
                _ => {}
            }
        }
    }

    fn declare_method<'a>(
        &mut self,
        parent: ScopeId,
        target: FutureId,
        method: &'a MethodDef,
        bodies: &mut Vec<PendingBody<'a>>,
    ) {
        let scope = self.ts.new_scope(Some(parent));
        let is_static = self.ts.host_type(self.ts.resolve(target)).is_meta();
        let context = if method.kind == MethodKind::Constructor && !is_static {
            ScopeContext::Constructor
        } else if is_static {
            ScopeContext::StaticMethod {
                name: method.name.clone(),
            }
        } else {
            ScopeContext::Method {
                name: method.name.clone(),
            }
        };
        let is_constructor = context == ScopeContext::Constructor;
        self.ts.set_context(scope, context);
        self.ts.set_self_type(scope, target);

        let mut params = Vec::with_capacity(method.params.len());
        for param in &method.params {
            let future = match &param.ty {
                Some(ty) => self.ts.get(scope, ty),
                None => {
                    let error = TypeError::UntypedParameter {
                        name: param.name.clone(),
                        span: param.span,
                    };
                    self.errors.push(error.clone());
                    self.ts.error_future(error)
                }
            };
            let cell = self.ts.get_local_type(scope, &param.name, Some(param.span));
            self.ts.declare(cell, future);
            self.record(param.span, future, format!("parameter `{}`", param.name));
            params.push(future);
        }

        let declared = method.return_type.as_ref().map(|ty| self.ts.get(scope, ty));
        let def = self
            .ts
            .get_method_def_type(target, &method.name, &params, declared, Some(method.span));
        self.record(method.span, def.return_type, format!("return type of `{}`", method.name));

        let declared_void = declared
            .map(|ty| self.ts.host_type(self.ts.resolve(ty)).is_void())
            .unwrap_or(false);
        bodies.push(PendingBody {
            def: method,
            scope,
            return_cell: def.return_cell,
            infer_return: !is_constructor && !declared_void,
        });
    }

    fn declare_field(
        &mut self,
        scope: ScopeId,
        target: FutureId,
        name: &str,
        ty: &TypeRef,
        is_static: bool,
        span: TextRange,
    ) -> FutureId {
        let declared = self.ts.get(scope, ty);
        let cell = self.ts.get_field_type(target, name, is_static, Some(span));
        let future = self.ts.declare(cell, declared);
        self.record(span, future, format!("field `{}`", name));
        future
    }

    fn infer_method_body(&mut self, body: PendingBody<'_>) {
        self.return_cells.push(body.return_cell);
        let value = self.infer_body(body.scope, &body.def.body);
        if body.infer_return && !ends_in_return(&body.def.body) {
            let value = match value {
                Some(value) => value,
                None => self.ts.type_future(self.ts.implicit_nil()),
            };
            let span = body.def.body.last().map(Node::span).or(Some(body.def.span));
            self.ts.assign(body.return_cell, value, span);
        }
        self.return_cells.pop();
    }

    /// Infer a sequence of statements; the value is the last expression's.
    fn infer_body(&mut self, scope: ScopeId, nodes: &[Node]) -> Option<FutureId> {
        let mut last = None;
        for node in nodes {
            if node.is_declaration() {
                continue;
            }
            last = Some(self.infer_node(scope, node));
        }
        last
    }

    fn infer_node(&mut self, scope: ScopeId, node: &Node) -> FutureId {
        let (future, what) = match node {
            Node::Literal { value, .. } => (self.infer_literal(value), "literal".to_string()),
            Node::ArrayLiteral { elements, .. } => {
                for element in elements {
                    self.infer_node(scope, element);
                }
                (self.ts.type_future(self.ts.list()), "array literal".to_string())
            }
            Node::HashLiteral { entries, .. } => {
                for (key, value) in entries {
                    self.infer_node(scope, key);
                    self.infer_node(scope, value);
                }
                (self.ts.type_future(self.ts.hash()), "hash literal".to_string())
            }
            Node::LocalDecl { name, ty, span } => {
                let declared = self.ts.get(scope, ty);
                let cell = self.ts.get_local_type(scope, name, Some(*span));
                self.ts.declare(cell, declared);
                (declared, format!("local `{}`", name))
            }
            Node::LocalAssign { name, value, span } => {
                let value = self.infer_node(scope, value);
                let cell = self.ts.get_local_type(scope, name, Some(*span));
                (self.ts.assign(cell, value, Some(*span)), format!("local `{}`", name))
            }
            Node::LocalRef { name, span } => match self.ts.find_local(scope, name) {
                Some(cell) => (self.ts.cell_type(cell), format!("local `{}`", name)),
                None => (
                    self.infer_call(scope, None, name, &[], *span),
                    format!("call to `{}`", name),
                ),
            },
            Node::FieldDecl {
                name,
                ty,
                is_static,
                span,
            } => {
                let target = self.self_type(scope);
                let future = self.declare_field(scope, target, name, ty, *is_static, *span);
                return future;
            }
            Node::FieldAssign {
                name,
                value,
                is_static,
                span,
            } => {
                let value = self.infer_node(scope, value);
                let target = self.self_type(scope);
                let cell = self.ts.get_field_type(target, name, *is_static, Some(*span));
                (self.ts.assign(cell, value, Some(*span)), format!("field `{}`", name))
            }
            Node::FieldRef {
                name,
                is_static,
                span,
            } => {
                let target = self.self_type(scope);
                let cell = self.ts.get_field_type(target, name, *is_static, Some(*span));
                (self.ts.cell_type(cell), format!("field `{}`", name))
            }
            Node::Call {
                target,
                name,
                args,
                span,
            } => (
                self.infer_call(scope, target.as_deref(), name, args, *span),
                format!("call to `{}`", name),
            ),
            Node::Super { args, span } => (self.infer_super(scope, args, *span), "call to `super`".to_string()),
            Node::SelfRef { .. } => (self.self_type(scope), "self".to_string()),
            Node::Constant { ty, .. } => {
                let instance = self.ts.get(scope, ty);
                (self.ts.meta_future(instance), format!("constant `{}`", ty.name))
            }
            Node::If {
                condition,
                then_body,
                else_body,
                span,
            } => {
                self.infer_node(scope, condition);
                (self.infer_if(scope, then_body, else_body.as_deref(), *span), "if".to_string())
            }
            Node::While { condition, body, .. } => {
                self.infer_node(scope, condition);
                self.infer_body(scope, body);
                (self.ts.type_future(self.ts.void()), "loop".to_string())
            }
            Node::Return { value, span } => {
                let value = match value {
                    Some(value) => self.infer_node(scope, value),
                    None => self.ts.type_future(self.ts.implicit_nil()),
                };
                let future = match self.return_cells.last() {
                    Some(&cell) => self.ts.assign(cell, value, Some(*span)),
                    None => value,
                };
                (future, "return value".to_string())
            }
            Node::Cast { ty, value, .. } => {
                self.infer_node(scope, value);
                (self.ts.get(scope, ty), format!("cast to `{}`", ty.name))
            }
            Node::NewArray { component, size, .. } => {
                self.infer_node(scope, size);
                let what = format!("array of `{}`", component.name);
                let component = self.ts.get(scope, component);
                (self.ts.array_future(component), what)
            }
            Node::Block { body, .. } => {
                let inner = self.ts.new_scope(Some(scope));
                let value = match self.infer_body(inner, body) {
                    Some(value) => value,
                    None => self.ts.type_future(self.ts.implicit_nil()),
                };
                (value, "block".to_string())
            }
            Node::Package { .. } | Node::Import { .. } | Node::ClassDef(_) | Node::MethodDef(_) => {
                return self.ts.type_future(self.ts.void());
            }
        };
        self.record(node.span(), future, what);
        future
    }

    fn infer_literal(&mut self, literal: &Literal) -> FutureId {
        let ty = match literal {
            Literal::Fixnum(value) => self.ts.fixnum(*value),
            Literal::Float(_) => self.ts.float(),
            Literal::Bool(_) => self.ts.boolean(),
            Literal::Char(_) => self.ts.primitive(Primitive::Char),
            Literal::String(_) => self.ts.string(),
            Literal::Regex(_) => self.ts.regex(),
            Literal::Nil => self.ts.null(),
        };
        self.ts.type_future(ty)
    }

    fn infer_call(
        &mut self,
        scope: ScopeId,
        target: Option<&Node>,
        name: &str,
        args: &[Node],
        span: TextRange,
    ) -> FutureId {
        let receiver = match target {
            Some(target) => self.infer_node(scope, target),
            None => self.self_type(scope),
        };
        let args: Vec<FutureId> = args.iter().map(|arg| self.infer_node(scope, arg)).collect();
        let call = self.ts.call(scope, receiver, name, &args, Some(span));
        self.call_sites.insert(span, call);
        self.ts.call_result(call)
    }

    /// `super(args)`: the same method on the superclass, or the superclass
    /// constructor inside `initialize`.
    fn infer_super(&mut self, scope: ScopeId, args: &[Node], span: TextRange) -> FutureId {
        let name = match self.ts.context_of(scope) {
            Some(ScopeContext::Method { name }) | Some(ScopeContext::StaticMethod { name }) => name.clone(),
            _ => "initialize".to_string(),
        };
        let own = self.self_type(scope);
        let receiver = self.ts.get_super_class(own);
        let args: Vec<FutureId> = args.iter().map(|arg| self.infer_node(scope, arg)).collect();
        let call = self.ts.call(scope, receiver, &name, &args, Some(span));
        self.call_sites.insert(span, call);
        self.ts.call_result(call)
    }

    fn infer_if(
        &mut self,
        scope: ScopeId,
        then_body: &[Node],
        else_body: Option<&[Node]>,
        span: TextRange,
    ) -> FutureId {
        let Some(else_body) = else_body else {
            return match self.infer_body(scope, then_body) {
                Some(value) => value,
                None => self.ts.type_future(self.ts.implicit_nil()),
            };
        };
        let cell = self.ts.new_cell("if", Some(span));
        let mut contributed = false;
        for branch in [then_body, else_body] {
            let value = self.infer_body(scope, branch);
            if let (Some(value), false) = (value, ends_in_return(branch)) {
                let branch_span = branch.last().map(Node::span);
                self.ts.assign(cell, value, branch_span);
                contributed = true;
            }
        }
        if !contributed {
            let void = self.ts.type_future(self.ts.implicit_nil());
            self.ts.declare(cell, void);
        }
        self.ts.cell_type(cell)
    }

    fn self_type(&mut self, scope: ScopeId) -> FutureId {
        match self.ts.self_type_of(scope) {
            Some(future) => future,
            None => self.ts.error_future(TypeError::Uninferred {
                what: "self".to_string(),
                span: None,
            }),
        }
    }

    fn record(&mut self, span: TextRange, future: FutureId, what: String) {
        self.nodes.insert(span, NodeType { future, what });
    }

    // ── Settling ────────────────────────────────────────────────────────

    /// Re-run unresolved call sites until a pass changes nothing.
    pub fn settle(&mut self) {
        self.phase = Phase::Settling;
        let max_passes = self.ts.config().max_passes;
        loop {
            if self.passes >= max_passes {
                warn!(passes = self.passes, "inference did not settle");
                self.errors.push(TypeError::NonTerminating {
                    passes: self.passes,
                });
                break;
            }
            self.passes += 1;
            self.ts.pass = self.passes;
            let before = self.ts.generation();
            let rerun = self.ts.rerun_unresolved_calls();
            let changes = self.ts.generation() - before;
            debug!(pass = self.passes, rerun, changes, "settling pass");
            if changes == 0 {
                break;
            }
        }
    }

    // ── Finalized ───────────────────────────────────────────────────────

    pub fn finalize(mut self) -> TypeckResult {
        self.phase = Phase::Finalized;

        let mut types = FxHashMap::default();
        let mut errors = std::mem::take(&mut self.errors);
        for (&span, node) in &self.nodes {
            match self.ts.state(node.future) {
                FutureState::Resolved(ty) => {
                    types.insert(span, *ty);
                }
                FutureState::Error(error) => errors.push(error.clone()),
                FutureState::Unresolved => errors.push(TypeError::Uninferred {
                    what: node.what.clone(),
                    span: Some(span),
                }),
            }
        }
        for (&span, &call) in &self.call_sites {
            if self.ts.is_resolved(self.ts.call_result(call)) && self.ts.resolved_call(call).is_none() {
                errors.push(TypeError::Uninferred {
                    what: format!("call to `{}`", self.ts.call_site(call).name),
                    span: Some(span),
                });
            }
        }
        errors.extend(self.ts.errors().iter().cloned());

        let mut unique: Vec<TypeError> = Vec::with_capacity(errors.len());
        for error in errors {
            if !unique.contains(&error) {
                unique.push(error);
            }
        }
        unique.sort_by_key(|e| {
            let span = e.span();
            (span.is_none(), span.map(|s| (s.start(), s.end())))
        });

        let calls = self
            .call_sites
            .iter()
            .filter_map(|(&span, &call)| self.ts.resolved_call(call).map(|c| (span, c)))
            .collect();
        let main_type = self
            .main_type
            .map(|main| self.ts.unmeta(self.ts.resolve(main)))
            .filter(|ty| !ty.is_error());

        debug!(
            nodes = self.nodes.len(),
            errors = unique.len(),
            passes = self.passes,
            "inference finalized"
        );
        TypeckResult {
            types,
            calls,
            errors: unique,
            main_type,
            type_system: self.ts,
        }
    }
}

fn ends_in_return(nodes: &[Node]) -> bool {
    matches!(nodes.last(), Some(Node::Return { .. }))
}
