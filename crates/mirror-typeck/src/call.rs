//! Call sites and overload resolution.
//!
//! A call site is re-resolved whenever its receiver, one of its arguments,
//! a parameter or supertype it was waiting on, or the selected member's
//! return type changes. The result future is pushed, never pulled.

use std::collections::VecDeque;

use rowan::TextRange;
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::error::TypeError;
use crate::future::{FutureId, FutureState, Observer};
use crate::registry::TypeSystem;
use crate::scope::{ScopeContext, ScopeId};
use crate::ty::{MemberId, MemberKind, TypeId};

/// Handle to a [`CallSite`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CallId(pub(crate) u32);

impl CallId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
pub struct CallSite {
    pub scope: ScopeId,
    pub receiver: FutureId,
    pub name: String,
    pub args: Vec<FutureId>,
    pub span: Option<TextRange>,
    pub(crate) result: FutureId,
    pub(crate) selected: Option<ResolvedCall>,
}

/// The member a call site settled on, as code generation needs it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedCall {
    pub member: MemberId,
    pub kind: MemberKind,
    /// The member's declared return type; `void` for void methods.
    pub return_type: TypeId,
    /// The type of the call expression. Differs from `return_type` for
    /// constructors and, with `void_returns_receiver`, void methods.
    pub value_type: TypeId,
}

impl TypeSystem {
    /// Create a call site and resolve it against what is known so far.
    pub fn call(
        &mut self,
        scope: ScopeId,
        receiver: FutureId,
        name: &str,
        args: &[FutureId],
        span: Option<TextRange>,
    ) -> CallId {
        let id = CallId(self.calls.len() as u32);
        let result = self.pushed_future(span);
        self.calls.push(CallSite {
            scope,
            receiver,
            name: name.to_string(),
            args: args.to_vec(),
            span,
            result,
            selected: None,
        });
        self.resolve_call(id);
        self.flush();
        id
    }

    /// The type of the call expression.
    pub fn call_result(&self, id: CallId) -> FutureId {
        self.calls[id.index()].result
    }

    pub fn call_site(&self, id: CallId) -> &CallSite {
        &self.calls[id.index()]
    }

    /// The selected member, once the call has resolved.
    pub fn resolved_call(&self, id: CallId) -> Option<ResolvedCall> {
        self.calls[id.index()].selected
    }

    /// Re-run every call site that has not resolved. Returns how many ran.
    pub fn rerun_unresolved_calls(&mut self) -> usize {
        let pending: Vec<CallId> = (0..self.calls.len() as u32)
            .map(CallId)
            .filter(|&id| !self.is_resolved(self.calls[id.index()].result))
            .collect();
        for &id in &pending {
            self.resolve_call(id);
        }
        self.flush();
        pending.len()
    }

    pub(crate) fn resolve_call(&mut self, id: CallId) {
        let site = &self.calls[id.index()];
        let scope = site.scope;
        let receiver = site.receiver;
        let name = site.name.clone();
        let args = site.args.clone();
        let span = site.span;
        let result = site.result;

        self.observe(receiver, Observer::Call(id));
        for &arg in &args {
            self.observe(arg, Observer::Call(id));
        }

        let (state, selected) = match self.state(receiver).clone() {
            FutureState::Resolved(receiver_ty) => {
                self.select_member(id, scope, receiver_ty, &name, &args, span)
            }
            other => (other, None),
        };
        trace!(call = %name, state = ?state, "call resolved");
        let keep_previous = state == FutureState::Unresolved
            && self.is_resolved(result)
            && self.calls[id.index()].selected.is_some();
        if keep_previous {
            // A better candidate is still waiting on its return type.
            return;
        }
        self.calls[id.index()].selected = selected;
        self.update(result, state);
    }

    fn select_member(
        &mut self,
        id: CallId,
        scope: ScopeId,
        receiver_ty: TypeId,
        name: &str,
        args: &[FutureId],
        span: Option<TextRange>,
    ) -> (FutureState, Option<ResolvedCall>) {
        let is_meta = self.host_type(receiver_ty).is_meta();
        let instance = self.unmeta(receiver_ty);
        let is_new = is_meta && name == "new";
        let is_super_init =
            name == "initialize" && matches!(self.context_of(scope), Some(ScopeContext::Constructor));

        let mut pending = Vec::new();
        let candidates: Vec<MemberId> = if is_new || is_super_init {
            self.declared_members(instance)
                .iter()
                .copied()
                .filter(|&m| {
                    let member = self.member(m);
                    member.kind == MemberKind::Constructor && member.params.len() == args.len()
                })
                .collect()
        } else {
            let methods = self.collect_candidates(instance, name, args.len(), is_meta, false, &mut pending);
            if methods.is_empty() && args.is_empty() {
                self.collect_candidates(instance, name, 0, is_meta, true, &mut pending)
            } else {
                methods
            }
        };

        let arg_types: Vec<TypeId> = args.iter().map(|&arg| self.resolve(arg)).collect();
        let applicable: Vec<MemberId> = candidates
            .iter()
            .copied()
            .filter(|&m| self.is_applicable(m, &arg_types, &mut pending))
            .collect();

        let mut seen = FxHashSet::default();
        for future in pending {
            if seen.insert(future) {
                self.observe(future, Observer::Call(id));
            }
        }

        if applicable.is_empty() {
            if let Some(&arg) = args.iter().find(|&&arg| !self.is_resolved(arg)) {
                return (self.state(arg).clone(), None);
            }
            let error = TypeError::NoApplicableMethod {
                receiver: self.type_name(receiver_ty),
                name: name.to_string(),
                args: arg_types.iter().map(|&t| self.type_name(t)).collect(),
                span,
            };
            debug!(%error, "no applicable method");
            return (FutureState::Error(error), None);
        }

        let member = match self.most_specific(&applicable) {
            Some(member) => member,
            None => {
                let error = TypeError::AmbiguousMethod {
                    receiver: self.type_name(receiver_ty),
                    name: name.to_string(),
                    candidates: applicable.iter().map(|&m| self.signature(m)).collect(),
                    span,
                };
                debug!(%error, "ambiguous call");
                return (FutureState::Error(error), None);
            }
        };

        let (kind, return_future) = {
            let member = self.member(member);
            (member.kind, member.return_type)
        };
        self.observe(return_future, Observer::Call(id));
        let return_type = match self.state(return_future).clone() {
            FutureState::Resolved(ty) => ty,
            other => return (other, None),
        };

        let value_type = if is_new {
            instance
        } else if kind == MemberKind::Constructor {
            receiver_ty
        } else if self.host_type(return_type).is_void() && self.config.void_returns_receiver {
            receiver_ty
        } else {
            return_type
        };
        debug!(
            call = name,
            receiver = %self.type_name(receiver_ty),
            member = %self.signature(member),
            kind = %kind,
            "selected member"
        );
        (
            FutureState::Resolved(value_type),
            Some(ResolvedCall {
                member,
                kind,
                return_type,
                value_type,
            }),
        )
    }

    /// Members named `name` with the given arity visible on `instance` and
    /// its supertypes, nearest first. Overridden members are dropped.
    fn collect_candidates(
        &self,
        instance: TypeId,
        name: &str,
        arity: usize,
        statics_only: bool,
        fields: bool,
        pending: &mut Vec<FutureId>,
    ) -> Vec<MemberId> {
        let mut found: Vec<MemberId> = Vec::new();
        let mut visited = FxHashSet::default();
        let mut queue = VecDeque::from([instance]);
        while let Some(ty) = queue.pop_front() {
            if !visited.insert(ty) {
                continue;
            }
            let host = self.host_type(ty);
            for &m in &host.members {
                let member = self.member(m);
                if member.name != name
                    || member.params.len() != arity
                    || member.kind == MemberKind::Constructor
                    || member.kind.is_field() != fields
                    || (statics_only && !member.kind.is_static())
                {
                    continue;
                }
                if found.iter().any(|&f| self.same_signature(f, m)) {
                    continue;
                }
                found.push(m);
            }
            for &sup in host.superclass.iter().chain(host.interfaces.iter()) {
                match self.state(sup) {
                    FutureState::Resolved(sup_ty) => queue.push_back(*sup_ty),
                    FutureState::Unresolved => pending.push(sup),
                    FutureState::Error(_) => {}
                }
            }
            if host.is_interface() {
                queue.push_back(self.known.object);
            }
        }
        found
    }

    fn is_applicable(&self, member: MemberId, args: &[TypeId], pending: &mut Vec<FutureId>) -> bool {
        let params = &self.member(member).params;
        let mut applicable = true;
        for (&param, &arg) in params.iter().zip(args) {
            match self.state(param) {
                FutureState::Resolved(param_ty) => {
                    if !self.is_assignable(*param_ty, arg, pending) {
                        applicable = false;
                    }
                }
                FutureState::Unresolved => {
                    pending.push(param);
                    applicable = false;
                }
                FutureState::Error(_) => applicable = false,
            }
        }
        applicable
    }

    /// The applicable member at least as specific as every other one.
    /// Members with identical parameters resolve to the first found.
    fn most_specific(&self, applicable: &[MemberId]) -> Option<MemberId> {
        applicable.iter().copied().find(|&a| {
            applicable
                .iter()
                .all(|&b| a == b || self.more_specific(a, b))
        })
    }

    fn more_specific(&self, a: MemberId, b: MemberId) -> bool {
        let a = &self.member(a).params;
        let b = &self.member(b).params;
        a.iter()
            .zip(b)
            .all(|(&pa, &pb)| self.assignable(self.resolve(pb), self.resolve(pa)))
    }

    fn same_signature(&self, a: MemberId, b: MemberId) -> bool {
        let a = &self.member(a).params;
        let b = &self.member(b).params;
        a.len() == b.len()
            && a.iter().zip(b).all(|(&pa, &pb)| {
                let (ta, tb) = (self.resolve(pa), self.resolve(pb));
                !ta.is_error() && ta == tb
            })
    }

    /// `name(int, java.lang.String)`.
    pub fn signature(&self, member: MemberId) -> String {
        let member = self.member(member);
        let params: Vec<String> = member
            .params
            .iter()
            .map(|&p| self.type_name(self.resolve(p)))
            .collect();
        format!("{}({})", member.name, params.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::Primitive;

    fn setup() -> (TypeSystem, ScopeId) {
        let mut ts = TypeSystem::new();
        let scope = ts.new_scope(None);
        ts.add_default_imports(scope);
        (ts, scope)
    }

    #[test]
    fn string_methods_resolve() {
        let (mut ts, scope) = setup();
        let string = ts.type_future(ts.string());
        let int = ts.type_future(ts.primitive(Primitive::Int));
        let call = ts.call(scope, string, "substring", &[int], None);
        assert_eq!(ts.resolve(ts.call_result(call)), ts.string());
        let selected = ts.resolved_call(call).unwrap();
        assert_eq!(selected.kind, MemberKind::Method);
        assert_eq!(ts.signature(selected.member), "substring(int)");
    }

    #[test]
    fn inherited_methods_are_found() {
        let (mut ts, scope) = setup();
        let exception = ts.type_future(ts.default_exception());
        let call = ts.call(scope, exception, "getMessage", &[], None);
        assert_eq!(ts.resolve(ts.call_result(call)), ts.string());
        let hash = ts.call(scope, exception, "hashCode", &[], None);
        assert_eq!(ts.descriptor(ts.resolve(ts.call_result(hash))), "I");
    }

    #[test]
    fn interface_receivers_see_object_methods() {
        let (mut ts, scope) = setup();
        let list = ts.type_future(ts.list());
        let call = ts.call(scope, list, "toString", &[], None);
        assert_eq!(ts.resolve(ts.call_result(call)), ts.string());
        let size = ts.call(scope, list, "size", &[], None);
        assert_eq!(ts.descriptor(ts.resolve(ts.call_result(size))), "I");
    }

    #[test]
    fn most_specific_overload_wins() {
        let (mut ts, scope) = setup();
        let out = ts.lookup_type("java.io.PrintStream").unwrap();
        let out = ts.type_future(out);
        let string = ts.type_future(ts.string());
        let call = ts.call(scope, out, "println", &[string], None);
        let selected = ts.resolved_call(call).unwrap();
        assert_eq!(ts.signature(selected.member), "println(java.lang.String)");

        let short = ts.type_future(ts.primitive(Primitive::Short));
        let call = ts.call(scope, out, "println", &[short], None);
        let selected = ts.resolved_call(call).unwrap();
        assert_eq!(ts.signature(selected.member), "println(int)");
    }

    #[test]
    fn void_call_evaluates_to_receiver() {
        let (mut ts, scope) = setup();
        let printer = ts.lookup_type("java.io.PrintStream").unwrap();
        let printer_future = ts.type_future(printer);
        let call = ts.call(scope, printer_future, "println", &[], None);
        assert_eq!(ts.resolve(ts.call_result(call)), printer);
        assert_eq!(ts.resolved_call(call).unwrap().return_type, ts.void());
    }

    #[test]
    fn void_call_without_receiver_chaining() {
        let config = crate::config::TyperConfig {
            void_returns_receiver: false,
            ..Default::default()
        };
        let mut ts = TypeSystem::with_config(config);
        let scope = ts.new_scope(None);
        let printer = ts.lookup_type("java.io.PrintStream").unwrap();
        let printer = ts.type_future(printer);
        let call = ts.call(scope, printer, "println", &[], None);
        assert_eq!(ts.resolve(ts.call_result(call)), ts.void());
    }

    #[test]
    fn static_methods_on_class_objects() {
        let (mut ts, scope) = setup();
        let math = ts.lookup_type("java.lang.Math").unwrap();
        let math_meta = ts.meta_type(math);
        let math_meta = ts.type_future(math_meta);
        let long = ts.type_future(ts.primitive(Primitive::Long));
        let int = ts.type_future(ts.primitive(Primitive::Int));
        let call = ts.call(scope, math_meta, "max", &[long, int], None);
        assert_eq!(ts.descriptor(ts.resolve(ts.call_result(call))), "J");
        assert_eq!(ts.resolved_call(call).unwrap().kind, MemberKind::StaticMethod);

        let string_meta = ts.meta_type(ts.string());
        let string_meta = ts.type_future(string_meta);
        let call = ts.call(scope, string_meta, "length", &[], None);
        assert!(matches!(
            ts.state(ts.call_result(call)).error(),
            Some(TypeError::NoApplicableMethod { .. })
        ));
    }

    #[test]
    fn new_selects_constructor_and_yields_instance() {
        let (mut ts, scope) = setup();
        let builder = ts.lookup_type("java.lang.StringBuilder").unwrap();
        let meta = ts.meta_type(builder);
        let meta = ts.type_future(meta);
        let string = ts.type_future(ts.string());
        let call = ts.call(scope, meta, "new", &[string], None);
        assert_eq!(ts.resolve(ts.call_result(call)), builder);
        let selected = ts.resolved_call(call).unwrap();
        assert_eq!(selected.kind, MemberKind::Constructor);
        assert_eq!(selected.return_type, ts.void());
    }

    #[test]
    fn ambiguous_overloads_are_reported() {
        let (mut ts, scope) = setup();
        let target = ts.define_type(scope, "Target", None, &[]);
        let string = ts.type_future(ts.string());
        let object = ts.type_future(ts.object_type());
        let int = ts.type_future(ts.primitive(Primitive::Int));
        ts.get_method_def_type(target, "pick", &[string, object], Some(int), None);
        ts.get_method_def_type(target, "pick", &[object, string], Some(int), None);
        let call = ts.call(scope, target, "pick", &[string, string], None);
        match ts.state(ts.call_result(call)).error() {
            Some(TypeError::AmbiguousMethod { candidates, .. }) => assert_eq!(candidates.len(), 2),
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn unresolved_receiver_keeps_call_pending() {
        let (mut ts, scope) = setup();
        let receiver = ts.new_future();
        let call = ts.call(scope, receiver, "length", &[], None);
        assert_eq!(ts.state(ts.call_result(call)), &FutureState::Unresolved);
        let string = ts.string();
        ts.resolved(receiver, string).unwrap();
        assert_eq!(ts.descriptor(ts.resolve(ts.call_result(call))), "I");
    }

    #[test]
    fn primitive_arithmetic_promotes() {
        let (mut ts, scope) = setup();
        let short = ts.type_future(ts.primitive(Primitive::Short));
        let double = ts.type_future(ts.float());
        let sum = ts.call(scope, short, "+", &[short], None);
        assert_eq!(ts.descriptor(ts.resolve(ts.call_result(sum))), "I");
        let mixed = ts.call(scope, short, "*", &[double], None);
        assert_eq!(ts.descriptor(ts.resolve(ts.call_result(mixed))), "D");
        let string = ts.type_future(ts.string());
        let concat = ts.call(scope, string, "+", &[short], None);
        assert_eq!(ts.resolve(ts.call_result(concat)), ts.string());
    }

    #[test]
    fn narrowing_to_pending_overload_keeps_previous_selection() {
        let (mut ts, scope) = setup();
        let target = ts.define_type(scope, "Target", None, &[]);
        let int = ts.type_future(ts.primitive(Primitive::Int));
        let short = ts.type_future(ts.primitive(Primitive::Short));
        let long = ts.type_future(ts.primitive(Primitive::Long));
        let param = ts.new_future();
        ts.get_method_def_type(target, "foo", &[int], Some(int), None);
        let narrow = ts.get_method_def_type(target, "foo", &[param], None, None);

        let call = ts.call(scope, target, "foo", &[short], None);
        assert_eq!(ts.signature(ts.resolved_call(call).unwrap().member), "foo(int)");

        let short_ty = ts.primitive(Primitive::Short);
        ts.resolved(param, short_ty).unwrap();
        let selected = ts.resolved_call(call).unwrap();
        assert_eq!(ts.signature(selected.member), "foo(int)");
        assert_eq!(ts.descriptor(ts.resolve(ts.call_result(call))), "I");

        ts.assign(narrow.return_cell, long, None);
        let selected = ts.resolved_call(call).unwrap();
        assert_eq!(ts.signature(selected.member), "foo(short)");
        assert_eq!(ts.descriptor(ts.resolve(ts.call_result(call))), "J");
    }
}
