//! The host type registry.
//!
//! [`TypeSystem`] is the per-compilation-unit owner of every type, member,
//! future, cell, call site and scope. Nothing is global: dropping it discards
//! all state created while checking the unit.

use std::collections::VecDeque;

use mirror_common::{classname_from_filename, QualifiedName};
use rowan::TextRange;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::builtins;
use crate::call::CallSite;
use crate::cell::{AssignableCell, CellId};
use crate::config::TyperConfig;
use crate::descriptor::{DescriptorError, FieldDescriptor};
use crate::error::TypeError;
use crate::future::{Derivation, FutureId, FutureState, FutureTable, Observer};
use crate::scope::{Scope, ScopeId};
use crate::ty::{flags, HostType, Member, MemberId, MemberKind, Primitive, TypeId, TypeKind};

/// Library classes the resolver refers to directly.
#[derive(Clone, Copy, Debug)]
pub(crate) struct WellKnown {
    pub object: TypeId,
    pub class: TypeId,
    pub string: TypeId,
    pub cloneable: TypeId,
    pub serializable: TypeId,
    pub pattern: TypeId,
    pub list: TypeId,
    pub hash_map: TypeId,
    pub exception: TypeId,
    pub throwable: TypeId,
}

/// A method or field defined on a target whose type was not known yet. It
/// is registered once the target resolves.
#[derive(Clone, Debug)]
pub(crate) struct PendingMember {
    target: FutureId,
    name: String,
    span: Option<TextRange>,
    cell: CellId,
    kind: PendingKind,
    registered: bool,
}

#[derive(Clone, Debug)]
enum PendingKind {
    Method {
        params: Vec<FutureId>,
        return_type: Option<FutureId>,
    },
    Field {
        is_static: bool,
    },
}

/// A method registered by [`TypeSystem::get_method_def_type`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MethodDef {
    /// `None` while the target type is unresolved or if it failed.
    pub member: Option<MemberId>,
    /// The method's return type. Resolved from the declaration if one was
    /// given, otherwise from values assigned to `return_cell`.
    pub return_type: FutureId,
    pub return_cell: CellId,
}

pub struct TypeSystem {
    pub(crate) config: TyperConfig,
    pub(crate) types: Vec<HostType>,
    by_name: FxHashMap<String, TypeId>,
    by_descriptor: FxHashMap<String, TypeId>,
    primitives: [TypeId; 9],
    pub(crate) known: WellKnown,
    pub(crate) members: Vec<Member>,
    pub(crate) futures: FutureTable,
    pub(crate) cells: Vec<AssignableCell>,
    pub(crate) calls: Vec<CallSite>,
    pub(crate) scopes: Vec<Scope>,
    pending_members: Vec<PendingMember>,
    pub(crate) type_futures: FxHashMap<TypeId, FutureId>,
    meta_futures: FxHashMap<FutureId, FutureId>,
    array_futures: FxHashMap<FutureId, FutureId>,
    pub(crate) queue: VecDeque<crate::future::Observer>,
    pub(crate) queued: FxHashSet<crate::future::Observer>,
    pub(crate) draining: bool,
    pub(crate) generation: u64,
    pub(crate) pass: usize,
    pub(crate) errors: Vec<TypeError>,
}

impl Default for TypeSystem {
    fn default() -> Self {
        TypeSystem::new()
    }
}

impl TypeSystem {
    pub fn new() -> Self {
        TypeSystem::with_config(TyperConfig::default())
    }

    pub fn with_config(config: TyperConfig) -> Self {
        let mut ts = TypeSystem {
            config,
            types: Vec::new(),
            by_name: FxHashMap::default(),
            by_descriptor: FxHashMap::default(),
            primitives: [TypeId::ERROR; 9],
            known: WellKnown {
                object: TypeId::ERROR,
                class: TypeId::ERROR,
                string: TypeId::ERROR,
                cloneable: TypeId::ERROR,
                serializable: TypeId::ERROR,
                pattern: TypeId::ERROR,
                list: TypeId::ERROR,
                hash_map: TypeId::ERROR,
                exception: TypeId::ERROR,
                throwable: TypeId::ERROR,
            },
            members: Vec::new(),
            futures: FutureTable::default(),
            cells: Vec::new(),
            calls: Vec::new(),
            scopes: Vec::new(),
            pending_members: Vec::new(),
            type_futures: FxHashMap::default(),
            meta_futures: FxHashMap::default(),
            array_futures: FxHashMap::default(),
            queue: VecDeque::new(),
            queued: FxHashSet::default(),
            draining: false,
            generation: 0,
            pass: 0,
            errors: Vec::new(),
        };

        ts.push_type(HostType::new("error", "", TypeKind::Error));
        ts.push_type(HostType::new("null", "Ljava/lang/Object;", TypeKind::Null));
        for (i, p) in Primitive::ALL.into_iter().enumerate() {
            let id = ts.push_type(HostType::new(p.name(), p.code().to_string(), TypeKind::Primitive(p)));
            ts.by_descriptor.insert(p.code().to_string(), id);
            ts.primitives[i] = id;
        }

        ts.known = WellKnown {
            object: ts.ensure_class("java.lang.Object"),
            class: ts.ensure_class("java.lang.Class"),
            string: ts.ensure_class("java.lang.String"),
            cloneable: ts.ensure_class("java.lang.Cloneable"),
            serializable: ts.ensure_class("java.io.Serializable"),
            pattern: ts.ensure_class("java.util.regex.Pattern"),
            list: ts.ensure_class("java.util.List"),
            hash_map: ts.ensure_class("java.util.HashMap"),
            exception: ts.ensure_class("java.lang.Exception"),
            throwable: ts.ensure_class("java.lang.Throwable"),
        };

        ts.load_catalog(builtins::LIBRARY)
            .expect("embedded library catalog is well-formed");
        ts.register_operators();
        ts
    }

    pub fn config(&self) -> &TyperConfig {
        &self.config
    }

    /// Errors recorded outside any future, such as an exhausted
    /// propagation budget.
    pub fn errors(&self) -> &[TypeError] {
        &self.errors
    }

    fn push_type(&mut self, ty: HostType) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty);
        id
    }

    /// Add a named type, indexed by name and descriptor.
    fn register(&mut self, ty: HostType) -> TypeId {
        let name = ty.name.clone();
        let descriptor = ty.descriptor.clone();
        let id = self.push_type(ty);
        self.by_name.insert(name, id);
        self.by_descriptor.insert(descriptor, id);
        id
    }

    pub(crate) fn add_member(&mut self, member: Member) -> MemberId {
        let id = MemberId(self.members.len() as u32);
        let owner = member.owner;
        self.members.push(member);
        self.types[owner.index()].members.push(id);
        id
    }

    pub(crate) fn host_type_mut(&mut self, id: TypeId) -> &mut HostType {
        &mut self.types[id.index()]
    }

    // ── Lookup ──────────────────────────────────────────────────────────

    pub fn host_type(&self, id: TypeId) -> &HostType {
        &self.types[id.index()]
    }

    pub fn member(&self, id: MemberId) -> &Member {
        &self.members[id.index()]
    }

    pub fn type_name(&self, id: TypeId) -> String {
        self.types[id.index()].name.clone()
    }

    pub fn descriptor(&self, id: TypeId) -> &str {
        &self.types[id.index()].descriptor
    }

    /// A registered class or interface by dotted name.
    pub fn lookup_type(&self, dotted: &str) -> Option<TypeId> {
        self.by_name.get(dotted).copied()
    }

    pub fn type_by_descriptor(&self, descriptor: &str) -> Option<TypeId> {
        self.by_descriptor.get(descriptor).copied()
    }

    pub fn primitive(&self, p: Primitive) -> TypeId {
        let index = Primitive::ALL
            .iter()
            .position(|&q| q == p)
            .unwrap_or_default();
        self.primitives[index]
    }

    pub fn primitive_named(&self, name: &str) -> Option<TypeId> {
        Primitive::from_name(name).map(|p| self.primitive(p))
    }

    /// Members declared directly on `ty` (or its instance type, for metas).
    pub fn declared_members(&self, ty: TypeId) -> &[MemberId] {
        &self.types[self.unmeta(ty).index()].members
    }

    /// A member declared on `ty` with exactly these parameter types.
    pub fn get_method(&self, ty: TypeId, name: &str, params: &[TypeId]) -> Option<MemberId> {
        self.declared_members(ty).iter().copied().find(|&id| {
            let member = self.member(id);
            member.name == name
                && member.params.len() == params.len()
                && member
                    .params
                    .iter()
                    .zip(params)
                    .all(|(&param, &ty)| self.resolve(param) == ty)
        })
    }

    // ── Literal and well-known types ────────────────────────────────────

    /// `int` unless the value needs 64 bits.
    pub fn fixnum(&self, value: i64) -> TypeId {
        if i32::try_from(value).is_ok() {
            self.primitive(Primitive::Int)
        } else {
            self.primitive(Primitive::Long)
        }
    }

    pub fn float(&self) -> TypeId {
        self.primitive(Primitive::Double)
    }

    pub fn boolean(&self) -> TypeId {
        self.primitive(Primitive::Boolean)
    }

    pub fn void(&self) -> TypeId {
        self.primitive(Primitive::Void)
    }

    pub fn null(&self) -> TypeId {
        TypeId::NULL
    }

    /// The value of an expression with nothing in it.
    pub fn implicit_nil(&self) -> TypeId {
        self.void()
    }

    pub fn object_type(&self) -> TypeId {
        self.known.object
    }

    pub fn string(&self) -> TypeId {
        self.known.string
    }

    pub fn regex(&self) -> TypeId {
        self.known.pattern
    }

    /// Type of an array literal.
    pub fn list(&self) -> TypeId {
        self.known.list
    }

    /// Type of a hash literal.
    pub fn hash(&self) -> TypeId {
        self.known.hash_map
    }

    /// Raised by a bare `raise`.
    pub fn default_exception(&self) -> TypeId {
        self.known.exception
    }

    /// Root of everything that can be raised or rescued.
    pub fn base_exception(&self) -> TypeId {
        self.known.throwable
    }

    // ── Meta types ──────────────────────────────────────────────────────

    /// The class-object type of `ty`. Meta types and the error marker map to
    /// themselves.
    pub fn meta_type(&mut self, ty: TypeId) -> TypeId {
        let host = &self.types[ty.index()];
        if host.is_error() || host.is_meta() {
            return ty;
        }
        if let Some(meta) = host.meta {
            return meta;
        }
        let mut meta = HostType::new(
            format!("{}.class", host.name),
            host.descriptor.clone(),
            TypeKind::Meta(ty),
        );
        meta.flags = host.flags;
        let id = self.push_type(meta);
        self.types[ty.index()].meta = Some(id);
        id
    }

    /// Asynchronous counterpart of [`meta_type`](Self::meta_type).
    pub fn meta_future(&mut self, future: FutureId) -> FutureId {
        if let Some(&meta) = self.meta_futures.get(&future) {
            return meta;
        }
        let meta = self.derived_future(Derivation::Meta(future), self.futures.span(future));
        self.meta_futures.insert(future, meta);
        meta
    }

    pub fn unmeta(&self, ty: TypeId) -> TypeId {
        match self.types[ty.index()].kind {
            TypeKind::Meta(instance) => instance,
            _ => ty,
        }
    }

    // ── Arrays ──────────────────────────────────────────────────────────

    /// The array type with the given component. Arrays of void, of class
    /// objects or of the error marker are the error marker.
    pub fn array_of(&mut self, component: TypeId) -> TypeId {
        let comp = &self.types[component.index()];
        if matches!(comp.kind, TypeKind::Error | TypeKind::Null | TypeKind::Meta(_)) || comp.is_void() {
            return TypeId::ERROR;
        }
        let descriptor = format!("[{}", comp.descriptor);
        if let Some(&id) = self.by_descriptor.get(&descriptor) {
            return id;
        }
        let mut host = HostType::new(format!("{}[]", comp.name), descriptor, TypeKind::Array(component));
        host.superclass = Some(self.type_future(self.known.object));
        host.interfaces = vec![
            self.type_future(self.known.cloneable),
            self.type_future(self.known.serializable),
        ];
        let id = self.register(host);

        let int = self.type_future(self.primitive(Primitive::Int));
        let comp = self.type_future(component);
        for (name, kind, params) in [
            ("length", MemberKind::ArrayLength, vec![]),
            ("[]", MemberKind::ArrayAccess, vec![int]),
            ("[]=", MemberKind::ArrayAssign, vec![int, comp]),
        ] {
            let return_type = if kind == MemberKind::ArrayLength { int } else { comp };
            self.add_member(Member {
                name: name.to_string(),
                owner: id,
                kind,
                params,
                return_type,
                flags: flags::ACC_PUBLIC,
                span: None,
                cell: None,
            });
        }
        id
    }

    /// Asynchronous counterpart of [`array_of`](Self::array_of).
    pub fn array_future(&mut self, component: FutureId) -> FutureId {
        if let Some(&array) = self.array_futures.get(&component) {
            return array;
        }
        let array = self.derived_future(Derivation::Array(component), self.futures.span(component));
        self.array_futures.insert(component, array);
        array
    }

    // ── Descriptors ─────────────────────────────────────────────────────

    /// The type a field descriptor denotes. Unknown classes become opaque
    /// classes extending the root object type.
    pub fn type_for_descriptor(&mut self, descriptor: &str) -> Result<TypeId, DescriptorError> {
        let parsed = FieldDescriptor::parse(descriptor)?;
        Ok(self.type_for_field(&parsed))
    }

    pub(crate) fn type_for_field(&mut self, descriptor: &FieldDescriptor) -> TypeId {
        match descriptor {
            FieldDescriptor::Primitive(p) => self.primitive(*p),
            FieldDescriptor::Object(internal) => {
                self.ensure_class(&mirror_common::names::to_dotted(internal))
            }
            FieldDescriptor::Array(component) => {
                let component = self.type_for_field(component);
                self.array_of(component)
            }
        }
    }

    /// An existing class, or a new opaque one extending the root object type.
    pub(crate) fn ensure_class(&mut self, dotted: &str) -> TypeId {
        if let Some(&id) = self.by_name.get(dotted) {
            return id;
        }
        let name = QualifiedName::parse(dotted);
        let mut host = HostType::new(dotted, format!("L{};", name.internal_name()), TypeKind::Class);
        if dotted != "java.lang.Object" {
            let object = self.ensure_class("java.lang.Object");
            host.superclass = Some(self.type_future(object));
        }
        self.register(host)
    }

    // ── User definitions ────────────────────────────────────────────────

    /// Dotted name of `name` under the scope's current package.
    pub(crate) fn qualify(&self, scope: ScopeId, name: &str) -> QualifiedName {
        if name.contains('.') {
            QualifiedName::parse(name)
        } else {
            QualifiedName::new(self.package_of(scope), name)
        }
    }

    /// Define a class, or return the existing one of the same qualified
    /// name.
    ///
    /// Classes without a superclass extend the root object type. Every new
    /// class starts with a synthetic public no-argument constructor that
    /// disappears once an explicit constructor is defined.
    pub fn define_type(
        &mut self,
        scope: ScopeId,
        name: &str,
        superclass: Option<FutureId>,
        interfaces: &[FutureId],
    ) -> FutureId {
        self.define(scope, name, superclass, interfaces, TypeKind::Class)
    }

    pub fn define_interface(&mut self, scope: ScopeId, name: &str, interfaces: &[FutureId]) -> FutureId {
        self.define(scope, name, None, interfaces, TypeKind::Interface)
    }

    fn define(
        &mut self,
        scope: ScopeId,
        name: &str,
        superclass: Option<FutureId>,
        interfaces: &[FutureId],
        kind: TypeKind,
    ) -> FutureId {
        let qualified = self.qualify(scope, name);
        let dotted = qualified.to_string();

        if let Some(&existing) = self.by_name.get(&dotted) {
            let host = &mut self.types[existing.index()];
            if host.implicit {
                host.implicit = false;
                if superclass.is_some() {
                    host.superclass = superclass;
                }
                if !interfaces.is_empty() {
                    host.interfaces = interfaces.to_vec();
                }
            }
            debug!(name = %dotted, "type already defined");
            return self.type_future(existing);
        }

        let is_interface = kind == TypeKind::Interface;
        let mut host = HostType::new(dotted.clone(), format!("L{};", qualified.internal_name()), kind);
        host.interfaces = interfaces.to_vec();
        if is_interface {
            host.flags = flags::ACC_PUBLIC | flags::ACC_INTERFACE | flags::ACC_ABSTRACT;
        } else {
            host.superclass = match superclass {
                Some(sup) => Some(sup),
                None => Some(self.type_future(self.known.object)),
            };
        }
        let id = self.register(host);

        if !is_interface {
            let void = self.type_future(self.void());
            self.add_member(Member {
                name: "<init>".to_string(),
                owner: id,
                kind: MemberKind::Constructor,
                params: Vec::new(),
                return_type: void,
                flags: flags::ACC_PUBLIC | flags::ACC_SYNTHETIC,
                span: None,
                cell: None,
            });
        }
        debug!(name = %dotted, interface = is_interface, "defined type");
        self.type_future(id)
    }

    /// The implicit class holding a script's top-level code, named after
    /// the file. Returns the class-object (meta) future.
    pub fn get_main_type(&mut self, scope: ScopeId, filename: &str) -> FutureId {
        let name = classname_from_filename(filename);
        let existed = self.lookup_type(&self.qualify(scope, &name).to_string()).is_some();
        let future = self.define_type(scope, &name, None, &[]);
        if !existed {
            let ty = self.resolve(future);
            self.types[ty.index()].implicit = true;
        }
        self.meta_future(future)
    }

    /// Superclass of the type in `future`. For class objects this is the
    /// superclass's class object. Fails with `NoSuperclass` for the root.
    pub fn get_super_class(&mut self, future: FutureId) -> FutureId {
        self.derived_future(Derivation::Superclass(future), self.futures.span(future))
    }

    /// Register (or find) a method on `target` and return its return type.
    ///
    /// A class-object target gets a static method; `initialize` on an
    /// instance target is a constructor. With no declared return type the
    /// result is inferred from whatever the driver assigns to
    /// `return_cell`.
    pub fn get_method_def_type(
        &mut self,
        target: FutureId,
        name: &str,
        params: &[FutureId],
        return_type: Option<FutureId>,
        span: Option<TextRange>,
    ) -> MethodDef {
        let target_ty = match self.state(target) {
            FutureState::Resolved(ty) => *ty,
            _ => return self.defer_method_def(target, name, params, return_type, span),
        };
        self.register_method(target_ty, name, params, return_type, span, None)
    }

    fn defer_method_def(
        &mut self,
        target: FutureId,
        name: &str,
        params: &[FutureId],
        return_type: Option<FutureId>,
        span: Option<TextRange>,
    ) -> MethodDef {
        let cell = self.new_cell(name, span);
        if let (Some(declared), false) = (return_type, name == "initialize") {
            self.declare(cell, declared);
        }
        let kind = PendingKind::Method {
            params: params.to_vec(),
            return_type,
        };
        self.defer_member(target, name, span, cell, kind);
        MethodDef {
            member: None,
            return_type: self.cell_type(cell),
            return_cell: cell,
        }
    }

    fn defer_member(&mut self, target: FutureId, name: &str, span: Option<TextRange>, cell: CellId, kind: PendingKind) {
        let index = self.pending_members.len() as u32;
        self.pending_members.push(PendingMember {
            target,
            name: name.to_string(),
            span,
            cell,
            kind,
            registered: false,
        });
        self.observe(target, Observer::Member(index));
        debug!(name, "member definition waits for its target");
    }

    /// Register a deferred member once its target has resolved.
    pub(crate) fn complete_member(&mut self, index: u32) {
        let pending = &self.pending_members[index as usize];
        if pending.registered {
            return;
        }
        let target_ty = match self.state(pending.target) {
            FutureState::Resolved(ty) => *ty,
            _ => return,
        };
        let pending = pending.clone();
        self.pending_members[index as usize].registered = true;
        match pending.kind {
            PendingKind::Method { params, return_type } => {
                self.register_method(target_ty, &pending.name, &params, return_type, pending.span, Some(pending.cell));
            }
            PendingKind::Field { is_static } => {
                self.register_field(target_ty, &pending.name, is_static, pending.span, Some(pending.cell));
            }
        }
    }

    /// Register (or find) a method on a resolved target. `return_cell` is
    /// the cell handed out while the target was still pending.
    fn register_method(
        &mut self,
        target_ty: TypeId,
        name: &str,
        params: &[FutureId],
        return_type: Option<FutureId>,
        span: Option<TextRange>,
        return_cell: Option<CellId>,
    ) -> MethodDef {
        let is_static = self.host_type(target_ty).is_meta();
        let owner = self.unmeta(target_ty);
        let (kind, host_name) = if is_static {
            (MemberKind::StaticMethod, name)
        } else if name == "initialize" {
            (MemberKind::Constructor, "<init>")
        } else {
            (MemberKind::Method, name)
        };

        let existing = self.types[owner.index()].members.iter().copied().find(|&id| {
            let member = &self.members[id.index()];
            member.name == host_name && member.kind == kind && member.cell.is_some() && member.params == params
        });
        if let Some(id) = existing {
            if let Some(cell) = self.members[id.index()].cell {
                if let Some(deferred) = return_cell {
                    let value = self.cell_type(deferred);
                    self.assign(cell, value, span);
                } else if let (Some(declared), false) = (return_type, kind == MemberKind::Constructor) {
                    self.declare(cell, declared);
                }
                return MethodDef {
                    member: Some(id),
                    return_type: self.cell_type(cell),
                    return_cell: cell,
                };
            }
        }

        let cell = match return_cell {
            Some(cell) => cell,
            None => self.new_cell(name, span),
        };
        let declared = self.cell(cell).is_declared();
        if kind == MemberKind::Constructor {
            if !declared {
                let void = self.type_future(self.void());
                self.declare(cell, void);
            }
            let members = &self.members;
            self.types[owner.index()].members.retain(|&id| {
                let member = &members[id.index()];
                !(member.kind == MemberKind::Constructor && member.is_synthetic())
            });
        } else if let (Some(ty), false) = (return_type, declared) {
            self.declare(cell, ty);
        }

        let mut member_flags = flags::ACC_PUBLIC;
        if is_static {
            member_flags |= flags::ACC_STATIC;
        }
        let id = self.add_member(Member {
            name: host_name.to_string(),
            owner,
            kind,
            params: params.to_vec(),
            return_type: self.cell_type(cell),
            flags: member_flags,
            span,
            cell: Some(cell),
        });
        debug!(owner = %self.type_name(owner), name = host_name, kind = %kind, "defined method");
        MethodDef {
            member: Some(id),
            return_type: self.cell_type(cell),
            return_cell: cell,
        }
    }

    /// The cell holding a field's type, registering the field on first use.
    /// Fields on a class-object target are static.
    pub fn get_field_type(
        &mut self,
        target: FutureId,
        name: &str,
        is_static: bool,
        span: Option<TextRange>,
    ) -> CellId {
        let target_ty = match self.state(target) {
            FutureState::Resolved(ty) => *ty,
            _ => {
                let cell = self.new_cell(name, span);
                self.defer_member(target, name, span, cell, PendingKind::Field { is_static });
                return cell;
            }
        };
        self.register_field(target_ty, name, is_static, span, None)
    }

    fn register_field(
        &mut self,
        target_ty: TypeId,
        name: &str,
        is_static: bool,
        span: Option<TextRange>,
        deferred: Option<CellId>,
    ) -> CellId {
        let is_static = is_static || self.host_type(target_ty).is_meta();
        let owner = self.unmeta(target_ty);
        let kind = if is_static {
            MemberKind::StaticFieldAccess
        } else {
            MemberKind::FieldAccess
        };
        let existing = self.types[owner.index()]
            .members
            .iter()
            .map(|&id| &self.members[id.index()])
            .find(|m| m.name == name && m.kind == kind)
            .and_then(|m| m.cell);
        if let Some(cell) = existing {
            if let Some(deferred) = deferred {
                let value = self.cell_type(deferred);
                self.assign(cell, value, span);
            }
            return cell;
        }

        let cell = match deferred {
            Some(cell) => cell,
            None => self.new_cell(name, span),
        };
        let mut member_flags = flags::ACC_PRIVATE;
        if is_static {
            member_flags |= flags::ACC_STATIC;
        }
        self.add_member(Member {
            name: name.to_string(),
            owner,
            kind,
            params: Vec::new(),
            return_type: self.cell_type(cell),
            flags: member_flags,
            span,
            cell: Some(cell),
        });
        debug!(owner = %self.type_name(owner), name, is_static, "defined field");
        cell
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_use_single_letter_descriptors() {
        let ts = TypeSystem::new();
        assert_eq!(ts.descriptor(ts.primitive(Primitive::Int)), "I");
        assert_eq!(ts.descriptor(ts.void()), "V");
        assert_eq!(ts.descriptor(ts.boolean()), "Z");
        assert_eq!(ts.primitive_named("short"), Some(ts.primitive(Primitive::Short)));
        assert_eq!(ts.primitive_named("String"), None);
    }

    #[test]
    fn fixnum_widens_to_long_past_32_bits() {
        let ts = TypeSystem::new();
        assert_eq!(ts.descriptor(ts.fixnum(0)), "I");
        assert_eq!(ts.descriptor(ts.fixnum(i64::from(i32::MAX))), "I");
        assert_eq!(ts.descriptor(ts.fixnum(1 << 40)), "J");
        assert_eq!(ts.descriptor(ts.float()), "D");
    }

    #[test]
    fn literal_types() {
        let ts = TypeSystem::new();
        assert_eq!(ts.descriptor(ts.string()), "Ljava/lang/String;");
        assert_eq!(ts.descriptor(ts.regex()), "Ljava/util/regex/Pattern;");
        assert_eq!(ts.descriptor(ts.list()), "Ljava/util/List;");
        assert_eq!(ts.descriptor(ts.hash()), "Ljava/util/HashMap;");
        assert_eq!(ts.descriptor(ts.default_exception()), "Ljava/lang/Exception;");
        assert_eq!(ts.descriptor(ts.base_exception()), "Ljava/lang/Throwable;");
        assert_eq!(ts.descriptor(ts.implicit_nil()), "V");
        assert_eq!(ts.type_name(ts.null()), "null");
    }

    #[test]
    fn meta_types_are_cached_and_not_rewrapped() {
        let mut ts = TypeSystem::new();
        let string = ts.string();
        let meta = ts.meta_type(string);
        assert!(ts.host_type(meta).is_meta());
        assert_eq!(ts.meta_type(string), meta);
        assert_eq!(ts.meta_type(meta), meta);
        assert_eq!(ts.unmeta(meta), string);
        assert_eq!(ts.descriptor(meta), "Ljava/lang/String;");
        assert_eq!(ts.meta_type(TypeId::ERROR), TypeId::ERROR);
    }

    #[test]
    fn array_types_have_builtin_members() {
        let mut ts = TypeSystem::new();
        let int = ts.primitive(Primitive::Int);
        let array = ts.array_of(int);
        assert_eq!(ts.descriptor(array), "[I");
        assert_eq!(ts.type_name(array), "int[]");
        assert_eq!(ts.array_of(int), array);

        let length = ts.get_method(array, "length", &[]).expect("length");
        assert_eq!(ts.member(length).kind, MemberKind::ArrayLength);
        assert_eq!(ts.resolve(ts.member(length).return_type), int);

        let assign = ts.get_method(array, "[]=", &[int, int]).expect("[]=");
        assert_eq!(ts.resolve(ts.member(assign).return_type), int);

        let void = ts.void();
        assert_eq!(ts.array_of(void), TypeId::ERROR);
    }

    #[test]
    fn descriptors_map_to_types() {
        let mut ts = TypeSystem::new();
        let strings = ts.type_for_descriptor("[Ljava/lang/String;").unwrap();
        assert_eq!(ts.type_name(strings), "java.lang.String[]");
        let opaque = ts.type_for_descriptor("Lcom/example/Widget;").unwrap();
        assert_eq!(ts.type_name(opaque), "com.example.Widget");
        assert_eq!(ts.lookup_type("com.example.Widget"), Some(opaque));
        assert!(ts.type_for_descriptor("Lbroken").is_err());
    }

    #[test]
    fn method_on_pending_target_registers_once_target_resolves() {
        let mut ts = TypeSystem::new();
        let scope = ts.new_scope(None);
        let int = ts.type_future(ts.primitive(Primitive::Int));
        let target = ts.new_future();
        let def = ts.get_method_def_type(target, "foo", &[], Some(int), None);
        assert_eq!(def.member, None);
        assert_eq!(ts.resolve(def.return_type), ts.primitive(Primitive::Int));

        let foo = ts.define_type(scope, "Foo", None, &[]);
        let foo_ty = ts.resolve(foo);
        ts.resolved(target, foo_ty).unwrap();
        assert_eq!(ts.resolve(def.return_type), ts.primitive(Primitive::Int));

        let call = ts.call(scope, foo, "foo", &[], None);
        assert_eq!(ts.resolve(ts.call_result(call)), ts.primitive(Primitive::Int));
        let selected = ts.resolved_call(call).unwrap();
        assert_eq!(selected.kind, MemberKind::Method);
        assert_eq!(ts.member(selected.member).cell, Some(def.return_cell));
    }

    #[test]
    fn field_on_pending_target_keeps_its_own_type() {
        let mut ts = TypeSystem::new();
        let scope = ts.new_scope(None);
        let target = ts.new_future();
        let cell = ts.get_field_type(target, "count", false, None);
        let long = ts.type_future(ts.primitive(Primitive::Long));
        ts.declare(cell, long);

        let foo = ts.define_type(scope, "Foo", None, &[]);
        let foo_ty = ts.resolve(foo);
        ts.resolved(target, foo_ty).unwrap();
        assert_eq!(ts.resolve(ts.cell_type(cell)), ts.primitive(Primitive::Long));
        assert_eq!(ts.get_field_type(foo, "count", false, None), cell);
    }
}
