//! Assignability between host types.

use rustc_hash::FxHashSet;

use crate::future::{FutureId, FutureState};
use crate::registry::TypeSystem;
use crate::ty::{TypeId, TypeKind};

impl TypeSystem {
    /// Whether a value of type `from` may be stored where `to` is expected.
    ///
    /// Primitives convert by widening only and never mix with references.
    /// `null` fits any reference type. Arrays are covariant in reference
    /// components and are also `Object`, `Cloneable` and `Serializable`.
    ///
    /// Supertypes that are still unresolved are pushed onto `pending`; the
    /// answer may turn from `false` to `true` once they resolve.
    pub fn is_assignable(&self, to: TypeId, from: TypeId, pending: &mut Vec<FutureId>) -> bool {
        if to.is_error() || from.is_error() {
            return false;
        }
        if to == from {
            return true;
        }
        let to_ty = self.host_type(to);
        let from_ty = self.host_type(from);

        match (&to_ty.kind, &from_ty.kind) {
            (TypeKind::Primitive(t), TypeKind::Primitive(f)) => f.widens_to(*t),
            (TypeKind::Primitive(_), _) | (_, TypeKind::Primitive(_)) => false,
            (TypeKind::Null, _) => false,
            (_, TypeKind::Null) => true,
            (TypeKind::Meta(t), TypeKind::Meta(f)) => self.is_assignable(*t, *f, pending),
            (_, TypeKind::Meta(_)) => to == self.known.object || to == self.known.class,
            (TypeKind::Meta(_), _) => false,
            (TypeKind::Array(t), TypeKind::Array(f)) => {
                let component_is_primitive = |id: TypeId| self.host_type(id).primitive().is_some();
                if component_is_primitive(*t) || component_is_primitive(*f) {
                    t == f
                } else {
                    self.is_assignable(*t, *f, pending)
                }
            }
            (TypeKind::Array(_), _) => false,
            (_, TypeKind::Array(_)) => {
                to == self.known.object || to == self.known.cloneable || to == self.known.serializable
            }
            _ if to == self.known.object => true,
            _ => self.is_subclass(to, from, pending),
        }
    }

    /// Walk the superclass and interface graph of `from` looking for `to`.
    fn is_subclass(&self, to: TypeId, from: TypeId, pending: &mut Vec<FutureId>) -> bool {
        let mut visited = FxHashSet::default();
        let mut stack = vec![from];
        while let Some(ty) = stack.pop() {
            if ty == to {
                return true;
            }
            if !visited.insert(ty) {
                continue;
            }
            let host = self.host_type(ty);
            for &sup in host.superclass.iter().chain(host.interfaces.iter()) {
                match self.state(sup) {
                    FutureState::Resolved(sup_ty) => stack.push(*sup_ty),
                    FutureState::Unresolved => pending.push(sup),
                    FutureState::Error(_) => {}
                }
            }
        }
        false
    }

    /// Assignability when pending supertypes are of no interest.
    pub fn assignable(&self, to: TypeId, from: TypeId) -> bool {
        self.is_assignable(to, from, &mut Vec::new())
    }
}
