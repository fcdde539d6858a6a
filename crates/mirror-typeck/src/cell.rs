//! Assignable cells: locals, fields and inferred return types.
//!
//! A cell's type is its declared type if it has one, otherwise the type of
//! the first assignment whose value resolved to something other than `null`.
//! Once established, an undeclared cell only narrows, and only to a type
//! every resolved assignment still fits.
//! Every assignment gets its own future, which resolves to the assigned
//! value's type or fails when that type does not fit the cell.

use rowan::TextRange;

use crate::error::TypeError;
use crate::future::{FutureId, FutureState, Observer};
use crate::registry::TypeSystem;
use crate::scope::{ScopeContext, ScopeId};
use crate::ty::TypeId;

/// Handle to an [`AssignableCell`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CellId(pub(crate) u32);

impl CellId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Assignment {
    value: FutureId,
    result: FutureId,
    span: Option<TextRange>,
}

#[derive(Clone, Debug)]
pub struct AssignableCell {
    pub name: String,
    pub span: Option<TextRange>,
    pub(crate) result: FutureId,
    pub(crate) declared: Option<FutureId>,
    pub(crate) assignments: Vec<Assignment>,
}

impl AssignableCell {
    pub fn is_declared(&self) -> bool {
        self.declared.is_some()
    }

    pub fn assignment_count(&self) -> usize {
        self.assignments.len()
    }
}

impl TypeSystem {
    pub fn new_cell(&mut self, name: &str, span: Option<TextRange>) -> CellId {
        let id = CellId(self.cells.len() as u32);
        let result = self.pushed_future(span);
        self.cells.push(AssignableCell {
            name: name.to_string(),
            span,
            result,
            declared: None,
            assignments: Vec::new(),
        });
        id
    }

    pub fn cell(&self, id: CellId) -> &AssignableCell {
        &self.cells[id.index()]
    }

    /// The future of the cell's established type.
    pub fn cell_type(&self, id: CellId) -> FutureId {
        self.cells[id.index()].result
    }

    /// Fix the cell's type. A second declaration is checked like an
    /// assignment.
    pub fn declare(&mut self, id: CellId, ty: FutureId) -> FutureId {
        if self.cells[id.index()].declared.is_some() {
            let span = self.futures.span(ty);
            return self.assign(id, ty, span);
        }
        self.cells[id.index()].declared = Some(ty);
        self.observe(ty, Observer::Cell(id));
        self.recompute_cell(id);
        self.flush();
        self.cell_type(id)
    }

    /// Assign a value and return the assignment expression's type.
    pub fn assign(&mut self, id: CellId, value: FutureId, span: Option<TextRange>) -> FutureId {
        let result = self.pushed_future(span);
        self.cells[id.index()].assignments.push(Assignment { value, result, span });
        self.observe(value, Observer::Cell(id));
        self.recompute_cell(id);
        self.flush();
        result
    }

    /// The local `name` visible from `scope`, created in `scope` on first
    /// use. Locals are shared with nested blocks but not across method
    /// bodies.
    pub fn get_local_type(&mut self, scope: ScopeId, name: &str, span: Option<TextRange>) -> CellId {
        if let Some(cell) = self.find_local(scope, name) {
            return cell;
        }
        let cell = self.new_cell(name, span);
        self.scope_mut(scope).locals.insert(name.to_string(), cell);
        cell
    }

    /// A local already visible from `scope`.
    pub fn find_local(&self, scope: ScopeId, name: &str) -> Option<CellId> {
        for s in self.scope_chain(scope) {
            if let Some(&cell) = s.locals.get(name) {
                return Some(cell);
            }
            if matches!(
                s.context,
                Some(
                    ScopeContext::Script
                        | ScopeContext::Class
                        | ScopeContext::Method { .. }
                        | ScopeContext::StaticMethod { .. }
                        | ScopeContext::Constructor
                )
            ) {
                break;
            }
        }
        None
    }

    pub(crate) fn recompute_cell(&mut self, id: CellId) {
        let cell = &self.cells[id.index()];
        let declared = cell.declared;
        let assignments = cell.assignments.clone();
        let name = cell.name.clone();
        let result = cell.result;

        let established = match declared {
            Some(declared) => self.state(declared).clone(),
            None => match (self.state(result).clone(), self.first_assignment_state(&assignments)) {
                (FutureState::Resolved(current), FutureState::Resolved(next))
                    if self.assignable(current, next) && self.accepts_all(next, &assignments) =>
                {
                    FutureState::Resolved(next)
                }
                (FutureState::Resolved(current), _) => FutureState::Resolved(current),
                (_, first) => first,
            },
        };
        self.update(result, established.clone());

        for assignment in assignments {
            let state = match (&established, self.state(assignment.value).clone()) {
                (_, FutureState::Unresolved) => FutureState::Unresolved,
                (_, FutureState::Error(e)) => FutureState::Error(e),
                (FutureState::Resolved(expected), FutureState::Resolved(found)) => {
                    let mut pending = Vec::new();
                    if self.is_assignable(*expected, found, &mut pending) {
                        FutureState::Resolved(found)
                    } else {
                        for future in pending {
                            self.observe(future, Observer::Cell(id));
                        }
                        FutureState::Error(TypeError::IncompatibleAssignment {
                            name: name.clone(),
                            expected: self.type_name(*expected),
                            found: self.type_name(found),
                            span: assignment.span,
                        })
                    }
                }
                (other, FutureState::Resolved(_)) => other.clone(),
            };
            self.update(assignment.result, state);
        }
    }

    fn accepts_all(&self, ty: TypeId, assignments: &[Assignment]) -> bool {
        assignments.iter().all(|a| match self.state(a.value) {
            FutureState::Resolved(found) => self.assignable(ty, *found),
            _ => true,
        })
    }

    fn first_assignment_state(&self, assignments: &[Assignment]) -> FutureState {
        let mut saw_null = false;
        let mut first_error = None;
        for assignment in assignments {
            match self.state(assignment.value) {
                FutureState::Resolved(ty) if *ty == TypeId::NULL => saw_null = true,
                FutureState::Resolved(ty) => return FutureState::Resolved(*ty),
                FutureState::Error(e) if first_error.is_none() => first_error = Some(e.clone()),
                _ => {}
            }
        }
        if saw_null {
            return FutureState::Resolved(self.object_type());
        }
        match first_error {
            Some(e) => FutureState::Error(e),
            None => FutureState::Unresolved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::Primitive;

    #[test]
    fn first_assignment_establishes_type() {
        let mut ts = TypeSystem::new();
        let cell = ts.new_cell("a", None);
        assert!(!ts.is_resolved(ts.cell_type(cell)));

        let short = ts.type_future(ts.primitive(Primitive::Short));
        let first = ts.assign(cell, short, None);
        assert_eq!(ts.resolve(ts.cell_type(cell)), ts.primitive(Primitive::Short));
        assert_eq!(ts.resolve(first), ts.primitive(Primitive::Short));

        let int = ts.type_future(ts.primitive(Primitive::Int));
        let second = ts.assign(cell, int, None);
        assert!(matches!(
            ts.state(second).error(),
            Some(TypeError::IncompatibleAssignment { .. })
        ));
        assert_eq!(ts.resolve(ts.cell_type(cell)), ts.primitive(Primitive::Short));
    }

    #[test]
    fn late_assignment_cannot_replace_established_type() {
        let mut ts = TypeSystem::new();
        let cell = ts.new_cell("a", None);
        let later = ts.new_future();
        let pending = ts.assign(cell, later, None);
        let int = ts.type_future(ts.primitive(Primitive::Int));
        let second = ts.assign(cell, int, None);
        assert_eq!(ts.resolve(ts.cell_type(cell)), ts.primitive(Primitive::Int));

        let string = ts.string();
        ts.resolved(later, string).unwrap();
        assert_eq!(ts.resolve(ts.cell_type(cell)), ts.primitive(Primitive::Int));
        assert_eq!(ts.resolve(second), ts.primitive(Primitive::Int));
        assert_eq!(
            ts.state(pending).error(),
            Some(&TypeError::IncompatibleAssignment {
                name: "a".to_string(),
                expected: "int".to_string(),
                found: "java.lang.String".to_string(),
                span: None,
            })
        );
    }

    #[test]
    fn late_assignment_narrows_only_when_everything_fits() {
        let mut ts = TypeSystem::new();
        let string = ts.string();

        let nulls = ts.new_cell("a", None);
        let later = ts.new_future();
        ts.assign(nulls, later, None);
        let null = ts.type_future(TypeId::NULL);
        let null_assign = ts.assign(nulls, null, None);
        assert_eq!(ts.resolve(ts.cell_type(nulls)), ts.object_type());
        ts.resolved(later, string).unwrap();
        assert_eq!(ts.resolve(ts.cell_type(nulls)), string);
        assert_eq!(ts.resolve(null_assign), TypeId::NULL);

        let objects = ts.new_cell("b", None);
        let later = ts.new_future();
        let late_assign = ts.assign(objects, later, None);
        let object = ts.type_future(ts.object_type());
        let object_assign = ts.assign(objects, object, None);
        ts.resolved(later, string).unwrap();
        assert_eq!(ts.resolve(ts.cell_type(objects)), ts.object_type());
        assert_eq!(ts.resolve(object_assign), ts.object_type());
        assert_eq!(ts.resolve(late_assign), string);
    }

    #[test]
    fn declaration_wins_over_assignments() {
        let mut ts = TypeSystem::new();
        let cell = ts.new_cell("a", None);
        let short = ts.type_future(ts.primitive(Primitive::Short));
        let long = ts.type_future(ts.primitive(Primitive::Long));
        let assigned = ts.assign(cell, short, None);
        ts.declare(cell, long);
        assert_eq!(ts.resolve(ts.cell_type(cell)), ts.primitive(Primitive::Long));
        assert_eq!(ts.resolve(assigned), ts.primitive(Primitive::Short));
    }

    #[test]
    fn pending_assignment_resolves_later() {
        let mut ts = TypeSystem::new();
        let cell = ts.new_cell("a", None);
        let later = ts.new_future();
        let assigned = ts.assign(cell, later, None);
        assert!(!ts.is_resolved(assigned));
        let string = ts.string();
        ts.resolved(later, string).unwrap();
        assert_eq!(ts.resolve(assigned), string);
        assert_eq!(ts.resolve(ts.cell_type(cell)), string);
    }

    #[test]
    fn null_then_string() {
        let mut ts = TypeSystem::new();
        let cell = ts.new_cell("a", None);
        let null = ts.type_future(TypeId::NULL);
        ts.assign(cell, null, None);
        assert_eq!(ts.resolve(ts.cell_type(cell)), ts.object_type());
        let string = ts.type_future(ts.string());
        ts.assign(cell, string, None);
        assert_eq!(ts.resolve(ts.cell_type(cell)), ts.string());
    }

    #[test]
    fn sibling_scopes_do_not_share_locals() {
        let mut ts = TypeSystem::new();
        let parent = ts.new_scope(None);
        let left = ts.new_scope(Some(parent));
        let right = ts.new_scope(Some(parent));
        let a_left = ts.get_local_type(left, "a", None);
        let a_right = ts.get_local_type(right, "a", None);
        assert_ne!(a_left, a_right);
        assert_eq!(ts.get_local_type(left, "a", None), a_left);

        let outer = ts.get_local_type(parent, "b", None);
        assert_eq!(ts.find_local(left, "b"), Some(outer));
    }

    #[test]
    fn method_bodies_do_not_see_outer_locals() {
        let mut ts = TypeSystem::new();
        let script = ts.new_scope(None);
        ts.set_context(script, ScopeContext::Script);
        ts.get_local_type(script, "a", None);
        let method = ts.new_scope(Some(script));
        ts.set_context(method, ScopeContext::Method { name: "foo".into() });
        assert_eq!(ts.find_local(method, "a"), None);
    }
}
