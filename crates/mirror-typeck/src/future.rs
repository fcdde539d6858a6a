//! Type futures: single-assignment dataflow cells with observers.
//!
//! A future starts unresolved and becomes resolved (or failed) later. Reading
//! one never blocks: [`TypeSystem::resolve`] returns [`TypeId::ERROR`] until a
//! type is known. Changes are pushed to observers synchronously; internal
//! observers are queued and drained in FIFO order until the graph is quiet.
//!
//! Two kinds exist. Settable futures are assigned once from outside
//! ([`TypeSystem::resolved`]); assigning a different type later is an
//! internal consistency error. Derived futures (meta types, call results,
//! assignable cells) are recomputed by the engine whenever a source changes
//! and may move between resolved values, but never back to unresolved.

use std::fmt;

use rowan::TextRange;
use tracing::{trace, warn};

use crate::call::CallId;
use crate::cell::CellId;
use crate::error::TypeError;
use crate::registry::TypeSystem;
use crate::ty::TypeId;

/// Handle to a future in the [`FutureTable`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FutureId(pub(crate) u32);

impl FutureId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FutureState {
    Unresolved,
    Resolved(TypeId),
    Error(TypeError),
}

impl FutureState {
    /// The current best-known type: the error marker unless resolved.
    pub fn type_id(&self) -> TypeId {
        match self {
            FutureState::Resolved(ty) => *ty,
            _ => TypeId::ERROR,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, FutureState::Resolved(_))
    }

    pub fn error(&self) -> Option<&TypeError> {
        match self {
            FutureState::Error(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FutureKind {
    Settable,
    Derived,
}

/// Engine-internal dependents of a future.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Observer {
    Derived(FutureId),
    Cell(CellId),
    Call(CallId),
    Member(u32),
}

/// How a derived future computes its value from a source future.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Derivation {
    Meta(FutureId),
    Array(FutureId),
    Superclass(FutureId),
}

/// An external observer, invoked once per state change.
pub type Callback = Box<dyn FnMut(FutureId, &FutureState)>;

struct FutureCell {
    state: FutureState,
    kind: FutureKind,
    observers: Vec<Observer>,
    callbacks: Vec<Callback>,
    derivation: Option<Derivation>,
    span: Option<TextRange>,
}

/// Arena of future cells.
#[derive(Default)]
pub struct FutureTable {
    cells: Vec<FutureCell>,
}

impl FutureTable {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub(crate) fn alloc(&mut self, kind: FutureKind, state: FutureState, span: Option<TextRange>) -> FutureId {
        let id = FutureId(self.cells.len() as u32);
        self.cells.push(FutureCell {
            state,
            kind,
            observers: Vec::new(),
            callbacks: Vec::new(),
            derivation: None,
            span,
        });
        id
    }

    pub fn state(&self, id: FutureId) -> &FutureState {
        &self.cells[id.index()].state
    }

    pub fn kind(&self, id: FutureId) -> FutureKind {
        self.cells[id.index()].kind
    }

    pub fn span(&self, id: FutureId) -> Option<TextRange> {
        self.cells[id.index()].span
    }

    /// Replace the state. Returns whether anything changed; a resolved or
    /// failed future never goes back to unresolved.
    pub(crate) fn set(&mut self, id: FutureId, state: FutureState) -> bool {
        let cell = &mut self.cells[id.index()];
        if cell.state == state {
            return false;
        }
        if state == FutureState::Unresolved {
            return false;
        }
        cell.state = state;
        true
    }

    /// Register an observer once; returns false if it was already present.
    pub(crate) fn add_observer(&mut self, id: FutureId, observer: Observer) -> bool {
        let observers = &mut self.cells[id.index()].observers;
        if observers.contains(&observer) {
            return false;
        }
        observers.push(observer);
        true
    }

    pub(crate) fn observers(&self, id: FutureId) -> &[Observer] {
        &self.cells[id.index()].observers
    }

    pub(crate) fn set_derivation(&mut self, id: FutureId, derivation: Derivation) {
        self.cells[id.index()].derivation = Some(derivation);
    }

    pub(crate) fn derivation(&self, id: FutureId) -> Option<Derivation> {
        self.cells[id.index()].derivation
    }

    fn push_callback(&mut self, id: FutureId, callback: Callback) {
        self.cells[id.index()].callbacks.push(callback);
    }

    fn take_callbacks(&mut self, id: FutureId) -> Vec<Callback> {
        std::mem::take(&mut self.cells[id.index()].callbacks)
    }

    fn restore_callbacks(&mut self, id: FutureId, mut callbacks: Vec<Callback>) {
        let cell = &mut self.cells[id.index()];
        callbacks.append(&mut cell.callbacks);
        cell.callbacks = callbacks;
    }

    /// Every future with an unresolved or failed state.
    pub fn pending(&self) -> impl Iterator<Item = FutureId> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| !cell.state.is_resolved())
            .map(|(i, _)| FutureId(i as u32))
    }
}

impl fmt::Debug for FutureTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.cells.iter().map(|cell| &cell.state))
            .finish()
    }
}

impl TypeSystem {
    /// A fresh, unresolved single-assignment future.
    pub fn new_future(&mut self) -> FutureId {
        self.futures.alloc(FutureKind::Settable, FutureState::Unresolved, None)
    }

    /// A future that has already failed.
    pub fn error_future(&mut self, error: TypeError) -> FutureId {
        let span = error.span();
        self.futures.alloc(FutureKind::Settable, FutureState::Error(error), span)
    }

    /// The shared, already-resolved future for a type.
    pub fn type_future(&mut self, ty: TypeId) -> FutureId {
        if let Some(&id) = self.type_futures.get(&ty) {
            return id;
        }
        let id = self
            .futures
            .alloc(FutureKind::Settable, FutureState::Resolved(ty), None);
        self.type_futures.insert(ty, id);
        id
    }

    /// Current best-known type; the error marker while unresolved.
    pub fn resolve(&self, id: FutureId) -> TypeId {
        self.futures.state(id).type_id()
    }

    pub fn state(&self, id: FutureId) -> &FutureState {
        self.futures.state(id)
    }

    pub fn is_resolved(&self, id: FutureId) -> bool {
        self.futures.state(id).is_resolved()
    }

    pub fn futures(&self) -> &FutureTable {
        &self.futures
    }

    /// Counts every state change. Unchanged across a pass means settled.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Resolve a single-assignment future.
    ///
    /// Resolving again with the same type is a no-op. Anything else on a
    /// future that already holds a value or an error is an internal
    /// consistency error and leaves the future untouched.
    pub fn resolved(&mut self, id: FutureId, ty: TypeId) -> Result<(), TypeError> {
        self.settle_once(id, FutureState::Resolved(ty))
    }

    /// Fail a single-assignment future that has not been settled yet.
    pub fn fail(&mut self, id: FutureId, error: TypeError) -> Result<(), TypeError> {
        self.settle_once(id, FutureState::Error(error))
    }

    fn settle_once(&mut self, id: FutureId, state: FutureState) -> Result<(), TypeError> {
        match self.futures.state(id) {
            FutureState::Unresolved => {}
            previous if *previous == state => return Ok(()),
            previous => {
                return Err(TypeError::InconsistentResolution {
                    previous: self.describe_state(previous),
                    attempted: self.describe_state(&state),
                });
            }
        }
        self.update(id, state);
        self.flush();
        Ok(())
    }

    fn describe_state(&self, state: &FutureState) -> String {
        match state {
            FutureState::Resolved(ty) => self.type_name(*ty),
            FutureState::Error(error) => format!("error: {}", error),
            FutureState::Unresolved => "unresolved".to_string(),
        }
    }

    /// Register an external observer.
    ///
    /// It runs immediately if the future already has a value, then once per
    /// later state change.
    pub fn on_update(&mut self, id: FutureId, callback: impl FnMut(FutureId, &FutureState) + 'static) {
        let mut callback: Callback = Box::new(callback);
        let state = self.futures.state(id);
        if *state != FutureState::Unresolved {
            callback(id, state);
        }
        self.futures.push_callback(id, callback);
    }

    pub(crate) fn observe(&mut self, source: FutureId, observer: Observer) {
        self.futures.add_observer(source, observer);
    }

    /// A derived future kept in sync with its source.
    pub(crate) fn derived_future(&mut self, derivation: Derivation, span: Option<TextRange>) -> FutureId {
        let id = self
            .futures
            .alloc(FutureKind::Derived, FutureState::Unresolved, span);
        self.futures.set_derivation(id, derivation);
        let source = match derivation {
            Derivation::Meta(source) | Derivation::Array(source) | Derivation::Superclass(source) => source,
        };
        self.observe(source, Observer::Derived(id));
        self.recompute_derived(id);
        self.flush();
        id
    }

    /// A derived future whose value is pushed by a call site or cell.
    pub(crate) fn pushed_future(&mut self, span: Option<TextRange>) -> FutureId {
        self.futures
            .alloc(FutureKind::Derived, FutureState::Unresolved, span)
    }

    /// Set a state and queue dependents if it changed. Callers outside the
    /// propagation loop must [`flush`](Self::flush) afterwards.
    pub(crate) fn update(&mut self, id: FutureId, state: FutureState) -> bool {
        if !self.futures.set(id, state) {
            return false;
        }
        self.generation += 1;
        trace!(future = id.0, state = ?self.futures.state(id), "future updated");
        self.notify(id);
        true
    }

    fn notify(&mut self, id: FutureId) {
        for &observer in self.futures.observers(id) {
            if self.queued.insert(observer) {
                self.queue.push_back(observer);
            }
        }

        let mut callbacks = self.futures.take_callbacks(id);
        if !callbacks.is_empty() {
            let state = self.futures.state(id).clone();
            for callback in callbacks.iter_mut() {
                callback(id, &state);
            }
        }
        self.futures.restore_callbacks(id, callbacks);
    }

    /// Propagate queued changes unless a propagation is already running
    /// further up the stack.
    pub(crate) fn flush(&mut self) {
        if !self.draining {
            self.drain();
        }
    }

    /// Run queued observers until nothing changes, within the step budget.
    fn drain(&mut self) {
        self.draining = true;
        let mut steps = 0usize;
        while let Some(observer) = self.queue.pop_front() {
            self.queued.remove(&observer);
            steps += 1;
            if steps > self.config.max_propagation_steps {
                warn!(steps, "propagation budget exhausted; dependency cycle suspected");
                self.errors.push(TypeError::NonTerminating { passes: self.pass });
                self.queue.clear();
                self.queued.clear();
                break;
            }
            match observer {
                Observer::Derived(id) => self.recompute_derived(id),
                Observer::Cell(cell) => self.recompute_cell(cell),
                Observer::Call(call) => self.resolve_call(call),
                Observer::Member(index) => self.complete_member(index),
            }
        }
        self.draining = false;
    }

    fn recompute_derived(&mut self, id: FutureId) {
        let Some(derivation) = self.futures.derivation(id) else {
            return;
        };
        let state = match derivation {
            Derivation::Meta(source) => match self.futures.state(source).clone() {
                FutureState::Resolved(ty) => FutureState::Resolved(self.meta_type(ty)),
                other => other,
            },
            Derivation::Array(source) => match self.futures.state(source).clone() {
                FutureState::Resolved(ty) => FutureState::Resolved(self.array_of(ty)),
                other => other,
            },
            Derivation::Superclass(source) => match self.futures.state(source).clone() {
                FutureState::Resolved(ty) => self.superclass_state(id, ty),
                other => other,
            },
        };
        self.update(id, state);
    }

    fn superclass_state(&mut self, id: FutureId, ty: TypeId) -> FutureState {
        let is_meta = self.host_type(ty).is_meta();
        let instance = self.unmeta(ty);
        let Some(superclass) = self.host_type(instance).superclass else {
            return FutureState::Error(TypeError::NoSuperclass {
                ty: self.type_name(instance),
                span: self.futures.span(id),
            });
        };
        self.observe(superclass, Observer::Derived(id));
        match self.futures.state(superclass).clone() {
            FutureState::Resolved(sup) if is_meta => FutureState::Resolved(self.meta_type(sup)),
            other => other,
        }
    }
}
