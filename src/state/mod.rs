//! # State Protocol
//!
//! Any piece of mutable parsing state takes part in backtracking and in the
//! left-recursion fixpoint check by implementing [`State`].
//!
//! ## Core Components
//!
//! - [`State`]: the typed protocol (`snapshot`, `restore`, `diff`, `merge`, `equiv`)
//! - [`DynState`]: its object-safe form, implemented for every [`State`]
//! - [`ValueStack`]: the persistent value stack used to pass values between parsers
//! - [`CopyState`]: a plain value that is copied wholesale
//! - [`MapState`]: a persistent map, for symbol tables and scopes
//! - [`Inert`]: a state that ignores backtracking entirely, for pure caches

mod map;
mod stack;

pub use map::MapState;
pub use stack::{StackSnapshot, ValueStack};

use std::any::{type_name, Any};
use std::rc::Rc;

use crate::error::StateError;

/// Built-in kinds of state; everything registered by grammar code is `User`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum StateKind {
    Position,
    ValueStack,
    Seeds,
    User,
}

/// A unit of mutable parsing state that can be captured, rolled back and
/// replayed.
///
/// Laws every implementation must keep:
///
/// - `restore(&snapshot())` leaves the state unchanged.
/// - after `let d = diff(&s)?`, restoring `s` and merging `d` reproduces
///   the current state.
/// - a snapshot never changes after it has been handed out.
pub trait State: 'static {
    type Snapshot: Clone + 'static;
    type Delta: Clone + 'static;

    fn snapshot(&self) -> Self::Snapshot;

    fn restore(&mut self, snapshot: &Self::Snapshot);

    /// Computes the change since `snapshot`.
    ///
    /// Must fail with [`StateError`] rather than return a wrong delta when
    /// the change cannot be expressed relative to `snapshot`.
    fn diff(&self, snapshot: &Self::Snapshot) -> Result<Self::Delta, StateError>;

    fn merge(&mut self, delta: &Self::Delta);

    /// Whether the state captured by `snapshot` at position `pos` is
    /// observationally the same as the current state.
    fn equiv(&self, pos: usize, snapshot: &Self::Snapshot) -> bool;

    fn kind(&self) -> StateKind {
        StateKind::User
    }
}

/// Object-safe view of a [`State`], used by the context registry.
pub trait DynState {
    fn dyn_snapshot(&self) -> Rc<dyn Any>;
    fn dyn_restore(&mut self, snapshot: &dyn Any);
    fn dyn_diff(&self, snapshot: &dyn Any) -> Result<Rc<dyn Any>, StateError>;
    fn dyn_merge(&mut self, delta: &dyn Any);
    fn dyn_equiv(&self, pos: usize, snapshot: &dyn Any) -> bool;
    fn state_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<S: State> DynState for S {
    fn dyn_snapshot(&self) -> Rc<dyn Any> {
        Rc::new(self.snapshot())
    }

    fn dyn_restore(&mut self, snapshot: &dyn Any) {
        let snapshot = downcast::<S::Snapshot>(snapshot, self.state_name());
        self.restore(snapshot)
    }

    fn dyn_diff(&self, snapshot: &dyn Any) -> Result<Rc<dyn Any>, StateError> {
        let snapshot = downcast::<S::Snapshot>(snapshot, self.state_name());
        Ok(Rc::new(self.diff(snapshot)?))
    }

    fn dyn_merge(&mut self, delta: &dyn Any) {
        let delta = downcast::<S::Delta>(delta, self.state_name());
        self.merge(delta)
    }

    fn dyn_equiv(&self, pos: usize, snapshot: &dyn Any) -> bool {
        let snapshot = downcast::<S::Snapshot>(snapshot, self.state_name());
        self.equiv(pos, snapshot)
    }

    fn state_name(&self) -> &'static str {
        type_name::<S>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// The context pairs snapshot elements with the states that produced them,
// so a mismatch here means a snapshot crossed over from another context.
fn downcast<'a, T: 'static>(value: &'a dyn Any, state: &str) -> &'a T {
    match value.downcast_ref::<T>() {
        Some(value) => value,
        None => panic!("snapshot element was not produced by state `{state}`"),
    }
}

/// A value that is snapshotted by cloning it. Suited to small values such
/// as counters, flags or indentation levels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CopyState<T> {
    value: T,
}

impl<T> CopyState<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn set(&mut self, value: T) {
        self.value = value;
    }
}

impl<T: Clone + PartialEq + 'static> State for CopyState<T> {
    type Snapshot = T;
    type Delta = T;

    fn snapshot(&self) -> T {
        self.value.clone()
    }

    fn restore(&mut self, snapshot: &T) {
        self.value = snapshot.clone();
    }

    fn diff(&self, _snapshot: &T) -> Result<T, StateError> {
        Ok(self.value.clone())
    }

    fn merge(&mut self, delta: &T) {
        self.value = delta.clone();
    }

    fn equiv(&self, _pos: usize, snapshot: &T) -> bool {
        self.value == *snapshot
    }
}

/// State that is safe to ignore under backtracking, such as a memoization
/// cache whose entries stay valid whatever path the parse takes.
#[derive(Debug, Clone, Default)]
pub struct Inert<T> {
    value: T,
}

impl<T> Inert<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: 'static> State for Inert<T> {
    type Snapshot = ();
    type Delta = ();

    fn snapshot(&self) {}

    fn restore(&mut self, _snapshot: &()) {}

    fn diff(&self, _snapshot: &()) -> Result<(), StateError> {
        Ok(())
    }

    fn merge(&mut self, _delta: &()) {}

    fn equiv(&self, _pos: usize, _snapshot: &()) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_copy_state_round_trip() {
        let mut depth = CopyState::new(1u32);
        let snapshot = depth.snapshot();
        depth.set(3);

        let delta = depth.diff(&snapshot).unwrap();
        assert!(!depth.equiv(0, &snapshot));

        depth.restore(&snapshot);
        assert_eq!(*depth.get(), 1);
        assert!(depth.equiv(0, &snapshot));

        depth.merge(&delta);
        assert_eq!(*depth.get(), 3);
    }

    #[test]
    fn test_inert_ignores_restore() {
        let mut cache: Inert<HashMap<usize, bool>> = Inert::default();
        let snapshot = cache.snapshot();
        cache.get_mut().insert(4, true);
        cache.restore(&snapshot);
        assert_eq!(cache.get().get(&4), Some(&true));
        assert!(cache.equiv(0, &snapshot));
    }

    #[test]
    fn test_dyn_state_dispatch() {
        let mut state: Box<dyn DynState> = Box::new(CopyState::new('a'));
        let snapshot = state.dyn_snapshot();
        if let Some(s) = state.as_any_mut().downcast_mut::<CopyState<char>>() {
            s.set('b');
        }
        assert!(!state.dyn_equiv(0, snapshot.as_ref()));
        state.dyn_restore(snapshot.as_ref());
        assert!(state.dyn_equiv(0, snapshot.as_ref()));
        assert!(state.state_name().contains("CopyState"));
    }

    #[test]
    fn test_state_kind_display() {
        assert_eq!(StateKind::ValueStack.to_string(), "value_stack");
        let name: &'static str = StateKind::Seeds.into();
        assert_eq!(name, "seeds");
    }
}
