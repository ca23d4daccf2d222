//! # Parsing Context
//!
//! A [`Context`] holds everything one parse mutates: the scan position, the
//! value stack, the left-recursion seeds and any user states declared by the
//! grammar. Its aggregate [`Context::snapshot`], [`Context::restore`],
//! [`Context::diff`], [`Context::merge`] and [`Context::equiv`] fan out over
//! all of them in a fixed order. Deciding *when* to call them is left to
//! the combinators.

use std::any::{Any, TypeId};
use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::ParseConfig;
use crate::error::StateError;
use crate::left_recursion::{Seeds, SeedsSnapshot};
use crate::parser::ParseResult;
use crate::result::{DebugInfo, Failure, Outcome};
use crate::state::{DynState, StackSnapshot, State, ValueStack};

/// Values exchanged between parsers through the value stack.
pub type Value = Rc<dyn Any>;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Aggregate snapshot of a [`Context`].
#[derive(Clone)]
pub struct Snapshot {
    owner: u64,
    pos: usize,
    stack: StackSnapshot<Value>,
    seeds: SeedsSnapshot,
    states: Vec<Rc<dyn Any>>,
}

impl Snapshot {
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    pub fn seed_count(&self) -> usize {
        self.seeds.len()
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("pos", &self.pos)
            .field("stack_len", &self.stack.len())
            .field("seeds", &self.seeds.len())
            .field("user_states", &self.states.len())
            .finish()
    }
}

/// Aggregate change of a [`Context`] since some snapshot.
#[derive(Clone)]
pub struct Delta {
    owner: u64,
    pos: usize,
    stack: Vec<Value>,
    states: Vec<Rc<dyn Any>>,
}

impl Delta {
    /// Position reached by the change.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn pushed(&self) -> usize {
        self.stack.len()
    }
}

impl fmt::Debug for Delta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delta")
            .field("pos", &self.pos)
            .field("pushed", &self.stack.len())
            .field("user_states", &self.states.len())
            .finish()
    }
}

/// Builds a [`Context`] with its configuration and user states.
///
/// User states are fixed once the context is built; registering the same
/// state type twice keeps the first instance.
pub struct ContextBuilder {
    input: Rc<str>,
    config: ParseConfig,
    states: Vec<Box<dyn DynState>>,
    index: HashMap<TypeId, usize>,
}

impl ContextBuilder {
    pub fn config(mut self, config: ParseConfig) -> Self {
        self.config = config;
        self
    }

    pub fn state<S: State>(self, state: S) -> Self {
        self.dyn_state(Box::new(state))
    }

    pub fn dyn_state(mut self, state: Box<dyn DynState>) -> Self {
        let type_id = state.as_any().type_id();
        if !self.index.contains_key(&type_id) {
            self.index.insert(type_id, self.states.len());
            self.states.push(state);
        }
        self
    }

    pub fn build(self) -> Context {
        Context {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            input: self.input,
            pos: 0,
            stack: ValueStack::new(),
            seeds: Seeds::default(),
            states: self.states,
            index: self.index,
            config: self.config,
            trace: Vec::new(),
            furthest: None,
            recording: true,
            line_map: OnceCell::new(),
        }
    }
}

/// Per-parse mutable state over an immutable input string.
///
/// Positions are byte offsets into the input.
pub struct Context {
    id: u64,
    input: Rc<str>,
    pos: usize,
    stack: ValueStack<Value>,
    seeds: Seeds,
    states: Vec<Box<dyn DynState>>,
    index: HashMap<TypeId, usize>,
    config: ParseConfig,
    trace: Vec<Rc<str>>,
    furthest: Option<Failure>,
    recording: bool,
    line_map: OnceCell<LineMap>,
}

impl Context {
    pub fn new(input: &str) -> Self {
        Self::builder(input).build()
    }

    pub fn builder(input: &str) -> ContextBuilder {
        ContextBuilder {
            input: Rc::from(input),
            config: ParseConfig::default(),
            states: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn config(&self) -> &ParseConfig {
        &self.config
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Shared handle on the input, for messages built after the parse.
    pub fn source(&self) -> Rc<str> {
        self.input.clone()
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn advance(&mut self, bytes: usize) {
        self.pos += bytes;
    }

    /// Unconsumed part of the input.
    pub fn rest(&self) -> &str {
        self.input.get(self.pos..).unwrap_or("")
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Input text between `start` and the current position.
    pub fn text_from(&self, start: usize) -> &str {
        self.input.get(start..self.pos).unwrap_or("")
    }

    // ---- value stack ----

    pub fn stack(&self) -> &ValueStack<Value> {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut ValueStack<Value> {
        &mut self.stack
    }

    pub fn push<T: Any>(&mut self, value: T) {
        self.stack.push(Rc::new(value));
    }

    /// Pops the top value if it has type `T`; leaves the stack alone otherwise.
    pub fn pop_as<T: Any>(&mut self) -> Option<Rc<T>> {
        if !self.stack.peek()?.is::<T>() {
            return None;
        }
        self.stack.pop()?.downcast::<T>().ok()
    }

    pub fn peek_as<T: Any>(&self) -> Option<&T> {
        self.stack.peek()?.downcast_ref::<T>()
    }

    // ---- registered states ----

    pub fn state<S: State>(&self) -> Option<&S> {
        let index = *self.index.get(&TypeId::of::<S>())?;
        self.states[index].as_any().downcast_ref::<S>()
    }

    pub fn state_mut<S: State>(&mut self) -> Option<&mut S> {
        let index = *self.index.get(&TypeId::of::<S>())?;
        self.states[index].as_any_mut().downcast_mut::<S>()
    }

    pub fn seeds(&self) -> &Seeds {
        &self.seeds
    }

    pub(crate) fn seeds_mut(&mut self) -> &mut Seeds {
        &mut self.seeds
    }

    // ---- aggregate state protocol ----

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            owner: self.id,
            pos: self.pos,
            stack: self.stack.snapshot(),
            seeds: self.seeds.snapshot(),
            states: self.states.iter().map(|s| s.dyn_snapshot()).collect(),
        }
    }

    /// Rolls every state back to `snapshot`.
    ///
    /// # Panics
    ///
    /// Panics if `snapshot` was taken from another context.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.check_owner(snapshot.owner);
        self.pos = snapshot.pos;
        self.stack.restore(&snapshot.stack);
        self.seeds.restore(&snapshot.seeds);
        for (state, element) in self.states.iter_mut().zip(&snapshot.states) {
            state.dyn_restore(element.as_ref());
        }
    }

    /// Change since `snapshot`; fails if some state cannot express it.
    pub fn diff(&self, snapshot: &Snapshot) -> Result<Delta, StateError> {
        self.check_owner(snapshot.owner);
        let states = self
            .states
            .iter()
            .zip(&snapshot.states)
            .map(|(state, element)| state.dyn_diff(element.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Delta {
            owner: self.id,
            pos: self.pos,
            stack: self.stack.diff(&snapshot.stack)?,
            states,
        })
    }

    /// Replays `delta` onto the current state.
    pub fn merge(&mut self, delta: &Delta) {
        self.check_owner(delta.owner);
        self.pos = delta.pos;
        self.stack.merge(&delta.stack);
        for (state, element) in self.states.iter_mut().zip(&delta.states) {
            state.dyn_merge(element.as_ref());
        }
    }

    /// Whether the current state is indistinguishable from `snapshot`.
    pub fn equiv(&self, snapshot: &Snapshot) -> bool {
        self.check_owner(snapshot.owner);
        self.pos == snapshot.pos
            && self.stack.equiv(self.pos, &snapshot.stack)
            && self.seeds.equiv(self.pos, &snapshot.seeds)
            && self
                .states
                .iter()
                .zip(&snapshot.states)
                .all(|(state, element)| state.dyn_equiv(self.pos, element.as_ref()))
    }

    /// Runs `f`, rolling back every change if it fails.
    pub fn transact<F>(&mut self, f: F) -> ParseResult
    where
        F: FnOnce(&mut Context) -> ParseResult,
    {
        let snapshot = self.snapshot();
        let outcome = f(self)?;
        if outcome.is_failure() {
            self.restore(&snapshot);
        }
        Ok(outcome)
    }

    fn check_owner(&self, owner: u64) {
        assert_eq!(owner, self.id, "state captured from a different context");
    }

    // ---- failures and diagnostics ----

    /// Builds a failure at the current position and records it as a
    /// candidate for the furthest failure of the parse.
    pub fn failure<F>(&mut self, message: F) -> Failure
    where
        F: Fn() -> String + 'static,
    {
        self.failure_at(self.pos, message)
    }

    pub fn failure_at<F>(&mut self, pos: usize, message: F) -> Failure
    where
        F: Fn() -> String + 'static,
    {
        let mut failure = Failure::new(pos, message);
        if self.config.debug {
            failure = failure.with_debug(self.debug_info(None));
        }
        self.record_failure(&failure);
        failure
    }

    /// Shorthand for returning [`Context::failure`] from a parser.
    pub fn fail<F>(&mut self, message: F) -> ParseResult
    where
        F: Fn() -> String + 'static,
    {
        Ok(Outcome::Failure(self.failure(message)))
    }

    pub(crate) fn record_failure(&mut self, failure: &Failure) {
        if !self.recording {
            return;
        }
        let further = self
            .furthest
            .as_ref()
            .map_or(true, |known| failure.position() > known.position());
        if further {
            self.furthest = Some(failure.clone());
        }
    }

    /// Runs `f` without recording the failures it builds as furthest
    /// failure candidates.
    pub fn without_recording<T, F>(&mut self, f: F) -> T
    where
        F: FnOnce(&mut Context) -> T,
    {
        let recording = std::mem::replace(&mut self.recording, false);
        let result = f(self);
        self.recording = recording;
        result
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Furthest failure built during the parse so far. Not subject to
    /// backtracking.
    pub fn furthest_failure(&self) -> Option<&Failure> {
        self.furthest.as_ref()
    }

    /// Diagnostics describing the context right now.
    pub fn debug_info(&self, cause: Option<String>) -> DebugInfo {
        DebugInfo {
            snapshot: self.snapshot(),
            trace: self.trace.clone(),
            cause,
        }
    }

    /// Names of the rules currently in flight, outermost first. Only
    /// recorded in debug mode.
    pub fn trace(&self) -> &[Rc<str>] {
        &self.trace
    }

    pub(crate) fn enter_rule(&mut self, name: &Rc<str>) {
        if self.config.debug {
            self.trace.push(name.clone());
        }
    }

    pub(crate) fn leave_rule(&mut self) {
        if self.config.debug {
            self.trace.pop();
        }
    }

    pub(crate) fn trace_depth(&self) -> usize {
        self.trace.len()
    }

    pub(crate) fn truncate_trace(&mut self, depth: usize) {
        self.trace.truncate(depth);
    }

    pub fn line_map(&self) -> &LineMap {
        self.line_map
            .get_or_init(|| LineMap::new(self.input.clone(), self.config.tab_width))
    }

    /// `line:column` of a byte offset, both one-based.
    pub fn position_string(&self, pos: usize) -> String {
        self.line_map().describe(pos)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("pos", &self.pos)
            .field("input_len", &self.input.len())
            .field("stack", &self.stack)
            .field("seeds", &self.seeds.len())
            .field(
                "states",
                &self.states.iter().map(|s| s.state_name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Maps byte offsets to one-based `line:column` pairs.
pub struct LineMap {
    text: Rc<str>,
    starts: Vec<usize>,
    tab_width: usize,
}

impl LineMap {
    pub fn new(text: Rc<str>, tab_width: usize) -> Self {
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            text,
            starts,
            tab_width: tab_width.max(1),
        }
    }

    pub fn line_col(&self, pos: usize) -> (usize, usize) {
        let pos = pos.min(self.text.len());
        let line = self.starts.partition_point(|&start| start <= pos);
        let start = self.starts[line - 1];
        let column = match self.text.get(start..pos) {
            Some(prefix) => prefix.chars().fold(0, |col, c| {
                if c == '\t' {
                    col + self.tab_width - col % self.tab_width
                } else {
                    col + 1
                }
            }),
            None => pos - start,
        };
        (line, column + 1)
    }

    pub fn describe(&self, pos: usize) -> String {
        let (line, column) = self.line_col(pos);
        format!("{}:{}", line, column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::CopyState;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_snapshot_restore_identity() {
        let mut ctx = Context::builder("abc").state(CopyState::new(0u8)).build();
        ctx.push(1i32);
        ctx.advance(1);
        let snapshot = ctx.snapshot();
        ctx.restore(&snapshot);
        assert!(ctx.equiv(&snapshot));
        assert_eq!(ctx.pos(), 1);
        assert_eq!(ctx.stack().len(), 1);
    }

    #[test]
    fn test_restore_rolls_back_everything() {
        let mut ctx = Context::builder("abc").state(CopyState::new(0u8)).build();
        let snapshot = ctx.snapshot();

        ctx.advance(2);
        ctx.push("x");
        if let Some(depth) = ctx.state_mut::<CopyState<u8>>() {
            depth.set(7);
        }
        assert!(!ctx.equiv(&snapshot));

        ctx.restore(&snapshot);
        assert!(ctx.equiv(&snapshot));
        assert_eq!(ctx.pos(), 0);
        assert!(ctx.stack().is_empty());
        assert_eq!(ctx.state::<CopyState<u8>>().map(|s| *s.get()), Some(0));
    }

    #[test]
    fn test_diff_merge_replays_growth() {
        let mut ctx = Context::new("abcd");
        ctx.push(1i32);
        let snapshot = ctx.snapshot();
        ctx.advance(3);
        ctx.push(2i32);

        let delta = ctx.diff(&snapshot).unwrap();
        assert_eq!(delta.position(), 3);
        assert_eq!(delta.pushed(), 1);

        ctx.restore(&snapshot);
        ctx.merge(&delta);
        assert_eq!(ctx.pos(), 3);
        assert_eq!(ctx.pop_as::<i32>().as_deref(), Some(&2));
        assert_eq!(ctx.pop_as::<i32>().as_deref(), Some(&1));
    }

    #[test]
    fn test_diff_after_popping_below_snapshot_fails() {
        let mut ctx = Context::new("");
        ctx.push(1i32);
        let snapshot = ctx.snapshot();
        ctx.stack_mut().pop();
        assert!(matches!(
            ctx.diff(&snapshot),
            Err(StateError::NotAPrefix { .. })
        ));
    }

    #[test]
    fn test_state_registration_is_idempotent() {
        let ctx = Context::builder("")
            .state(CopyState::new(1u32))
            .state(CopyState::new(2u32))
            .state(CopyState::new('c'))
            .build();
        assert_eq!(ctx.state::<CopyState<u32>>().map(|s| *s.get()), Some(1));
        assert_eq!(ctx.state::<CopyState<char>>().map(|s| *s.get()), Some('c'));
        assert!(ctx.state::<CopyState<u64>>().is_none());
    }

    #[test]
    fn test_pop_as_wrong_type_keeps_value() {
        let mut ctx = Context::new("");
        ctx.push("text");
        assert!(ctx.pop_as::<i32>().is_none());
        assert_eq!(ctx.stack().len(), 1);
        assert_eq!(ctx.peek_as::<&str>(), Some(&"text"));
    }

    #[test]
    fn test_furthest_failure_record() {
        let mut ctx = Context::new("abcdef");
        ctx.set_pos(4);
        ctx.failure(|| "far".to_string());
        ctx.set_pos(1);
        ctx.failure(|| "near".to_string());
        assert_eq!(ctx.furthest_failure().map(|f| f.position()), Some(4));
    }

    #[test]
    fn test_debug_failures_carry_snapshot() {
        let mut ctx = Context::builder("ab").config(ParseConfig::debug()).build();
        ctx.advance(1);
        let failure = ctx.failure(|| "boom".to_string());
        let info = failure.debug_info().unwrap();
        assert_eq!(info.snapshot.position(), 1);
        assert!(info.cause.is_none());
    }

    #[test]
    #[should_panic(expected = "different context")]
    fn test_foreign_snapshot_is_rejected() {
        let a = Context::new("a");
        let mut b = Context::new("a");
        b.restore(&a.snapshot());
    }

    #[test]
    fn test_line_map() {
        let map = LineMap::new(Rc::from("ab\n\tc\nxyz"), 4);
        assert_eq!(map.line_col(0), (1, 1));
        assert_eq!(map.line_col(2), (1, 3));
        assert_eq!(map.line_col(3), (2, 1));
        assert_eq!(map.line_col(4), (2, 5));
        assert_eq!(map.describe(8), "3:3");
        assert_eq!(map.describe(100), "3:4");
    }
}
