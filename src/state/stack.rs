use std::fmt;
use std::rc::Rc;

use super::{State, StateKind};
use crate::error::StateError;

struct Node<T> {
    value: T,
    parent: Option<Rc<Node<T>>>,
}

// Unlinks long chains iteratively instead of recursing once per node.
impl<T> Drop for Node<T> {
    fn drop(&mut self) {
        let mut parent = self.parent.take();
        while let Some(node) = parent {
            match Rc::try_unwrap(node) {
                Ok(mut node) => parent = node.parent.take(),
                Err(_) => break,
            }
        }
    }
}

fn same_node<T>(a: Option<&Rc<Node<T>>>, b: Option<&Rc<Node<T>>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

/// Captured position of a [`ValueStack`]: its height and its top node.
#[derive(Clone)]
pub struct StackSnapshot<T> {
    len: usize,
    top: Option<Rc<Node<T>>>,
}

impl<T> StackSnapshot<T> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<T> fmt::Debug for StackSnapshot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackSnapshot").field("len", &self.len).finish()
    }
}

/// A persistent stack.
///
/// Every push allocates a reference-counted node that points at its parent,
/// so a snapshot is the height plus a handle on the top node, and restoring
/// a snapshot taken below the current top is a truncation. A node lives as
/// long as the stack or some snapshot still reaches it; values pushed by an
/// abandoned attempt are dropped once the last snapshot above them is.
///
/// `spine` lists the live nodes from bottom to top.
pub struct ValueStack<T> {
    spine: Vec<Rc<Node<T>>>,
}

impl<T> Default for ValueStack<T> {
    fn default() -> Self {
        Self { spine: Vec::new() }
    }
}

impl<T: Clone> ValueStack<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: T) {
        let parent = self.spine.last().cloned();
        self.spine.push(Rc::new(Node { value, parent }));
    }

    pub fn pop(&mut self) -> Option<T> {
        let node = self.spine.pop()?;
        Some(node.value.clone())
    }

    pub fn peek(&self) -> Option<&T> {
        self.spine.last().map(|node| &node.value)
    }

    /// Item at `depth` counted from the top, `0` being the top itself.
    pub fn peek_at(&self, depth: usize) -> Option<&T> {
        let position = self.spine.len().checked_sub(depth + 1)?;
        Some(&self.spine[position].value)
    }

    pub fn len(&self) -> usize {
        self.spine.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spine.is_empty()
    }

    /// Iterates from the bottom of the stack to the top.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.spine.iter().map(|node| &node.value)
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }

    fn holds_prefix(&self, snapshot: &StackSnapshot<T>) -> bool {
        match &snapshot.top {
            None => true,
            Some(top) => same_node(self.spine.get(snapshot.len - 1), Some(top)),
        }
    }
}

impl<T: Clone + 'static> State for ValueStack<T> {
    type Snapshot = StackSnapshot<T>;
    type Delta = Vec<T>;

    fn snapshot(&self) -> StackSnapshot<T> {
        StackSnapshot {
            len: self.spine.len(),
            top: self.spine.last().cloned(),
        }
    }

    fn restore(&mut self, snapshot: &StackSnapshot<T>) {
        if self.holds_prefix(snapshot) {
            self.spine.truncate(snapshot.len);
            return;
        }
        // Values below the snapshot frontier were popped: rebuild the spine
        // from the parent chain.
        self.spine.clear();
        let mut cursor = snapshot.top.clone();
        while let Some(node) = cursor {
            cursor = node.parent.clone();
            self.spine.push(node);
        }
        self.spine.reverse();
    }

    fn diff(&self, snapshot: &StackSnapshot<T>) -> Result<Vec<T>, StateError> {
        if !self.holds_prefix(snapshot) {
            return Err(StateError::NotAPrefix {
                kind: StateKind::ValueStack,
                snapshot_len: snapshot.len,
                current_len: self.spine.len(),
            });
        }
        Ok(self.spine[snapshot.len..]
            .iter()
            .map(|node| node.value.clone())
            .collect())
    }

    fn merge(&mut self, delta: &Vec<T>) {
        for value in delta {
            self.push(value.clone());
        }
    }

    fn equiv(&self, _pos: usize, snapshot: &StackSnapshot<T>) -> bool {
        snapshot.len == self.spine.len() && same_node(self.spine.last(), snapshot.top.as_ref())
    }

    fn kind(&self) -> StateKind {
        StateKind::ValueStack
    }
}

impl<T> fmt::Debug for ValueStack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueStack")
            .field("len", &self.spine.len())
            .finish()
    }
}
