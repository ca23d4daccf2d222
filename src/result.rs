//! # Result & Failure Model
//!
//! Every parsing step produces an [`Outcome`]: either [`Outcome::Success`]
//! (the context has been advanced) or [`Outcome::Failure`] (the context is
//! unchanged). Failure messages are built lazily, because most failures are
//! compared by position and discarded without ever being shown to anyone.

use std::{fmt, rc::Rc};

use crate::context::Snapshot;

/// The outcome of a parsing step.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Success,
    Failure(Failure),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Success => None,
            Outcome::Failure(failure) => Some(failure),
        }
    }

    pub fn into_failure(self) -> Option<Failure> {
        match self {
            Outcome::Success => None,
            Outcome::Failure(failure) => Some(failure),
        }
    }
}

impl From<Failure> for Outcome {
    fn from(failure: Failure) -> Self {
        Outcome::Failure(failure)
    }
}

/// A failed match: the position where it was detected and a deferred message.
///
/// Two failures compare equal when they sit at the same position; the
/// message plays no part in control flow.
#[derive(Clone)]
pub struct Failure {
    pos: usize,
    message: Rc<dyn Fn() -> String>,
    debug: Option<Rc<DebugInfo>>,
}

impl Failure {
    /// Creates a failure whose message is produced on demand.
    pub fn new<F>(pos: usize, message: F) -> Self
    where
        F: Fn() -> String + 'static,
    {
        Self {
            pos,
            message: Rc::new(message),
            debug: None,
        }
    }

    /// Creates a failure from an already built message.
    pub fn with_message<S: Into<String>>(pos: usize, message: S) -> Self {
        let message: Rc<str> = Rc::from(message.into());
        Self::new(pos, move || message.to_string())
    }

    pub fn with_debug(mut self, info: DebugInfo) -> Self {
        self.debug = Some(Rc::new(info));
        self
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Builds the message. Only call this when reporting the failure.
    pub fn message(&self) -> String {
        (self.message)()
    }

    pub fn debug_info(&self) -> Option<&DebugInfo> {
        self.debug.as_deref()
    }
}

impl PartialEq for Failure {
    fn eq(&self, other: &Self) -> bool {
        self.pos == other.pos
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Failure")
            .field("pos", &self.pos)
            .field("message", &self.message())
            .field("debug", &self.debug)
            .finish()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at position {})", self.message(), self.pos)
    }
}

/// Extra diagnostics attached to a failure when debugging is enabled.
///
/// Carrying this payload never changes how a failure is compared or
/// propagated.
#[derive(Clone, Debug)]
pub struct DebugInfo {
    /// State of the whole context when the failure was built.
    pub snapshot: Snapshot,
    /// Names of the rules in flight, outermost first.
    pub trace: Vec<Rc<str>>,
    /// What caused the failure, when it stems from an abort or a panic.
    pub cause: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_message_is_lazy() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let failure = Failure::new(3, move || {
            counter.set(counter.get() + 1);
            "expected digit".to_string()
        });

        let copy = failure.clone();
        assert_eq!(copy, failure);
        assert_eq!(calls.get(), 0);

        assert_eq!(failure.message(), "expected digit");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_equality_ignores_message() {
        let a = Failure::with_message(2, "a");
        let b = Failure::with_message(2, "b");
        let c = Failure::with_message(5, "a");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_outcome_accessors() {
        let outcome = Outcome::from(Failure::with_message(1, "nope"));
        assert!(outcome.is_failure());
        assert_eq!(outcome.failure().map(Failure::position), Some(1));
        assert!(Outcome::Success.into_failure().is_none());
        assert_eq!(
            outcome.into_failure().map(|f| f.to_string()),
            Some("nope (at position 1)".to_string())
        );
    }
}
