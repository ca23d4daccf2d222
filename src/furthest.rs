//! # Furthest-Failure Policy
//!
//! A total preorder over outcomes: any success outdoes any failure, and
//! between two failures the one detected further into the input wins. Ties
//! keep the first operand, so reducing a list keeps the earliest of the
//! best candidates.

use std::cmp::Ordering;

use crate::result::{Failure, Outcome};

pub struct Furthest;

impl Furthest {
    /// Orders two outcomes. `Greater` means `a` outdoes `b`.
    pub fn compare(a: &Outcome, b: &Outcome) -> Ordering {
        match (a, b) {
            (Outcome::Success, Outcome::Success) => Ordering::Equal,
            (Outcome::Success, Outcome::Failure(_)) => Ordering::Greater,
            (Outcome::Failure(_), Outcome::Success) => Ordering::Less,
            (Outcome::Failure(x), Outcome::Failure(y)) => x.position().cmp(&y.position()),
        }
    }

    /// Returns the better of two outcomes, `a` on ties.
    pub fn max(a: Outcome, b: Outcome) -> Outcome {
        match Self::compare(&b, &a) {
            Ordering::Greater => b,
            _ => a,
        }
    }

    /// Returns the further of two failures, `a` on ties.
    pub fn max_failure(a: Failure, b: Failure) -> Failure {
        if b.position() > a.position() {
            b
        } else {
            a
        }
    }

    /// Folds a sequence of outcomes down to the best one.
    pub fn select<I>(outcomes: I) -> Option<Outcome>
    where
        I: IntoIterator<Item = Outcome>,
    {
        outcomes.into_iter().reduce(Self::max)
    }

    pub fn select_failure<I>(failures: I) -> Option<Failure>
    where
        I: IntoIterator<Item = Failure>,
    {
        failures.into_iter().reduce(Self::max_failure)
    }
}
