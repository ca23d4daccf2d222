//! # Left Recursion
//!
//! Rule references ([`Ref`]) grow a *seed* when a rule calls itself at the
//! position where it started. The first attempt runs with a failing seed in
//! place, so the left-recursive alternative fails and some other alternative
//! matches. Each following attempt lets the recursive call reuse the last
//! result by replaying its [`Delta`], which can only extend the match. The
//! loop stops as soon as an attempt no longer reaches past the previous one;
//! since every continuing iteration strictly advances the end position, it
//! runs at most once per byte of input.

use std::cell::{Cell, OnceCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::context::{Context, Delta};
use crate::error::{GrammarError, StateError};
use crate::furthest::Furthest;
use crate::grammar::Rule;
use crate::parser::{ParseResult, Parser};
use crate::result::{Failure, Outcome};
use crate::state::{State, StateKind};

/// The best result found so far for one rule at one position.
pub struct Seed {
    start: usize,
    end: usize,
    target: Rc<Rule>,
    outcome: Outcome,
    delta: Delta,
    used: Cell<bool>,
}

impl Seed {
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn rule(&self) -> &str {
        self.target.name()
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Whether a recursive call has reused this seed.
    pub fn is_used(&self) -> bool {
        self.used.get()
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seed")
            .field("rule", &self.target.name())
            .field("start", &self.start)
            .field("end", &self.end)
            .field("success", &self.outcome.is_success())
            .field("used", &self.used.get())
            .finish()
    }
}

struct SeedLink {
    seed: Rc<Seed>,
    next: Option<Rc<SeedLink>>,
}

fn walk<'a>(mut link: Option<&'a Rc<SeedLink>>) -> impl Iterator<Item = &'a Rc<Seed>> {
    std::iter::from_fn(move || {
        let current = link?;
        link = current.next.as_ref();
        Some(&current.seed)
    })
}

fn seeds_from(pos: usize, head: Option<&Rc<SeedLink>>) -> Vec<*const Seed> {
    walk(head)
        .filter(|seed| seed.start >= pos)
        .map(Rc::as_ptr)
        .collect()
}

/// The seeds currently being grown, innermost first.
///
/// Seeds only change through [`Ref`]; a snapshot shares the list, so taking
/// one is constant time.
#[derive(Default)]
pub struct Seeds {
    head: Option<Rc<SeedLink>>,
    len: usize,
}

#[derive(Clone, Default)]
pub struct SeedsSnapshot {
    head: Option<Rc<SeedLink>>,
    len: usize,
}

impl SeedsSnapshot {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Seeds {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<Seed>> + '_ {
        walk(self.head.as_ref())
    }

    /// The seed for `target` at `pos`, if one is being grown.
    pub fn find(&self, pos: usize, target: &Rc<Rule>) -> Option<Rc<Seed>> {
        self.iter()
            .find(|seed| seed.start == pos && Rc::ptr_eq(&seed.target, target))
            .cloned()
    }

    fn push(&mut self, seed: Rc<Seed>) {
        let next = self.head.take();
        self.head = Some(Rc::new(SeedLink { seed, next }));
        self.len += 1;
    }

    fn pop(&mut self) -> Option<Rc<Seed>> {
        let link = self.head.take()?;
        self.head = link.next.clone();
        self.len -= 1;
        Some(link.seed.clone())
    }
}

impl State for Seeds {
    type Snapshot = SeedsSnapshot;
    type Delta = ();

    fn snapshot(&self) -> SeedsSnapshot {
        SeedsSnapshot {
            head: self.head.clone(),
            len: self.len,
        }
    }

    fn restore(&mut self, snapshot: &SeedsSnapshot) {
        self.head = snapshot.head.clone();
        self.len = snapshot.len;
    }

    // Seeds are scoped to the reference that grows them and are never
    // replayed elsewhere.
    fn diff(&self, _snapshot: &SeedsSnapshot) -> Result<(), StateError> {
        Ok(())
    }

    fn merge(&mut self, _delta: &()) {}

    fn equiv(&self, pos: usize, snapshot: &SeedsSnapshot) -> bool {
        seeds_from(pos, self.head.as_ref()) == seeds_from(pos, snapshot.head.as_ref())
    }

    fn kind(&self) -> StateKind {
        StateKind::Seeds
    }
}

type Slot = Rc<OnceCell<Weak<Rule>>>;

/// Reference to a grammar rule by name.
///
/// References are handed out by [`crate::GrammarBuilder::reference`] and
/// wired to their rule once, when the grammar is built. Every reference
/// grows seeds, so a rule reached through a reference may be left-recursive,
/// directly or through other rules.
#[derive(Clone)]
pub struct Ref {
    name: Rc<str>,
    slot: Slot,
}

impl Ref {
    pub(crate) fn new(name: Rc<str>, slot: Slot) -> Self {
        Self { name, slot }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_resolved(&self) -> bool {
        self.slot.get().is_some()
    }

    fn target(&self) -> Result<Rc<Rule>, GrammarError> {
        let weak = self
            .slot
            .get()
            .ok_or_else(|| GrammarError::UnresolvedReference(self.name.to_string()))?;
        weak.upgrade()
            .ok_or_else(|| GrammarError::DanglingReference(self.name.to_string()))
    }
}

impl Parser for Ref {
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        let target = self.target()?;
        let start = ctx.pos();

        if let Some(seed) = ctx.seeds().find(start, &target) {
            seed.used.set(true);
            ctx.merge(&seed.delta);
            return Ok(seed.outcome.clone());
        }

        let initial = ctx.snapshot();
        let name = self.name.clone();
        let mut seed = Rc::new(Seed {
            start,
            end: start,
            target: target.clone(),
            outcome: Outcome::Failure(Failure::new(start, move || {
                format!("expected {}", name)
            })),
            delta: ctx.diff(&initial)?,
            used: Cell::new(false),
        });

        let mut iteration = 0usize;
        loop {
            ctx.seeds_mut().push(seed.clone());
            let outcome = target.parse(ctx);
            ctx.seeds_mut().pop();
            let outcome = outcome?;

            if iteration == 0 && !seed.used.get() {
                return Ok(outcome);
            }

            let grew = outcome.is_success() && (seed.outcome.is_failure() || ctx.pos() > seed.end);
            if !grew {
                ctx.restore(&initial);
                ctx.merge(&seed.delta);
                debug!(
                    target: "seedling::left_recursion",
                    rule = %self.name,
                    start,
                    end = seed.end,
                    iterations = iteration,
                    "seed reached fixpoint"
                );
                return Ok(match (&seed.outcome, outcome) {
                    // ties go to the last attempt; the seed may still be the placeholder
                    (Outcome::Failure(best), Outcome::Failure(last)) => {
                        Outcome::Failure(Furthest::max_failure(last, best.clone()))
                    }
                    (known, _) => known.clone(),
                });
            }

            debug!(
                target: "seedling::left_recursion",
                rule = %self.name,
                start,
                end = ctx.pos(),
                iteration,
                "seed grown"
            );
            seed = Rc::new(Seed {
                start,
                end: ctx.pos(),
                target: target.clone(),
                outcome,
                delta: ctx.diff(&initial)?,
                used: Cell::new(false),
            });
            ctx.restore(&initial);
            iteration += 1;
        }
    }

    fn describe(&self) -> String {
        format!("Ref({})", self.name)
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("name", &self.name)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
