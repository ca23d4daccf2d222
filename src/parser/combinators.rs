//! # Structural Combinators
//!
//! Sequencing, ordered and longest-match choice, repetition, lookahead and
//! bounded repetition. Each combinator keeps the parser contract: when it
//! reports a failure the context is back where it started.

use std::rc::Rc;

use super::core::{Abort, ParseResult, Parser};
use crate::context::{Context, Snapshot};
use crate::furthest::Furthest;
use crate::result::{Failure, Outcome};

fn describe_all(parsers: &[Box<dyn Parser>]) -> String {
    parsers
        .iter()
        .map(|p| p.describe())
        .collect::<Vec<_>>()
        .join(", ")
}

fn keep_furthest(known: Option<Failure>, failure: Failure) -> Option<Failure> {
    Some(match known {
        None => failure,
        Some(known) => Furthest::max_failure(known, failure),
    })
}

/// Seq: Matches all parsers one after the other
///
/// On the first failure the whole sequence is rolled back and that failure
/// is reported.
pub struct Seq {
    parsers: Vec<Box<dyn Parser>>,
}

impl Seq {
    /// Creates a new Seq parser
    ///
    /// # Arguments
    ///
    /// * `parsers` - The parsers to match, in order
    pub fn new(parsers: Vec<Box<dyn Parser>>) -> Self {
        Self { parsers }
    }
}

impl Parser for Seq {
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        let snapshot = ctx.snapshot();
        for parser in &self.parsers {
            if let Outcome::Failure(failure) = parser.parse(ctx)? {
                ctx.restore(&snapshot);
                return Ok(Outcome::Failure(failure));
            }
        }
        Ok(Outcome::Success)
    }

    fn describe(&self) -> String {
        format!("Seq({})", describe_all(&self.parsers))
    }
}

/// Choice: Ordered choice, the first alternative to succeed wins
///
/// Later alternatives are never tried once one has succeeded. When every
/// alternative fails, the furthest of their failures is reported.
pub struct Choice {
    parsers: Vec<Box<dyn Parser>>,
}

impl Choice {
    /// Creates a new Choice parser
    ///
    /// # Arguments
    ///
    /// * `parsers` - The alternatives, in priority order
    pub fn new(parsers: Vec<Box<dyn Parser>>) -> Self {
        Self { parsers }
    }
}

impl Parser for Choice {
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        let mut furthest = None;
        for parser in &self.parsers {
            match parser.parse(ctx)? {
                Outcome::Success => return Ok(Outcome::Success),
                Outcome::Failure(failure) => furthest = keep_furthest(furthest, failure),
            }
        }
        match furthest {
            Some(failure) => Ok(Outcome::Failure(failure)),
            None => ctx.fail(|| "empty choice".to_string()),
        }
    }

    fn describe(&self) -> String {
        format!("Choice({})", describe_all(&self.parsers))
    }
}

/// Longest: Tries every alternative and keeps the one that matches the most
///
/// Ties go to the alternative declared first.
pub struct Longest {
    parsers: Vec<Box<dyn Parser>>,
}

impl Longest {
    pub fn new(parsers: Vec<Box<dyn Parser>>) -> Self {
        Self { parsers }
    }
}

impl Parser for Longest {
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        let initial = ctx.snapshot();
        let mut best: Option<(usize, Snapshot)> = None;
        let mut furthest = None;

        for parser in &self.parsers {
            match parser.parse(ctx)? {
                Outcome::Success => {
                    let end = ctx.pos();
                    if best.as_ref().map_or(true, |(known, _)| end > *known) {
                        best = Some((end, ctx.snapshot()));
                    }
                    ctx.restore(&initial);
                }
                Outcome::Failure(failure) => furthest = keep_furthest(furthest, failure),
            }
        }

        match (best, furthest) {
            (Some((_, winner)), _) => {
                ctx.restore(&winner);
                Ok(Outcome::Success)
            }
            (None, Some(failure)) => Ok(Outcome::Failure(failure)),
            (None, None) => ctx.fail(|| "empty longest-match choice".to_string()),
        }
    }

    fn describe(&self) -> String {
        format!("Longest({})", describe_all(&self.parsers))
    }
}

/// Optional: Matches the parser if possible, succeeds regardless
pub struct Optional<P> {
    parser: P,
}

impl<P> Optional<P> {
    pub fn new(parser: P) -> Self {
        Self { parser }
    }
}

impl<P: Parser> Parser for Optional<P> {
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        // A failing child has already restored the context.
        self.parser.parse(ctx)?;
        Ok(Outcome::Success)
    }

    fn describe(&self) -> String {
        format!("Optional({})", self.parser.describe())
    }
}

/// Matches `parser` until it fails and returns the number of matches.
///
/// A match that does not advance the position ends the repetition, so a
/// zero-width child cannot loop forever.
fn repeat_until_failure<P: Parser>(parser: &P, ctx: &mut Context) -> Result<usize, Abort> {
    let mut count = 0;
    loop {
        let before = ctx.pos();
        match parser.parse(ctx)? {
            Outcome::Success if ctx.pos() == before => {
                tracing::trace!(
                    target: "seedling::repeat",
                    position = before,
                    iterations = count + 1,
                    "repetition stopped on a zero-width match"
                );
                return Ok(count + 1);
            }
            Outcome::Success => count += 1,
            Outcome::Failure(failure) => {
                tracing::trace!(
                    target: "seedling::repeat",
                    position = failure.position(),
                    iterations = count,
                    "repetition stopped"
                );
                return Ok(count);
            }
        }
    }
}

/// ZeroMore: Matches the parser as many times as possible, zero included
pub struct ZeroMore<P> {
    parser: P,
}

impl<P> ZeroMore<P> {
    pub fn new(parser: P) -> Self {
        Self { parser }
    }
}

impl<P: Parser> Parser for ZeroMore<P> {
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        repeat_until_failure(&self.parser, ctx)?;
        Ok(Outcome::Success)
    }

    fn describe(&self) -> String {
        format!("ZeroMore({})", self.parser.describe())
    }
}

/// OneMore: Matches the parser as many times as possible, at least once
pub struct OneMore<P> {
    parser: P,
}

impl<P> OneMore<P> {
    pub fn new(parser: P) -> Self {
        Self { parser }
    }
}

impl<P: Parser> Parser for OneMore<P> {
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        let before = ctx.pos();
        match self.parser.parse(ctx)? {
            Outcome::Failure(failure) => Ok(Outcome::Failure(failure)),
            Outcome::Success if ctx.pos() == before => Ok(Outcome::Success),
            Outcome::Success => {
                repeat_until_failure(&self.parser, ctx)?;
                Ok(Outcome::Success)
            }
        }
    }

    fn describe(&self) -> String {
        format!("OneMore({})", self.parser.describe())
    }
}

/// Repeat: Matches the parser exactly `count` times
pub struct Repeat<P> {
    count: usize,
    parser: P,
}

impl<P> Repeat<P> {
    pub fn new(count: usize, parser: P) -> Self {
        Self { count, parser }
    }
}

impl<P: Parser> Parser for Repeat<P> {
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        let snapshot = ctx.snapshot();
        for _ in 0..self.count {
            if let Outcome::Failure(failure) = self.parser.parse(ctx)? {
                ctx.restore(&snapshot);
                return Ok(Outcome::Failure(failure));
            }
        }
        Ok(Outcome::Success)
    }

    fn describe(&self) -> String {
        format!("Repeat({}, {})", self.count, self.parser.describe())
    }
}

/// Ahead: Succeeds iff the parser matches, without consuming anything
pub struct Ahead<P> {
    parser: P,
}

impl<P> Ahead<P> {
    pub fn new(parser: P) -> Self {
        Self { parser }
    }
}

impl<P: Parser> Parser for Ahead<P> {
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        let snapshot = ctx.snapshot();
        let outcome = self.parser.parse(ctx)?;
        if outcome.is_success() {
            ctx.restore(&snapshot);
        }
        Ok(outcome)
    }

    fn describe(&self) -> String {
        format!("Ahead({})", self.parser.describe())
    }
}

/// Not: Succeeds iff the parser fails, without consuming anything
pub struct Not<P> {
    parser: P,
    label: Rc<str>,
}

impl<P: Parser> Not<P> {
    pub fn new(parser: P) -> Self {
        let label = Rc::from(parser.describe());
        Self { parser, label }
    }
}

impl<P: Parser> Parser for Not<P> {
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        let snapshot = ctx.snapshot();
        // the child failing is the expected case, so its failures are no
        // candidates for the furthest failure
        match ctx.without_recording(|ctx| self.parser.parse(ctx))? {
            Outcome::Success => {
                ctx.restore(&snapshot);
                let label = self.label.clone();
                ctx.fail(move || format!("{} unexpectedly succeeded", label))
            }
            Outcome::Failure(_) => Ok(Outcome::Success),
        }
    }

    fn describe(&self) -> String {
        format!("Not({})", self.label)
    }
}

/// Until: Repeats `repeat` until `until` matches
///
/// The terminator is tried before each repetition. With `match_until` the
/// terminator's match is part of the consumed range, otherwise the parse
/// stops right before it. With `match_some` at least one repetition is
/// required.
pub struct Until<R, U> {
    repeat: R,
    until: U,
    match_until: bool,
    match_some: bool,
    until_label: Rc<str>,
}

impl<R: Parser, U: Parser> Until<R, U> {
    /// Creates a new Until parser
    ///
    /// # Arguments
    ///
    /// * `repeat` - The parser matched between terminator attempts
    /// * `until` - The terminator
    /// * `match_until` - Whether the terminator's match is consumed
    /// * `match_some` - Whether at least one repetition is required
    pub fn new(repeat: R, until: U, match_until: bool, match_some: bool) -> Self {
        let until_label = Rc::from(until.describe());
        Self {
            repeat,
            until,
            match_until,
            match_some,
            until_label,
        }
    }
}

impl<R: Parser, U: Parser> Parser for Until<R, U> {
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        let initial = ctx.snapshot();
        let mut count = 0;

        loop {
            let before_until = (!self.match_until).then(|| ctx.snapshot());
            let until_failure = match self.until.parse(ctx)? {
                Outcome::Success => {
                    if let Some(snapshot) = before_until {
                        ctx.restore(&snapshot);
                    }
                    break;
                }
                Outcome::Failure(failure) => failure,
            };
            let before_repeat = ctx.pos();
            match self.repeat.parse(ctx)? {
                // a zero-width item would be tried forever
                Outcome::Success if ctx.pos() == before_repeat => {
                    ctx.restore(&initial);
                    return Ok(Outcome::Failure(until_failure));
                }
                Outcome::Success => count += 1,
                Outcome::Failure(repeat_failure) => {
                    ctx.restore(&initial);
                    let failure = Furthest::max_failure(until_failure, repeat_failure);
                    return Ok(Outcome::Failure(failure));
                }
            }
        }

        if self.match_some && count == 0 {
            ctx.restore(&initial);
            let label = self.until_label.clone();
            return ctx.fail(move || format!("expected at least one item before {}", label));
        }
        Ok(Outcome::Success)
    }

    fn describe(&self) -> String {
        format!("Until({}, {})", self.repeat.describe(), self.until_label)
    }
}

/// Around: Items separated by a separator
///
/// Each separator and the item after it are matched as a unit: if the item
/// fails, the separator is given back and the items matched so far stand.
pub struct Around<P, S> {
    item: P,
    separator: S,
    at_least_one: bool,
}

impl<P, S> Around<P, S> {
    /// Zero or more items.
    pub fn new(item: P, separator: S) -> Self {
        Self {
            item,
            separator,
            at_least_one: false,
        }
    }

    /// One or more items.
    pub fn at_least_one(item: P, separator: S) -> Self {
        Self {
            item,
            separator,
            at_least_one: true,
        }
    }
}

impl<P: Parser, S: Parser> Parser for Around<P, S> {
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        if let Outcome::Failure(failure) = self.item.parse(ctx)? {
            return Ok(if self.at_least_one {
                Outcome::Failure(failure)
            } else {
                Outcome::Success
            });
        }

        loop {
            let snapshot = ctx.snapshot();
            let before = ctx.pos();
            if self.separator.parse(ctx)?.is_failure() {
                break;
            }
            match self.item.parse(ctx)? {
                Outcome::Failure(_) => {
                    ctx.restore(&snapshot);
                    break;
                }
                Outcome::Success if ctx.pos() == before => break,
                Outcome::Success => {}
            }
        }
        Ok(Outcome::Success)
    }

    fn describe(&self) -> String {
        let name = if self.at_least_one { "Around1" } else { "Around" };
        format!(
            "{}({}, {})",
            name,
            self.item.describe(),
            self.separator.describe()
        )
    }
}
