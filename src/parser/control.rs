//! # Control Parsers
//!
//! Parsers that steer a parse rather than match text: forced outcomes,
//! panics and the combinator that catches them, predicates over the
//! context, side-effecting actions, parsers chosen at parse time, and
//! tracing wrappers.

use std::rc::Rc;

use super::core::{Abort, ParseResult, Parser};
use crate::context::Context;
use crate::result::{Failure, Outcome};

/// Succeed: Always succeeds without consuming input
#[derive(Clone, Default)]
pub struct Succeed;

impl Parser for Succeed {
    fn parse(&self, _ctx: &mut Context) -> ParseResult {
        Ok(Outcome::Success)
    }
}

/// Fail: Always fails with the given message
#[derive(Clone)]
pub struct Fail {
    message: Rc<str>,
}

impl Fail {
    pub fn new(message: &str) -> Self {
        Self {
            message: Rc::from(message),
        }
    }
}

impl Parser for Fail {
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        let message = self.message.clone();
        ctx.fail(move || message.to_string())
    }

    fn describe(&self) -> String {
        format!("Fail({:?})", &*self.message)
    }
}

/// OrFail: Replaces the parser's failure with a fixed message
///
/// The failure is reported at the position where the parser started.
pub struct OrFail<P> {
    parser: P,
    message: Rc<str>,
}

impl<P> OrFail<P> {
    pub fn new(parser: P, message: &str) -> Self {
        Self {
            parser,
            message: Rc::from(message),
        }
    }
}

impl<P: Parser> Parser for OrFail<P> {
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        match self.parser.parse(ctx)? {
            Outcome::Success => Ok(Outcome::Success),
            Outcome::Failure(_) => {
                let message = self.message.clone();
                ctx.fail(move || message.to_string())
            }
        }
    }

    fn describe(&self) -> String {
        format!("OrFail({})", self.parser.describe())
    }
}

/// PanicParser: Aborts the parse with a failure at the current position
///
/// The abort skips every enclosing combinator up to the nearest [`Chill`]
/// or the parse entry point.
#[derive(Clone)]
pub struct PanicParser {
    message: Rc<str>,
}

impl PanicParser {
    pub fn new(message: &str) -> Self {
        Self {
            message: Rc::from(message),
        }
    }
}

impl Parser for PanicParser {
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        let message = self.message.clone();
        Err(Abort::Panic(ctx.failure(move || message.to_string())))
    }

    fn describe(&self) -> String {
        format!("Panic({:?})", &*self.message)
    }
}

/// Paranoid: Turns the parser's failure into a panic
pub struct Paranoid<P> {
    parser: P,
}

impl<P> Paranoid<P> {
    pub fn new(parser: P) -> Self {
        Self { parser }
    }
}

impl<P: Parser> Parser for Paranoid<P> {
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        match self.parser.parse(ctx)? {
            Outcome::Success => Ok(Outcome::Success),
            Outcome::Failure(failure) => Err(Abort::Panic(failure)),
        }
    }

    fn describe(&self) -> String {
        format!("Paranoid({})", self.parser.describe())
    }
}

/// Chill: Catches panics raised inside the parser
///
/// A panic whose failure satisfies the filter is turned back into an
/// ordinary failure, after restoring the context to where the parser
/// started. Other aborts keep propagating.
pub struct Chill<P, F> {
    parser: P,
    filter: F,
}

impl<P> Chill<P, fn(&Failure) -> bool> {
    /// Catches every panic.
    pub fn new(parser: P) -> Self {
        Self {
            parser,
            filter: |_| true,
        }
    }
}

impl<P, F> Chill<P, F>
where
    F: Fn(&Failure) -> bool,
{
    /// Catches the panics whose failure satisfies `filter`.
    pub fn when(parser: P, filter: F) -> Self {
        Self { parser, filter }
    }
}

impl<P, F> Parser for Chill<P, F>
where
    P: Parser,
    F: Fn(&Failure) -> bool,
{
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        let snapshot = ctx.snapshot();
        let depth = ctx.trace_depth();
        match self.parser.parse(ctx) {
            Err(Abort::Panic(failure)) if (self.filter)(&failure) => {
                tracing::debug!(
                    target: "seedling::chill",
                    position = failure.position(),
                    restored_to = snapshot.position(),
                    "caught panic"
                );
                ctx.restore(&snapshot);
                ctx.truncate_trace(depth);
                ctx.record_failure(&failure);
                Ok(Outcome::Failure(failure))
            }
            other => other,
        }
    }

    fn describe(&self) -> String {
        format!("Chill({})", self.parser.describe())
    }
}

/// Catch: Turns aborts raised inside the parser into failures
///
/// Unlike [`Chill`], which only stops panics, any abort accepted by the
/// filter is caught: state errors, grammar errors and errors raised by
/// user code too. The context is restored to where the parser started and
/// the failure carries the abort as its debug cause.
pub struct Catch<P, F> {
    parser: P,
    filter: F,
}

impl<P> Catch<P, fn(&Abort) -> bool> {
    /// Catches every abort.
    pub fn new(parser: P) -> Self {
        Self {
            parser,
            filter: |_| true,
        }
    }
}

impl<P, F> Catch<P, F>
where
    F: Fn(&Abort) -> bool,
{
    /// Catches the aborts satisfying `filter`.
    pub fn when(parser: P, filter: F) -> Self {
        Self { parser, filter }
    }
}

impl<P, F> Parser for Catch<P, F>
where
    P: Parser,
    F: Fn(&Abort) -> bool,
{
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        let snapshot = ctx.snapshot();
        let depth = ctx.trace_depth();
        match self.parser.parse(ctx) {
            Err(abort) if (self.filter)(&abort) => {
                let pos = match &abort {
                    Abort::Panic(failure) => failure.position(),
                    _ => ctx.pos(),
                };
                let cause = abort.to_string();
                tracing::debug!(
                    target: "seedling::catch",
                    position = pos,
                    restored_to = snapshot.position(),
                    error = %cause,
                    "caught abort"
                );
                let info = ctx.debug_info(Some(cause.clone()));
                ctx.restore(&snapshot);
                ctx.truncate_trace(depth);
                let failure = Failure::new(pos, move || cause.clone()).with_debug(info);
                ctx.record_failure(&failure);
                Ok(Outcome::Failure(failure))
            }
            other => other,
        }
    }

    fn describe(&self) -> String {
        format!("Catch({})", self.parser.describe())
    }
}

/// DontRecordFailures: Hides the parser's failures from the furthest
/// failure record
///
/// Useful around whitespace and other filler whose failures say nothing
/// about what the input got wrong.
pub struct DontRecordFailures<P> {
    parser: P,
}

impl<P> DontRecordFailures<P> {
    pub fn new(parser: P) -> Self {
        Self { parser }
    }
}

impl<P: Parser> Parser for DontRecordFailures<P> {
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        ctx.without_recording(|ctx| self.parser.parse(ctx))
    }

    fn describe(&self) -> String {
        self.parser.describe()
    }
}

/// Bounded: Runs `around` over exactly the text matched by `source`
///
/// `around` runs in a fresh context over the matched text, sharing no
/// values or states with the enclosing one, and may match a prefix of it.
/// Its failures are reported at the corresponding position of the
/// enclosing input. Panics inside it become failures.
pub struct Bounded<S, A> {
    source: S,
    around: A,
}

impl<S, A> Bounded<S, A> {
    pub fn new(source: S, around: A) -> Self {
        Self { source, around }
    }
}

impl<S: Parser, A: Parser> Parser for Bounded<S, A> {
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        let snapshot = ctx.snapshot();
        let start = ctx.pos();
        if let Outcome::Failure(failure) = self.source.parse(ctx)? {
            return Ok(Outcome::Failure(failure));
        }

        let mut inner = Context::builder(ctx.text_from(start))
            .config(ctx.config().clone())
            .build();
        let inner_failure = match self.around.parse(&mut inner) {
            Ok(Outcome::Success) => return Ok(Outcome::Success),
            Ok(Outcome::Failure(failure)) | Err(Abort::Panic(failure)) => failure,
            Err(abort) => return Err(abort),
        };

        ctx.restore(&snapshot);
        let pos = start + inner_failure.position();
        Ok(Outcome::Failure(
            ctx.failure_at(pos, move || inner_failure.message()),
        ))
    }

    fn describe(&self) -> String {
        format!("Bounded({}, {})", self.source.describe(), self.around.describe())
    }
}

/// Predicate: Succeeds without consuming input iff the test holds
pub struct Predicate<F> {
    test: F,
    label: Rc<str>,
}

impl<F> Predicate<F>
where
    F: Fn(&Context) -> bool,
{
    pub fn new(label: &str, test: F) -> Self {
        Self {
            test,
            label: Rc::from(label),
        }
    }
}

impl<F> Parser for Predicate<F>
where
    F: Fn(&Context) -> bool,
{
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        if (self.test)(ctx) {
            return Ok(Outcome::Success);
        }
        let label = self.label.clone();
        ctx.fail(move || format!("predicate `{}` does not hold", label))
    }

    fn describe(&self) -> String {
        format!("Predicate({})", self.label)
    }
}

/// Perform: Runs an action on the context, then succeeds
///
/// Typically used to push or combine values on the value stack.
pub struct Perform<F> {
    action: F,
}

impl<F> Perform<F>
where
    F: Fn(&mut Context) -> Result<(), Abort>,
{
    pub fn new(action: F) -> Self {
        Self { action }
    }
}

impl<F> Parser for Perform<F>
where
    F: Fn(&mut Context) -> Result<(), Abort>,
{
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        (self.action)(ctx)?;
        Ok(Outcome::Success)
    }
}

/// Dynamic: Builds the parser to run from the context at parse time
pub struct Dynamic<F> {
    generator: F,
}

impl<F> Dynamic<F>
where
    F: Fn(&Context) -> Box<dyn Parser>,
{
    pub fn new(generator: F) -> Self {
        Self { generator }
    }
}

impl<F> Parser for Dynamic<F>
where
    F: Fn(&Context) -> Box<dyn Parser>,
{
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        let parser = (self.generator)(ctx);
        parser.parse(ctx)
    }
}

/// Traced: Logs entry into and exit from the parser
pub struct Traced<P> {
    name: Rc<str>,
    parser: P,
}

impl<P> Traced<P> {
    pub fn new(name: &str, parser: P) -> Self {
        Self {
            name: Rc::from(name),
            parser,
        }
    }
}

impl<P: Parser> Parser for Traced<P> {
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        let start = ctx.pos();
        tracing::debug!(
            target: "seedling::traced",
            parser = %self.name,
            position = %ctx.position_string(start),
            stack = ctx.stack().len(),
            "enter"
        );
        let result = self.parser.parse(ctx);
        match &result {
            Ok(Outcome::Success) => tracing::debug!(
                target: "seedling::traced",
                parser = %self.name,
                matched = ctx.text_from(start),
                stack = ctx.stack().len(),
                "success"
            ),
            Ok(Outcome::Failure(failure)) => tracing::debug!(
                target: "seedling::traced",
                parser = %self.name,
                failure = %failure,
                "failure"
            ),
            Err(abort) => tracing::debug!(
                target: "seedling::traced",
                parser = %self.name,
                error = %abort,
                "abort"
            ),
        }
        result
    }

    fn describe(&self) -> String {
        self.name.to_string()
    }
}

/// FnParser: A parser written as a closure
pub struct FnParser<F> {
    name: Rc<str>,
    f: F,
}

impl<F> FnParser<F>
where
    F: Fn(&mut Context) -> ParseResult,
{
    pub fn new(name: &str, f: F) -> Self {
        Self {
            name: Rc::from(name),
            f,
        }
    }
}

impl<F> Parser for FnParser<F>
where
    F: Fn(&mut Context) -> ParseResult,
{
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        (self.f)(ctx)
    }

    fn describe(&self) -> String {
        self.name.to_string()
    }
}
