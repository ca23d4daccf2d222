//! # Core Parser Definitions
//!
//! This module defines the parser interface and the abort signal that
//! unwinds through it.

use std::rc::Rc;

use thiserror::Error;

use crate::context::Context;
use crate::error::{GrammarError, StateError};
use crate::result::{Failure, Outcome};

/// Parser trait defines the core parsing interface.
///
/// A parser attempts a match against the context. On [`Outcome::Success`]
/// the position has advanced past the match (zero-width matches are legal)
/// and any values pushed are kept. On [`Outcome::Failure`] the context must
/// be observably the same as before the call.
///
/// `Err(Abort)` skips all of that: it travels up through every combinator
/// without any restore and is only stopped by [`crate::Chill`] or by a
/// parse entry point.
pub trait Parser {
    /// Attempts to match at the context's current position.
    fn parse(&self, ctx: &mut Context) -> ParseResult;

    /// Short human-readable description, used in failure messages and logs.
    fn describe(&self) -> String {
        let name = std::any::type_name::<Self>();
        let name = name.split('<').next().unwrap_or(name);
        name.rsplit("::").next().unwrap_or(name).to_string()
    }
}

/// Result type for parsing operations.
pub type ParseResult = Result<Outcome, Abort>;

/// Non-local exit from a parse.
#[derive(Error, Debug, Clone)]
pub enum Abort {
    /// Raised deliberately by grammar code.
    #[error("parse panicked: {0}")]
    Panic(Failure),
    #[error("inconsistent parser state: {0}")]
    State(#[from] StateError),
    #[error("grammar error: {0}")]
    Grammar(#[from] GrammarError),
    /// An error reported by user parser code.
    #[error("{0}")]
    Raised(String),
}

impl Abort {
    pub fn raised<S: Into<String>>(message: S) -> Self {
        Abort::Raised(message.into())
    }
}

impl<P: Parser + ?Sized> Parser for Box<P> {
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        (**self).parse(ctx)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<P: Parser + ?Sized> Parser for Rc<P> {
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        (**self).parse(ctx)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<P: Parser + ?Sized> Parser for &P {
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        (**self).parse(ctx)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
