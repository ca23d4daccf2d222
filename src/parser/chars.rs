//! # Character Parsers
//!
//! Leaf parsers that match characters of the input directly. Positions are
//! byte offsets, so a match advances by the UTF-8 length of what it consumed.

use std::rc::Rc;

use super::core::{ParseResult, Parser};
use crate::context::Context;
use crate::result::Outcome;

fn match_char<F>(ctx: &mut Context, accept: F, expected: &Rc<str>) -> ParseResult
where
    F: Fn(char) -> bool,
{
    match ctx.peek_char() {
        Some(c) if accept(c) => {
            ctx.advance(c.len_utf8());
            Ok(Outcome::Success)
        }
        _ => {
            let expected = expected.clone();
            ctx.fail(move || format!("expected {}", expected))
        }
    }
}

/// AnyChar: Matches any single character
#[derive(Clone, Default)]
pub struct AnyChar;

impl AnyChar {
    pub fn new() -> Self {
        Self
    }
}

impl Parser for AnyChar {
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        match ctx.peek_char() {
            Some(c) => {
                ctx.advance(c.len_utf8());
                Ok(Outcome::Success)
            }
            None => ctx.fail(|| "expected any character, found end of input".to_string()),
        }
    }

    fn describe(&self) -> String {
        "AnyChar".to_string()
    }
}

/// CharPred: Matches a single character satisfying a predicate
pub struct CharPred<F> {
    predicate: F,
    label: Rc<str>,
}

impl<F> CharPred<F>
where
    F: Fn(char) -> bool,
{
    pub fn new(predicate: F) -> Self {
        Self::named("character matching predicate", predicate)
    }

    /// Creates a predicate parser that names what it expects in failures.
    pub fn named(label: &str, predicate: F) -> Self {
        Self {
            predicate,
            label: Rc::from(label),
        }
    }
}

impl<F> Parser for CharPred<F>
where
    F: Fn(char) -> bool,
{
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        match_char(ctx, &self.predicate, &self.label)
    }

    fn describe(&self) -> String {
        format!("CharPred({})", self.label)
    }
}

/// CharRange: Matches a single character in an inclusive range
#[derive(Clone)]
pub struct CharRange {
    start: char,
    end: char,
    label: Rc<str>,
}

impl CharRange {
    pub fn new(start: char, end: char) -> Self {
        let label = Rc::from(format!("character in {:?}..={:?}", start, end));
        Self { start, end, label }
    }
}

impl Parser for CharRange {
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        match_char(ctx, |c| (self.start..=self.end).contains(&c), &self.label)
    }

    fn describe(&self) -> String {
        format!("CharRange({:?}, {:?})", self.start, self.end)
    }
}

/// CharSet: Matches a single character from a set
#[derive(Clone)]
pub struct CharSet {
    chars: Vec<char>,
    label: Rc<str>,
}

impl CharSet {
    pub fn new(chars: &str) -> Self {
        Self {
            chars: chars.chars().collect(),
            label: Rc::from(format!("one of {:?}", chars)),
        }
    }
}

impl Parser for CharSet {
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        match_char(ctx, |c| self.chars.contains(&c), &self.label)
    }

    fn describe(&self) -> String {
        let chars: String = self.chars.iter().collect();
        format!("CharSet({:?})", chars)
    }
}

/// Str: Matches a literal string
#[derive(Clone)]
pub struct Str {
    text: Rc<str>,
}

impl Str {
    pub fn new(text: &str) -> Self {
        Self {
            text: Rc::from(text),
        }
    }
}

impl Parser for Str {
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        if ctx.rest().starts_with(&*self.text) {
            ctx.advance(self.text.len());
            return Ok(Outcome::Success);
        }
        let text = self.text.clone();
        ctx.fail(move || format!("expected {:?}", &*text))
    }

    fn describe(&self) -> String {
        format!("Str({:?})", &*self.text)
    }
}
