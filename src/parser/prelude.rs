use super::chars::*;
use super::combinators::*;
use super::control::*;
use super::core::{Abort, ParseResult, Parser};
use crate::context::Context;
use crate::result::Failure;

pub fn seq(parsers: Vec<Box<dyn Parser>>) -> Seq {
    Seq::new(parsers)
}

pub fn choice(parsers: Vec<Box<dyn Parser>>) -> Choice {
    Choice::new(parsers)
}

pub fn longest(parsers: Vec<Box<dyn Parser>>) -> Longest {
    Longest::new(parsers)
}

pub fn optional<P: Parser>(parser: P) -> Optional<P> {
    Optional::new(parser)
}

pub fn zero_more<P: Parser>(parser: P) -> ZeroMore<P> {
    ZeroMore::new(parser)
}

pub fn one_more<P: Parser>(parser: P) -> OneMore<P> {
    OneMore::new(parser)
}

pub fn repeat<P: Parser>(count: usize, parser: P) -> Repeat<P> {
    Repeat::new(count, parser)
}

pub fn ahead<P: Parser>(parser: P) -> Ahead<P> {
    Ahead::new(parser)
}

pub fn not<P: Parser>(parser: P) -> Not<P> {
    Not::new(parser)
}

pub fn until<R: Parser, U: Parser>(
    repeat: R,
    until: U,
    match_until: bool,
    match_some: bool,
) -> Until<R, U> {
    Until::new(repeat, until, match_until, match_some)
}

pub fn around<P: Parser, S: Parser>(item: P, separator: S) -> Around<P, S> {
    Around::new(item, separator)
}

pub fn around1<P: Parser, S: Parser>(item: P, separator: S) -> Around<P, S> {
    Around::at_least_one(item, separator)
}

pub fn any_char() -> AnyChar {
    AnyChar::new()
}

pub fn char_pred<F>(label: &str, predicate: F) -> CharPred<F>
where
    F: Fn(char) -> bool,
{
    CharPred::named(label, predicate)
}

pub fn char_range(start: char, end: char) -> CharRange {
    CharRange::new(start, end)
}

pub fn char_set(chars: &str) -> CharSet {
    CharSet::new(chars)
}

pub fn literal(text: &str) -> Str {
    Str::new(text)
}

pub fn succeed() -> Succeed {
    Succeed
}

pub fn fail(message: &str) -> Fail {
    Fail::new(message)
}

pub fn or_fail<P: Parser>(parser: P, message: &str) -> OrFail<P> {
    OrFail::new(parser, message)
}

pub fn panic_with(message: &str) -> PanicParser {
    PanicParser::new(message)
}

pub fn paranoid<P: Parser>(parser: P) -> Paranoid<P> {
    Paranoid::new(parser)
}

pub fn chill<P: Parser>(parser: P) -> Chill<P, fn(&Failure) -> bool> {
    Chill::new(parser)
}

pub fn chill_when<P, F>(parser: P, filter: F) -> Chill<P, F>
where
    P: Parser,
    F: Fn(&Failure) -> bool,
{
    Chill::when(parser, filter)
}

pub fn catch<P: Parser>(parser: P) -> Catch<P, fn(&Abort) -> bool> {
    Catch::new(parser)
}

pub fn catch_when<P, F>(parser: P, filter: F) -> Catch<P, F>
where
    P: Parser,
    F: Fn(&Abort) -> bool,
{
    Catch::when(parser, filter)
}

pub fn dont_record_failures<P: Parser>(parser: P) -> DontRecordFailures<P> {
    DontRecordFailures::new(parser)
}

pub fn bounded<S: Parser, A: Parser>(source: S, around: A) -> Bounded<S, A> {
    Bounded::new(source, around)
}

pub fn predicate<F>(label: &str, test: F) -> Predicate<F>
where
    F: Fn(&Context) -> bool,
{
    Predicate::new(label, test)
}

pub fn perform<F>(action: F) -> Perform<F>
where
    F: Fn(&mut Context) -> Result<(), Abort>,
{
    Perform::new(action)
}

pub fn dynamic<F>(generator: F) -> Dynamic<F>
where
    F: Fn(&Context) -> Box<dyn Parser>,
{
    Dynamic::new(generator)
}

pub fn traced<P: Parser>(name: &str, parser: P) -> Traced<P> {
    Traced::new(name, parser)
}

pub fn parser_fn<F>(name: &str, f: F) -> FnParser<F>
where
    F: Fn(&mut Context) -> ParseResult,
{
    FnParser::new(name, f)
}
