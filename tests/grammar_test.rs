mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pretty_assertions::assert_eq;
use seedling::parser::prelude::*;
use seedling::{
    parse, parse_prefix, Abort, Context, CopyState, Failure, Grammar, Inert, MapState, Outcome,
    ParseConfig, Parser,
};

fn digits() -> impl seedling::Parser {
    one_more(char_range('0', '9'))
}

#[test]
fn test_full_match_versus_prefix() {
    assert_eq!(parse(&digits(), "123"), Outcome::Success);
    assert_eq!(parse_prefix(&digits(), "12a"), Outcome::Success);

    // the digit parser failing at the `a` is the furthest failure
    let failure = parse(&digits(), "12a").into_failure().unwrap();
    assert_eq!(failure.position(), 2);
    assert_eq!(failure.message(), "expected character in '0'..='9'");
}

#[test]
fn test_input_remaining_failure() {
    let failure = parse(&literal("ab"), "ab\ncd").into_failure().unwrap();
    assert_eq!(failure.position(), 2);
    assert_eq!(failure.message(), "input remaining, matched up to 1:3");
}

#[test]
fn test_furthest_failure_is_reported() {
    let keyword = choice(vec![
        Box::new(seq(vec![Box::new(literal("let")), Box::new(literal(" x"))])),
        Box::new(literal("l")),
    ]);
    let failure = parse(&keyword, "let y").into_failure().unwrap();
    assert_eq!(failure.position(), 3);
    assert_eq!(failure.message(), r#"expected " x""#);
}

#[test]
fn test_panic_parser_escapes_choice() {
    let parser = choice(vec![
        Box::new(seq(vec![
            Box::new(literal("(")),
            Box::new(or_fail(literal(")"), "unclosed paren")),
        ])),
        Box::new(literal("(")),
    ]);
    assert!(parse_prefix(&parser, "(").is_success());

    let parser = choice(vec![
        Box::new(seq(vec![
            Box::new(literal("(")),
            Box::new(choice(vec![
                Box::new(literal(")")),
                Box::new(panic_with("unclosed paren")),
            ])),
        ])),
        Box::new(literal("(")),
    ]);
    let failure = parse_prefix(&parser, "(").into_failure().unwrap();
    assert_eq!(failure.position(), 1);
    assert_eq!(failure.message(), "unclosed paren");
}

#[test]
fn test_chill_turns_panic_into_failure() {
    let parser = choice(vec![
        Box::new(chill(seq(vec![
            Box::new(literal("(")),
            Box::new(paranoid(literal(")"))),
        ]))),
        Box::new(literal("(")),
    ]);
    let mut ctx = Context::new("(");
    assert_eq!(parser.parse(&mut ctx).unwrap(), Outcome::Success);
    assert_eq!(ctx.pos(), 1);
}

#[test]
fn test_rust_panic_becomes_failure() {
    let boom = parser_fn("boom", |_: &mut Context| -> seedling::ParseResult {
        panic!("boom");
    });
    let parser = seq(vec![Box::new(literal("a")), Box::new(boom)]);

    let failure = parse(&parser, "ab").into_failure().unwrap();
    let cause = failure
        .debug_info()
        .and_then(|info| info.cause.clone())
        .unwrap();
    assert!(cause.contains("boom"), "cause: {}", cause);
}

#[test]
#[should_panic(expected = "boom")]
fn test_rust_panic_propagates_when_not_caught() {
    let boom = parser_fn("boom", |_: &mut Context| -> seedling::ParseResult {
        panic!("boom");
    });
    let config = ParseConfig {
        catch_panics: false,
        ..ParseConfig::default()
    };
    let mut ctx = Context::builder("a").config(config).build();
    let _ = seedling::run(&boom, &mut ctx);
}

#[test]
fn test_raised_abort_carries_cause() {
    let parser = seq(vec![
        Box::new(literal("a")),
        Box::new(perform(|_: &mut Context| Err(Abort::raised("bad action")))),
    ]);
    let failure = parse(&parser, "a").into_failure().unwrap();
    assert_eq!(failure.message(), "bad action");
    assert_eq!(
        failure.debug_info().and_then(|info| info.cause.as_deref()),
        Some("bad action")
    );
}

fn bump() -> impl seedling::Parser {
    perform(|ctx: &mut Context| {
        let state = ctx
            .state_mut::<CopyState<u32>>()
            .ok_or_else(|| Abort::raised("counter state missing"))?;
        let next = *state.get() + 1;
        state.set(next);
        Ok(())
    })
}

#[test]
fn test_user_state_backtracks() {
    let mut grammar = Grammar::builder();
    grammar
        .rule(
            "start",
            choice(vec![
                Box::new(seq(vec![Box::new(bump()), Box::new(literal("x"))])),
                Box::new(literal("y")),
            ]),
        )
        .state(|| CopyState::new(0u32));
    let grammar = grammar.build().unwrap();

    let mut ctx = grammar.context("y");
    assert_eq!(grammar.run(&mut ctx), Outcome::Success);
    assert_eq!(ctx.state::<CopyState<u32>>().map(|s| *s.get()), Some(0));

    let mut ctx = grammar.context("x");
    assert_eq!(grammar.run(&mut ctx), Outcome::Success);
    assert_eq!(ctx.state::<CopyState<u32>>().map(|s| *s.get()), Some(1));
}

#[test]
fn test_user_state_grows_with_left_recursion() {
    // L := L ',' item | item, where every item bumps the counter
    let mut grammar = Grammar::builder();
    let list = grammar.reference("L");
    let item = || seq(vec![Box::new(char_range('a', 'z')), Box::new(bump())]);
    grammar
        .rule(
            "L",
            choice(vec![
                Box::new(seq(vec![
                    Box::new(list),
                    Box::new(literal(",")),
                    Box::new(item()),
                ])),
                Box::new(item()),
            ]),
        )
        .state(|| CopyState::new(0u32));
    let grammar = grammar.build().unwrap();

    let mut ctx = grammar.context("a,b,c");
    assert_eq!(grammar.run(&mut ctx), Outcome::Success);
    assert_eq!(ctx.state::<CopyState<u32>>().map(|s| *s.get()), Some(3));
}

#[test]
fn test_inert_state_survives_backtracking() {
    let attempts = perform(|ctx: &mut Context| {
        if let Some(seen) = ctx.state_mut::<Inert<Vec<usize>>>() {
            seen.get_mut().push(0);
        }
        Ok(())
    });
    let parser = choice(vec![
        Box::new(seq(vec![Box::new(attempts), Box::new(literal("x"))])),
        Box::new(literal("y")),
    ]);
    let mut ctx = Context::builder("y")
        .state(Inert::new(Vec::<usize>::new()))
        .build();
    assert_eq!(seedling::run(&parser, &mut ctx), Outcome::Success);
    assert_eq!(
        ctx.state::<Inert<Vec<usize>>>().map(|s| s.get().len()),
        Some(1)
    );
}

#[test]
fn test_predicate_and_dynamic() {
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let even_position = predicate("even position", |ctx: &Context| ctx.pos() % 2 == 0);
    let echo = dynamic(move |ctx: &Context| {
        counter.set(counter.get() + 1);
        let first = ctx.input().chars().next().unwrap_or('?').to_string();
        Box::new(literal(&first)) as Box<dyn seedling::Parser>
    });
    let parser = seq(vec![
        Box::new(any_char()),
        Box::new(any_char()),
        Box::new(even_position),
        Box::new(echo),
    ]);

    assert!(parse(&parser, "aba").is_success());
    assert!(parse(&parser, "abb").is_failure());
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_debug_failures_carry_snapshot_and_trace() {
    let mut grammar = Grammar::builder();
    let word = grammar.reference("word");
    grammar
        .rule("sentence", seq(vec![Box::new(word), Box::new(literal("!"))]))
        .rule("word", one_more(char_range('a', 'z')))
        .config(r#"{"debug": true}"#.parse::<ParseConfig>().unwrap());
    let grammar = grammar.build().unwrap();

    let failure = grammar.parse("hi?").into_failure().unwrap();
    assert_eq!(failure.position(), 2);
    let info = failure.debug_info().unwrap();
    assert_eq!(info.snapshot.position(), 2);
    let trace: Vec<&str> = info.trace.iter().map(|name| &**name).collect();
    assert_eq!(trace.first(), Some(&"sentence"));
}

#[test]
fn test_failure_positions_are_comparable() {
    let failure = parse(&literal("abc"), "abd").into_failure().unwrap();
    assert_eq!(failure, Failure::with_message(0, "anything"));
}

#[test]
fn test_negative_lookahead_does_not_report_inner_failure() {
    let parser = seq(vec![
        Box::new(literal("a")),
        Box::new(not(seq(vec![Box::new(literal("b")), Box::new(literal("c"))]))),
    ]);
    let failure = parse(&parser, "abd").into_failure().unwrap();
    assert_eq!(failure.position(), 1);
    assert_eq!(failure.message(), "input remaining, matched up to 1:2");
}

/// `sum := sum '+' num | num`, with blanks after every token that never
/// show up in failure reports.
fn spaced_sum() -> Grammar {
    let blanks = || dont_record_failures(zero_more(char_set(" \t")));
    let number = || seq(vec![Box::new(one_more(char_range('0', '9'))), Box::new(blanks())]);
    let mut grammar = Grammar::builder();
    let sum = grammar.reference("sum");
    grammar
        .rule("input", seq(vec![Box::new(blanks()), Box::new(sum.clone())]))
        .rule(
            "sum",
            choice(vec![
                Box::new(seq(vec![
                    Box::new(sum),
                    Box::new(seq(vec![Box::new(literal("+")), Box::new(blanks())])),
                    Box::new(number()),
                ])),
                Box::new(number()),
            ]),
        );
    grammar.build().unwrap()
}

#[test]
fn test_blank_failures_are_not_reported() {
    let grammar = spaced_sum();
    assert!(grammar.parse("1 + 2").is_success());

    let failure = grammar.parse("1 + 2 x").into_failure().unwrap();
    assert_eq!(failure.position(), 6);
    assert_eq!(failure.message(), r#"expected "+""#);
}

#[test]
fn test_empty_input_reports_base_case() {
    let failure = spaced_sum().parse("").into_failure().unwrap();
    assert_eq!(failure.position(), 0);
    assert_eq!(failure.message(), "expected character in '0'..='9'");
}

#[test]
fn test_chill_truncates_rule_trace() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let record = seen.clone();
    let mut grammar = Grammar::builder();
    let inner = grammar.reference("inner");
    grammar
        .rule(
            "outer",
            choice(vec![
                Box::new(chill(inner)),
                Box::new(perform(move |ctx: &mut Context| {
                    record.replace(ctx.trace().iter().map(|name| name.to_string()).collect());
                    Ok(())
                })),
            ]),
        )
        .rule("inner", panic_with("deep"))
        .config(ParseConfig::debug());
    let grammar = grammar.build().unwrap();

    let mut ctx = grammar.context("");
    assert_eq!(grammar.run(&mut ctx), Outcome::Success);
    assert_eq!(*seen.borrow(), vec!["outer".to_string()]);
    assert!(ctx.trace().is_empty());
}

#[test]
fn test_catch_stops_raised_abort() {
    let parser = choice(vec![
        Box::new(catch(seq(vec![
            Box::new(literal("a")),
            Box::new(perform(|_: &mut Context| Err(Abort::raised("bad action")))),
        ]))),
        Box::new(literal("ab")),
    ]);
    assert!(parse(&parser, "ab").is_success());
}

#[test]
fn test_bounded_reports_enclosing_position() {
    // two digits, then checked again by a stricter parser over just them
    let digits = repeat(2, char_range('0', '9'));
    let low = seq(vec![Box::new(char_range('0', '4')), Box::new(char_range('0', '4'))]);
    let parser = seq(vec![Box::new(literal("n=")), Box::new(bounded(digits, low))]);

    assert!(parse(&parser, "n=34").is_success());
    let failure = parse(&parser, "n=37").into_failure().unwrap();
    assert_eq!(failure.position(), 3);
    assert_eq!(failure.message(), "expected character in '0'..='4'");
}

#[test]
fn test_map_state_scopes_backtrack() {
    let declare = |name: &'static str| {
        perform(move |ctx: &mut Context| {
            let scope = ctx
                .state_mut::<MapState<&'static str, u32>>()
                .ok_or_else(|| Abort::raised("scope missing"))?;
            scope.insert(name, 1);
            Ok(())
        })
    };
    let parser = choice(vec![
        Box::new(seq(vec![Box::new(declare("x")), Box::new(literal("x;"))])),
        Box::new(seq(vec![Box::new(declare("y")), Box::new(literal("y;"))])),
    ]);
    let mut ctx = Context::builder("y;")
        .state(MapState::<&'static str, u32>::new())
        .build();
    assert_eq!(parser.parse(&mut ctx).unwrap(), Outcome::Success);

    let scope = ctx.state::<MapState<&'static str, u32>>().unwrap();
    assert_eq!(scope.len(), 1);
    assert!(scope.contains_key(&"y"));
}
