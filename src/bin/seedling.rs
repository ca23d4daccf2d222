use clap::Parser;
use seedling::parser::prelude::*;
use seedling::{
    Abort, Context, Error, Grammar, GrammarError, InternalResult, Outcome, ParseConfig,
};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Evaluates arithmetic expressions with a left-recursive grammar.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Expression to evaluate
    expression: Option<String>,

    /// Read the expression from a file instead
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a JSON parse config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Attach debug information to failures
    #[arg(short, long)]
    debug: bool,

    /// Accept trailing input after the expression
    #[arg(short, long)]
    prefix: bool,
}

fn spaces() -> impl seedling::Parser {
    dont_record_failures(zero_more(char_set(" \t\r\n")))
}

fn token(text: &str) -> impl seedling::Parser {
    seq(vec![Box::new(literal(text)), Box::new(spaces())])
}

fn number() -> impl seedling::Parser {
    let digits = parser_fn("number", |ctx: &mut Context| {
        let rest = ctx.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        match rest[..len].parse::<f64>() {
            Ok(value) => {
                ctx.advance(len);
                ctx.push(value);
                Ok(Outcome::Success)
            }
            Err(_) => ctx.fail(|| "expected a number".to_string()),
        }
    });
    seq(vec![Box::new(digits), Box::new(spaces())])
}

/// Pops two operands and pushes `op` applied to them.
fn apply(op: fn(f64, f64) -> f64) -> impl seedling::Parser {
    perform(move |ctx: &mut Context| {
        let rhs = ctx.pop_as::<f64>();
        let lhs = ctx.pop_as::<f64>();
        match (lhs, rhs) {
            (Some(lhs), Some(rhs)) => {
                ctx.push(op(*lhs, *rhs));
                Ok(())
            }
            _ => Err(Abort::raised("operand missing from the value stack")),
        }
    })
}

fn calculator(config: ParseConfig) -> Result<Grammar, GrammarError> {
    let mut grammar = Grammar::builder();
    let expr = grammar.reference("expr");
    let term = grammar.reference("term");
    let factor = grammar.reference("factor");

    grammar
        .rule("input", seq(vec![Box::new(spaces()), Box::new(expr.clone())]))
        .rule(
            "expr",
            choice(vec![
                Box::new(seq(vec![
                    Box::new(expr.clone()),
                    Box::new(token("+")),
                    Box::new(term.clone()),
                    Box::new(apply(|a, b| a + b)),
                ])),
                Box::new(seq(vec![
                    Box::new(expr.clone()),
                    Box::new(token("-")),
                    Box::new(term.clone()),
                    Box::new(apply(|a, b| a - b)),
                ])),
                Box::new(term.clone()),
            ]),
        )
        .rule(
            "term",
            choice(vec![
                Box::new(seq(vec![
                    Box::new(term.clone()),
                    Box::new(token("*")),
                    Box::new(factor.clone()),
                    Box::new(apply(|a, b| a * b)),
                ])),
                Box::new(seq(vec![
                    Box::new(term.clone()),
                    Box::new(token("/")),
                    Box::new(factor.clone()),
                    Box::new(apply(|a, b| a / b)),
                ])),
                Box::new(factor),
            ]),
        )
        .rule(
            "factor",
            choice(vec![
                Box::new(number()),
                Box::new(seq(vec![
                    Box::new(token("(")),
                    Box::new(expr),
                    Box::new(token(")")),
                ])),
            ]),
        )
        .config(config);
    grammar.build()
}

fn run(cli: &Cli) -> InternalResult<bool> {
    let mut config = match &cli.config {
        Some(path) => ParseConfig::from_file(path)?,
        None => ParseConfig::default(),
    };
    if cli.debug {
        config.debug = true;
    }
    info!("config loaded.");
    debug!("config: {:?}", config);

    let input = match (&cli.expression, &cli.file) {
        (Some(expression), _) => expression.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => return Err(Error::config("no expression given, pass one or use --file")),
    };

    let grammar = calculator(config)?;
    debug!("grammar: {:?}", grammar);

    let mut ctx = grammar.context(&input);
    let outcome = if cli.prefix {
        grammar.run_prefix(&mut ctx)
    } else {
        grammar.run(&mut ctx)
    };

    match outcome {
        Outcome::Success => {
            match ctx.peek_as::<f64>() {
                Some(value) => println!("{}", value),
                None => println!("matched without a value"),
            }
            if ctx.pos() < input.len() {
                println!("stopped at {}", ctx.position_string(ctx.pos()));
            }
            Ok(true)
        }
        Outcome::Failure(failure) => {
            eprintln!(
                "{}: {}",
                ctx.position_string(failure.position()),
                failure.message()
            );
            if let Some(info) = failure.debug_info() {
                if !info.trace.is_empty() {
                    eprintln!("  in: {}", info.trace.join(" > "));
                }
                if let Some(cause) = &info.cause {
                    eprintln!("  cause: {}", cause);
                }
                eprintln!("  state: {:?}", info.snapshot);
            }
            Ok(false)
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
