//! # Grammars and Parse Entry Points
//!
//! A [`Grammar`] is a table of named [`Rule`]s, a root rule, the user states
//! its parsers need and a [`ParseConfig`]. Rules refer to each other through
//! [`Ref`]s obtained from the [`GrammarBuilder`] while the grammar is put
//! together; building the grammar wires every reference to its rule.
//!
//! The entry points ([`parse`], [`parse_prefix`], [`run`], [`run_prefix`]
//! and their [`Grammar`] counterparts) always return an [`Outcome`]: aborts
//! and panics escaping the root parser are converted into failures.

use std::any::Any;
use std::cell::OnceCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use tracing::{trace, warn};

use crate::config::ParseConfig;
use crate::context::{Context, LineMap};
use crate::error::GrammarError;
use crate::left_recursion::Ref;
use crate::parser::{Abort, ParseResult, Parser};
use crate::result::{Failure, Outcome};
use crate::state::{DynState, State};

/// A named parser.
///
/// In debug mode a rule records itself in the context's trace while it
/// runs. If the rule aborts it stays on the trace, so the failure built at
/// the entry point shows where the abort came from.
pub struct Rule {
    name: Rc<str>,
    body: Box<dyn Parser>,
}

impl Rule {
    pub fn new<P: Parser + 'static>(name: &str, body: P) -> Self {
        Self {
            name: Rc::from(name),
            body: Box::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Parser for Rule {
    fn parse(&self, ctx: &mut Context) -> ParseResult {
        ctx.enter_rule(&self.name);
        trace!(target: "seedling::rule", rule = %self.name, position = ctx.pos(), "enter");
        let outcome = self.body.parse(ctx)?;
        ctx.leave_rule();
        trace!(
            target: "seedling::rule",
            rule = %self.name,
            position = ctx.pos(),
            success = outcome.is_success(),
            "exit"
        );
        Ok(outcome)
    }

    fn describe(&self) -> String {
        self.name.to_string()
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

/// Creates a fresh instance of a state required by a grammar.
pub type StateFactory = Rc<dyn Fn() -> Box<dyn DynState>>;

type Slot = Rc<OnceCell<Weak<Rule>>>;

/// Collects the rules, references and required states of a grammar.
#[derive(Default)]
pub struct GrammarBuilder {
    rules: Vec<Rc<Rule>>,
    index: HashMap<Rc<str>, usize>,
    slots: BTreeMap<Rc<str>, Slot>,
    duplicates: Vec<String>,
    root: Option<String>,
    states: Vec<StateFactory>,
    config: ParseConfig,
}

impl GrammarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines a rule. The first rule defined is the root unless
    /// [`GrammarBuilder::root`] says otherwise.
    pub fn rule<P: Parser + 'static>(&mut self, name: &str, body: P) -> &mut Self {
        if self.index.contains_key(name) {
            self.duplicates.push(name.to_string());
            return self;
        }
        let rule = Rc::new(Rule::new(name, body));
        self.index.insert(rule.name.clone(), self.rules.len());
        self.rules.push(rule);
        self
    }

    /// A reference to the rule called `name`, which may be defined later.
    pub fn reference(&mut self, name: &str) -> Ref {
        let (name, slot) = match self.slots.get_key_value(name) {
            Some((name, slot)) => (name.clone(), slot.clone()),
            None => {
                let name: Rc<str> = Rc::from(name);
                let slot = Slot::default();
                self.slots.insert(name.clone(), slot.clone());
                (name, slot)
            }
        };
        Ref::new(name, slot)
    }

    pub fn root(&mut self, name: &str) -> &mut Self {
        self.root = Some(name.to_string());
        self
    }

    /// Declares a state every parse of this grammar needs.
    pub fn state<S, F>(&mut self, factory: F) -> &mut Self
    where
        S: State,
        F: Fn() -> S + 'static,
    {
        self.states
            .push(Rc::new(move || Box::new(factory()) as Box<dyn DynState>));
        self
    }

    pub fn config(&mut self, config: ParseConfig) -> &mut Self {
        self.config = config;
        self
    }

    /// Checks the definitions and resolves every reference.
    pub fn build(mut self) -> Result<Grammar, GrammarError> {
        if let Some(name) = self.duplicates.first().cloned() {
            return Err(GrammarError::DuplicateRule(name));
        }
        let root = match &self.root {
            Some(name) => self
                .index
                .get(name.as_str())
                .map(|&i| self.rules[i].clone())
                .ok_or_else(|| GrammarError::UnknownRoot(name.clone()))?,
            None => self.rules.first().cloned().ok_or(GrammarError::MissingRoot)?,
        };
        // the root is entered through a reference too, so it may be
        // left-recursive itself
        let entry = self.reference(root.name());
        let grammar = Grammar {
            rules: self.rules,
            index: self.index,
            slots: self.slots,
            root,
            entry,
            states: self.states,
            config: self.config,
        };
        grammar.resolve()?;
        Ok(grammar)
    }
}

/// A resolved grammar, ready to parse.
pub struct Grammar {
    rules: Vec<Rc<Rule>>,
    index: HashMap<Rc<str>, usize>,
    slots: BTreeMap<Rc<str>, Slot>,
    root: Rc<Rule>,
    entry: Ref,
    states: Vec<StateFactory>,
    config: ParseConfig,
}

impl Grammar {
    pub fn builder() -> GrammarBuilder {
        GrammarBuilder::new()
    }

    /// Wires references to their rules. References already wired are left
    /// alone, so calling this again is a no-op.
    pub fn resolve(&self) -> Result<(), GrammarError> {
        for (name, slot) in &self.slots {
            if slot.get().is_some() {
                continue;
            }
            let rule = self
                .rule(name)
                .ok_or_else(|| GrammarError::UnresolvedReference(name.to_string()))?;
            let _ = slot.set(Rc::downgrade(&rule));
        }
        Ok(())
    }

    pub fn rule(&self, name: &str) -> Option<Rc<Rule>> {
        self.index.get(name).map(|&i| self.rules[i].clone())
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rc<Rule>> {
        self.rules.iter()
    }

    pub fn root(&self) -> &Rc<Rule> {
        &self.root
    }

    pub fn config(&self) -> &ParseConfig {
        &self.config
    }

    pub fn with_config(mut self, config: ParseConfig) -> Self {
        self.config = config;
        self
    }

    /// A fresh context over `input` holding the states this grammar needs.
    pub fn context(&self, input: &str) -> Context {
        self.states
            .iter()
            .fold(
                Context::builder(input).config(self.config.clone()),
                |builder, factory| builder.dyn_state(factory()),
            )
            .build()
    }

    /// Matches the root rule against the whole input.
    pub fn parse(&self, input: &str) -> Outcome {
        self.run(&mut self.context(input))
    }

    /// Matches the root rule against a prefix of the input.
    pub fn parse_prefix(&self, input: &str) -> Outcome {
        self.run_prefix(&mut self.context(input))
    }

    /// Like [`Grammar::parse`] on a context prepared by the caller, who can
    /// inspect it afterwards.
    pub fn run(&self, ctx: &mut Context) -> Outcome {
        run(&self.entry, ctx)
    }

    pub fn run_prefix(&self, ctx: &mut Context) -> Outcome {
        run_prefix(&self.entry, ctx)
    }
}

impl fmt::Debug for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grammar")
            .field("root", &self.root.name())
            .field(
                "rules",
                &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .field("states", &self.states.len())
            .finish()
    }
}

/// Matches `root` against the whole of `input`.
pub fn parse<P: Parser + ?Sized>(root: &P, input: &str) -> Outcome {
    run(root, &mut Context::new(input))
}

/// Matches `root` against a prefix of `input`.
pub fn parse_prefix<P: Parser + ?Sized>(root: &P, input: &str) -> Outcome {
    run_prefix(root, &mut Context::new(input))
}

/// Matches `root` from the context's position to the end of the input.
///
/// If `root` succeeds but input remains, the result is the furthest failure
/// seen during the parse when it lies at or past the stopping point, and a
/// failure at the stopping point otherwise.
pub fn run<P: Parser + ?Sized>(root: &P, ctx: &mut Context) -> Outcome {
    match run_prefix(root, ctx) {
        Outcome::Success if !ctx.at_end() => {
            let stop = ctx.pos();
            if let Some(furthest) = ctx.furthest_failure().filter(|f| f.position() >= stop) {
                return Outcome::Failure(furthest.clone());
            }
            let lines = ctx.source();
            let tab_width = ctx.config().tab_width;
            Outcome::Failure(ctx.failure_at(stop, move || {
                let map = LineMap::new(lines.clone(), tab_width);
                format!("input remaining, matched up to {}", map.describe(stop))
            }))
        }
        outcome => outcome,
    }
}

/// Matches `root` from the context's position, accepting leftover input.
pub fn run_prefix<P: Parser + ?Sized>(root: &P, ctx: &mut Context) -> Outcome {
    let result = if ctx.config().catch_panics {
        match catch_unwind(AssertUnwindSafe(|| root.parse(ctx))) {
            Ok(result) => result,
            Err(payload) => return panic_failure(ctx, payload),
        }
    } else {
        root.parse(ctx)
    };
    match result {
        Ok(Outcome::Failure(failure)) => Outcome::Failure(most_informative(ctx, failure)),
        Ok(outcome) => outcome,
        Err(abort) => abort_failure(ctx, abort),
    }
}

/// The recorded furthest failure when it lies at or past `failure`.
///
/// Alternatives failing at the same position keep the first failure, which
/// may come from a placeholder such as a left-recursion seed rather than
/// from the parser that actually inspected the input.
fn most_informative(ctx: &Context, failure: Failure) -> Failure {
    match ctx.furthest_failure() {
        Some(recorded) if recorded.position() >= failure.position() => recorded.clone(),
        _ => failure,
    }
}

fn abort_failure(ctx: &mut Context, abort: Abort) -> Outcome {
    match abort {
        Abort::Panic(failure) => {
            warn!(
                target: "seedling::parse",
                position = failure.position(),
                "parse aborted by a panic"
            );
            Outcome::Failure(failure)
        }
        abort => {
            let cause = abort.to_string();
            warn!(target: "seedling::parse", position = ctx.pos(), error = %cause, "parse aborted");
            Outcome::Failure(debug_failure(ctx, cause))
        }
    }
}

fn panic_failure(ctx: &mut Context, payload: Box<dyn Any + Send>) -> Outcome {
    let cause = match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast_ref::<&str>() {
            Some(message) => message.to_string(),
            None => "unknown panic payload".to_string(),
        },
    };
    warn!(target: "seedling::parse", position = ctx.pos(), cause = %cause, "grammar code panicked");
    Outcome::Failure(debug_failure(ctx, format!("grammar code panicked: {}", cause)))
}

fn debug_failure(ctx: &mut Context, cause: String) -> Failure {
    let message = cause.clone();
    let failure = Failure::new(ctx.pos(), move || message.clone())
        .with_debug(ctx.debug_info(Some(cause)));
    ctx.record_failure(&failure);
    failure
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::prelude::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unresolved_reference_is_a_build_error() {
        let mut builder = Grammar::builder();
        let missing = builder.reference("missing");
        builder.rule("start", missing);
        assert_eq!(
            builder.build().unwrap_err(),
            GrammarError::UnresolvedReference("missing".to_string())
        );
    }

    #[test]
    fn test_duplicate_and_root_errors() {
        let mut builder = Grammar::builder();
        builder.rule("a", literal("a")).rule("a", literal("b"));
        assert_eq!(
            builder.build().unwrap_err(),
            GrammarError::DuplicateRule("a".to_string())
        );

        assert_eq!(
            Grammar::builder().build().unwrap_err(),
            GrammarError::MissingRoot
        );

        let mut builder = Grammar::builder();
        builder.rule("a", literal("a")).root("b");
        assert_eq!(
            builder.build().unwrap_err(),
            GrammarError::UnknownRoot("b".to_string())
        );
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut builder = Grammar::builder();
        let b = builder.reference("b");
        builder.rule("a", b.clone()).rule("b", literal("x"));
        let grammar = builder.build().unwrap();
        assert!(b.is_resolved());
        assert!(grammar.resolve().is_ok());
        assert!(grammar.parse("x").is_success());
    }

    #[test]
    fn test_reference_outliving_grammar() {
        let mut builder = Grammar::builder();
        let a = builder.reference("a");
        builder.rule("a", literal("a"));
        drop(builder.build().unwrap());

        let mut ctx = Context::new("a");
        assert!(matches!(
            a.parse(&mut ctx),
            Err(Abort::Grammar(GrammarError::DanglingReference(_)))
        ));
    }

    #[test]
    fn test_explicit_root() {
        let mut builder = Grammar::builder();
        builder
            .rule("a", literal("a"))
            .rule("b", literal("b"))
            .root("b");
        let grammar = builder.build().unwrap();
        assert_eq!(grammar.root().name(), "b");
        assert!(grammar.parse("b").is_success());
        assert!(grammar.parse("a").is_failure());
    }

    #[test]
    fn test_rule_trace_in_debug_mode() {
        let mut builder = Grammar::builder();
        let inner = builder.reference("inner");
        builder
            .rule("outer", seq(vec![Box::new(literal("(")), Box::new(inner)]))
            .rule("inner", panic_with("no closing paren"))
            .config(ParseConfig::debug());
        let grammar = builder.build().unwrap();

        let mut ctx = grammar.context("(x");
        let outcome = grammar.run(&mut ctx);
        assert_eq!(outcome.failure().map(Failure::position), Some(1));
        let names: Vec<&str> = ctx.trace().iter().map(|n| &**n).collect();
        assert_eq!(names, vec!["outer", "inner"]);
    }
}
