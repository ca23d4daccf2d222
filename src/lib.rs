//! # Seedling: a PEG Parsing Engine
//!
//! Seedling runs parsing expression grammars built from composable parsers
//! against a shared, backtracking-aware [`Context`]. Rules may be
//! left-recursive.
//!
//! ## Technical Foundations
//!
//! ### 1. Result Model
//! Every parser returns an [`Outcome`]: a success, or a [`Failure`] holding
//! a position and a lazily built message ([`result`]). Among competing
//! failures the one that got furthest into the input is reported
//! ([`furthest`]).
//!
//! ### 2. State Protocol
//! Mutable state takes part in backtracking through the [`State`] trait:
//! `snapshot`, `restore`, `diff`, `merge` and `equiv` ([`state`]). The
//! position, the value stack, the left-recursion seeds and any user states
//! live in the [`Context`] ([`context`]).
//!
//! ### 3. Parsers
//! The [`Parser`] trait and the combinators grammars are made of
//! ([`parser`]). A parser that fails leaves the context exactly as it found
//! it. [`Abort`] is the escape hatch that skips that rule.
//!
//! ### 4. Left Recursion
//! [`Ref`]s grow seeds so that rules such as `E := E '+' num | num`
//! terminate and associate to the left ([`left_recursion`]).
//!
//! ### 5. Grammars
//! Named rules, reference resolution and the parse entry points
//! ([`grammar`]), configured by [`ParseConfig`] ([`config`]).
//!
//! ```text
//! Grammar::parse → Context → root Rule → combinators → Ref (seed loop) → Outcome
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod furthest;
pub mod grammar;
pub mod left_recursion;
pub mod parser;
pub mod result;
pub mod state;

// Re-exports
pub use config::ParseConfig;
pub use context::{Context, ContextBuilder, Delta, LineMap, Snapshot, Value};
pub use error::*;
pub use furthest::Furthest;
pub use grammar::{parse, parse_prefix, run, run_prefix, Grammar, GrammarBuilder, Rule};
pub use left_recursion::{Ref, Seed, Seeds};
pub use parser::*;
pub use result::{DebugInfo, Failure, Outcome};
pub use state::{
    CopyState, DynState, Inert, MapState, StackSnapshot, State, StateKind, ValueStack,
};
