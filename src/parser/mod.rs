//! # Parser Combinators
//!
//! This module provides the parser interface and the library of parsers
//! grammars are assembled from.
//!
//! ## Core Components
//!
//! ### Parser Trait
//!
//! Every parser implements [`Parser`]. It is handed the [`crate::Context`],
//! and reports an [`crate::Outcome`] or an [`Abort`].
//!
//! ### Structural Combinators
//!
//! - [`Seq`], [`Choice`], [`Longest`]
//! - [`Optional`], [`ZeroMore`], [`OneMore`], [`Repeat`]
//! - [`Ahead`], [`Not`], [`Until`], [`Around`]
//!
//! ### Character Parsers
//!
//! - [`AnyChar`], [`CharPred`], [`CharRange`], [`CharSet`], [`Str`]
//!
//! ### Control Parsers
//!
//! - [`Succeed`], [`Fail`], [`OrFail`]
//! - [`PanicParser`], [`Paranoid`], [`Chill`], [`Catch`]
//! - [`DontRecordFailures`], [`Bounded`]
//! - [`Predicate`], [`Perform`], [`Dynamic`], [`Traced`], [`FnParser`]
//!
//! The [`prelude`] module has one constructor function per parser type.

pub mod chars;
pub mod combinators;
pub mod control;
mod core;
pub mod prelude;

pub use self::chars::*;
pub use self::combinators::*;
pub use self::control::*;
pub use self::core::{Abort, ParseResult, Parser};
