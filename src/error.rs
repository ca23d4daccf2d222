use thiserror::Error;

use crate::state::StateKind;

/// Internal-consistency errors raised by state implementations.
///
/// These are programming defects in grammar code (for example popping a
/// value below a snapshot's frontier and then asking for a delta), never
/// problems with the input text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error(
        "supplied {kind} snapshot is not a prefix of the current state \
         (snapshot length {snapshot_len}, current length {current_len})"
    )]
    NotAPrefix {
        kind: StateKind,
        snapshot_len: usize,
        current_len: usize,
    },
}

/// Configuration errors in a grammar definition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    #[error("rule `{0}` is defined more than once")]
    DuplicateRule(String),
    #[error("reference to undefined rule `{0}`")]
    UnresolvedReference(String),
    #[error("grammar has no root rule")]
    MissingRoot,
    #[error("root rule `{0}` is not defined")]
    UnknownRoot(String),
    #[error("reference `{0}` outlived the grammar that owns its target")]
    DanglingReference(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Grammar error: {0}")]
    Grammar(#[from] GrammarError),
    #[error("State error: {0}")]
    State(#[from] StateError),
    #[error("Config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type InternalResult<T> = Result<T, Error>;

impl Error {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config(message.into())
    }
}
