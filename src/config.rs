use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, str::FromStr};

use crate::{Error, InternalResult};

/// Per-parse configuration, threaded through [`crate::Context`] construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseConfig {
    /// Attach [`crate::DebugInfo`] to failures and record the rule trace.
    #[serde(default)]
    pub debug: bool,

    /// Convert Rust panics escaping the root parser into failures.
    #[serde(default = "default_true")]
    pub catch_panics: bool,

    /// Column width of a tab character when reporting `line:column`.
    #[serde(default = "default_tab_width")]
    pub tab_width: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            debug: false,
            catch_panics: default_true(),
            tab_width: default_tab_width(),
        }
    }
}

impl ParseConfig {
    pub fn debug() -> Self {
        Self {
            debug: true,
            ..Self::default()
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> InternalResult<Self> {
        let file = File::open(path)?;
        let config = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::config(format!("Failed to parse config file: {}", e)))?;
        Ok(config)
    }
}

impl FromStr for ParseConfig {
    type Err = Error;

    fn from_str(s: &str) -> InternalResult<Self> {
        serde_json::from_str(s)
            .map_err(|e| Error::config(format!("Failed to parse config: {}", e)))
    }
}

fn default_true() -> bool {
    true
}

fn default_tab_width() -> usize {
    4
}
