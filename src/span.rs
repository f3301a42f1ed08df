//! Source location tracking.
//!
//! Atoms optionally carry a [`Loc`] pointing back into whatever the parser
//! collaborator fed the engine. The core never reads file contents itself —
//! it only stores and forwards what it was given, for diagnostics.

use serde::{Deserialize, Serialize};

/// A byte-offset span into a named source, attached to an atom at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Loc {
    pub source_name: String,
    pub start: usize,
    pub end: usize,
}

impl Loc {
    pub fn new(source_name: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            source_name: source_name.into(),
            start,
            end,
        }
    }
}

impl std::fmt::Display for Loc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.source_name, self.start, self.end)
    }
}
