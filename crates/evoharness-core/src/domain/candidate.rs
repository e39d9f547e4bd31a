//! Candidate programs produced during evolution.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Monotonically increasing identifier assigned by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub u64);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Immutable text of one generated program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProgram {
    /// Identifier, unique within a run.
    pub id: CandidateId,

    /// Generation that produced this candidate (0 = seed).
    pub generation: u32,

    /// Candidate this one was mutated from.
    pub parent: Option<CandidateId>,

    /// Backend that produced the text, `None` for the seed.
    pub model: Option<String>,

    /// Program source.
    pub code: Arc<str>,
}

impl CandidateProgram {
    /// The seed program of a run.
    pub fn seed(id: CandidateId, code: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            generation: 0,
            parent: None,
            model: None,
            code: code.into(),
        }
    }

    /// A mutated offspring of `parent`.
    pub fn offspring(
        id: CandidateId,
        generation: u32,
        parent: CandidateId,
        model: &str,
        code: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            id,
            generation,
            parent: Some(parent),
            model: Some(model.to_string()),
            code: code.into(),
        }
    }

    /// SHA-256 hex digest of the program text.
    pub fn digest(&self) -> String {
        code_digest(&self.code)
    }
}

/// SHA-256 hex digest of program text, after trimming surrounding whitespace.
pub fn code_digest(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.trim().as_bytes());
    hex::encode(hasher.finalize())
}
