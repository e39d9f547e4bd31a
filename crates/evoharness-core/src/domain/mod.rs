//! Domain models for the evolution harness.
//!
//! Canonical definitions for the core entities:
//! - `CandidateProgram`: immutable program text with lineage
//! - `TestCase` / `TestSuite`: the fixed scoring suite of a run
//! - `EvaluationResult`: per-case outcomes and the aggregate score
//! - `ModelConfig`: one weighted backend in the selection universe

pub mod candidate;
pub mod error;
pub mod evaluation;
pub mod model;
pub mod test_case;

pub use candidate::{code_digest, CandidateId, CandidateProgram};
pub use error::{HarnessError, Result};
pub use evaluation::{CaseOutcome, EvaluationResult, ExecutionFailure, FaultStage};
pub use model::ModelConfig;
pub use test_case::{Comparator, TestCase, TestSuite};
