//! Evaluation outcomes: per-case results and the aggregate fitness score.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where in the candidate lifecycle a runtime fault was raised.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum FaultStage {
    Load,
    Call,
}

/// Candidate-level failure. Always recoverable: it lowers fitness, never aborts a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionFailure {
    #[error("no candidate function matching {rule}")]
    NoCandidateFunction { rule: String },

    #[error("runtime fault during {stage:?}: {message}")]
    RuntimeFault { stage: FaultStage, message: String },

    #[error("execution exceeded time limit of {limit_ms}ms")]
    Timeout { limit_ms: u64 },

    #[error("resource limit exhausted: {message}")]
    ResourceExhausted { message: String },

    #[error("return value is not representable: {message}")]
    UnsupportedOutput { message: String },
}

impl ExecutionFailure {
    /// Stable short label, used for aggregation and prompts.
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionFailure::NoCandidateFunction { .. } => "no_candidate_function",
            ExecutionFailure::RuntimeFault { .. } => "runtime_fault",
            ExecutionFailure::Timeout { .. } => "timeout",
            ExecutionFailure::ResourceExhausted { .. } => "resource_exhausted",
            ExecutionFailure::UnsupportedOutput { .. } => "unsupported_output",
        }
    }
}

/// Outcome of running one test case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseOutcome {
    /// Index of the case in the suite.
    pub case_index: usize,

    /// Whether the output matched.
    pub passed: bool,

    /// Value returned by the candidate, if it returned at all.
    pub output: Option<Value>,

    /// Failure raised while running the case.
    pub failure: Option<ExecutionFailure>,

    /// Wall-clock time of the call.
    pub duration_ms: u64,
}

/// Aggregate evaluation of one candidate. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationResult {
    /// `passed / total`, in `[0, 1]`.
    pub score: f64,

    pub passed: usize,

    pub total: usize,

    /// Per-case outcomes, empty when the candidate never ran.
    pub cases: Vec<CaseOutcome>,

    /// Candidate-level failure that prevented any case from running.
    pub diagnostic: Option<ExecutionFailure>,
}

impl EvaluationResult {
    /// Build from case outcomes. `total` must be non-zero.
    pub(crate) fn from_cases(cases: Vec<CaseOutcome>, total: usize) -> Self {
        let passed = cases.iter().filter(|c| c.passed).count();
        Self {
            score: passed as f64 / total as f64,
            passed,
            total,
            cases,
            diagnostic: None,
        }
    }

    /// Worst-case result for a candidate that could not be run at all.
    pub(crate) fn unrunnable(failure: ExecutionFailure, total: usize) -> Self {
        Self {
            score: 0.0,
            passed: 0,
            total,
            cases: Vec::new(),
            diagnostic: Some(failure),
        }
    }

    /// Whether every case passed.
    pub fn is_perfect(&self) -> bool {
        self.total > 0 && self.passed == self.total
    }

    /// Count of failures by kind, including the candidate-level diagnostic.
    pub fn failure_summary(&self) -> BTreeMap<&'static str, usize> {
        let mut summary = BTreeMap::new();
        if let Some(d) = &self.diagnostic {
            *summary.entry(d.kind()).or_insert(0) += self.total;
        }
        for failure in self.cases.iter().filter_map(|c| c.failure.as_ref()) {
            *summary.entry(failure.kind()).or_insert(0) += 1;
        }
        summary
    }
}
