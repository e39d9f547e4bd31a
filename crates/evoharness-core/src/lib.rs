//! Evoharness Core Library
//!
//! Evaluator-guided code evolution: sandboxed candidate execution, scoring,
//! weighted model selection and the generation loop.

pub mod artifact;
pub mod backend;
pub mod cancel;
pub mod controller;
pub mod domain;
pub mod executor;
pub mod metrics;
pub mod obs;
pub mod prompt;
pub mod scorer;
pub mod selector;
pub mod telemetry;

pub use artifact::{ArtifactWriter, BestProgramInfo, OUTPUT_DIR_NAME};

pub use backend::{
    extract_program, BackendError, ChatMessage, ModelBackend, OpenAiCompatibleBackend,
    RetryExhausted, RetryPolicy, Role,
};

pub use cancel::CancellationHandle;

pub use controller::{
    EvolutionConfig, EvolutionController, EvolutionOutcome, GenerationSummary, Phase,
    Population, ScoredCandidate, StopReason,
};

pub use domain::{
    CandidateId, CandidateProgram, CaseOutcome, Comparator, EvaluationResult, ExecutionFailure,
    FaultStage, HarnessError, ModelConfig, Result, TestCase, TestSuite,
};

pub use executor::{CandidateExecutor, ExecutionLimits, TargetFunction};

pub use scorer::Scorer;

pub use selector::{ModelSelector, SelectorError};

pub use telemetry::init_tracing;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
