//! Configuration-level error taxonomy.
//!
//! Only configuration faults are represented here: they are fatal and abort a
//! run before any generation executes. Candidate faults live in
//! [`ExecutionFailure`](super::evaluation::ExecutionFailure) and backend faults
//! in [`BackendError`](crate::backend::BackendError); neither ever surfaces as a
//! `HarnessError`. A cancelled scoring call surfaces as
//! [`HarnessError::Cancelled`].

/// Errors produced when validating run configuration.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("test suite is empty: at least one test case is required")]
    EmptyTestSuite,

    #[error("model set is empty: at least one backend must be configured")]
    EmptyModelSet,

    #[error("invalid model weights: {0}")]
    InvalidWeights(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("run cancelled before scoring finished")]
    Cancelled,
}

impl HarnessError {
    /// Whether this error comes from the configuration rather than the environment.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            HarnessError::EmptyTestSuite
                | HarnessError::EmptyModelSet
                | HarnessError::InvalidWeights(_)
                | HarnessError::InvalidConfig(_)
        )
    }
}

/// Result type for harness configuration operations.
pub type Result<T> = std::result::Result<T, HarnessError>;
