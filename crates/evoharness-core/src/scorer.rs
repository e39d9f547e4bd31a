//! Scorer: reduces per-case execution outcomes to a fitness score.
//!
//! The candidate is loaded once per scoring call; each case then runs in its
//! own execution unit with an independent copy of its input. Candidate faults
//! never escape as errors: they become failed cases or a zero-score result
//! with a diagnostic. The only error is an empty suite.
//!
//! [`Scorer::score_until`] stops launching units once a run is cancelled.

use std::time::Instant;

use tracing::debug;

use crate::cancel::CancellationHandle;
use crate::domain::{CaseOutcome, EvaluationResult, HarnessError, Result, TestSuite};
use crate::executor::{run_blocking, CandidateExecutor};

/// Scores candidate programs against a test suite.
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    executor: CandidateExecutor,
}

impl Scorer {
    pub fn new(executor: CandidateExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &CandidateExecutor {
        &self.executor
    }

    /// Score `code` against every case of `suite`.
    pub async fn score(&self, code: &str, suite: &TestSuite) -> Result<EvaluationResult> {
        self.score_until(code, suite, &CancellationHandle::new())
            .await?
            .ok_or(HarnessError::Cancelled)
    }

    /// Like [`score`](Self::score), but returns `Ok(None)` if `cancel` fires
    /// before every case has been launched. A unit already running is
    /// awaited; no unit starts after the flag is seen.
    pub async fn score_until(
        &self,
        code: &str,
        suite: &TestSuite,
        cancel: &CancellationHandle,
    ) -> Result<Option<EvaluationResult>> {
        if suite.is_empty() {
            return Err(HarnessError::EmptyTestSuite);
        }
        let total = suite.len();
        let time_limit = self.executor.limits().timeout();

        if cancel.is_cancelled() {
            return Ok(None);
        }
        let executor = self.executor.clone();
        let source = code.to_string();
        let loaded = match run_blocking(move || executor.load(&source)).await {
            Ok(loaded) => loaded,
            Err(failure) => {
                debug!(failure = %failure, "candidate could not be loaded");
                return Ok(Some(EvaluationResult::unrunnable(failure, total)));
            }
        };

        let mut cases = Vec::with_capacity(total);
        for (case_index, case) in suite.cases().iter().enumerate() {
            if cancel.is_cancelled() {
                debug!(launched = case_index, total, "scoring cancelled");
                return Ok(None);
            }
            let started = Instant::now();
            let outcome = loaded.invoke(&case.input, time_limit).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            cases.push(match outcome {
                Ok(output) => CaseOutcome {
                    case_index,
                    passed: case.accepts(&output),
                    output: Some(output),
                    failure: None,
                    duration_ms,
                },
                Err(failure) => CaseOutcome {
                    case_index,
                    passed: false,
                    output: None,
                    failure: Some(failure),
                    duration_ms,
                },
            });
        }

        Ok(Some(EvaluationResult::from_cases(cases, total)))
    }
}
