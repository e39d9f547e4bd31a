//! Structured observability hooks for the evolution lifecycle.
//!
//! This module provides:
//! - The run-scoped tracing span (`run_span`)
//! - Emission functions for run start/finish, generation boundaries,
//!   candidate scores, skipped backend slots and artifact failures

use tracing::{info, warn, Span};

/// Run-scoped span. The controller instruments its run future with it, so
/// every event emitted during the run carries `run_id`.
///
/// ```ignore
/// run_inner().instrument(run_span("3f1c...")).await
/// ```
pub fn run_span(run_id: &str) -> Span {
    tracing::info_span!("evoharness.run", run_id = %run_id)
}

/// Emit event: run started.
pub fn emit_run_started(run_id: &str, iterations: u32, models: usize, cases: usize) {
    info!(
        event = "run.started",
        run_id = %run_id,
        iterations = iterations,
        models = models,
        cases = cases,
    );
}

/// Emit event: a candidate received its score.
pub fn emit_candidate_scored(
    candidate: &str,
    generation: u32,
    score: f64,
    passed: usize,
    total: usize,
) {
    info!(
        event = "candidate.scored",
        candidate = %candidate,
        generation = generation,
        score = score,
        passed = passed,
        total = total,
    );
}

/// Emit event: a generation slot was skipped after its backend failed.
pub fn emit_slot_skipped(
    generation: u32,
    slot: usize,
    model: &str,
    attempts: u32,
    error: &dyn std::fmt::Display,
) {
    warn!(
        event = "backend.slot_skipped",
        generation = generation,
        slot = slot,
        model = %model,
        attempts = attempts,
        error = %error,
    );
}

/// Emit event: a generation finished selection.
pub fn emit_generation_finished(
    generation: u32,
    offspring: usize,
    skipped: usize,
    best_score: f64,
) {
    info!(
        event = "generation.finished",
        generation = generation,
        offspring = offspring,
        skipped = skipped,
        best_score = best_score,
    );
}

/// Emit event: run finished.
pub fn emit_run_finished(
    run_id: &str,
    duration_ms: u64,
    generations: u32,
    best_score: f64,
    reason: &str,
) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        generations = generations,
        best_score = best_score,
        reason = %reason,
    );
}

/// Emit event: an artifact could not be written (warning level).
pub fn emit_artifact_write_error(run_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "artifact.write_error", run_id = %run_id, error = %error);
}
