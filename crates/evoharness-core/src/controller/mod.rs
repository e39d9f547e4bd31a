//! EvolutionController: the generation loop.
//!
//! ```text
//! Seeding -> Generating -> Evaluating -> Selecting -> (Generating | Done)
//! ```
//!
//! Only configuration errors are fatal, and they are raised by
//! [`EvolutionController::new`] before any generation runs. Backend failures
//! skip a slot; candidate faults become worst-case scores.

pub mod config;
pub mod population;

pub use config::EvolutionConfig;
pub use population::{rank, BestTracker, Population, ScoredCandidate};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, info, Instrument};
use uuid::Uuid;

use crate::artifact::ArtifactWriter;
use crate::backend::{complete_with_retry, extract_program, BackendError, ModelBackend};
use crate::cancel::CancellationHandle;
use crate::domain::{code_digest, CandidateId, CandidateProgram, ModelConfig, Result, TestSuite};
use crate::executor::CandidateExecutor;
use crate::metrics::METRICS;
use crate::obs;
use crate::prompt::mutation_messages;
use crate::scorer::Scorer;
use crate::selector::ModelSelector;

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Seeding,
    Generating,
    Evaluating,
    Selecting,
    Done,
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    IterationsReached,
    EarlyStop,
    Cancelled,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::IterationsReached => "iterations_reached",
            StopReason::EarlyStop => "early_stop",
            StopReason::Cancelled => "cancelled",
        }
    }
}

/// What happened in one completed generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub generation: u32,
    /// Mutation slots issued.
    pub requested: usize,
    /// Model drawn for each slot, in slot order.
    pub models: Vec<String>,
    /// Slots skipped after backend failure.
    pub skipped: usize,
    /// Offspring dropped as duplicates of existing code.
    pub duplicates: usize,
    /// Offspring scored and offered to selection.
    pub evaluated: usize,
    /// Best score among the surviving population.
    pub population_best: f64,
    /// Best-ever score after this generation.
    pub best_score: f64,
}

/// Result of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionOutcome {
    pub run_id: String,
    pub best: ScoredCandidate,
    pub generations_completed: u32,
    pub stop_reason: StopReason,
    pub history: Vec<GenerationSummary>,
    pub duration_ms: u64,
}

/// Offspring text returned by one mutation slot.
struct SlotOutput {
    slot: usize,
    parent: CandidateId,
    model: String,
    code: String,
}

/// Orchestrates generations over a validated configuration.
pub struct EvolutionController {
    config: EvolutionConfig,
    selector: ModelSelector,
    scorer: Scorer,
    backend: Arc<dyn ModelBackend>,
    artifacts: Option<ArtifactWriter>,
    cancel: CancellationHandle,
}

impl EvolutionController {
    /// Validate `config` and build a controller. Fails on configuration
    /// errors only.
    pub fn new(config: EvolutionConfig, backend: Arc<dyn ModelBackend>) -> Result<Self> {
        let selector = config.validate()?;
        let executor =
            CandidateExecutor::new(config.target_function.clone(), config.limits.clone());
        Ok(Self {
            config,
            selector,
            scorer: Scorer::new(executor),
            backend,
            artifacts: None,
            cancel: CancellationHandle::new(),
        })
    }

    /// Persist best programs and checkpoints under a problem directory.
    pub fn with_artifacts(mut self, writer: ArtifactWriter) -> Self {
        self.artifacts = Some(writer);
        self
    }

    /// Share an externally owned cancellation flag.
    pub fn with_cancellation(mut self, cancel: CancellationHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_handle(&self) -> CancellationHandle {
        self.cancel.clone()
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    fn suite(&self) -> &TestSuite {
        &self.config.test_cases
    }

    /// Evolve `seed_code` and return the best-ever candidate.
    pub async fn run(&self, seed_code: &str) -> Result<EvolutionOutcome> {
        let run_id = Uuid::new_v4().to_string();
        let span = obs::run_span(&run_id);
        self.run_inner(run_id, seed_code).instrument(span).await
    }

    async fn run_inner(&self, run_id: String, seed_code: &str) -> Result<EvolutionOutcome> {
        let started = Instant::now();
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        obs::emit_run_started(
            &run_id,
            self.config.iterations,
            self.selector.models().len(),
            self.suite().len(),
        );

        debug!(phase = ?Phase::Seeding);
        let mut next_id = 0u64;
        let seed_program = CandidateProgram::seed(CandidateId(next_id), seed_code);
        next_id += 1;
        let seed_eval = self.scorer.score(&seed_program.code, self.suite()).await?;
        let seed = ScoredCandidate::new(seed_program, seed_eval);
        self.record_scored(&seed);

        let mut best = BestTracker::new(seed.clone());
        let mut population = Population::new(self.config.population_size, seed);
        let mut history = Vec::new();
        let mut generations_completed = 0;
        self.write_best(&run_id, best.get());

        let mut stop_reason = if self.reached_threshold(best.get()) {
            StopReason::EarlyStop
        } else {
            StopReason::IterationsReached
        };

        if stop_reason != StopReason::EarlyStop {
            for generation in 1..=self.config.iterations {
                if self.cancel.is_cancelled() {
                    stop_reason = StopReason::Cancelled;
                    break;
                }

                debug!(phase = ?Phase::Generating, generation);
                let requested = self.config.offspring_per_generation;
                let (models, outputs) = self.generate(generation, &population, &mut rng).await;
                let skipped = requested - outputs.len();

                let (offspring, duplicates) =
                    self.admit_offspring(generation, &population, outputs, &mut next_id);

                if self.cancel.is_cancelled() {
                    stop_reason = StopReason::Cancelled;
                    break;
                }

                debug!(phase = ?Phase::Evaluating, generation, candidates = offspring.len());
                let scored = match self.evaluate(offspring).await? {
                    Some(scored) => scored,
                    None => {
                        stop_reason = StopReason::Cancelled;
                        break;
                    }
                };

                debug!(phase = ?Phase::Selecting, generation);
                let evaluated = scored.len();
                for candidate in &scored {
                    if best.offer(candidate) {
                        info!(
                            candidate = %candidate.program.id,
                            score = candidate.score(),
                            "new best candidate"
                        );
                        self.write_best(&run_id, best.get());
                    }
                }
                population.select(scored);
                self.write_checkpoint(&run_id, generation, best.get());

                let summary = GenerationSummary {
                    generation,
                    requested,
                    models,
                    skipped,
                    duplicates,
                    evaluated,
                    population_best: population.best().score(),
                    best_score: best.get().score(),
                };
                obs::emit_generation_finished(generation, evaluated, skipped, summary.best_score);
                history.push(summary);
                generations_completed = generation;

                if self.reached_threshold(best.get()) {
                    stop_reason = StopReason::EarlyStop;
                    break;
                }
            }
        }

        debug!(phase = ?Phase::Done);
        let duration_ms = started.elapsed().as_millis() as u64;
        let best = best.into_inner();
        obs::emit_run_finished(
            &run_id,
            duration_ms,
            generations_completed,
            best.score(),
            stop_reason.as_str(),
        );
        METRICS.flush();

        Ok(EvolutionOutcome {
            run_id,
            best,
            generations_completed,
            stop_reason,
            history,
            duration_ms,
        })
    }

    fn reached_threshold(&self, best: &ScoredCandidate) -> bool {
        self.config
            .early_stop_score
            .is_some_and(|threshold| best.score() >= threshold)
    }

    /// Issue every mutation slot concurrently. Models are drawn in slot order
    /// before any request starts, so a seeded run draws the same sequence.
    async fn generate(
        &self,
        generation: u32,
        population: &Population,
        rng: &mut StdRng,
    ) -> (Vec<String>, Vec<SlotOutput>) {
        let requests: Vec<(usize, &ScoredCandidate, &ModelConfig)> = (0..self
            .config
            .offspring_per_generation)
            .map(|slot| {
                let model = self.selector.select(&mut *rng);
                (slot, population.parent_for_slot(slot), model)
            })
            .collect();
        let models = requests.iter().map(|(_, _, m)| m.name.clone()).collect();

        let results = join_all(
            requests
                .into_iter()
                .map(|(slot, parent, model)| {
                    self.request_mutation(generation, slot, parent, model)
                }),
        )
        .await;

        (models, results.into_iter().flatten().collect())
    }

    async fn request_mutation(
        &self,
        generation: u32,
        slot: usize,
        parent: &ScoredCandidate,
        model: &ModelConfig,
    ) -> Option<SlotOutput> {
        let messages = mutation_messages(
            self.config.system_prompt.as_deref(),
            &self.config.target_function,
            self.suite(),
            &parent.program,
            &parent.evaluation,
        );

        let outcome = complete_with_retry(&self.config.retry, &self.cancel, || {
            self.backend.complete(model, &messages)
        })
        .await;

        match outcome {
            Ok((text, attempts)) => {
                debug!(generation, slot, model = %model.name, attempts, "mutation received");
                METRICS.inc_generated();
                Some(SlotOutput {
                    slot,
                    parent: parent.program.id,
                    model: model.name.clone(),
                    code: extract_program(&text),
                })
            }
            Err(exhausted) => {
                if exhausted.last_error != BackendError::Cancelled {
                    METRICS.inc_backend_failures();
                    obs::emit_slot_skipped(
                        generation,
                        slot,
                        &model.name,
                        exhausted.attempts,
                        &exhausted.last_error,
                    );
                }
                None
            }
        }
    }

    /// Assign ids in slot order and drop code already present in the
    /// population or produced by an earlier slot.
    fn admit_offspring(
        &self,
        generation: u32,
        population: &Population,
        mut outputs: Vec<SlotOutput>,
        next_id: &mut u64,
    ) -> (Vec<CandidateProgram>, usize) {
        outputs.sort_by_key(|o| o.slot);
        let mut seen: HashSet<String> = population
            .members()
            .iter()
            .map(|m| m.program.digest())
            .collect();

        let mut admitted = Vec::with_capacity(outputs.len());
        let mut duplicates = 0;
        for output in outputs {
            if !seen.insert(code_digest(&output.code)) {
                debug!(generation, slot = output.slot, "dropping duplicate offspring");
                METRICS.inc_duplicates();
                duplicates += 1;
                continue;
            }
            admitted.push(CandidateProgram::offspring(
                CandidateId(*next_id),
                generation,
                output.parent,
                &output.model,
                output.code,
            ));
            *next_id += 1;
        }
        (admitted, duplicates)
    }

    /// Score every offspring, at most `max_concurrent_evaluations` at a time.
    /// Returns `None` if the run was cancelled before every candidate was
    /// scored; candidates already running finish normally.
    async fn evaluate(
        &self,
        offspring: Vec<CandidateProgram>,
    ) -> Result<Option<Vec<ScoredCandidate>>> {
        let permits = Semaphore::new(self.config.max_concurrent_evaluations);

        let results = join_all(
            offspring
                .into_iter()
                .map(|program| self.score_offspring(&permits, program)),
        )
        .await;

        let mut scored = Vec::with_capacity(results.len());
        for result in results {
            match result? {
                Some(candidate) => scored.push(candidate),
                None => return Ok(None),
            }
        }
        if self.cancel.is_cancelled() {
            return Ok(None);
        }
        for candidate in &scored {
            self.record_scored(candidate);
        }
        Ok(Some(scored))
    }

    async fn score_offspring(
        &self,
        permits: &Semaphore,
        program: CandidateProgram,
    ) -> Result<Option<ScoredCandidate>> {
        let _permit = permits.acquire().await.ok();
        let evaluation = self
            .scorer
            .score_until(&program.code, self.suite(), &self.cancel)
            .await?;
        Ok(evaluation.map(|evaluation| ScoredCandidate::new(program, evaluation)))
    }

    fn record_scored(&self, candidate: &ScoredCandidate) {
        METRICS.inc_scored();
        obs::emit_candidate_scored(
            &candidate.program.id.to_string(),
            candidate.program.generation,
            candidate.score(),
            candidate.evaluation.passed,
            candidate.evaluation.total,
        );
        let failures = candidate.evaluation.failure_summary();
        if !failures.is_empty() {
            debug!(candidate = %candidate.program.id, failures = ?failures, "candidate failures");
        }
    }

    fn write_best(&self, run_id: &str, best: &ScoredCandidate) {
        if let Some(writer) = &self.artifacts {
            if let Err(err) = writer.write_best(run_id, best) {
                obs::emit_artifact_write_error(run_id, &err);
            }
        }
    }

    fn write_checkpoint(&self, run_id: &str, generation: u32, best: &ScoredCandidate) {
        if let Some(writer) = &self.artifacts {
            if let Err(err) = writer.write_checkpoint(run_id, generation, best) {
                obs::emit_artifact_write_error(run_id, &err);
            }
        }
    }
}
