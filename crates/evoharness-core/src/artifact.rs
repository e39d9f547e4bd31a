//! Run artifacts written under a problem directory.
//!
//! Layout:
//!
//! ```text
//! <problem_dir>/openevolve_output/
//!   best/best_program.rhai
//!   best/best_program_info.json
//!   checkpoints/checkpoint_<n>/best_program.rhai
//!   checkpoints/checkpoint_<n>/best_program_info.json
//! ```
//!
//! The presence of the output directory is what the run auditor treats as a
//! completed run.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::controller::ScoredCandidate;
use crate::domain::{CandidateId, Result};

/// Name of the output directory beneath a problem directory.
pub const OUTPUT_DIR_NAME: &str = "openevolve_output";

pub const PROGRAM_FILE: &str = "best_program.rhai";
pub const INFO_FILE: &str = "best_program_info.json";

/// Metadata persisted next to a best program.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BestProgramInfo {
    pub run_id: String,
    pub candidate_id: CandidateId,
    pub generation: u32,
    pub parent: Option<CandidateId>,
    pub model: Option<String>,
    pub score: f64,
    pub passed: usize,
    pub total: usize,
    pub digest: String,
    pub written_at: DateTime<Utc>,
}

impl BestProgramInfo {
    pub fn new(run_id: &str, candidate: &ScoredCandidate) -> Self {
        let program = &candidate.program;
        Self {
            run_id: run_id.to_string(),
            candidate_id: program.id,
            generation: program.generation,
            parent: program.parent,
            model: program.model.clone(),
            score: candidate.evaluation.score,
            passed: candidate.evaluation.passed,
            total: candidate.evaluation.total,
            digest: program.digest(),
            written_at: Utc::now(),
        }
    }
}

/// Writes best programs and per-generation checkpoints.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(problem_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: problem_dir.as_ref().join(OUTPUT_DIR_NAME),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Overwrite `best/` with `candidate`. Returns the directory written.
    pub fn write_best(&self, run_id: &str, candidate: &ScoredCandidate) -> Result<PathBuf> {
        let dir = self.output_dir.join("best");
        write_program(&dir, run_id, candidate)?;
        Ok(dir)
    }

    /// Write `checkpoints/checkpoint_<generation>/`.
    pub fn write_checkpoint(
        &self,
        run_id: &str,
        generation: u32,
        candidate: &ScoredCandidate,
    ) -> Result<PathBuf> {
        let dir = self
            .output_dir
            .join("checkpoints")
            .join(format!("checkpoint_{}", generation));
        write_program(&dir, run_id, candidate)?;
        Ok(dir)
    }
}

fn write_program(dir: &Path, run_id: &str, candidate: &ScoredCandidate) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    std::fs::write(dir.join(PROGRAM_FILE), candidate.program.code.as_bytes())?;
    let info = BestProgramInfo::new(run_id, candidate);
    let content = serde_json::to_string_pretty(&info)?;
    std::fs::write(dir.join(INFO_FILE), content)?;
    Ok(())
}

/// Read a `best_program_info.json`.
pub fn read_info(path: &Path) -> Result<BestProgramInfo> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
