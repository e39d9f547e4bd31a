//! Scored population and the selection policy.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::domain::{CandidateProgram, EvaluationResult};

/// A candidate together with its evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub program: CandidateProgram,
    pub evaluation: EvaluationResult,
}

impl ScoredCandidate {
    pub fn new(program: CandidateProgram, evaluation: EvaluationResult) -> Self {
        Self {
            program,
            evaluation,
        }
    }

    pub fn score(&self) -> f64 {
        self.evaluation.score
    }
}

/// Selection order: score descending, then lower generation, then lower id.
pub fn rank(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score()
        .total_cmp(&a.score())
        .then_with(|| a.program.generation.cmp(&b.program.generation))
        .then_with(|| a.program.id.cmp(&b.program.id))
}

/// Survivors of the latest generation, ranked best first.
///
/// Never empty: it starts from the scored seed and selection keeps at least
/// one member of a non-empty union.
#[derive(Debug, Clone)]
pub struct Population {
    capacity: usize,
    members: Vec<ScoredCandidate>,
}

impl Population {
    /// `capacity` is clamped to at least one.
    pub fn new(capacity: usize, seed: ScoredCandidate) -> Self {
        Self {
            capacity: capacity.max(1),
            members: vec![seed],
        }
    }

    pub fn members(&self) -> &[ScoredCandidate] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn best(&self) -> &ScoredCandidate {
        &self.members[0]
    }

    /// Parent for mutation slot `slot`: cycles through members best first.
    pub fn parent_for_slot(&self, slot: usize) -> &ScoredCandidate {
        &self.members[slot % self.members.len()]
    }

    /// Rank the union of current members and `offspring`, keep the top K.
    pub fn select(&mut self, offspring: Vec<ScoredCandidate>) {
        self.members.extend(offspring);
        self.members.sort_by(rank);
        self.members.truncate(self.capacity);
    }
}

/// Best-ever candidate of a run. Replaced only by a strictly higher score, so
/// ties keep the older candidate and the score never decreases.
#[derive(Debug, Clone)]
pub struct BestTracker {
    best: ScoredCandidate,
}

impl BestTracker {
    pub fn new(initial: ScoredCandidate) -> Self {
        Self { best: initial }
    }

    pub fn get(&self) -> &ScoredCandidate {
        &self.best
    }

    /// Offer a candidate; returns whether it became the new best.
    pub fn offer(&mut self, candidate: &ScoredCandidate) -> bool {
        if candidate.score() > self.best.score() {
            self.best = candidate.clone();
            true
        } else {
            false
        }
    }

    pub fn into_inner(self) -> ScoredCandidate {
        self.best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CandidateId;

    fn scored(id: u64, generation: u32, passed: usize) -> ScoredCandidate {
        let program = CandidateProgram {
            id: CandidateId(id),
            generation,
            parent: None,
            model: None,
            code: format!("fn sort_{}(a) {{ a }}", id).into(),
        };
        ScoredCandidate::new(
            program,
            EvaluationResult {
                score: passed as f64 / 4.0,
                passed,
                total: 4,
                cases: Vec::new(),
                diagnostic: None,
            },
        )
    }

    #[test]
    fn test_select_keeps_top_k_by_score() {
        let mut population = Population::new(2, scored(0, 0, 1));
        population.select(vec![scored(1, 1, 3), scored(2, 1, 0), scored(3, 1, 2)]);
        let ids: Vec<u64> = population.members().iter().map(|m| m.program.id.0).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(population.best().program.id, CandidateId(1));
    }

    #[test]
    fn test_ties_prefer_older_generation() {
        let mut population = Population::new(1, scored(0, 0, 2));
        population.select(vec![scored(1, 1, 2)]);
        assert_eq!(population.best().program.id, CandidateId(0));
    }

    #[test]
    fn test_parent_for_slot_cycles() {
        let mut population = Population::new(3, scored(0, 0, 0));
        population.select(vec![scored(1, 1, 4), scored(2, 1, 2)]);
        assert_eq!(population.parent_for_slot(0).program.id, CandidateId(1));
        assert_eq!(population.parent_for_slot(1).program.id, CandidateId(2));
        assert_eq!(population.parent_for_slot(3).program.id, CandidateId(1));
    }

    #[test]
    fn test_best_tracker_is_monotonic() {
        let mut tracker = BestTracker::new(scored(0, 0, 2));
        assert!(!tracker.offer(&scored(1, 1, 2)));
        assert!(!tracker.offer(&scored(2, 1, 1)));
        assert!(tracker.offer(&scored(3, 2, 3)));
        assert_eq!(tracker.get().program.id, CandidateId(3));
    }
}
