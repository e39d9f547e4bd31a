//! ModelSelector: weighted random choice of a model backend per mutation request.
//!
//! Probability of each backend is `weight / Σweight` over the full configured
//! set. The weight table is validated once and never adapted. Randomness is
//! injected, so a seeded generator reproduces the same draw sequence.

use rand::Rng;

use crate::domain::ModelConfig;

/// Errors produced when building a selection universe.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SelectorError {
    #[error("model set is empty")]
    EmptyModelSet,

    #[error("invalid weights: {0}")]
    InvalidWeights(String),
}

impl From<SelectorError> for crate::domain::HarnessError {
    fn from(err: SelectorError) -> Self {
        match err {
            SelectorError::EmptyModelSet => crate::domain::HarnessError::EmptyModelSet,
            SelectorError::InvalidWeights(reason) => {
                crate::domain::HarnessError::InvalidWeights(reason)
            }
        }
    }
}

/// A validated, immutable weight table.
#[derive(Debug, Clone)]
pub struct ModelSelector {
    models: Vec<ModelConfig>,
    cumulative: Vec<f64>,
    total: f64,
}

impl ModelSelector {
    /// Validate `models` and build the cumulative weight table.
    pub fn new(models: Vec<ModelConfig>) -> Result<Self, SelectorError> {
        if models.is_empty() {
            return Err(SelectorError::EmptyModelSet);
        }

        let mut cumulative = Vec::with_capacity(models.len());
        let mut total = 0.0;
        for model in &models {
            if !model.weight.is_finite() || model.weight < 0.0 {
                return Err(SelectorError::InvalidWeights(format!(
                    "weight for '{}' must be a finite non-negative number, got {}",
                    model.name, model.weight
                )));
            }
            total += model.weight;
            cumulative.push(total);
        }
        if total <= 0.0 {
            return Err(SelectorError::InvalidWeights(
                "all weights are zero".to_string(),
            ));
        }
        if !total.is_finite() {
            return Err(SelectorError::InvalidWeights(
                "sum of weights overflows".to_string(),
            ));
        }

        Ok(Self {
            models,
            cumulative,
            total,
        })
    }

    pub fn models(&self) -> &[ModelConfig] {
        &self.models
    }

    /// Draw the index of one model.
    pub fn select_index<R: Rng>(&self, rng: &mut R) -> usize {
        let point = rng.gen_range(0.0..self.total);
        // Zero-weight buckets have an empty interval and are never chosen.
        self.cumulative
            .iter()
            .position(|&upper| point < upper)
            .unwrap_or(self.models.len() - 1)
    }

    /// Draw one model.
    pub fn select<R: Rng>(&self, rng: &mut R) -> &ModelConfig {
        &self.models[self.select_index(rng)]
    }
}
