//! Evolution run configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::backend::RetryPolicy;
use crate::domain::{HarnessError, ModelConfig, Result, TestSuite};
use crate::executor::{ExecutionLimits, TargetFunction};
use crate::selector::ModelSelector;

/// Explicit configuration for one run. Never mutated once the run starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Number of generations after seeding.
    pub iterations: u32,

    /// Survivors kept per generation (K).
    pub population_size: usize,

    /// Mutation slots issued per generation.
    pub offspring_per_generation: usize,

    /// Stop once the best-ever score reaches this value.
    pub early_stop_score: Option<f64>,

    /// Seed for model selection; `None` draws from OS entropy.
    pub seed: Option<u64>,

    pub target_function: TargetFunction,

    pub limits: ExecutionLimits,

    pub retry: RetryPolicy,

    /// Candidates scored concurrently within a generation.
    pub max_concurrent_evaluations: usize,

    pub models: Vec<ModelConfig>,

    pub test_cases: TestSuite,

    /// Replaces the default system message of mutation requests.
    pub system_prompt: Option<String>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            population_size: 4,
            offspring_per_generation: 4,
            early_stop_score: Some(1.0),
            seed: None,
            target_function: TargetFunction::default(),
            limits: ExecutionLimits::default(),
            retry: RetryPolicy::default(),
            max_concurrent_evaluations: 4,
            models: Vec::new(),
            test_cases: TestSuite::default(),
            system_prompt: None,
        }
    }
}

impl EvolutionConfig {
    /// Parse a JSON configuration document.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Check every fatal condition. Returns the validated weight table.
    pub fn validate(&self) -> Result<ModelSelector> {
        if self.test_cases.is_empty() {
            return Err(HarnessError::EmptyTestSuite);
        }
        let selector = ModelSelector::new(self.models.clone())?;

        if self.population_size == 0 {
            return Err(HarnessError::InvalidConfig(
                "population_size must be at least 1".to_string(),
            ));
        }
        if self.offspring_per_generation == 0 {
            return Err(HarnessError::InvalidConfig(
                "offspring_per_generation must be at least 1".to_string(),
            ));
        }
        if self.max_concurrent_evaluations == 0 {
            return Err(HarnessError::InvalidConfig(
                "max_concurrent_evaluations must be at least 1".to_string(),
            ));
        }
        if self.limits.timeout_ms == 0 {
            return Err(HarnessError::InvalidConfig(
                "limits.timeout_ms must be positive".to_string(),
            ));
        }
        if let Some(threshold) = self.early_stop_score {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(HarnessError::InvalidConfig(format!(
                    "early_stop_score must be within [0, 1], got {}",
                    threshold
                )));
            }
        }
        Ok(selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TestCase;
    use serde_json::json;

    fn valid() -> EvolutionConfig {
        EvolutionConfig {
            models: vec![ModelConfig::new("m", "http://localhost", 1.0)],
            test_cases: TestSuite::new(vec![TestCase::new(json!([1]), json!([1]))]),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config_passes() {
        let selector = valid().validate().expect("valid");
        assert_eq!(selector.models().len(), 1);
    }

    #[test]
    fn test_empty_suite_is_rejected_first() {
        let mut config = valid();
        config.test_cases = TestSuite::default();
        config.models.clear();
        assert!(matches!(config.validate(), Err(HarnessError::EmptyTestSuite)));
    }

    #[test]
    fn test_model_set_errors() {
        let mut config = valid();
        config.models.clear();
        assert!(matches!(config.validate(), Err(HarnessError::EmptyModelSet)));

        config.models = vec![ModelConfig::new("m", "http://localhost", 0.0)];
        assert!(matches!(config.validate(), Err(HarnessError::InvalidWeights(_))));
    }

    #[test]
    fn test_zero_population_is_invalid() {
        let mut config = valid();
        config.population_size = 0;
        assert!(matches!(config.validate(), Err(HarnessError::InvalidConfig(_))));
    }

    #[test]
    fn test_early_stop_out_of_range() {
        let mut config = valid();
        config.early_stop_score = Some(1.5);
        assert!(matches!(config.validate(), Err(HarnessError::InvalidConfig(_))));
    }

    #[test]
    fn test_parse_minimal_json() {
        let config = EvolutionConfig::from_json_str(
            r#"{
                "iterations": 3,
                "models": [{"name": "a", "api_base": "http://x/v1", "weight": 3}],
                "test_cases": [{"input": [2, 1], "expected": [1, 2]}],
                "target_function": {"exact": "sort_list"},
                "limits": {"timeout_ms": 500}
            }"#,
        )
        .expect("parse");
        assert_eq!(config.iterations, 3);
        assert_eq!(config.population_size, 4);
        assert_eq!(config.models[0].weight, 3.0);
        assert_eq!(config.test_cases.len(), 1);
        assert_eq!(config.target_function, TargetFunction::Exact("sort_list".into()));
        assert_eq!(config.limits.timeout_ms, 500);
        assert_eq!(config.limits.max_call_depth, 64);
        assert_eq!(config.early_stop_score, Some(1.0));
    }
}
