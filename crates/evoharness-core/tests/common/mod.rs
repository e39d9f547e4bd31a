//! Shared fixtures: a sorting suite, candidate programs and a scripted backend.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use evoharness_core::backend::BackendResult;
use evoharness_core::{
    BackendError, CancellationHandle, ChatMessage, EvolutionConfig, ModelBackend, ModelConfig,
    RetryPolicy, TestCase, TestSuite,
};
use serde_json::json;

pub const SEED: &str = "fn sort_list(arr) { arr }";

/// Sorts lists of up to three elements; longer lists come back unchanged.
pub const SORTS_SHORT_LISTS: &str = r#"
fn sort_list(arr) {
    if arr.len() > 3 {
        return arr;
    }
    let n = arr.len();
    for i in 0..n {
        let m = n - 1 - i;
        for j in 0..m {
            if arr[j] > arr[j + 1] {
                let t = arr[j];
                arr[j] = arr[j + 1];
                arr[j + 1] = t;
            }
        }
    }
    arr
}
"#;

pub const SORTS_EVERYTHING: &str = r#"
fn sort_list(arr) {
    let n = arr.len();
    for i in 0..n {
        let m = n - 1 - i;
        for j in 0..m {
            if arr[j] > arr[j + 1] {
                let t = arr[j];
                arr[j] = arr[j + 1];
                arr[j + 1] = t;
            }
        }
    }
    arr
}
"#;

pub const THROWS: &str = r#"fn sort_list(arr) { throw "mutant failure"; }"#;

pub const RETURNS_EMPTY: &str = "fn sort_list(arr) { [] }";

/// Four cases; the seed passes none of them.
pub fn sort_suite() -> TestSuite {
    TestSuite::new(vec![
        TestCase::new(json!([3, 1, 2]), json!([1, 2, 3])),
        TestCase::new(json!([5, 2, 8, 1]), json!([1, 2, 5, 8])),
        TestCase::new(json!([2, 1]), json!([1, 2])),
        TestCase::new(json!([9, 7, 8]), json!([7, 8, 9])),
    ])
}

pub fn fenced(code: &str) -> String {
    format!("Here is the improved program:\n```rhai\n{}\n```\n", code.trim())
}

pub fn config(iterations: u32, offspring: usize) -> EvolutionConfig {
    EvolutionConfig {
        iterations,
        population_size: 2,
        offspring_per_generation: offspring,
        seed: Some(7),
        models: vec![
            ModelConfig::new("model-a", "http://unused/v1", 3.0),
            ModelConfig::new("model-b", "http://unused/v1", 1.0),
        ],
        test_cases: sort_suite(),
        retry: RetryPolicy {
            max_retries: 1,
            backoff_base_ms: 1,
            request_timeout_ms: 2_000,
        },
        ..Default::default()
    }
}

/// Answers calls from a fixed script, cycling when it runs out.
pub struct ScriptedBackend {
    script: Vec<BackendResult<String>>,
    calls: AtomicUsize,
    cancel_on_call: Option<CancellationHandle>,
    seen_models: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(script: Vec<BackendResult<String>>) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            cancel_on_call: None,
            seen_models: Mutex::new(Vec::new()),
        }
    }

    pub fn programs(programs: &[&str]) -> Self {
        Self::new(programs.iter().map(|p| Ok(fenced(p))).collect())
    }

    pub fn failing(error: BackendError) -> Self {
        Self::new(vec![Err(error)])
    }

    /// Trigger `handle` on every call.
    pub fn cancelling(mut self, handle: CancellationHandle) -> Self {
        self.cancel_on_call = Some(handle);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_models(&self) -> Vec<String> {
        self.seen_models.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn complete(
        &self,
        model: &ModelConfig,
        messages: &[ChatMessage],
    ) -> BackendResult<String> {
        assert_eq!(messages.len(), 2);
        self.seen_models.lock().unwrap().push(model.name.clone());
        if let Some(handle) = &self.cancel_on_call {
            handle.cancel();
        }
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.script[index % self.script.len()].clone()
    }
}
