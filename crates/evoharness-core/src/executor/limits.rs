//! Resource bounds applied to every candidate invocation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Limits for one candidate execution unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutionLimits {
    /// Maximum wall-clock time for a single call (milliseconds).
    pub timeout_ms: u64,
    /// Maximum number of engine operations per call (0 = unlimited).
    pub max_operations: u64,
    /// Maximum function call nesting.
    pub max_call_depth: usize,
    /// Maximum expression nesting, applied to statements and function bodies.
    pub max_expr_depth: usize,
    /// Maximum length of any string value (0 = unlimited).
    pub max_string_size: usize,
    /// Maximum length of any array value (0 = unlimited).
    pub max_array_size: usize,
    /// Maximum number of entries in any map value (0 = unlimited).
    pub max_map_size: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            timeout_ms: 2_000,
            max_operations: 5_000_000,
            max_call_depth: 64,
            max_expr_depth: 64,
            max_string_size: 1 << 20,
            max_array_size: 1 << 20,
            max_map_size: 1 << 16,
        }
    }
}

impl ExecutionLimits {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
