//! Test cases and the suite candidates are scored against.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a produced output is compared with the expected one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Comparator {
    /// JSON value equality.
    #[default]
    Exact,

    /// Numbers equal within `epsilon`, applied recursively through arrays and objects.
    Approx { epsilon: f64 },
}

impl Comparator {
    /// Compare `actual` with `expected` under this comparator.
    pub fn matches(&self, actual: &Value, expected: &Value) -> bool {
        match self {
            Comparator::Exact => actual == expected,
            Comparator::Approx { epsilon } => approx_eq(actual, expected, *epsilon),
        }
    }
}

fn approx_eq(actual: &Value, expected: &Value, epsilon: f64) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => (a - b).abs() <= epsilon,
            _ => a == b,
        },
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| approx_eq(x, y, epsilon))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, x)| b.get(k).is_some_and(|y| approx_eq(x, y, epsilon)))
        }
        _ => actual == expected,
    }
}

/// One input/expected-output pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestCase {
    /// Value passed to the candidate function.
    pub input: Value,

    /// Value the candidate must return.
    pub expected: Value,

    /// Comparison rule for this case.
    #[serde(default)]
    pub comparator: Comparator,
}

impl TestCase {
    /// Create a case compared by value equality.
    pub fn new(input: Value, expected: Value) -> Self {
        Self {
            input,
            expected,
            comparator: Comparator::Exact,
        }
    }

    /// Override the comparator.
    pub fn with_comparator(mut self, comparator: Comparator) -> Self {
        self.comparator = comparator;
        self
    }

    /// Whether `actual` satisfies this case.
    pub fn accepts(&self, actual: &Value) -> bool {
        self.comparator.matches(actual, &self.expected)
    }
}

/// The fixed suite of a run. Defined once and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct TestSuite {
    cases: Vec<TestCase>,
}

impl TestSuite {
    pub fn new(cases: Vec<TestCase>) -> Self {
        Self { cases }
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Human-readable listing used in mutation prompts.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for (i, case) in self.cases.iter().enumerate() {
            out.push_str(&format!(
                "{}. input: {} -> expected: {}\n",
                i + 1,
                case.input,
                case.expected
            ));
        }
        out
    }
}

impl From<Vec<TestCase>> for TestSuite {
    fn from(cases: Vec<TestCase>) -> Self {
        Self::new(cases)
    }
}
