//! Locating the callable under test inside a compiled candidate.
//!
//! The rule is a naming convention that mutation prompts must honor too: the
//! first public one-argument function, in declaration order, whose name
//! satisfies the configured [`TargetFunction`].

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use rhai::{FnAccess, AST};
use serde::{Deserialize, Serialize};

/// Naming rule for the function under test.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TargetFunction {
    /// Function name equals this identifier.
    Exact(String),
    /// Function name contains this keyword, case-insensitively.
    Contains(String),
}

impl Default for TargetFunction {
    fn default() -> Self {
        TargetFunction::Contains("sort".to_string())
    }
}

impl TargetFunction {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            TargetFunction::Exact(expected) => name == expected,
            TargetFunction::Contains(keyword) => {
                name.to_lowercase().contains(&keyword.to_lowercase())
            }
        }
    }
}

impl fmt::Display for TargetFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetFunction::Exact(name) => write!(f, "a function named '{}'", name),
            TargetFunction::Contains(keyword) => {
                write!(f, "a function whose name contains '{}'", keyword)
            }
        }
    }
}

fn fn_decl_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\bfn\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(").expect("static regex is valid")
    })
}

/// Function names in order of their first declaration in `source`.
fn declaration_order(source: &str) -> Vec<&str> {
    let mut seen = Vec::new();
    for caps in fn_decl_regex().captures_iter(source) {
        if let Some(name) = caps.get(1).map(|m| m.as_str()) {
            if !seen.contains(&name) {
                seen.push(name);
            }
        }
    }
    seen
}

/// Find the function under test, or `None`.
pub fn discover(ast: &AST, source: &str, rule: &TargetFunction) -> Option<String> {
    let mut eligible: Vec<String> = ast
        .iter_functions()
        .filter(|f| f.access == FnAccess::Public && f.params.len() == 1 && rule.matches(f.name))
        .map(|f| f.name.to_string())
        .collect();
    if eligible.is_empty() {
        return None;
    }

    let order = declaration_order(source);
    // Names the scan could not place sort after every placed name.
    eligible.sort_by_key(|name| {
        (
            order.iter().position(|n| *n == name.as_str()).unwrap_or(usize::MAX),
            name.clone(),
        )
    });
    eligible.into_iter().next()
}
