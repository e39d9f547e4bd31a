//! Mutation prompts sent to model backends.

use crate::backend::ChatMessage;
use crate::domain::{CandidateProgram, EvaluationResult, TestSuite};
use crate::executor::TargetFunction;

/// Default system message.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert programmer improving a program written in the Rhai \
scripting language. Rhai functions are declared with `fn name(arg) { ... }`, arrays support \
`len()`, indexing and `push`, and the last expression of a function is its return value. \
The program runs without any I/O, imports or `eval`.";

/// Failing cases shown to the model are capped at this many.
const MAX_FAILURES_SHOWN: usize = 8;

/// Build the request for one mutation of `parent`.
pub fn mutation_messages(
    system_prompt: Option<&str>,
    target: &TargetFunction,
    suite: &TestSuite,
    parent: &CandidateProgram,
    evaluation: &EvaluationResult,
) -> Vec<ChatMessage> {
    let mut user = String::new();
    user.push_str(&format!(
        "Rewrite the program below so that it passes every test case. The program must define {} \
taking exactly one argument and returning the result.\n\n",
        target
    ));

    user.push_str("## Test cases\n");
    user.push_str(&suite.describe());

    user.push_str(&format!(
        "\n## Current program (score {:.3}, {}/{} passed)\n```rhai\n{}\n```\n",
        evaluation.score,
        evaluation.passed,
        evaluation.total,
        parent.code.trim()
    ));

    if let Some(diagnostic) = &evaluation.diagnostic {
        user.push_str(&format!("\nThe program could not run: {}\n", diagnostic));
    }

    let failing: Vec<_> = evaluation.cases.iter().filter(|c| !c.passed).collect();
    if !failing.is_empty() {
        user.push_str("\n## Failing cases\n");
        for case in failing.iter().take(MAX_FAILURES_SHOWN) {
            let input = suite
                .cases()
                .get(case.case_index)
                .map(|c| c.input.to_string())
                .unwrap_or_default();
            match (&case.output, &case.failure) {
                (_, Some(failure)) => {
                    user.push_str(&format!("- input {}: {}\n", input, failure));
                }
                (Some(output), None) => {
                    user.push_str(&format!("- input {}: returned {}\n", input, output));
                }
                (None, None) => {
                    user.push_str(&format!("- input {}: no output\n", input));
                }
            }
        }
    }

    user.push_str("\nRespond with the complete program in a single ```rhai code block.");

    vec![
        ChatMessage::system(system_prompt.unwrap_or(DEFAULT_SYSTEM_PROMPT)),
        ChatMessage::user(user),
    ]
}
