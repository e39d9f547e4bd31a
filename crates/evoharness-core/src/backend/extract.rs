//! Pulling program text out of a model completion.

use std::sync::OnceLock;

use regex::Regex;

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n(.*?)```").expect("static regex is valid")
    })
}

/// Body of the first fenced code block, or the whole trimmed text if unfenced.
pub fn extract_program(completion: &str) -> String {
    match fence_regex().captures(completion).and_then(|c| c.get(1)) {
        Some(body) => body.as_str().trim().to_string(),
        None => completion.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_tagged_fence() {
        let text = "Here you go:\n```rhai\nfn sort(a) { a }\n```\nEnjoy.";
        assert_eq!(extract_program(text), "fn sort(a) { a }");
    }

    #[test]
    fn test_takes_first_of_several_fences() {
        let text = "```\nfn a(x) { x }\n```\n```rhai\nfn b(x) { x }\n```";
        assert_eq!(extract_program(text), "fn a(x) { x }");
    }

    #[test]
    fn test_unfenced_text_used_as_is() {
        assert_eq!(extract_program("\n fn sort(a) { a }\n"), "fn sort(a) { a }");
    }
}
