//! Unit tests for attribute parsing and macro expansion


/// Generated code with all whitespace removed, for pattern checks
pub(crate) fn normalize_generated_code(code: &str) -> String {
    code.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Whitespace-insensitive containment check on generated code
pub(crate) fn contains_pattern(code: &str, pattern: &str) -> bool {
    normalize_generated_code(code).contains(&normalize_generated_code(pattern))
}
