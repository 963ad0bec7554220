//! Custom assertions for integration tests

use serde_json::Value;

/// Assert that output is valid JSON and return parsed value
pub fn assert_valid_json(output: &str, context: &str) -> Value {
    serde_json::from_str(output).unwrap_or_else(|e| {
        panic!(
            "Expected valid JSON ({}): {}\nOutput:\n{}",
            context, e, output
        )
    })
}

/// Assert that `text` contains `needle`
pub fn assert_contains(text: &str, needle: &str) {
    assert!(
        text.contains(needle),
        "Expected to find {:?} in:\n{}",
        needle,
        text
    );
}

pub fn assert_not_contains(text: &str, needle: &str) {
    assert!(
        !text.contains(needle),
        "Did not expect {:?} in:\n{}",
        needle,
        text
    );
}

/// Assert the three-line text report
pub fn assert_counts(output: &str, converted: usize, conflicting: usize, rejected: usize) {
    let expected = format!(
        "{} converted\n{} potentially conflicting\n{} change(s) rejected\n",
        converted, conflicting, rejected
    );
    assert_eq!(output, expected, "Unexpected report");
}

/// Assert that `text` contains `lines` consecutively, ignoring indentation
pub fn assert_lines(text: &str, lines: &[&str]) {
    let trimmed: Vec<&str> = text.lines().map(str::trim).collect();
    let found = trimmed.windows(lines.len()).any(|window| window == lines);
    assert!(found, "Expected consecutive lines {:?} in:\n{}", lines, text);
}
