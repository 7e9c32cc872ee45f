//! Static checks for contract artifacts.
//!
//! Catches artifacts that `accord_core::deserialize` would reject, plus a
//! few that it would load but that are probably mistakes.
//!
//! # Example
//!
//! ```no_run
//! use accord_lint::{lint_directory, lint_file, LintOptions};
//! use std::path::Path;
//!
//! let result = lint_file(Path::new("pacts/web-api.json"), &LintOptions::default());
//! let all = lint_directory(Path::new("pacts"), &LintOptions::default());
//!
//! if result.has_errors() || all.has_errors() {
//!     eprintln!("Found {} errors", result.errors + all.errors);
//! }
//! ```

mod types;
mod validator;

use std::path::Path;

pub use types::{LintIssue, LintOptions, LintResult, Severity};

pub use validator::{
    validate_contract, validate_headers, validate_interaction, validate_matching_rules,
    validate_message, validate_request, validate_response, validate_rule,
};

/// Lint a single artifact file.
pub fn lint_file(path: &Path, options: &LintOptions) -> LintResult {
    let mut result = LintResult::new();
    result.files_checked = 1;

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            result.add_issue(LintIssue::error(
                "E001",
                format!("Failed to read file: {e}"),
                path,
            ));
            return result;
        }
    };

    check_json(&content, path, &mut result, options);
    result
}

/// Lint every `.json` file directly inside a directory, in name order.
pub fn lint_directory(path: &Path, options: &LintOptions) -> LintResult {
    let mut result = LintResult::new();

    let entries = match std::fs::read_dir(path) {
        Ok(e) => e,
        Err(e) => {
            result.add_issue(LintIssue::error(
                "E001",
                format!("Failed to read directory: {e}"),
                path,
            ));
            return result;
        }
    };

    let mut files: Vec<_> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();

    for file in files {
        result.merge(lint_file(&file, options));
    }
    result
}

/// Lint an in-memory artifact; `source_name` is used as the file name in issues.
pub fn lint_json(json: &str, source_name: &str, options: &LintOptions) -> LintResult {
    let mut result = LintResult::new();
    result.files_checked = 1;
    check_json(json, Path::new(source_name), &mut result, options);
    result
}

fn check_json(content: &str, path: &Path, result: &mut LintResult, options: &LintOptions) {
    match serde_json::from_str::<serde_json::Value>(content) {
        Ok(value) => validate_contract(path, &value, result, options),
        Err(e) => result.add_issue(
            LintIssue::error("E002", format!("Invalid JSON: {e}"), path)
                .with_suggestion("Check for JSON syntax errors"),
        ),
    }
}
