//! Accord contract artifact linter CLI
//!
//! Usage:
//!   accord-lint <file_or_directory> [OPTIONS]

use accord_lint::{lint_directory, lint_file, LintIssue, LintOptions, LintResult, Severity};
use clap::{Parser, ValueEnum};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Accord contract artifact linter
#[derive(Parser, Debug)]
#[command(name = "accord-lint")]
#[command(author, version, about = "Validate contract artifacts before publishing them")]
struct Args {
    /// Artifact file or directory of artifacts
    #[arg(required = true)]
    path: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Only show errors (hide warnings)
    #[arg(short = 'e', long)]
    errors_only: bool,

    /// Treat warnings as errors
    #[arg(short, long)]
    strict: bool,

    /// Skip the check for body rules that address nothing
    #[arg(long)]
    no_coverage: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let options = LintOptions {
        check_rule_coverage: !args.no_coverage,
    };

    let result = lint_path(&args.path, &options);

    match args.output {
        OutputFormat::Json => print_results_json(&result),
        OutputFormat::Text => print_results(&result, &args),
    }

    let failed = result.has_errors() || (args.strict && result.has_warnings());
    if failed {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

fn lint_path(path: &Path, options: &LintOptions) -> LintResult {
    if path.is_dir() {
        lint_directory(path, options)
    } else {
        lint_file(path, options)
    }
}

fn print_results_json(result: &LintResult) {
    match serde_json::to_string_pretty(result) {
        Ok(output) => println!("{output}"),
        Err(e) => eprintln!("{RED}Failed to render results: {e}{RESET}"),
    }
}

fn print_results(result: &LintResult, args: &Args) {
    println!("{BOLD}{CYAN}Accord Contract Linter{RESET}");
    println!("{DIM}Scanning:{RESET} {CYAN}{}{RESET}\n", args.path.display());

    let mut by_file: BTreeMap<&PathBuf, Vec<&LintIssue>> = BTreeMap::new();
    for issue in &result.issues {
        if args.errors_only && issue.severity != Severity::Error {
            continue;
        }
        by_file.entry(&issue.file).or_default().push(issue);
    }

    if by_file.is_empty() {
        println!("{GREEN}{BOLD}No issues found!{RESET}");
    }

    for (file, issues) in by_file {
        let errors = issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count();
        let status = if errors > 0 {
            format!("{RED}FAIL{RESET}")
        } else {
            format!("{YELLOW}WARN{RESET}")
        };
        let file_name = file.file_name().unwrap_or_default().to_string_lossy();
        println!(
            "{status} {BOLD}{CYAN}{file_name}{RESET} {DIM}({} issue(s)){RESET}",
            issues.len()
        );

        for issue in issues {
            let color = severity_color(issue.severity);
            let location = issue
                .location
                .as_ref()
                .map(|l| format!("{DIM}[{RESET}{CYAN}{l}{RESET}{DIM}]{RESET} "))
                .unwrap_or_default();
            println!(
                "  {color}|{RESET} {location}{BOLD}{color}{}{RESET}: {} {DIM}({}){RESET}",
                issue.severity.label(),
                issue.message,
                issue.code
            );
            if let Some(suggestion) = &issue.suggestion {
                println!("  {color}|{RESET}   {GREEN}-> {suggestion}{RESET}");
            }
        }
        println!();
    }

    println!(
        "{DIM}Files checked:{RESET} {BOLD}{}{RESET}  {RED}Errors:{RESET} {BOLD}{}{RESET}  {YELLOW}Warnings:{RESET} {BOLD}{}{RESET}",
        result.files_checked, result.errors, result.warnings
    );
    if result.errors == 0 && result.warnings == 0 {
        println!("{GREEN}{BOLD}All checks passed!{RESET}");
    } else if result.errors == 0 {
        println!("{YELLOW}{BOLD}Passed with warnings{RESET}");
    } else {
        println!("{RED}{BOLD}Linting failed with errors{RESET}");
    }
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => RED,
        Severity::Warning => YELLOW,
    }
}
