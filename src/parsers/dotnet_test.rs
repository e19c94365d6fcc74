use super::{split_lines, truncate_line};
use crate::diagnostics::{Diagnostic, LogRange, Severity, TestSummary};
use once_cell::sync::Lazy;
use regex::Regex;

// Failed-test marker: `  Failed Namespace.Class.TestName [23 ms]`
static FAILED_TEST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*Failed\s+(.+?)\s+\[").expect("valid regex"));

// Stack frame location: `at Foo.Bar() in /src/FooTests.cs:line 42`
static STACK_LOCATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"in\s+(.+?):line\s+(\d+)").expect("valid regex"));

// Per-project tally: `Failed! - Failed: 2, Passed: 9, Skipped: 0, Total: 11`
static SUMMARY_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:Passed!|Failed!)\s*-\s*Failed:\s*(\d+),\s*Passed:\s*(\d+),\s*Skipped:\s*(\d+),\s*Total:\s*(\d+)",
    )
    .expect("valid regex")
});

// Compiler errors attributed to a test project:
// `... : error CS0021: message [/src/Something.Tests.csproj]`
static TEST_PROJECT_BUILD_ERROR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r": error \w+\d+:.+\[(.+?\.Tests\.csproj)\]").expect("valid regex")
});

struct TestFailure {
    error_message: String,
    file: Option<String>,
    line: Option<u64>,
    start_line: u64,
    end_line: u64,
}

/// Scans for failed-test blocks: an opening `Failed <name> [` line, then
/// subsequent lines until a blank line or the next opening line, picking up
/// the `Error Message:` payload and the first stack-frame location.
pub fn parse_test_output(tool: &str, output: &str) -> Vec<Diagnostic> {
    let lines = split_lines(output);
    let mut failures = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let line = truncate_line(lines[i]);
        let Some(caps) = FAILED_TEST.captures(line) else {
            i += 1;
            continue;
        };

        let test_name = caps[1].to_string();
        let start_line = i as u64 + 1;
        let mut error_message = String::new();
        let mut file = None;
        let mut file_line = None;
        let mut end_line = start_line;

        i += 1;
        while i < lines.len() {
            let next_line = truncate_line(lines[i]);

            if FAILED_TEST.is_match(next_line) || next_line.trim().is_empty() {
                if next_line.trim().is_empty() {
                    i += 1;
                }
                break;
            }

            if next_line.contains("Error Message:") {
                i += 1;
                if let Some(message_line) = lines.get(i) {
                    error_message = message_line.trim().to_string();
                }
            }

            if file.is_none() {
                if let Some(stack) = STACK_LOCATION.captures(next_line) {
                    file = Some(stack[1].to_string());
                    file_line = stack[2].parse().ok();
                }
            }

            end_line = i as u64 + 1;
            i += 1;
        }

        if error_message.is_empty() {
            error_message = format!("Test {test_name} failed");
        }
        failures.push(TestFailure {
            error_message,
            file,
            line: file_line,
            start_line,
            end_line,
        });
    }

    failures
        .into_iter()
        .map(|failure| {
            let mut diagnostic = Diagnostic::new(tool, Severity::Error, failure.error_message);
            diagnostic.code = Some("TestFailure".to_string());
            diagnostic.file = failure.file;
            diagnostic.line = failure.line;
            diagnostic.log_range = LogRange::span(failure.start_line, failure.end_line);
            diagnostic
        })
        .collect()
}

/// Sums the per-project tally lines a monorepo test run emits, and counts
/// distinct test projects that failed to build (surfaced separately, not
/// folded into the pass/fail counts).
pub fn parse_test_summary(output: &str) -> Option<TestSummary> {
    let mut found = false;
    let mut summary = TestSummary::default();

    for caps in SUMMARY_LINE.captures_iter(output) {
        found = true;
        summary.failed += caps[1].parse::<u64>().unwrap_or(0);
        summary.passed += caps[2].parse::<u64>().unwrap_or(0);
        summary.skipped += caps[3].parse::<u64>().unwrap_or(0);
        summary.total += caps[4].parse::<u64>().unwrap_or(0);
    }

    let mut failed_projects = std::collections::HashSet::new();
    for caps in TEST_PROJECT_BUILD_ERROR.captures_iter(output) {
        failed_projects.insert(caps[1].to_string());
    }
    if !failed_projects.is_empty() {
        found = true;
        summary.projects_build_failed = Some(failed_projects.len() as u64);
    }

    found.then_some(summary)
}
