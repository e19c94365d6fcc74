use super::{split_lines, truncate_line};
use crate::diagnostics::{Diagnostic, LogRange, Severity, TestSummary};
use once_cell::sync::Lazy;
use regex::Regex;

static FAIL_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^FAIL\s+(.+)$").expect("valid regex"));

// `  ● describe › test name` opens a failure block.
static TEST_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*●\s+(.+)$").expect("valid regex"));

// First stack frame usually points at the test file: `    at ... (file:line:col)`
static STACK_FRAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s+at\s+.+\((.+):(\d+):(\d+)\)$").expect("valid regex"));

static EXPECT_ASSERTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s+(expect\(.+\)\..+)$").expect("valid regex"));
static EXPECTED_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s+Expected:\s*(.+)$").expect("valid regex"));
static RECEIVED_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s+Received:\s*(.+)$").expect("valid regex"));

static SUMMARY_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Tests:\s+(.+)$").expect("valid regex"));
static FAILED_COUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s+failed").expect("valid regex"));
static PASSED_COUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s+passed").expect("valid regex"));
static SKIPPED_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s+(?:skipped|todo)").expect("valid regex"));
static TOTAL_COUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s+total").expect("valid regex"));

#[derive(Default)]
struct PendingFailure {
    test_name: String,
    test_name_line: u64,
    file: Option<String>,
    line: Option<u64>,
    column: Option<u64>,
    expected: Option<String>,
    received: Option<String>,
    assertion: Option<String>,
}

pub fn parse_jest_output(tool: &str, output: &str) -> Vec<Diagnostic> {
    let lines = split_lines(output);
    let mut diagnostics = Vec::new();

    let mut current_file: Option<String> = None;
    let mut pending: Option<PendingFailure> = None;

    for (i, raw_line) in lines.iter().enumerate() {
        let line = truncate_line(raw_line);
        let line_number = i as u64 + 1;

        if let Some(caps) = FAIL_FILE.captures(line) {
            current_file = Some(caps[1].trim().to_string());
            continue;
        }

        if let Some(caps) = TEST_NAME.captures(line) {
            if let Some(done) = pending.take() {
                diagnostics.push(failure_diagnostic(tool, done, current_file.as_deref()));
            }
            pending = Some(PendingFailure {
                test_name: caps[1].trim().to_string(),
                test_name_line: line_number,
                ..PendingFailure::default()
            });
            continue;
        }

        let Some(failure) = pending.as_mut() else {
            continue;
        };

        if let Some(caps) = EXPECT_ASSERTION.captures(line) {
            failure.assertion = Some(caps[1].trim().to_string());
            continue;
        }
        if let Some(caps) = EXPECTED_VALUE.captures(line) {
            failure.expected = Some(caps[1].trim().to_string());
            continue;
        }
        if let Some(caps) = RECEIVED_VALUE.captures(line) {
            failure.received = Some(caps[1].trim().to_string());
            continue;
        }
        if failure.file.is_none() {
            if let Some(caps) = STACK_FRAME.captures(line) {
                failure.file = Some(caps[1].to_string());
                failure.line = caps[2].parse().ok();
                failure.column = caps[3].parse().ok();
            }
        }
    }

    if let Some(done) = pending {
        diagnostics.push(failure_diagnostic(tool, done, current_file.as_deref()));
    }

    diagnostics
}

fn failure_diagnostic(tool: &str, failure: PendingFailure, fallback_file: Option<&str>) -> Diagnostic {
    let mut message = failure.test_name;
    match (&failure.expected, &failure.received) {
        (Some(expected), Some(received)) => {
            message.push_str(&format!(" - Expected: {expected}, Received: {received}"));
        }
        _ => {
            if let Some(assertion) = &failure.assertion {
                message.push_str(&format!(" - {assertion}"));
            }
        }
    }

    let mut diagnostic = Diagnostic::new(tool, Severity::Error, message);
    diagnostic.file = failure.file.or_else(|| fallback_file.map(str::to_string));
    diagnostic.line = failure.line;
    diagnostic.column = failure.column;
    diagnostic.log_range = LogRange::line(failure.test_name_line);
    diagnostic
}

/// Sums `Tests: 3 failed, 45 passed, 2 skipped, 50 total` tallies across
/// projects; `todo` counts as skipped.
pub fn parse_jest_summary(output: &str) -> Option<TestSummary> {
    let mut found = false;
    let mut summary = TestSummary::default();

    for line in split_lines(output) {
        let Some(caps) = SUMMARY_LINE.captures(line) else {
            continue;
        };
        found = true;
        let tally = &caps[1];
        summary.failed += first_count(&FAILED_COUNT, tally);
        summary.passed += first_count(&PASSED_COUNT, tally);
        summary.skipped += first_count(&SKIPPED_COUNT, tally);
        summary.total += first_count(&TOTAL_COUNT, tally);
    }

    found.then_some(summary)
}

fn first_count(regex: &Regex, tally: &str) -> u64 {
    regex
        .captures(tally)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0)
}
