use super::{split_lines, strip_ansi, truncate_line};
use crate::diagnostics::{Diagnostic, LogRange, Severity, TestSummary};
use once_cell::sync::Lazy;
use regex::Regex;

// ` FAIL  src/foo.test.ts > describe > test` (the double space after FAIL
// distinguishes vitest from jest).
static FAIL_TEST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ FAIL\s+(.+?)\s+>\s+(.+)$").expect("valid regex"));

// `    ❯ src/foo.test.ts:12:20`
static STACK_FRAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*❯\s+(.+):(\d+):(\d+)\b").expect("valid regex"));

static ERROR_MESSAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(AssertionError|AssertError|Error|TypeError|ReferenceError):\s*(.+)$")
        .expect("valid regex")
});

static EXPECTED_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*-\s+Expected\s*$").expect("valid regex"));
static RECEIVED_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\+\s+Received\s*$").expect("valid regex"));
static EXPECTED_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*-\s{3}(.+)$").expect("valid regex"));
static RECEIVED_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\+\s{3}(.+)$").expect("valid regex"));

static FAILED_TESTS_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ Failed Tests\s*(\d+)?").expect("valid regex"));

// ` Tests  2 failed | 14 passed (16)`
static SUMMARY_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*Tests\s+(.+)\((\d+)\)\s*$").expect("valid regex"));
static FAILED_COUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s+failed").expect("valid regex"));
static PASSED_COUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s+passed").expect("valid regex"));
static SKIPPED_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s+(?:skipped|todo)").expect("valid regex"));

#[derive(Default)]
struct PendingFailure {
    test_name: String,
    test_name_line: u64,
    file: Option<String>,
    line: Option<u64>,
    column: Option<u64>,
    expected: Option<String>,
    received: Option<String>,
    error_message: Option<String>,
}

pub fn parse_vitest_output(tool: &str, output: &str) -> Vec<Diagnostic> {
    let cleaned = strip_ansi(output);
    let lines = split_lines(&cleaned);
    let mut diagnostics = Vec::new();

    let mut pending: Option<PendingFailure> = None;
    let mut in_diff_block = false;

    for (i, raw_line) in lines.iter().enumerate() {
        let line = truncate_line(raw_line);
        let line_number = i as u64 + 1;

        if FAILED_TESTS_HEADER.is_match(line) {
            continue;
        }

        if let Some(caps) = FAIL_TEST.captures(line) {
            if let Some(done) = pending.take() {
                diagnostics.push(failure_diagnostic(tool, done));
            }
            pending = Some(PendingFailure {
                test_name: caps[2].trim().to_string(),
                test_name_line: line_number,
                file: Some(caps[1].trim().to_string()),
                ..PendingFailure::default()
            });
            in_diff_block = false;
            continue;
        }

        let Some(failure) = pending.as_mut() else {
            continue;
        };

        if failure.line.is_none() {
            if let Some(caps) = STACK_FRAME.captures(line) {
                failure.file = Some(caps[1].to_string());
                failure.line = caps[2].parse().ok();
                failure.column = caps[3].parse().ok();
                continue;
            }
        }

        if let Some(caps) = ERROR_MESSAGE.captures(line) {
            failure.error_message = Some(caps[2].trim().to_string());
            continue;
        }

        if EXPECTED_HEADER.is_match(line) {
            in_diff_block = true;
            continue;
        }
        if RECEIVED_HEADER.is_match(line) {
            continue;
        }

        if in_diff_block {
            if failure.expected.is_none() {
                if let Some(caps) = EXPECTED_VALUE.captures(line) {
                    failure.expected = Some(caps[1].trim().to_string());
                    continue;
                }
            }
            if failure.received.is_none() {
                if let Some(caps) = RECEIVED_VALUE.captures(line) {
                    failure.received = Some(caps[1].trim().to_string());
                    in_diff_block = false;
                }
            }
        }
    }

    if let Some(done) = pending {
        diagnostics.push(failure_diagnostic(tool, done));
    }

    diagnostics
}

fn failure_diagnostic(tool: &str, failure: PendingFailure) -> Diagnostic {
    let mut message = failure.test_name;
    match (&failure.expected, &failure.received) {
        (Some(expected), Some(received)) => {
            message.push_str(&format!(" - Expected: {expected}, Received: {received}"));
        }
        _ => {
            if let Some(error_message) = &failure.error_message {
                message.push_str(&format!(" - {error_message}"));
            }
        }
    }

    let mut diagnostic = Diagnostic::new(tool, Severity::Error, message);
    diagnostic.file = failure.file;
    diagnostic.line = failure.line;
    diagnostic.column = failure.column;
    diagnostic.log_range = LogRange::line(failure.test_name_line);
    diagnostic
}

pub fn parse_vitest_summary(output: &str) -> Option<TestSummary> {
    let cleaned = strip_ansi(output);

    for line in split_lines(&cleaned) {
        let Some(caps) = SUMMARY_LINE.captures(line) else {
            continue;
        };
        let tally = caps[1].to_string();
        let total = caps[2].parse().unwrap_or(0);
        return Some(TestSummary {
            failed: first_count(&FAILED_COUNT, &tally),
            passed: first_count(&PASSED_COUNT, &tally),
            skipped: first_count(&SKIPPED_COUNT, &tally),
            total,
            projects_build_failed: None,
        });
    }

    None
}

fn first_count(regex: &Regex, tally: &str) -> u64 {
    regex
        .captures(tally)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0)
}
