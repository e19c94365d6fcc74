use super::{severity_from_token, split_lines, truncate_line};
use crate::diagnostics::{Diagnostic, LogRange};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

// Source file diagnostics: path/File.cs(10,5): error CS1234: message
static SOURCE_DIAGNOSTIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?)\((\d+),(\d+)\):\s*(error|warning)\s+(\w+):\s*(.+)$").expect("valid regex")
});

// Project-level diagnostics without a source location, e.g.
// `Project.csproj : error MSB3021: message` or `MSBUILD : error MSB1009: message`
static PROJECT_DIAGNOSTIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?)\s*:\s*(error|warning)\s+(\w+):\s*(.+)$").expect("valid regex")
});

static RETRY_IN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)retry \d+ in \d+ms").expect("valid regex"));
static RETRY_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)retry count of \d+").expect("valid regex"));

pub fn parse_build_line(raw_line: &str, line_number: u64, tool: &str) -> Option<Diagnostic> {
    let line = truncate_line(raw_line);

    if let Some(caps) = SOURCE_DIAGNOSTIC.captures(line) {
        let mut diagnostic =
            Diagnostic::new(tool, severity_from_token(&caps[4]), caps[6].trim());
        diagnostic.code = Some(caps[5].to_string());
        diagnostic.file = Some(caps[1].trim().to_string());
        diagnostic.line = caps[2].parse().ok();
        diagnostic.column = caps[3].parse().ok();
        diagnostic.log_range = LogRange::line(line_number);
        return Some(diagnostic);
    }

    if let Some(caps) = PROJECT_DIAGNOSTIC.captures(line) {
        let mut diagnostic =
            Diagnostic::new(tool, severity_from_token(&caps[2]), caps[4].trim());
        diagnostic.code = Some(caps[3].to_string());
        diagnostic.file = Some(caps[1].trim().to_string());
        diagnostic.log_range = LogRange::line(line_number);
        return Some(diagnostic);
    }

    None
}

pub fn parse_build_output(tool: &str, output: &str) -> Vec<Diagnostic> {
    let lines = split_lines(output);
    let mut diagnostics = Vec::new();

    for (i, raw_line) in lines.iter().enumerate() {
        if let Some(diagnostic) = parse_build_line(raw_line, i as u64 + 1, tool) {
            diagnostics.push(diagnostic);
        }
    }

    collapse_retry_warnings(diagnostics)
}

/// MSBuild repeats file-lock warnings (MSB3026 and friends) once per retry
/// attempt with only the counters changing; N retries of the same underlying
/// problem collapse to one diagnostic. Applied before any cross-parser dedup.
fn collapse_retry_warnings(diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
    let mut seen = HashSet::new();
    let mut result = Vec::with_capacity(diagnostics.len());

    for diagnostic in diagnostics {
        let normalized = RETRY_IN.replace_all(&diagnostic.message, "retry N");
        let normalized = RETRY_COUNT.replace_all(&normalized, "retry count of N");
        let key = format!(
            "{}:{}:{}:{}",
            diagnostic.severity,
            diagnostic.code.as_deref().unwrap_or(""),
            diagnostic.file.as_deref().unwrap_or(""),
            normalized
        );
        if seen.insert(key) {
            result.push(diagnostic);
        }
    }

    result
}
