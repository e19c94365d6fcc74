use super::{split_lines, truncate_line};
use crate::diagnostics::{Diagnostic, LogRange, Severity};
use once_cell::sync::Lazy;
use regex::Regex;

// npm prefixes every diagnostic line: `npm warn deprecated pkg@1.0.0: message`
// and `npm error code E404` / `npm error 404 Not Found`.
static NPM_WARN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^npm warn\s+(\w+)?\s*(.*)$").expect("valid regex"));
static NPM_ERROR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^npm error\s+(?:code\s+)?(\w+)?\s*(.*)$").expect("valid regex"));

// pnpm uses bare `WARN` markers and `ERR_PNPM_*` error codes.
static PNPM_WARN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*WARN\s+(\w+)?\s*(.+)$").expect("valid regex"));
static PNPM_ERROR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*ERR_PNPM_(\w+)\s+(.+)$").expect("valid regex"));

pub fn parse_npm_output(tool: &str, output: &str) -> Vec<Diagnostic> {
    parse_with(&NPM_WARN, &NPM_ERROR, tool, output)
}

pub fn parse_pnpm_output(tool: &str, output: &str) -> Vec<Diagnostic> {
    parse_with(&PNPM_WARN, &PNPM_ERROR, tool, output)
}

fn parse_with(warn: &Regex, error: &Regex, tool: &str, output: &str) -> Vec<Diagnostic> {
    let lines = split_lines(output);
    let mut diagnostics = Vec::new();

    for (i, raw_line) in lines.iter().enumerate() {
        let line = truncate_line(raw_line);
        let line_number = i as u64 + 1;

        if let Some(caps) = warn.captures(line) {
            diagnostics.push(line_diagnostic(
                tool,
                Severity::Warning,
                &caps,
                line_number,
            ));
            continue;
        }

        if let Some(caps) = error.captures(line) {
            diagnostics.push(line_diagnostic(tool, Severity::Error, &caps, line_number));
        }
    }

    diagnostics
}

fn line_diagnostic(
    tool: &str,
    severity: Severity,
    caps: &regex::Captures<'_>,
    line_number: u64,
) -> Diagnostic {
    let message = caps.get(2).map_or("", |m| m.as_str()).trim();
    let mut diagnostic = Diagnostic::new(tool, severity, message);
    diagnostic.code = caps
        .get(1)
        .map(|m| m.as_str().to_string())
        .filter(|code| !code.is_empty());
    diagnostic.log_range = LogRange::line(line_number);
    diagnostic
}
