use super::{severity_from_token, split_lines, truncate_line};
use crate::diagnostics::{Diagnostic, LogRange};
use once_cell::sync::Lazy;
use regex::Regex;

// Default format: src/foo.ts(10,5): error TS2322: message
static TSC_DEFAULT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?)\((\d+),(\d+)\):\s*(error|warning)\s+(TS\d+):\s*(.+)$")
        .expect("valid regex")
});

// Pretty format: src/foo.ts:10:5 - error TS2322: message
static TSC_PRETTY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?):(\d+):(\d+)\s*-\s*(error|warning)\s+(TS\d+):\s*(.+)$")
        .expect("valid regex")
});

pub fn parse_typescript_output(tool: &str, output: &str) -> Vec<Diagnostic> {
    let lines = split_lines(output);
    let mut diagnostics = Vec::new();

    for (i, raw_line) in lines.iter().enumerate() {
        let line = truncate_line(raw_line);
        let line_number = i as u64 + 1;

        let Some(caps) = TSC_DEFAULT
            .captures(line)
            .or_else(|| TSC_PRETTY.captures(line))
        else {
            continue;
        };

        let mut diagnostic = Diagnostic::new(tool, severity_from_token(&caps[4]), caps[6].trim());
        diagnostic.code = Some(caps[5].to_string());
        diagnostic.file = Some(caps[1].to_string());
        diagnostic.line = caps[2].parse().ok();
        diagnostic.column = caps[3].parse().ok();
        diagnostic.log_range = LogRange::line(line_number);
        diagnostics.push(diagnostic);
    }

    diagnostics
}
