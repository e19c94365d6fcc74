use super::{split_lines, truncate_line};
use crate::diagnostics::{Diagnostic, LogRange, Severity};
use once_cell::sync::Lazy;
use regex::Regex;

// Next.js reports type errors over two lines:
//   ./app/page.tsx:10:5
//   Type error: Some error message
static LOCATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\.?/?.+?\.[a-zA-Z]+):(\d+):(\d+)\s*$").expect("valid regex"));
static TYPE_ERROR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Type error:\s*(.+)$").expect("valid regex"));

pub fn parse_nextjs_output(tool: &str, output: &str) -> Vec<Diagnostic> {
    let lines = split_lines(output);
    let mut diagnostics = Vec::new();

    for i in 0..lines.len().saturating_sub(1) {
        let line = truncate_line(lines[i]);
        let next_line = truncate_line(lines[i + 1]);

        let Some(location) = LOCATION.captures(line) else {
            continue;
        };
        let Some(error) = TYPE_ERROR.captures(next_line) else {
            continue;
        };

        let log_line = i as u64 + 1;
        let mut diagnostic = Diagnostic::new(tool, Severity::Error, error[1].trim());
        diagnostic.file = Some(location[1].to_string());
        diagnostic.line = location[2].parse().ok();
        diagnostic.column = location[3].parse().ok();
        diagnostic.log_range = LogRange::span(log_line, log_line + 1);
        diagnostics.push(diagnostic);
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_line_type_error_spans_both_lines() {
        let output = "./app/page.tsx:10:5\nType error: Property 'foo' does not exist\n";
        let diagnostics = parse_nextjs_output("npm.build", output);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].file.as_deref(), Some("./app/page.tsx"));
        assert_eq!(diagnostics[0].line, Some(10));
        assert_eq!(diagnostics[0].column, Some(5));
        assert_eq!(diagnostics[0].log_range, LogRange::span(1, 2));
    }

    #[test]
    fn location_line_without_type_error_is_ignored() {
        let output = "./app/page.tsx:10:5\nsome unrelated output\n";
        assert!(parse_nextjs_output("npm.build", output).is_empty());
    }
}
