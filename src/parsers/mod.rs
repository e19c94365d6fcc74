use crate::diagnostics::{Diagnostic, Severity};
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashSet;

pub mod dotnet_test;
pub mod eslint;
pub mod jest;
pub mod msbuild;
pub mod nextjs;
pub mod package_manager;
pub mod typescript;
pub mod vitest;

/// Lines longer than this are cut before regex matching; real diagnostics fit
/// comfortably, and pathological single-line output should not stall parsing.
pub const MAX_PARSE_LINE_LEN: usize = 4096;

/// One text parser over a tool's combined output. Each parser is a pure
/// function of the raw text; which parsers apply to a tool is decided by the
/// plugin catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserKind {
    Npm,
    Pnpm,
    Msbuild,
    DotnetTest,
    Typescript,
    Nextjs,
    Jest,
    Vitest,
    Eslint,
}

impl ParserKind {
    pub fn parse(self, tool: &str, output: &str) -> Vec<Diagnostic> {
        match self {
            ParserKind::Npm => package_manager::parse_npm_output(tool, output),
            ParserKind::Pnpm => package_manager::parse_pnpm_output(tool, output),
            ParserKind::Msbuild => msbuild::parse_build_output(tool, output),
            ParserKind::DotnetTest => dotnet_test::parse_test_output(tool, output),
            ParserKind::Typescript => typescript::parse_typescript_output(tool, output),
            ParserKind::Nextjs => nextjs::parse_nextjs_output(tool, output),
            ParserKind::Jest => jest::parse_jest_output(tool, output),
            ParserKind::Vitest => vitest::parse_vitest_output(tool, output),
            ParserKind::Eslint => eslint::parse_eslint_output(tool, output),
        }
    }
}

/// Runs the parsers in order over the same output and unions their results,
/// deduplicating on `(file, line, column, message)`. Order is significant:
/// the first parser to claim a location wins attribution, so lower-level
/// failures are not masked by a coincidental higher-level match.
pub fn chain_parsers(parsers: &[ParserKind], tool: &str, output: &str) -> Vec<Diagnostic> {
    let mut all = Vec::new();
    let mut seen = HashSet::new();

    for parser in parsers {
        for diagnostic in parser.parse(tool, output) {
            let key = format!(
                "{}:{}:{}:{}",
                diagnostic.file.as_deref().unwrap_or(""),
                diagnostic.line.unwrap_or(0),
                diagnostic.column.unwrap_or(0),
                diagnostic.message
            );
            if seen.insert(key) {
                all.push(diagnostic);
            }
        }
    }

    all
}

/// Splits combined output into lines on either `\n` or `\r\n`.
pub fn split_lines(output: &str) -> Vec<&str> {
    output
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

pub fn truncate_line(line: &str) -> &str {
    if line.len() <= MAX_PARSE_LINE_LEN {
        return line;
    }
    let mut end = MAX_PARSE_LINE_LEN;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

static ANSI_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("valid regex"));

/// Interactive test runners colorize output; escapes must go before matching.
pub fn strip_ansi(output: &str) -> Cow<'_, str> {
    ANSI_ESCAPE.replace_all(output, "")
}

/// Raw severity tokens normalize to exactly `error` or `warning`.
pub(crate) fn severity_from_token(token: &str) -> Severity {
    if token == "error" {
        Severity::Error
    } else {
        Severity::Warning
    }
}
