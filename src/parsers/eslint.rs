use crate::diagnostics::{Diagnostic, Severity};
use serde::Deserialize;

// ESLint is invoked with `--format json`; the output is a result array, one
// entry per linted file. Anything that does not parse as that array yields no
// diagnostics rather than an error.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EslintMessage {
    #[serde(default)]
    rule_id: Option<String>,
    severity: u8,
    message: String,
    #[serde(default)]
    line: Option<u64>,
    #[serde(default)]
    column: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EslintFileResult {
    file_path: String,
    #[serde(default)]
    messages: Vec<EslintMessage>,
}

pub fn parse_eslint_output(tool: &str, output: &str) -> Vec<Diagnostic> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let Ok(results) = serde_json::from_str::<Vec<EslintFileResult>>(trimmed) else {
        return Vec::new();
    };

    let mut diagnostics = Vec::new();
    for file_result in results {
        for message in file_result.messages {
            let severity = if message.severity == 2 {
                Severity::Error
            } else {
                Severity::Warning
            };
            let mut diagnostic = Diagnostic::new(tool, severity, message.message);
            diagnostic.code = message.rule_id.filter(|rule| !rule.is_empty());
            diagnostic.file = Some(file_result.file_path.clone());
            diagnostic.line = message.line;
            diagnostic.column = message.column;
            // positions come from re-serialized JSON, not the raw log
            diagnostics.push(diagnostic);
        }
    }

    diagnostics
}
