use crate::diagnostics::{Diagnostic, Severity, TestSummary};
use serde::{Deserialize, Serialize};

/// Diagnostic trimmed down for the caller: location and message, no log
/// bookkeeping. The full records stay with the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleDiagnostic {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl From<&Diagnostic> for SimpleDiagnostic {
    fn from(diagnostic: &Diagnostic) -> Self {
        Self {
            message: diagnostic.message.clone(),
            file: diagnostic.file.clone(),
            line: diagnostic.line,
            column: diagnostic.column,
            code: diagnostic.code.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<SimpleDiagnostic>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<SimpleDiagnostic>,
    pub run_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<TestSummary>,
}

impl ToolResponse {
    pub fn from_diagnostics(
        success: bool,
        run_id: String,
        diagnostics: &[Diagnostic],
        summary: Option<TestSummary>,
    ) -> Self {
        let simplify = |severity: Severity| {
            diagnostics
                .iter()
                .filter(|d| d.severity == severity)
                .map(SimpleDiagnostic::from)
                .collect::<Vec<_>>()
        };
        Self {
            success,
            errors: if success {
                Vec::new()
            } else {
                simplify(Severity::Error)
            },
            warnings: simplify(Severity::Warning),
            run_id,
            summary,
        }
    }
}

/// A mutating tool was requested without confirmation; nothing was executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationRequest {
    pub confirmation_required: bool,
    pub tool: String,
    pub description: String,
    pub args: Vec<String>,
    pub cwd: String,
}

/// Result of a tool call. Callers branch on the variant: either the tool ran
/// and produced a response, or it needs confirmation first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCallOutcome {
    Response(ToolResponse),
    ConfirmationNeeded(ConfirmationRequest),
}
