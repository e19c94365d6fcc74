use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Line span in the raw log that produced a diagnostic. Zero means the
/// position is not available (e.g. parsers working on re-serialized output).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRange {
    pub start_line: u64,
    pub end_line: u64,
}

impl LogRange {
    pub fn line(line: u64) -> Self {
        Self {
            start_line: line,
            end_line: line,
        }
    }

    pub fn span(start_line: u64, end_line: u64) -> Self {
        Self {
            start_line,
            end_line,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByteOffsets {
    pub start: u64,
    pub end: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub tool: String,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u64>,
    #[serde(default)]
    pub log_range: LogRange,
    #[serde(default)]
    pub byte_offsets: ByteOffsets,
}

impl Diagnostic {
    pub fn new(tool: &str, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            tool: tool.to_string(),
            severity,
            message: message.into(),
            code: None,
            file: None,
            line: None,
            column: None,
            log_range: LogRange::default(),
            byte_offsets: ByteOffsets::default(),
        }
    }
}

/// Aggregate test tally attached to a run when the tool is a test runner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSummary {
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub total: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects_build_failed: Option<u64>,
}
