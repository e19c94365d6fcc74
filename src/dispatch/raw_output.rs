use crate::shared::RunId;
use crate::storage::{Storage, StorageError};
use serde::Serialize;

pub const DEFAULT_RAW_LENGTH: usize = 4096;
pub const MAX_RAW_LENGTH: usize = 64 * 1024;
pub const DEFAULT_LINE_COUNT: u64 = 50;
pub const MAX_LINE_COUNT: u64 = 500;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("invalid runId: {0}")]
    InvalidRunId(String),
    #[error("run not found: {0}")]
    RunNotFound(String),
    #[error("startLine must be >= 1")]
    InvalidStartLine,
    #[error("run {0} has no readable line index record")]
    CorruptRun(String),
    #[error(transparent)]
    Storage(StorageError),
}

impl QueryError {
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::InvalidRunId(_) => "INVALID_RUN_ID",
            QueryError::RunNotFound(_) => "RUN_NOT_FOUND",
            QueryError::InvalidStartLine => "INVALID_START_LINE",
            QueryError::CorruptRun(_) => "RUN_CORRUPT",
            QueryError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

impl From<StorageError> for QueryError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::CorruptRun { run_id } => QueryError::CorruptRun(run_id),
            other => QueryError::Storage(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawResponse {
    pub data: String,
    pub offset: u64,
    pub length: usize,
    pub total_bytes: u64,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRangeResponse {
    pub lines: Vec<String>,
    pub start_line: u64,
    pub end_line: u64,
    pub total_lines: u64,
    pub has_more: bool,
}

/// Byte-range query against a completed run's raw log.
pub fn run_raw(
    storage: &Storage,
    run_id: &str,
    offset: Option<u64>,
    length: Option<usize>,
) -> Result<RawResponse, QueryError> {
    let run_id =
        RunId::parse(run_id).map_err(|_| QueryError::InvalidRunId(run_id.to_string()))?;
    let reader = storage
        .get_run(&run_id)?
        .ok_or_else(|| QueryError::RunNotFound(run_id.to_string()))?;

    let offset = offset.unwrap_or(0);
    let length = length.unwrap_or(DEFAULT_RAW_LENGTH).clamp(1, MAX_RAW_LENGTH);

    let index = reader.log_index()?;
    let bytes = reader.log_bytes(offset, length)?;
    let actual_length = bytes.len();

    Ok(RawResponse {
        data: String::from_utf8_lossy(&bytes).into_owned(),
        offset,
        length: actual_length,
        total_bytes: index.total_bytes,
        has_more: offset + (actual_length as u64) < index.total_bytes,
    })
}

/// Line-range query against a completed run's raw log. A start past the end
/// is an empty slice, not an error; a start below 1 is a usage error.
pub fn run_log_range(
    storage: &Storage,
    run_id: &str,
    start_line: u64,
    line_count: Option<u64>,
) -> Result<LogRangeResponse, QueryError> {
    let run_id =
        RunId::parse(run_id).map_err(|_| QueryError::InvalidRunId(run_id.to_string()))?;
    let reader = storage
        .get_run(&run_id)?
        .ok_or_else(|| QueryError::RunNotFound(run_id.to_string()))?;

    if start_line < 1 {
        return Err(QueryError::InvalidStartLine);
    }
    let count = line_count.unwrap_or(DEFAULT_LINE_COUNT).clamp(1, MAX_LINE_COUNT);

    let index = reader.log_index()?;
    if start_line > index.total_lines {
        return Ok(LogRangeResponse {
            lines: Vec::new(),
            start_line,
            end_line: start_line - 1,
            total_lines: index.total_lines,
            has_more: false,
        });
    }

    let lines = reader.log_lines(start_line, count)?;
    let end_line = start_line + lines.len() as u64 - 1;

    Ok(LogRangeResponse {
        lines,
        start_line,
        end_line,
        total_lines: index.total_lines,
        has_more: end_line < index.total_lines,
    })
}
