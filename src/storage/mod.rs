use crate::shared::RunId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub mod cleanup;
pub mod paths;
pub mod run_reader;
pub mod run_writer;

pub use cleanup::{cleanup_old_runs, RETENTION_DAYS};
pub use paths::{
    default_storage_root, is_allowed_run_file, DIAGNOSTICS_FILE, META_FILE, RAW_INDEX_FILE,
    RAW_LOG_FILE, RUN_FILES,
};
pub use run_reader::RunReader;
pub use run_writer::RunWriter;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to create storage path {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid json in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid run id: {0}")]
    InvalidRunId(String),
    #[error("run file name is not allowed: {0}")]
    RunFileNotAllowed(String),
    #[error("run {run_id} has no readable line index record")]
    CorruptRun { run_id: String },
    #[error("failed to resolve home directory for storage root")]
    HomeDirectoryUnavailable,
}

/// Completion record for a run. Written once, atomically, when the run
/// finishes; its presence is what marks a run as readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMeta {
    pub run_id: RunId,
    pub tool: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub exit_code: i32,
    pub cwd: String,
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineEntry {
    /// 1-indexed line number.
    pub line: u64,
    /// Byte position of the line start within the raw log.
    pub byte_offset: u64,
    /// Length of the line in bytes, including its terminator if present.
    pub byte_length: u64,
}

/// Derived index over the raw log. Entries are contiguous:
/// `lines[i].byte_offset + lines[i].byte_length == lines[i + 1].byte_offset`
/// and the byte lengths sum to `total_bytes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogIndex {
    pub lines: Vec<LineEntry>,
    pub total_lines: u64,
    pub total_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Opens the storage root, creating the runs directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        let runs = paths::runs_dir(&root);
        fs::create_dir_all(&runs).map_err(|source| StorageError::CreateDir {
            path: runs.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn create_run(
        &self,
        tool: &str,
        cwd: &Path,
        command: &[String],
    ) -> Result<RunWriter, StorageError> {
        RunWriter::create(&self.root, tool, cwd, command)
    }

    /// Fails closed: a syntactically valid id whose completion record does
    /// not exist yet reads as absent, never as a partial run.
    pub fn get_run(&self, run_id: &RunId) -> Result<Option<RunReader>, StorageError> {
        RunReader::open(&self.root, run_id)
    }

    pub fn list_runs(&self) -> Result<Vec<RunMeta>, StorageError> {
        let runs = paths::runs_dir(&self.root);
        let entries = match fs::read_dir(&runs) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_error(&runs, err)),
        };

        let mut metas = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| io_error(&runs, err))?;
            if !entry.path().is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let Ok(run_id) = RunId::parse(&name) else {
                continue;
            };
            let meta_path = paths::run_file(&self.root, &run_id, META_FILE)?;
            let Ok(raw) = fs::read_to_string(&meta_path) else {
                continue;
            };
            // skip malformed records instead of aborting the whole scan
            let Ok(meta) = serde_json::from_str::<RunMeta>(&raw) else {
                continue;
            };
            metas.push(meta);
        }

        metas.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(metas)
    }

    pub fn cleanup(&self, now: DateTime<Utc>, retention_days: i64) -> Result<usize, StorageError> {
        cleanup::cleanup_old_runs(&self.root, now, retention_days)
    }
}

pub(crate) fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}

pub(crate) fn parse_error(path: &Path, source: serde_json::Error) -> StorageError {
    StorageError::Parse {
        path: path.display().to_string(),
        source,
    }
}
