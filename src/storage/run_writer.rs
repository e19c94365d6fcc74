use super::paths::{self, DIAGNOSTICS_FILE, META_FILE, RAW_INDEX_FILE, RAW_LOG_FILE};
use super::{io_error, parse_error, LineEntry, LogIndex, RunMeta, StorageError};
use crate::diagnostics::Diagnostic;
use crate::shared::fs_atomic::atomic_write_file;
use crate::shared::RunId;
use chrono::{DateTime, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Single writer for one run. Bound 1:1 to a freshly allocated identifier,
/// so the append path needs no locking. Chunks are persisted as they arrive;
/// the line index and completion record only hit disk in `complete`.
pub struct RunWriter {
    run_id: RunId,
    root: PathBuf,
    tool: String,
    cwd: String,
    command: Vec<String>,
    started_at: DateTime<Utc>,
    log: fs::File,
    index: LogIndex,
    pending: Vec<u8>,
}

impl RunWriter {
    pub(crate) fn create(
        root: &Path,
        tool: &str,
        cwd: &Path,
        command: &[String],
    ) -> Result<Self, StorageError> {
        let run_id = RunId::generate();
        let dir = paths::run_dir(root, &run_id);
        create_run_dir(&dir).map_err(|source| StorageError::CreateDir {
            path: dir.display().to_string(),
            source,
        })?;

        let log_path = paths::run_file(root, &run_id, RAW_LOG_FILE)?;
        let log = open_log_file(&log_path).map_err(|err| io_error(&log_path, err))?;

        debug!(run_id = %run_id, tool, "created run");

        Ok(Self {
            run_id,
            root: root.to_path_buf(),
            tool: tool.to_string(),
            cwd: cwd.display().to_string(),
            command: command.to_vec(),
            started_at: Utc::now(),
            log,
            index: LogIndex::default(),
            pending: Vec::new(),
        })
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Appends `chunk` verbatim to the raw log and advances the incremental
    /// line scan. A chunk may contain zero, one, or many newlines; a line
    /// split across calls is carried in the pending buffer.
    pub fn append_log(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        let log_path = paths::run_file(&self.root, &self.run_id, RAW_LOG_FILE)?;
        self.log
            .write_all(chunk)
            .and_then(|()| self.log.flush())
            .map_err(|err| io_error(&log_path, err))?;

        let mut position = 0;
        while position < chunk.len() {
            match chunk[position..].iter().position(|&b| b == b'\n') {
                None => {
                    self.pending.extend_from_slice(&chunk[position..]);
                    break;
                }
                Some(rel) => {
                    let after_newline = position + rel + 1;
                    let line_len = self.pending.len() + (after_newline - position);
                    self.push_entry(line_len as u64);
                    self.pending.clear();
                    position = after_newline;
                }
            }
        }
        Ok(())
    }

    fn push_entry(&mut self, byte_length: u64) {
        self.index.lines.push(LineEntry {
            line: self.index.total_lines + 1,
            byte_offset: self.index.total_bytes,
            byte_length,
        });
        self.index.total_lines += 1;
        self.index.total_bytes += byte_length;
    }

    pub fn write_diagnostics(&self, diagnostics: &[Diagnostic]) -> Result<(), StorageError> {
        let path = paths::run_file(&self.root, &self.run_id, DIAGNOSTICS_FILE)?;
        let body = serde_json::to_vec_pretty(diagnostics).map_err(|e| parse_error(&path, e))?;
        fs::write(&path, body).map_err(|e| io_error(&path, e))
    }

    /// Flushes the trailing partial line, persists the line index, then the
    /// completion record. The metadata write is atomic and comes last:
    /// readers treat its presence as the signal that the index is trustworthy.
    pub fn complete(mut self, exit_code: i32) -> Result<RunMeta, StorageError> {
        if !self.pending.is_empty() {
            let byte_length = self.pending.len() as u64;
            self.push_entry(byte_length);
            self.pending.clear();
        }

        let index_path = paths::run_file(&self.root, &self.run_id, RAW_INDEX_FILE)?;
        let index_body =
            serde_json::to_vec_pretty(&self.index).map_err(|e| parse_error(&index_path, e))?;
        fs::write(&index_path, index_body).map_err(|e| io_error(&index_path, e))?;

        let meta = RunMeta {
            run_id: self.run_id.clone(),
            tool: self.tool.clone(),
            started_at: self.started_at,
            completed_at: Utc::now(),
            exit_code,
            cwd: self.cwd.clone(),
            command: self.command.clone(),
        };
        let meta_path = paths::run_file(&self.root, &self.run_id, META_FILE)?;
        let meta_body = serde_json::to_vec_pretty(&meta).map_err(|e| parse_error(&meta_path, e))?;
        atomic_write_file(&meta_path, &meta_body).map_err(|e| io_error(&meta_path, e))?;

        debug!(run_id = %self.run_id, exit_code, total_bytes = self.index.total_bytes, "completed run");
        Ok(meta)
    }
}

fn create_run_dir(dir: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
    }
    #[cfg(not(unix))]
    {
        fs::create_dir_all(dir)
    }
}

fn open_log_file(path: &Path) -> std::io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.create_new(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}
