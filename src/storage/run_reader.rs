use super::paths::{self, DIAGNOSTICS_FILE, META_FILE, RAW_INDEX_FILE, RAW_LOG_FILE};
use super::{io_error, parse_error, LogIndex, RunMeta, StorageError};
use crate::diagnostics::Diagnostic;
use crate::shared::RunId;
use std::fs;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Read-only view of a completed run. Opening requires the completion record;
/// a run that is still being written (or that crashed before `complete`)
/// reads as absent.
pub struct RunReader {
    root: PathBuf,
    meta: RunMeta,
}

impl RunReader {
    pub(crate) fn open(root: &Path, run_id: &RunId) -> Result<Option<Self>, StorageError> {
        let meta_path = paths::run_file(root, run_id, META_FILE)?;
        let raw = match fs::read_to_string(&meta_path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_error(&meta_path, err)),
        };
        let meta: RunMeta = serde_json::from_str(&raw).map_err(|e| parse_error(&meta_path, e))?;
        Ok(Some(Self {
            root: root.to_path_buf(),
            meta,
        }))
    }

    pub fn meta(&self) -> &RunMeta {
        &self.meta
    }

    pub fn diagnostics(&self) -> Result<Vec<Diagnostic>, StorageError> {
        let path = paths::run_file(&self.root, &self.meta.run_id, DIAGNOSTICS_FILE)?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_error(&path, err)),
        };
        serde_json::from_str(&raw).map_err(|e| parse_error(&path, e))
    }

    /// A completed run always has an index record; a missing or unparsable
    /// one means the run state is corrupt, which is reported as such rather
    /// than read as "zero bytes captured".
    pub fn log_index(&self) -> Result<LogIndex, StorageError> {
        let path = paths::run_file(&self.root, &self.meta.run_id, RAW_INDEX_FILE)?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StorageError::CorruptRun {
                    run_id: self.meta.run_id.to_string(),
                })
            }
            Err(err) => return Err(io_error(&path, err)),
        };
        serde_json::from_str(&raw).map_err(|_| StorageError::CorruptRun {
            run_id: self.meta.run_id.to_string(),
        })
    }

    /// Direct seek-and-read against the raw log. Returns fewer bytes than
    /// requested when the log is shorter; a missing log reads as empty.
    pub fn log_bytes(&self, offset: u64, length: usize) -> Result<Vec<u8>, StorageError> {
        let path = paths::run_file(&self.root, &self.meta.run_id, RAW_LOG_FILE)?;
        read_at(&path, offset, length)
    }

    /// Reads the inclusive line range `[start_line, start_line + count)` in a
    /// single contiguous read over the index entries' byte span, then slices
    /// per entry. Out-of-range starts return an empty list.
    pub fn log_lines(&self, start_line: u64, count: u64) -> Result<Vec<String>, StorageError> {
        let index = self.log_index()?;
        if start_line == 0 || index.lines.is_empty() {
            return Ok(Vec::new());
        }
        let start_idx = (start_line - 1) as usize;
        if start_idx >= index.lines.len() {
            return Ok(Vec::new());
        }
        let end_idx = index.lines.len().min(start_idx + count as usize);
        let entries = &index.lines[start_idx..end_idx];
        let first = entries[0];
        let last = entries[entries.len() - 1];
        let span = (last.byte_offset + last.byte_length - first.byte_offset) as usize;

        let path = paths::run_file(&self.root, &self.meta.run_id, RAW_LOG_FILE)?;
        let bytes = read_at(&path, first.byte_offset, span)?;

        let mut lines = Vec::with_capacity(entries.len());
        let mut cursor = 0usize;
        for entry in entries {
            let end = cursor + entry.byte_length as usize;
            let Some(slice) = bytes.get(cursor..end) else {
                break;
            };
            let mut line = String::from_utf8_lossy(slice).into_owned();
            if line.ends_with('\n') {
                line.pop();
                if line.ends_with('\r') {
                    line.pop();
                }
            }
            lines.push(line);
            cursor = end;
        }
        Ok(lines)
    }
}

fn read_at(path: &Path, offset: u64, length: usize) -> Result<Vec<u8>, StorageError> {
    let mut file = match fs::File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(io_error(path, err)),
    };
    file.seek(SeekFrom::Start(offset))
        .map_err(|err| io_error(path, err))?;
    let mut buf = Vec::with_capacity(length.min(1 << 20));
    file.take(length as u64)
        .read_to_end(&mut buf)
        .map_err(|err| io_error(path, err))?;
    Ok(buf)
}
