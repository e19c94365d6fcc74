use super::paths::{self, META_FILE};
use super::{io_error, RunMeta, StorageError};
use crate::shared::RunId;
use chrono::{DateTime, Duration, Utc};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

pub const RETENTION_DAYS: i64 = 14;

/// Best-effort retention sweep: removes runs whose completion record is older
/// than the retention window. Directories with non-UUID names, missing
/// metadata (a writer may still own them), or unparsable metadata are left
/// alone.
pub fn cleanup_old_runs(
    root: &Path,
    now: DateTime<Utc>,
    retention_days: i64,
) -> Result<usize, StorageError> {
    let runs = paths::runs_dir(root);
    let entries = match fs::read_dir(&runs) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(io_error(&runs, err)),
    };

    let cutoff = now - Duration::days(retention_days);
    let mut removed = 0;

    for entry in entries {
        let entry = entry.map_err(|err| io_error(&runs, err))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        let Ok(run_id) = RunId::parse(&name) else {
            continue;
        };
        let meta_path = paths::run_file(root, &run_id, META_FILE)?;
        let Ok(raw) = fs::read_to_string(&meta_path) else {
            continue;
        };
        let Ok(meta) = serde_json::from_str::<RunMeta>(&raw) else {
            continue;
        };

        if meta.completed_at < cutoff {
            match fs::remove_dir_all(&path) {
                Ok(()) => {
                    debug!(run_id = %run_id, completed_at = %meta.completed_at, "removed expired run");
                    removed += 1;
                }
                Err(err) => {
                    warn!(run_id = %run_id, error = %err, "failed to remove expired run");
                }
            }
        }
    }

    Ok(removed)
}
