use super::StorageError;
use crate::shared::RunId;
use std::env;
use std::path::{Path, PathBuf};

pub const APP_DIR: &str = "buildlens";
pub const RUNS_DIR: &str = "runs";

pub const RAW_LOG_FILE: &str = "raw.log";
pub const RAW_INDEX_FILE: &str = "raw.index.json";
pub const DIAGNOSTICS_FILE: &str = "diagnostics.json";
pub const META_FILE: &str = "meta.json";

/// The only filenames ever read or written inside a run directory.
pub const RUN_FILES: [&str; 4] = [RAW_LOG_FILE, RAW_INDEX_FILE, DIAGNOSTICS_FILE, META_FILE];

/// Storage root per the XDG base directory convention:
/// `$XDG_DATA_HOME/buildlens`, defaulting to `~/.local/share/buildlens`.
pub fn default_storage_root() -> Result<PathBuf, StorageError> {
    if let Some(xdg) = env::var_os("XDG_DATA_HOME") {
        if !xdg.is_empty() {
            return Ok(PathBuf::from(xdg).join(APP_DIR));
        }
    }
    let home = env::var_os("HOME").ok_or(StorageError::HomeDirectoryUnavailable)?;
    Ok(PathBuf::from(home).join(".local/share").join(APP_DIR))
}

pub fn runs_dir(root: &Path) -> PathBuf {
    root.join(RUNS_DIR)
}

pub fn run_dir(root: &Path, run_id: &RunId) -> PathBuf {
    runs_dir(root).join(run_id.as_str())
}

pub fn run_file(root: &Path, run_id: &RunId, name: &str) -> Result<PathBuf, StorageError> {
    if !is_allowed_run_file(name) {
        return Err(StorageError::RunFileNotAllowed(name.to_string()));
    }
    Ok(run_dir(root, run_id).join(name))
}

pub fn is_allowed_run_file(name: &str) -> bool {
    if name.contains('/') || name.contains('\\') {
        return false;
    }
    RUN_FILES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_file_rejects_names_outside_the_allow_list() {
        let run_id = RunId::generate();
        let root = Path::new("/tmp/buildlens-root");
        assert!(run_file(root, &run_id, "meta.json").is_ok());
        assert!(run_file(root, &run_id, "raw.log").is_ok());
        assert!(matches!(
            run_file(root, &run_id, "notes.txt"),
            Err(StorageError::RunFileNotAllowed(_))
        ));
        assert!(matches!(
            run_file(root, &run_id, "../meta.json"),
            Err(StorageError::RunFileNotAllowed(_))
        ));
        assert!(matches!(
            run_file(root, &run_id, "..\\meta.json"),
            Err(StorageError::RunFileNotAllowed(_))
        ));
    }

    #[test]
    fn run_dir_nests_under_the_runs_directory() {
        let run_id = RunId::generate();
        let dir = run_dir(Path::new("/data/buildlens"), &run_id);
        assert!(dir.starts_with("/data/buildlens/runs"));
        assert!(dir.ends_with(run_id.as_str()));
    }
}
