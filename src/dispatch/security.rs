use std::fs;
use std::path::{Path, PathBuf};

const SENSITIVE_DIRS: &[&str] = &[
    "/etc", "/usr", "/bin", "/sbin", "/var", "/System", "/boot", "/dev", "/proc", "/sys", "/root",
];

#[derive(Debug, thiserror::Error)]
pub enum CwdError {
    #[error("working directory does not exist: {0}")]
    Missing(String),
    #[error("working directory is in a sensitive system path: {0}")]
    Sensitive(String),
    #[error("relative working directory resolves outside the default: {0}")]
    OutsideDefault(String),
}

impl CwdError {
    pub fn code(&self) -> &'static str {
        match self {
            CwdError::Missing(_) => "INVALID_CWD",
            CwdError::Sensitive(_) | CwdError::OutsideDefault(_) => "CWD_NOT_ALLOWED",
        }
    }
}

/// Resolves and validates the working directory for a tool invocation.
/// Symlinks are resolved first so a link into `/etc` cannot slip through.
/// A relative `cwd` from the caller must stay under the default directory.
pub fn validate_cwd(
    resolved_cwd: &Path,
    original_cwd: Option<&str>,
    default_cwd: &Path,
) -> Result<PathBuf, CwdError> {
    let real = fs::canonicalize(resolved_cwd)
        .map_err(|_| CwdError::Missing(resolved_cwd.display().to_string()))?;

    for dir in SENSITIVE_DIRS {
        let resolved_dir = fs::canonicalize(dir).unwrap_or_else(|_| PathBuf::from(dir));
        if real == resolved_dir || real.starts_with(&resolved_dir) {
            return Err(CwdError::Sensitive(real.display().to_string()));
        }
    }

    if let Some(original) = original_cwd {
        if !Path::new(original).is_absolute() {
            let real_default = fs::canonicalize(default_cwd)
                .unwrap_or_else(|_| default_cwd.to_path_buf());
            if !real.starts_with(&real_default) {
                return Err(CwdError::OutsideDefault(real.display().to_string()));
            }
        }
    }

    Ok(real)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensitive_system_paths_are_rejected() {
        let err = validate_cwd(Path::new("/etc"), None, Path::new("/tmp"))
            .expect_err("system path rejected");
        assert_eq!(err.code(), "CWD_NOT_ALLOWED");
    }

    #[test]
    fn missing_directories_are_rejected() {
        let err = validate_cwd(
            Path::new("/tmp/definitely-not-a-real-directory-449f"),
            None,
            Path::new("/tmp"),
        )
        .expect_err("missing path rejected");
        assert_eq!(err.code(), "INVALID_CWD");
    }

    #[test]
    fn relative_cwd_must_stay_under_the_default() {
        let default = tempfile::tempdir().expect("create default dir");
        let other = tempfile::tempdir().expect("create other dir");
        let err = validate_cwd(other.path(), Some("../elsewhere"), default.path())
            .expect_err("escaping relative cwd rejected");
        assert_eq!(err.code(), "CWD_NOT_ALLOWED");

        let nested = default.path().join("sub");
        std::fs::create_dir(&nested).expect("create nested dir");
        validate_cwd(&nested, Some("sub"), default.path()).expect("nested cwd allowed");
    }
}
