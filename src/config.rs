use crate::storage::{default_storage_root, RETENTION_DAYS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const GLOBAL_STATE_DIR: &str = ".buildlens";
pub const GLOBAL_SETTINGS_FILE_NAME: &str = "config.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid yaml in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to resolve home directory for global config path")]
    HomeDirectoryUnavailable,
    #[error("failed to resolve storage root: {0}")]
    StorageRoot(String),
}

/// Optional operator settings. Every field has a built-in default; a missing
/// config file means "all defaults".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub storage_root: Option<PathBuf>,
    #[serde(default)]
    pub default_cwd: Option<PathBuf>,
    #[serde(default)]
    pub retention_days: Option<i64>,
    /// Login shell used for PATH discovery; allow-list checked before use.
    #[serde(default)]
    pub shell: Option<String>,
}

impl Settings {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn resolve_storage_root(&self) -> Result<PathBuf, ConfigError> {
        match &self.storage_root {
            Some(root) => Ok(root.clone()),
            None => default_storage_root().map_err(|err| ConfigError::StorageRoot(err.to_string())),
        }
    }

    pub fn resolve_retention_days(&self) -> i64 {
        self.retention_days.unwrap_or(RETENTION_DAYS)
    }
}

pub fn default_global_config_path() -> Result<PathBuf, ConfigError> {
    let home = std::env::var_os("HOME").ok_or(ConfigError::HomeDirectoryUnavailable)?;
    Ok(PathBuf::from(home)
        .join(GLOBAL_STATE_DIR)
        .join(GLOBAL_SETTINGS_FILE_NAME))
}

pub fn load_global_settings() -> Result<Settings, ConfigError> {
    let path = default_global_config_path()?;
    if !path.exists() {
        return Ok(Settings::default());
    }
    Settings::from_path(&path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_parse_with_all_fields_optional() {
        let settings: Settings = serde_yaml::from_str("{}").expect("empty settings parse");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.resolve_retention_days(), RETENTION_DAYS);

        let settings: Settings = serde_yaml::from_str(
            r#"
storage_root: /data/buildlens
default_cwd: /work/project
retention_days: 30
shell: /bin/bash
"#,
        )
        .expect("full settings parse");
        assert_eq!(
            settings.storage_root.as_deref(),
            Some(Path::new("/data/buildlens"))
        );
        assert_eq!(settings.resolve_retention_days(), 30);
        assert_eq!(settings.shell.as_deref(), Some("/bin/bash"));
    }

    #[test]
    fn explicit_storage_root_wins_over_the_default() {
        let settings = Settings {
            storage_root: Some(PathBuf::from("/data/buildlens")),
            ..Settings::default()
        };
        let root = settings.resolve_storage_root().expect("resolve root");
        assert_eq!(root, PathBuf::from("/data/buildlens"));
    }
}
