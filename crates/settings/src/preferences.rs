use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use workflowdeck_core::{DeleteOrder, MenuConfig, DEFAULT_EXTENSION};
use workflowdeck_store::write_atomic;

/// Schema version written by this build.
const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("failed to read preferences from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse preferences {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not encode preferences for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not write preferences to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// 工作流程選單的使用者設定。 / User configuration for the workflow menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_index_file")]
    pub index_file: String,
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default)]
    pub delete_order: DeleteOrder,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_version() -> u32 {
    SCHEMA_VERSION
}

fn default_namespace() -> String {
    "workflows".to_string()
}

fn default_index_file() -> String {
    ".index.json".to_string()
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            namespace: default_namespace(),
            index_file: default_index_file(),
            extension: default_extension(),
            delete_order: DeleteOrder::default(),
            log_level: default_log_level(),
        }
    }
}

impl Preferences {
    /// Repairs blank or malformed values and upgrades legacy files.
    pub fn sanitize(&mut self) {
        if self.version == 0 {
            self.version = SCHEMA_VERSION;
        }
        let namespace = self.namespace.trim().trim_matches('/').to_string();
        self.namespace = if namespace.is_empty() {
            default_namespace()
        } else {
            namespace
        };
        if self.index_file.trim().is_empty() || self.index_file.contains('/') {
            self.index_file = default_index_file();
        }
        if self.extension.trim().is_empty() {
            self.extension = default_extension();
        } else if !self.extension.starts_with('.') {
            self.extension = format!(".{}", self.extension.trim());
        }
        if self.log_level.trim().is_empty() {
            self.log_level = default_log_level();
        }
    }

    /// 轉換為核心選單設定。 / Builds the core menu configuration.
    pub fn menu_config(&self) -> MenuConfig {
        MenuConfig {
            namespace: self.namespace.clone(),
            extension: self.extension.clone(),
            delete_order: self.delete_order,
        }
    }
}

/// Preferences bound to the JSON file they were read from.
/// 與來源 JSON 檔綁定的偏好設定。
#[derive(Debug)]
pub struct PreferencesStore {
    path: PathBuf,
    current: Preferences,
}

impl PreferencesStore {
    pub fn new(path: impl Into<PathBuf>, preferences: Preferences) -> Self {
        Self {
            path: path.into(),
            current: preferences,
        }
    }

    /// Reads `path`, falling back to defaults when it does not exist.
    /// 讀取設定檔；不存在時使用預設值且不建立檔案。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PreferencesError> {
        let path = path.as_ref().to_path_buf();
        let mut current = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str::<Preferences>(&raw).map_err(|source| {
                PreferencesError::Parse {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(err) if err.kind() == ErrorKind::NotFound => Preferences::default(),
            Err(source) => return Err(PreferencesError::Read { path, source }),
        };
        current.sanitize();
        debug!(path = %path.display(), "preferences loaded");
        Ok(Self { path, current })
    }

    pub fn preferences(&self) -> &Preferences {
        &self.current
    }

    /// Applies `edit`, normalizes the result and writes it back.
    pub fn update(&mut self, edit: impl FnOnce(&mut Preferences)) -> Result<(), PreferencesError> {
        edit(&mut self.current);
        self.current.sanitize();
        self.save()
    }

    pub fn overwrite(&mut self, preferences: Preferences) -> Result<(), PreferencesError> {
        self.update(|current| *current = preferences)
    }

    pub fn save(&self) -> Result<(), PreferencesError> {
        let encoded =
            serde_json::to_vec_pretty(&self.current).map_err(|source| PreferencesError::Serialize {
                path: self.path.clone(),
                source,
            })?;
        write_atomic(&self.path, &encoded).map_err(|source| PreferencesError::Write {
            path: self.path.clone(),
            source,
        })?;
        info!(path = %self.path.display(), "preferences saved");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_restores_defaults_and_normalizes() {
        let mut prefs = Preferences {
            version: 0,
            namespace: " /team/ ".into(),
            index_file: "nested/index.json".into(),
            extension: "flow".into(),
            delete_order: DeleteOrder::LocalFirst,
            log_level: String::new(),
        };
        prefs.sanitize();
        assert_eq!(prefs.version, SCHEMA_VERSION);
        assert_eq!(prefs.namespace, "team");
        assert_eq!(prefs.index_file, ".index.json");
        assert_eq!(prefs.extension, ".flow");
        assert_eq!(prefs.log_level, "warn");
        assert_eq!(prefs.menu_config().delete_order, DeleteOrder::LocalFirst);
    }

    #[test]
    fn delete_order_serializes_snake_case() {
        let prefs = Preferences {
            delete_order: DeleteOrder::LocalFirst,
            ..Preferences::default()
        };
        let json = serde_json::to_string(&prefs).unwrap();
        assert!(json.contains("\"delete_order\":\"local_first\""));
    }
}
