use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::path::WorkflowPath;

/// Sidecar record holding the favorites of one namespace.
/// 命名空間旁置索引檔的內容（我的最愛清單）。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    #[serde(default)]
    pub favorites: Vec<String>,
}

/// Persistence boundary consumed by the menu.
/// 選單所依賴的外部儲存介面。
///
/// Paths are namespace-relative. Implementations report a destination that
/// already exists as [`StoreError::Conflict`] when `overwrite` is `false`,
/// and a missing source as [`StoreError::NotFound`].
pub trait WorkflowStore {
    /// Every stored workflow under `namespace`, in the store's listing order.
    fn list_paths(&self, namespace: &str) -> Result<Vec<WorkflowPath>, StoreError>;

    /// Sidecar favorites record, `Ok(None)` when it has never been written.
    fn get_index(&self, namespace: &str) -> Result<Option<IndexRecord>, StoreError>;

    fn put_index(&mut self, namespace: &str, record: &IndexRecord) -> Result<(), StoreError>;

    fn get_blob(&self, namespace: &str, path: &WorkflowPath) -> Result<String, StoreError>;

    fn put_blob(
        &mut self,
        namespace: &str,
        path: &WorkflowPath,
        content: &str,
        overwrite: bool,
    ) -> Result<(), StoreError>;

    fn delete_blob(&mut self, namespace: &str, path: &WorkflowPath) -> Result<(), StoreError>;

    fn move_blob(
        &mut self,
        namespace: &str,
        from: &WorkflowPath,
        to: &WorkflowPath,
        overwrite: bool,
    ) -> Result<(), StoreError>;
}

/// Outcomes of a store call other than success.
/// 儲存操作失敗時的分類。
#[derive(Debug, Error)]
pub enum StoreError {
    /// Destination exists and `overwrite` was not requested.
    #[error("workflow '{0}' already exists")]
    Conflict(String),
    #[error("workflow '{0}' not found")]
    NotFound(String),
    #[error("store request failed: {0}")]
    Failed(String),
    #[error("store IO error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid store payload: {0}")]
    Invalid(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
