use tracing::warn;

use crate::path::WorkflowPath;
use crate::registry::{FileNode, NodeRegistry};
use crate::store::IndexRecord;

/// In-memory mirror of the favorites sidecar record.
/// 我的最愛集合（對應旁置索引檔的記憶體副本）。
///
/// Keeps first-insertion order so the favorites view is stable. Entries need
/// not resolve to a node in the current tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoritesIndex {
    entries: Vec<WorkflowPath>,
}

impl FavoritesIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores the set from persisted paths, dropping duplicates.
    /// 由儲存的路徑還原集合，並去除重複項目。
    pub fn from_paths(paths: impl IntoIterator<Item = WorkflowPath>) -> Self {
        let mut index = Self::new();
        for path in paths {
            index.insert(path);
        }
        index
    }

    /// Restores the set from a sidecar record. Unparseable entries are skipped.
    /// 由旁置索引紀錄還原；無法解析的項目會被略過。
    pub fn from_record(record: &IndexRecord) -> Self {
        let paths = record
            .favorites
            .iter()
            .filter_map(|raw| match WorkflowPath::parse(raw) {
                Ok(path) => Some(path),
                Err(err) => {
                    warn!(entry = %raw, error = %err, "skipping malformed favorite");
                    None
                }
            });
        Self::from_paths(paths)
    }

    pub fn to_record(&self) -> IndexRecord {
        IndexRecord {
            favorites: self.entries.iter().map(WorkflowPath::as_key).collect(),
        }
    }

    pub fn is_favorite(&self, path: &WorkflowPath) -> bool {
        self.entries.contains(path)
    }

    /// Adds `path`; returns `false` when it was already present.
    pub fn insert(&mut self, path: WorkflowPath) -> bool {
        if self.is_favorite(&path) {
            return false;
        }
        self.entries.push(path);
        true
    }

    /// Removes `path`; returns `true` when it was present.
    pub fn remove(&mut self, path: &WorkflowPath) -> bool {
        let before = self.entries.len();
        self.entries.retain(|existing| existing != path);
        before != self.entries.len()
    }

    /// Flips membership and returns the new state.
    /// 切換是否為我的最愛並回傳新狀態。
    pub fn toggle(&mut self, path: &WorkflowPath) -> bool {
        if self.remove(path) {
            false
        } else {
            self.entries.push(path.clone());
            true
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorkflowPath> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Projects the set through `registry`, skipping paths with no node.
    /// 透過節點索引投影出我的最愛檢視，無對應節點者略過。
    pub fn project<'a>(&'a self, registry: &'a NodeRegistry) -> Vec<&'a FileNode> {
        self.entries
            .iter()
            .filter_map(|path| registry.get(path))
            .collect()
    }
}
