use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use crate::path::WorkflowPath;
use crate::store::{IndexRecord, StoreError, WorkflowStore};

/// Store operations, used for call logs and failure injection.
/// 儲存操作種類，供呼叫紀錄與錯誤注入使用。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOp {
    List,
    GetIndex,
    PutIndex,
    GetBlob,
    PutBlob,
    DeleteBlob,
    MoveBlob,
}

#[derive(Debug, Default)]
struct Namespace {
    blobs: Vec<(WorkflowPath, String)>,
    index: Option<IndexRecord>,
}

impl Namespace {
    fn position(&self, path: &WorkflowPath) -> Option<usize> {
        self.blobs.iter().position(|(existing, _)| existing == path)
    }
}

/// Volatile [`WorkflowStore`] that lists blobs in insertion order.
/// 以插入順序列出內容的記憶體儲存。
#[derive(Debug, Default)]
pub struct MemoryStore {
    namespaces: HashMap<String, Namespace>,
    failing: HashSet<StoreOp>,
    calls: RefCell<Vec<StoreOp>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds `namespace` with `paths`, each holding `{}`.
    pub fn with_paths<'a>(namespace: &str, paths: impl IntoIterator<Item = &'a str>) -> Self {
        let mut store = Self::new();
        let entry = store.namespaces.entry(namespace.to_string()).or_default();
        for raw in paths {
            if let Ok(path) = WorkflowPath::parse(raw) {
                entry.blobs.push((path, "{}".to_string()));
            }
        }
        store
    }

    /// Seeds the sidecar record of `namespace`.
    pub fn with_favorites<'a>(
        mut self,
        namespace: &str,
        favorites: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        self.namespaces
            .entry(namespace.to_string())
            .or_default()
            .index = Some(IndexRecord {
            favorites: favorites.into_iter().map(str::to_string).collect(),
        });
        self
    }

    /// Makes every later call of `op` fail until [`MemoryStore::recover`].
    pub fn fail(&mut self, op: StoreOp) {
        self.failing.insert(op);
    }

    pub fn recover(&mut self, op: StoreOp) {
        self.failing.remove(&op);
    }

    /// Operations issued so far, in order.
    pub fn calls(&self) -> Vec<StoreOp> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn contains(&self, namespace: &str, path: &WorkflowPath) -> bool {
        self.namespaces
            .get(namespace)
            .and_then(|ns| ns.position(path))
            .is_some()
    }

    pub fn index(&self, namespace: &str) -> Option<&IndexRecord> {
        self.namespaces.get(namespace).and_then(|ns| ns.index.as_ref())
    }

    fn enter(&self, op: StoreOp) -> Result<(), StoreError> {
        self.calls.borrow_mut().push(op);
        if self.failing.contains(&op) {
            return Err(StoreError::Failed(format!("{op:?} rejected")));
        }
        Ok(())
    }
}

impl WorkflowStore for MemoryStore {
    fn list_paths(&self, namespace: &str) -> Result<Vec<WorkflowPath>, StoreError> {
        self.enter(StoreOp::List)?;
        Ok(self
            .namespaces
            .get(namespace)
            .map(|ns| ns.blobs.iter().map(|(path, _)| path.clone()).collect())
            .unwrap_or_default())
    }

    fn get_index(&self, namespace: &str) -> Result<Option<IndexRecord>, StoreError> {
        self.enter(StoreOp::GetIndex)?;
        Ok(self.index(namespace).cloned())
    }

    fn put_index(&mut self, namespace: &str, record: &IndexRecord) -> Result<(), StoreError> {
        self.enter(StoreOp::PutIndex)?;
        self.namespaces
            .entry(namespace.to_string())
            .or_default()
            .index = Some(record.clone());
        Ok(())
    }

    fn get_blob(&self, namespace: &str, path: &WorkflowPath) -> Result<String, StoreError> {
        self.enter(StoreOp::GetBlob)?;
        self.namespaces
            .get(namespace)
            .and_then(|ns| ns.blobs.iter().find(|(existing, _)| existing == path))
            .map(|(_, content)| content.clone())
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    fn put_blob(
        &mut self,
        namespace: &str,
        path: &WorkflowPath,
        content: &str,
        overwrite: bool,
    ) -> Result<(), StoreError> {
        self.enter(StoreOp::PutBlob)?;
        let ns = self.namespaces.entry(namespace.to_string()).or_default();
        match ns.position(path) {
            Some(_) if !overwrite => Err(StoreError::Conflict(path.to_string())),
            Some(index) => {
                ns.blobs[index].1 = content.to_string();
                Ok(())
            }
            None => {
                ns.blobs.push((path.clone(), content.to_string()));
                Ok(())
            }
        }
    }

    fn delete_blob(&mut self, namespace: &str, path: &WorkflowPath) -> Result<(), StoreError> {
        self.enter(StoreOp::DeleteBlob)?;
        let ns = self
            .namespaces
            .get_mut(namespace)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        let index = ns
            .position(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        ns.blobs.remove(index);
        Ok(())
    }

    fn move_blob(
        &mut self,
        namespace: &str,
        from: &WorkflowPath,
        to: &WorkflowPath,
        overwrite: bool,
    ) -> Result<(), StoreError> {
        self.enter(StoreOp::MoveBlob)?;
        let ns = self
            .namespaces
            .get_mut(namespace)
            .ok_or_else(|| StoreError::NotFound(from.to_string()))?;
        let source = ns
            .position(from)
            .ok_or_else(|| StoreError::NotFound(from.to_string()))?;
        if from == to {
            return Ok(());
        }
        if let Some(dest) = ns.position(to) {
            if !overwrite {
                return Err(StoreError::Conflict(to.to_string()));
            }
            let (_, content) = ns.blobs.remove(source);
            let dest = if dest > source { dest - 1 } else { dest };
            ns.blobs[dest].1 = content;
            return Ok(());
        }
        let (_, content) = ns.blobs.remove(source);
        ns.blobs.push((to.clone(), content));
        Ok(())
    }
}
