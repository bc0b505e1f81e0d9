use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;
use workflowdeck_core::{IndexRecord, StoreError, WorkflowPath, WorkflowStore};

use crate::util::{write_atomic, TMP_SUFFIX};

/// Default name of the favorites sidecar inside each namespace.
/// 命名空間內我的最愛索引檔的預設名稱。
pub const DEFAULT_INDEX_FILE: &str = ".index.json";

/// Stores workflows as files under `<root>/<namespace>/`.
/// 將工作流程以檔案形式存放於 `<root>/<namespace>/`。
#[derive(Debug, Clone)]
pub struct FsWorkflowStore {
    root: PathBuf,
    index_file: String,
}

impl FsWorkflowStore {
    /// Constructs a store rooted at the user-data directory.
    /// 建立以使用者資料夾為根的儲存器。
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            index_file: DEFAULT_INDEX_FILE.to_string(),
        }
    }

    pub fn with_index_file(mut self, index_file: impl Into<String>) -> Self {
        self.index_file = index_file.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn namespace_dir(&self, namespace: &str) -> Result<PathBuf, StoreError> {
        if namespace.is_empty() || !is_plain(Path::new(namespace)) {
            return Err(StoreError::Invalid(format!(
                "namespace {namespace:?} must be a relative path"
            )));
        }
        Ok(self.root.join(namespace))
    }

    fn index_path(&self, namespace: &str) -> Result<PathBuf, StoreError> {
        Ok(self.namespace_dir(namespace)?.join(&self.index_file))
    }

    /// Maps a workflow path to its file, refusing `.`/`..` segments.
    /// 將工作流程路徑轉為檔案位置，拒絕 `.`/`..` 片段。
    fn blob_path(&self, namespace: &str, path: &WorkflowPath) -> Result<PathBuf, StoreError> {
        let mut full = self.namespace_dir(namespace)?;
        for segment in path.segments() {
            if let Some(reason) = unaddressable(segment) {
                return Err(StoreError::Invalid(format!("workflow path {path} {reason}")));
            }
            full.push(segment);
        }
        if path.segments().len() == 1 && path.file_name() == self.index_file {
            return Err(StoreError::Invalid(format!(
                "{path} is reserved for the favorites index"
            )));
        }
        Ok(full)
    }
}

/// Why `segment` cannot name a stored workflow, if it cannot.
/// Listing and addressing share this rule so every listed path is reachable.
fn unaddressable(segment: &str) -> Option<&'static str> {
    if segment == "." || segment == ".." {
        Some("escapes its namespace")
    } else if segment.contains('\\') {
        Some("contains a backslash")
    } else if segment.ends_with(TMP_SUFFIX) {
        Some("uses the reserved temporary suffix")
    } else {
        None
    }
}

fn is_plain(path: &Path) -> bool {
    path.components()
        .all(|component| matches!(component, Component::Normal(_)))
}

fn not_found_as(err: std::io::Error, path: &WorkflowPath) -> StoreError {
    if err.kind() == ErrorKind::NotFound {
        StoreError::NotFound(path.to_string())
    } else {
        StoreError::Io(err)
    }
}

impl WorkflowStore for FsWorkflowStore {
    fn list_paths(&self, namespace: &str) -> Result<Vec<WorkflowPath>, StoreError> {
        let dir = self.namespace_dir(namespace)?;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|err| StoreError::Failed(err.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = match entry.path().strip_prefix(&dir) {
                Ok(relative) => relative,
                Err(_) => continue,
            };
            if relative == Path::new(&self.index_file) {
                continue;
            }
            let segments: Option<Vec<&str>> = relative
                .components()
                .map(|component| component.as_os_str().to_str())
                .collect();
            let Some(segments) = segments else {
                warn!(path = %entry.path().display(), "skipping non UTF-8 workflow path");
                continue;
            };
            if segments.last().is_some_and(|name| name.ends_with(TMP_SUFFIX)) {
                continue;
            }
            if let Some(reason) = segments.iter().find_map(|segment| unaddressable(segment)) {
                warn!(path = %entry.path().display(), reason, "skipping unaddressable workflow");
                continue;
            }
            match WorkflowPath::from_segments(segments) {
                Ok(path) => paths.push(path),
                Err(err) => warn!(path = %entry.path().display(), error = %err, "skipping workflow"),
            }
        }
        debug!(namespace, count = paths.len(), "listed workflows");
        Ok(paths)
    }

    fn get_index(&self, namespace: &str) -> Result<Option<IndexRecord>, StoreError> {
        let path = self.index_path(namespace)?;
        match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map(Some)
                .map_err(|err| StoreError::Invalid(err.to_string())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    fn put_index(&mut self, namespace: &str, record: &IndexRecord) -> Result<(), StoreError> {
        let path = self.index_path(namespace)?;
        let payload = serde_json::to_vec_pretty(record)
            .map_err(|err| StoreError::Invalid(err.to_string()))?;
        write_atomic(&path, &payload)?;
        Ok(())
    }

    fn get_blob(&self, namespace: &str, path: &WorkflowPath) -> Result<String, StoreError> {
        let file = self.blob_path(namespace, path)?;
        if file.is_dir() {
            return Err(StoreError::NotFound(path.to_string()));
        }
        fs::read_to_string(&file).map_err(|err| not_found_as(err, path))
    }

    fn put_blob(
        &mut self,
        namespace: &str,
        path: &WorkflowPath,
        content: &str,
        overwrite: bool,
    ) -> Result<(), StoreError> {
        let file = self.blob_path(namespace, path)?;
        if file.exists() && !overwrite {
            return Err(StoreError::Conflict(path.to_string()));
        }
        write_atomic(&file, content.as_bytes())?;
        Ok(())
    }

    fn delete_blob(&mut self, namespace: &str, path: &WorkflowPath) -> Result<(), StoreError> {
        let file = self.blob_path(namespace, path)?;
        fs::remove_file(&file).map_err(|err| not_found_as(err, path))
    }

    fn move_blob(
        &mut self,
        namespace: &str,
        from: &WorkflowPath,
        to: &WorkflowPath,
        overwrite: bool,
    ) -> Result<(), StoreError> {
        let source = self.blob_path(namespace, from)?;
        let dest = self.blob_path(namespace, to)?;
        if !source.is_file() {
            return Err(StoreError::NotFound(from.to_string()));
        }
        if source == dest {
            return Ok(());
        }
        if dest.exists() && !overwrite {
            return Err(StoreError::Conflict(to.to_string()));
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&source, &dest)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const NS: &str = "workflows";

    fn path(text: &str) -> WorkflowPath {
        WorkflowPath::parse(text).unwrap()
    }

    #[test]
    fn list_skips_index_and_tmp_files() {
        let dir = tempdir().unwrap();
        let mut store = FsWorkflowStore::new(dir.path());
        store.put_blob(NS, &path("b.json"), "{}", false).unwrap();
        store.put_blob(NS, &path("a/c.json"), "{}", false).unwrap();
        store
            .put_index(NS, &IndexRecord { favorites: vec!["b.json".into()] })
            .unwrap();
        fs::write(dir.path().join(NS).join("half.json.tmp"), "x").unwrap();

        let listed: Vec<String> = store
            .list_paths(NS)
            .unwrap()
            .iter()
            .map(|p| p.to_string())
            .collect();
        assert_eq!(listed, vec!["a/c.json", "b.json"]);
    }

    #[test]
    fn missing_namespace_lists_nothing_and_has_no_index() {
        let dir = tempdir().unwrap();
        let store = FsWorkflowStore::new(dir.path());
        assert!(store.list_paths(NS).unwrap().is_empty());
        assert!(store.get_index(NS).unwrap().is_none());
    }

    #[test]
    fn index_round_trip_uses_configured_name() {
        let dir = tempdir().unwrap();
        let mut store = FsWorkflowStore::new(dir.path()).with_index_file("favs.json");
        let record = IndexRecord {
            favorites: vec!["x.json".into(), "y/z.json".into()],
        };
        store.put_index(NS, &record).unwrap();
        assert!(dir.path().join(NS).join("favs.json").exists());
        assert_eq!(store.get_index(NS).unwrap(), Some(record));
    }

    #[test]
    fn malformed_index_is_invalid() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(NS)).unwrap();
        fs::write(dir.path().join(NS).join(DEFAULT_INDEX_FILE), "not json").unwrap();
        let store = FsWorkflowStore::new(dir.path());
        assert!(matches!(store.get_index(NS), Err(StoreError::Invalid(_))));
    }

    #[test]
    fn put_get_delete_and_not_found() {
        let dir = tempdir().unwrap();
        let mut store = FsWorkflowStore::new(dir.path());
        store.put_blob(NS, &path("f.json"), "one", false).unwrap();
        assert!(store
            .put_blob(NS, &path("f.json"), "two", false)
            .unwrap_err()
            .is_conflict());
        store.put_blob(NS, &path("f.json"), "two", true).unwrap();
        assert_eq!(store.get_blob(NS, &path("f.json")).unwrap(), "two");

        store.delete_blob(NS, &path("f.json")).unwrap();
        assert!(store.get_blob(NS, &path("f.json")).unwrap_err().is_not_found());
        assert!(store.delete_blob(NS, &path("f.json")).unwrap_err().is_not_found());
    }

    #[test]
    fn move_blob_conflict_and_overwrite() {
        let dir = tempdir().unwrap();
        let mut store = FsWorkflowStore::new(dir.path());
        store.put_blob(NS, &path("a.json"), "A", false).unwrap();
        store.put_blob(NS, &path("b.json"), "B", false).unwrap();

        assert!(store
            .move_blob(NS, &path("a.json"), &path("b.json"), false)
            .unwrap_err()
            .is_conflict());
        assert_eq!(store.get_blob(NS, &path("b.json")).unwrap(), "B");

        store
            .move_blob(NS, &path("a.json"), &path("b.json"), true)
            .unwrap();
        assert_eq!(store.get_blob(NS, &path("b.json")).unwrap(), "A");
        assert!(store.get_blob(NS, &path("a.json")).unwrap_err().is_not_found());

        store
            .move_blob(NS, &path("b.json"), &path("deep/dir/b.json"), false)
            .unwrap();
        assert_eq!(store.get_blob(NS, &path("deep/dir/b.json")).unwrap(), "A");
        assert!(store
            .move_blob(NS, &path("b.json"), &path("c.json"), false)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn temporary_suffix_is_not_a_workflow_name() {
        let dir = tempdir().unwrap();
        let mut store = FsWorkflowStore::new(dir.path());
        assert!(matches!(
            store.put_blob(NS, &path("x.json.tmp"), "PRECIOUS", false),
            Err(StoreError::Invalid(_))
        ));

        // A stray file with that name survives a save of its base name.
        fs::create_dir_all(dir.path().join(NS)).unwrap();
        fs::write(dir.path().join(NS).join("x.json.tmp"), "PRECIOUS").unwrap();
        store.put_blob(NS, &path("x.json"), "{}", false).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join(NS).join("x.json.tmp")).unwrap(),
            "PRECIOUS"
        );

        // Moving onto such a name would hide the workflow from the listing.
        store.put_blob(NS, &path("a.json"), "A", false).unwrap();
        assert!(matches!(
            store.move_blob(NS, &path("a.json"), &path("backup.tmp"), false),
            Err(StoreError::Invalid(_))
        ));
        assert_eq!(store.get_blob(NS, &path("a.json")).unwrap(), "A");
        let listed: Vec<String> = store
            .list_paths(NS)
            .unwrap()
            .iter()
            .map(|p| p.to_string())
            .collect();
        assert_eq!(listed, vec!["a.json", "x.json"]);
    }

    #[cfg(unix)]
    #[test]
    fn backslash_names_are_not_listed() {
        let dir = tempdir().unwrap();
        let mut store = FsWorkflowStore::new(dir.path());
        store.put_blob(NS, &path("ok.json"), "{}", false).unwrap();
        fs::write(dir.path().join(NS).join("a\\b.json"), "{}").unwrap();

        let listed = store.list_paths(NS).unwrap();
        assert_eq!(listed, vec![path("ok.json")]);
        for listed_path in &listed {
            assert!(store.get_blob(NS, listed_path).is_ok());
        }
    }

    #[test]
    fn traversal_and_reserved_names_are_rejected() {
        let dir = tempdir().unwrap();
        let mut store = FsWorkflowStore::new(dir.path());
        assert!(matches!(
            store.put_blob(NS, &path("../escape.json"), "{}", true),
            Err(StoreError::Invalid(_))
        ));
        assert!(matches!(
            store.put_blob(NS, &path(".index.json"), "{}", true),
            Err(StoreError::Invalid(_))
        ));
        assert!(matches!(
            store.list_paths("../outside"),
            Err(StoreError::Invalid(_))
        ));
    }
}
