use std::collections::HashMap;

use crate::path::{trim_extension, WorkflowPath};

/// One saved workflow as shown in the menu.
/// 選單中代表單一工作流程的葉節點。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    pub path: WorkflowPath,
    /// Full path with the extension trimmed.
    pub display_name: String,
    /// Last segment with the extension trimmed.
    pub label: String,
    pub is_favorite: bool,
}

impl FileNode {
    pub fn new(path: WorkflowPath, extension: &str, is_favorite: bool) -> Self {
        let display_name = path.display_name(extension);
        let label = trim_extension(path.file_name(), extension).to_string();
        Self {
            path,
            display_name,
            label,
            is_favorite,
        }
    }
}

/// Flat lookup from full path to its leaf.
/// 完整路徑對應葉節點的平面索引。
///
/// Filled only while a [`PathTree`](crate::tree::PathTree) is built; every
/// removal from the tree must evict the matching entry here.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    nodes: HashMap<WorkflowPath, FileNode>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &WorkflowPath) -> Option<&FileNode> {
        self.nodes.get(path)
    }

    pub fn get_mut(&mut self, path: &WorkflowPath) -> Option<&mut FileNode> {
        self.nodes.get_mut(path)
    }

    pub fn contains(&self, path: &WorkflowPath) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &WorkflowPath> {
        self.nodes.keys()
    }

    pub(crate) fn insert(&mut self, node: FileNode) {
        self.nodes.insert(node.path.clone(), node);
    }

    /// Drops the entry for `path`, returning it if present.
    /// 移除指定路徑的項目。
    pub(crate) fn evict(&mut self, path: &WorkflowPath) -> Option<FileNode> {
        self.nodes.remove(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(text: &str) -> WorkflowPath {
        WorkflowPath::parse(text).unwrap()
    }

    #[test]
    fn file_node_trims_extension() {
        let node = FileNode::new(path("team/render.json"), ".json", false);
        assert_eq!(node.display_name, "team/render");
        assert_eq!(node.label, "render");
    }

    #[test]
    fn insert_get_and_evict() {
        let mut registry = NodeRegistry::new();
        registry.insert(FileNode::new(path("a.json"), ".json", true));
        assert!(registry.contains(&path("a.json")));
        assert!(registry.get(&path("a.json")).unwrap().is_favorite);

        registry.get_mut(&path("a.json")).unwrap().is_favorite = false;
        assert!(!registry.get(&path("a.json")).unwrap().is_favorite);

        let evicted = registry.evict(&path("a.json")).unwrap();
        assert_eq!(evicted.label, "a");
        assert!(registry.is_empty());
        assert!(registry.evict(&path("a.json")).is_none());
    }
}
