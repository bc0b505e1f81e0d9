use thiserror::Error;
use tracing::debug;

use crate::favorites::FavoritesIndex;
use crate::path::{join_segments, WorkflowPath};
use crate::registry::{FileNode, NodeRegistry};

/// Disclosure state of a folder.
/// 資料夾的展開狀態。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Disclosure {
    Open,
    #[default]
    Closed,
}

impl Disclosure {
    pub fn toggled(self) -> Self {
        match self {
            Disclosure::Open => Disclosure::Closed,
            Disclosure::Closed => Disclosure::Open,
        }
    }
}

/// Aggregation node for one shared path prefix.
/// 代表共同路徑前綴的資料夾節點。
#[derive(Debug, Clone, PartialEq)]
pub struct FolderNode {
    pub name: String,
    /// Canonical prefix key (`a/b`); empty for the root.
    pub prefix: String,
    pub disclosure: Disclosure,
    /// Children in first-seen order from the listing.
    pub children: Vec<TreeNode>,
}

impl FolderNode {
    fn new(name: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            disclosure: Disclosure::default(),
            children: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Child folder named `name`, if any.
    pub fn folder(&self, name: &str) -> Option<&FolderNode> {
        self.children.iter().find_map(|child| match child {
            TreeNode::Folder(folder) if folder.name == name => Some(folder),
            _ => None,
        })
    }

    fn folder_mut(&mut self, name: &str) -> Option<&mut FolderNode> {
        self.children.iter_mut().find_map(|child| match child {
            TreeNode::Folder(folder) if folder.name == name => Some(folder),
            _ => None,
        })
    }

    fn insert_leaf(&mut self, path: &WorkflowPath, depth: usize) -> bool {
        let segments = path.segments();
        if depth + 1 == segments.len() {
            self.children.push(TreeNode::File(path.clone()));
            return true;
        }

        let name = &segments[depth];
        let index = match self
            .children
            .iter()
            .position(|child| matches!(child, TreeNode::Folder(folder) if folder.name == *name))
        {
            Some(index) => index,
            None => {
                let prefix = join_segments(&segments[..=depth]);
                self.children
                    .push(TreeNode::Folder(FolderNode::new(name.clone(), prefix)));
                self.children.len() - 1
            }
        };

        match self.children.get_mut(index) {
            Some(TreeNode::Folder(child)) => child.insert_leaf(path, depth + 1),
            _ => false,
        }
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a WorkflowPath>) {
        for child in &self.children {
            match child {
                TreeNode::Folder(folder) => folder.collect_leaves(out),
                TreeNode::File(path) => out.push(path),
            }
        }
    }

    fn count_folders(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                TreeNode::Folder(folder) => 1 + folder.count_folders(),
                TreeNode::File(_) => 0,
            })
            .sum()
    }
}

/// Either a folder or a reference to a leaf held in [`NodeRegistry`].
/// 樹狀節點：資料夾，或指向節點索引中葉節點的路徑。
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    Folder(FolderNode),
    File(WorkflowPath),
}

/// Hierarchy built from a flat, ordered listing of workflow paths.
/// 由有序路徑清單建構的階層樹。
#[derive(Debug, Clone, PartialEq)]
pub struct PathTree {
    root: FolderNode,
}

impl Default for PathTree {
    fn default() -> Self {
        Self::empty()
    }
}

impl PathTree {
    pub fn empty() -> Self {
        Self {
            root: FolderNode::new("", ""),
        }
    }

    /// Builds the tree and its registry in listing order.
    /// 依清單順序建構樹與節點索引。
    ///
    /// Shared prefixes reuse one folder. A path listed twice keeps its first
    /// position only. Nothing is sorted.
    pub fn build<I>(listing: I, favorites: &FavoritesIndex, extension: &str) -> (Self, NodeRegistry)
    where
        I: IntoIterator<Item = WorkflowPath>,
    {
        let mut tree = Self::empty();
        let mut registry = NodeRegistry::new();

        for path in listing {
            if registry.contains(&path) {
                debug!(path = %path, "duplicate path in listing ignored");
                continue;
            }
            if tree.root.insert_leaf(&path, 0) {
                let is_favorite = favorites.is_favorite(&path);
                registry.insert(FileNode::new(path, extension, is_favorite));
            }
        }

        debug!(
            leaves = registry.len(),
            folders = tree.folder_count(),
            "workflow tree built"
        );
        (tree, registry)
    }

    pub fn root(&self) -> &FolderNode {
        &self.root
    }

    /// Folder at `prefix`; the empty prefix is the root.
    /// 取得指定前綴的資料夾；空前綴即根節點。
    pub fn folder(&self, prefix: &[String]) -> Option<&FolderNode> {
        let mut current = &self.root;
        for segment in prefix {
            current = current.folder(segment)?;
        }
        Some(current)
    }

    fn folder_mut(&mut self, prefix: &[String]) -> Option<&mut FolderNode> {
        let mut current = &mut self.root;
        for segment in prefix {
            current = current.folder_mut(segment)?;
        }
        Some(current)
    }

    /// Flips the disclosure of exactly one folder.
    /// 僅切換單一資料夾的展開狀態，不影響上層。
    pub fn toggle_folder(&mut self, prefix: &[String]) -> Result<Disclosure, TreeError> {
        if prefix.is_empty() {
            return Err(TreeError::UnknownFolder(String::new()));
        }
        let folder = self
            .folder_mut(prefix)
            .ok_or_else(|| TreeError::UnknownFolder(join_segments(prefix)))?;
        folder.disclosure = folder.disclosure.toggled();
        Ok(folder.disclosure)
    }

    pub fn contains_leaf(&self, path: &WorkflowPath) -> bool {
        let segments = path.segments();
        self.folder(&segments[..segments.len() - 1])
            .map(|parent| {
                parent
                    .children
                    .iter()
                    .any(|child| matches!(child, TreeNode::File(leaf) if leaf == path))
            })
            .unwrap_or(false)
    }

    /// All leaves in depth-first display order.
    /// 依顯示順序列出所有葉節點。
    pub fn leaves(&self) -> Vec<&WorkflowPath> {
        let mut out = Vec::new();
        self.root.collect_leaves(&mut out);
        out
    }

    pub fn folder_count(&self) -> usize {
        self.root.count_folders()
    }

    /// Detaches a leaf and evicts it from `registry` in the same step.
    ///
    /// When the leaf's parent folder is left with no children it is removed
    /// from its own parent. Only that one level collapses. Returns the prefix
    /// of the collapsed folder, if any.
    pub(crate) fn remove_leaf(
        &mut self,
        path: &WorkflowPath,
        registry: &mut NodeRegistry,
    ) -> Result<Option<String>, TreeError> {
        let segments = path.segments();
        let depth = segments.len();
        let parent = self
            .folder_mut(&segments[..depth - 1])
            .ok_or_else(|| TreeError::UnknownLeaf(path.clone()))?;
        let position = parent
            .children
            .iter()
            .position(|child| matches!(child, TreeNode::File(leaf) if leaf == path))
            .ok_or_else(|| TreeError::UnknownLeaf(path.clone()))?;
        parent.children.remove(position);
        let parent_empty = parent.is_empty();
        registry.evict(path);

        let mut collapsed_folder = None;
        if parent_empty && depth >= 2 {
            let folder_name = &segments[depth - 2];
            if let Some(grandparent) = self.folder_mut(&segments[..depth - 2]) {
                grandparent.children.retain(
                    |child| !matches!(child, TreeNode::Folder(folder) if folder.name == *folder_name),
                );
                collapsed_folder = Some(join_segments(&segments[..depth - 1]));
            }
        }
        Ok(collapsed_folder)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("folder {0:?} not found")]
    UnknownFolder(String),
    #[error("workflow {0} is not in the tree")]
    UnknownLeaf(WorkflowPath),
}
