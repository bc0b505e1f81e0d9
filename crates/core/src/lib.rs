//! Workflow menu core: path tree, node registry, favorites and open overlay.
//! 工作流程選單核心：路徑樹、節點索引、我的最愛與開啟中清單。

pub mod favorites;
pub mod host;
pub mod memory_store;
pub mod menu;
pub mod overlay;
pub mod path;
pub mod registry;
pub mod store;
pub mod tree;

pub use favorites::FavoritesIndex;
pub use host::{ActiveWorkflow, HostEvent, MenuLabel, UNSAVED_LABEL};
pub use memory_store::{MemoryStore, StoreOp};
pub use menu::{DeleteOrder, DeleteRequest, MenuConfig, MenuError, WorkflowMenu};
pub use overlay::OpenOverlay;
pub use path::{trim_extension, PathError, WorkflowPath, DEFAULT_EXTENSION, SEPARATOR};
pub use registry::{FileNode, NodeRegistry};
pub use store::{IndexRecord, StoreError, WorkflowStore};
pub use tree::{Disclosure, FolderNode, PathTree, TreeError, TreeNode};
