//! Filesystem-backed workflow storage for WorkflowDeck.
//! 以檔案系統實作的工作流程儲存。

mod fs_store;
mod util;

pub use fs_store::{FsWorkflowStore, DEFAULT_INDEX_FILE};
pub use util::{write_atomic, TMP_SUFFIX};
