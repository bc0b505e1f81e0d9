use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use workflowdeck_core::WorkflowPath;
use workflowdeck_store::write_atomic;

/// Host-side state carried between runs.  
/// 宿主在多次執行之間保留的狀態。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Workflow currently loaded in the editor.
    #[serde(default)]
    pub active_workflow: Option<String>,
    /// Whether the loaded graph has edits that were never saved.
    #[serde(default)]
    pub unsaved: bool,
    /// Display identifiers of every open workflow.
    #[serde(default)]
    pub open_workflows: Vec<String>,
}

impl SessionState {
    /// Parses the recorded active workflow, dropping it when malformed.  
    /// 解析目前工作流程；格式錯誤時視為無。
    pub fn active_path(&self) -> Option<WorkflowPath> {
        let raw = self.active_workflow.as_deref()?;
        match WorkflowPath::parse(raw) {
            Ok(path) => Some(path),
            Err(err) => {
                warn!(active = %raw, error = %err, "ignoring malformed active workflow");
                None
            }
        }
    }

    pub fn set_active_path(&mut self, path: Option<&WorkflowPath>) {
        self.active_workflow = path.map(WorkflowPath::as_key);
    }

    /// Adds `id` to the open set; returns `false` when already present.
    pub fn open(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.open_workflows.contains(&id) {
            return false;
        }
        self.open_workflows.push(id);
        true
    }

    /// Removes `id` from the open set; returns `true` when it was present.
    pub fn close(&mut self, id: &str) -> bool {
        let before = self.open_workflows.len();
        self.open_workflows.retain(|existing| existing != id);
        before != self.open_workflows.len()
    }
}

/// Errors raised by session persistence.  
/// 工作階段儲存相關的錯誤。
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session file IO error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid session payload: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Reads and writes [`SessionState`] as JSON.  
/// 以 JSON 讀寫 [`SessionState`]。
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the state, returning the default when the file is absent.  
    /// 載入狀態；檔案不存在時回傳預設值。
    pub fn load(&self) -> Result<SessionState, SessionError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(SessionState::default()),
            Err(err) => Err(SessionError::Io(err)),
        }
    }

    pub fn save(&self, state: &SessionState) -> Result<(), SessionError> {
        let json = serde_json::to_vec_pretty(state)?;
        write_atomic(&self.path, &json)?;
        Ok(())
    }
}
