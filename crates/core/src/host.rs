use std::cell::RefCell;
use std::rc::Rc;

use crate::path::WorkflowPath;

/// Host-owned slot naming the workflow currently loaded in the editor.
/// 由宿主持有、記錄目前載入工作流程的共享槽位。
///
/// Cloning yields another handle to the same slot. The menu reads it to
/// compare against mutated paths and writes it on save, load, rename and
/// delete.
#[derive(Debug, Clone, Default)]
pub struct ActiveWorkflow {
    slot: Rc<RefCell<Option<WorkflowPath>>>,
}

impl ActiveWorkflow {
    pub fn new(initial: Option<WorkflowPath>) -> Self {
        Self {
            slot: Rc::new(RefCell::new(initial)),
        }
    }

    pub fn get(&self) -> Option<WorkflowPath> {
        self.slot.borrow().clone()
    }

    pub fn set(&self, path: Option<WorkflowPath>) {
        *self.slot.borrow_mut() = path;
    }

    pub fn clear(&self) {
        self.set(None);
    }

    pub fn is(&self, path: &WorkflowPath) -> bool {
        self.slot.borrow().as_ref() == Some(path)
    }
}

/// Notifications the host pushes into the menu.
/// 宿主推送給選單的通知。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// The active workflow changed (loaded, saved or cleared).
    WorkflowsChanged,
    /// The graph was edited.
    GraphChanged,
    UnsavedChanged(bool),
    /// Display identifiers of every workflow the host has open.
    OpenSetChanged(Vec<String>),
}

/// Text shown on the menu button.
/// 選單按鈕上顯示的標籤。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuLabel {
    pub text: String,
    pub title: String,
    pub unsaved: bool,
}

pub const UNSAVED_LABEL: &str = "Unsaved workflow";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_slot() {
        let host = ActiveWorkflow::default();
        let menu_side = host.clone();
        let path = WorkflowPath::parse("a.json").unwrap();

        menu_side.set(Some(path.clone()));
        assert!(host.is(&path));
        host.clear();
        assert_eq!(menu_side.get(), None);
    }
}
