/// Workflows the host currently has open, independent of the saved tree.
/// 宿主目前開啟的工作流程清單，與已儲存的樹無關。
///
/// Entries are display identifiers; an unsaved workflow has no path at all.
/// The overlay is display-only: favorite and remove requests are refused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenOverlay {
    entries: Vec<String>,
}

impl OpenOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the list with the host's latest open set.
    /// 以宿主最新的開啟清單取代目前內容。
    pub fn replace(&mut self, entries: Vec<String>) {
        self.entries = entries;
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}
