use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::favorites::FavoritesIndex;
use crate::host::{ActiveWorkflow, HostEvent, MenuLabel, UNSAVED_LABEL};
use crate::overlay::OpenOverlay;
use crate::path::{PathError, WorkflowPath, DEFAULT_EXTENSION, SEPARATOR};
use crate::registry::{FileNode, NodeRegistry};
use crate::store::{StoreError, WorkflowStore};
use crate::tree::{Disclosure, PathTree, TreeError};

/// When delete commits its local side effects.
/// 刪除時本地狀態變更的時機。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOrder {
    /// Favorites and the active reference change only after the store
    /// confirms the delete.
    #[default]
    RemoteFirst,
    /// Favorites are dropped and the active reference cleared before the
    /// store call; nothing is rolled back if it fails.
    LocalFirst,
}

/// Settings the menu needs from the host configuration.
/// 選單所需的設定。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuConfig {
    pub namespace: String,
    pub extension: String,
    pub delete_order: DeleteOrder,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            namespace: "workflows".to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            delete_order: DeleteOrder::default(),
        }
    }
}

/// Result of the two-step delete control.
/// 兩段式刪除的結果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteRequest {
    /// First activation: waiting for confirmation.
    Armed,
    /// Confirmed; carries whether a node left the tree.
    Deleted(bool),
}

#[derive(Debug)]
struct MenuView {
    tree: PathTree,
    registry: NodeRegistry,
}

/// Workflow browser state: favorites, open overlay, and the tree while open.
/// 工作流程選單：我的最愛、開啟中清單，以及開啟時的路徑樹。
///
/// The tree and registry exist only between [`open`](Self::open) and
/// [`close`](Self::close). Every mutating action takes `&mut self`, so a
/// second submission cannot start while one is still running.
#[derive(Debug)]
pub struct WorkflowMenu<S: WorkflowStore> {
    store: S,
    config: MenuConfig,
    active: ActiveWorkflow,
    favorites: FavoritesIndex,
    favorites_loaded: bool,
    overlay: OpenOverlay,
    view: Option<MenuView>,
    armed_delete: Option<WorkflowPath>,
    unsaved: bool,
    suppress_next_change: bool,
    current_label: String,
}

impl<S: WorkflowStore> WorkflowMenu<S> {
    pub fn new(store: S, config: MenuConfig, active: ActiveWorkflow) -> Self {
        let mut menu = Self {
            store,
            config,
            active,
            favorites: FavoritesIndex::new(),
            favorites_loaded: false,
            overlay: OpenOverlay::new(),
            view: None,
            armed_delete: None,
            unsaved: false,
            suppress_next_change: false,
            current_label: String::new(),
        };
        menu.refresh_label();
        menu
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn config(&self) -> &MenuConfig {
        &self.config
    }

    pub fn active(&self) -> &ActiveWorkflow {
        &self.active
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Reads the sidecar and the listing, then builds tree and registry.
    /// 讀取索引檔與清單並重建樹與節點索引。
    ///
    /// Nothing is replaced unless both reads succeed.
    pub fn open(&mut self) -> Result<(), MenuError> {
        let namespace = self.config.namespace.as_str();
        let favorites = match self.store.get_index(namespace)? {
            Some(record) => FavoritesIndex::from_record(&record),
            None => FavoritesIndex::new(),
        };
        let listing = self.store.list_paths(namespace)?;
        let (tree, registry) = PathTree::build(listing, &favorites, &self.config.extension);

        let stray = favorites
            .iter()
            .filter(|path| !registry.contains(path))
            .count();
        if stray > 0 {
            debug!(stray, "favorites without a workflow are hidden");
        }

        self.favorites = favorites;
        self.favorites_loaded = true;
        self.view = Some(MenuView { tree, registry });
        self.armed_delete = None;
        info!(namespace, "workflow menu opened");
        Ok(())
    }

    /// Drops the tree and registry; favorites and the overlay survive.
    pub fn close(&mut self) {
        self.view = None;
        self.armed_delete = None;
    }

    pub fn is_open(&self) -> bool {
        self.view.is_some()
    }

    fn rebuild(&mut self) -> Result<(), MenuError> {
        if let Err(err) = self.open() {
            // A stale tree would show paths that no longer exist.
            self.close();
            return Err(err);
        }
        Ok(())
    }

    pub fn tree(&self) -> Option<&PathTree> {
        self.view.as_ref().map(|view| &view.tree)
    }

    pub fn registry(&self) -> Option<&NodeRegistry> {
        self.view.as_ref().map(|view| &view.registry)
    }

    pub fn node(&self, path: &WorkflowPath) -> Option<&FileNode> {
        self.registry().and_then(|registry| registry.get(path))
    }

    pub fn favorites(&self) -> &FavoritesIndex {
        &self.favorites
    }

    /// Favorites that resolve to a node, in the order they were added.
    /// 可對應到節點的我的最愛，依加入順序排列。
    pub fn favorites_view(&self) -> Vec<&FileNode> {
        match &self.view {
            Some(view) => self.favorites.project(&view.registry),
            None => Vec::new(),
        }
    }

    pub fn open_view(&self) -> &[String] {
        self.overlay.entries()
    }

    pub fn armed_delete(&self) -> Option<&WorkflowPath> {
        self.armed_delete.as_ref()
    }

    /// Flips the folder at `prefix` (`a/b`) without touching its ancestors.
    pub fn toggle_folder(&mut self, prefix: &str) -> Result<Disclosure, MenuError> {
        let view = self.view.as_mut().ok_or(MenuError::MenuClosed)?;
        let segments: Vec<String> = prefix
            .split(SEPARATOR)
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        Ok(view.tree.toggle_folder(&segments)?)
    }

    fn ensure_favorites(&mut self) -> Result<(), MenuError> {
        if self.favorites_loaded {
            return Ok(());
        }
        if let Some(record) = self.store.get_index(&self.config.namespace)? {
            self.favorites = FavoritesIndex::from_record(&record);
        }
        self.favorites_loaded = true;
        Ok(())
    }

    fn persist_favorites(&mut self) -> Result<(), StoreError> {
        let record = self.favorites.to_record();
        self.store.put_index(&self.config.namespace, &record)
    }

    /// Flips the favorite flag of `path` and writes the sidecar.
    /// 切換我的最愛並寫回索引檔。
    ///
    /// The in-memory set and node flag change first. If the write fails the
    /// error is returned and the in-memory change is kept.
    pub fn toggle_favorite(&mut self, path: &WorkflowPath) -> Result<bool, MenuError> {
        self.ensure_favorites()?;
        let now = self.favorites.toggle(path);
        if let Some(node) = self
            .view
            .as_mut()
            .and_then(|view| view.registry.get_mut(path))
        {
            node.is_favorite = now;
        }

        if let Err(err) = self.persist_favorites() {
            warn!(path = %path, error = %err, "favorites not persisted");
            return Err(err.into());
        }
        info!(path = %path, favorite = now, "favorite toggled");
        Ok(now)
    }

    pub fn is_favorite(&self, path: &WorkflowPath) -> bool {
        self.favorites.is_favorite(path)
    }

    /// Always refused: open entries are display-only.
    pub fn favorite_open_entry(&mut self, id: &str) -> Result<(), MenuError> {
        debug!(id, "favorite request on open workflow vetoed");
        Err(MenuError::OverlayReadOnly(id.to_string()))
    }

    /// Always refused: open entries are display-only.
    pub fn remove_open_entry(&mut self, id: &str) -> Result<(), MenuError> {
        debug!(id, "remove request on open workflow vetoed");
        Err(MenuError::OverlayReadOnly(id.to_string()))
    }

    /// Two-step delete: the first call arms `path`, a second call on the same
    /// path deletes it. Arming another path replaces the armed one.
    /// 兩段式刪除：第一次呼叫進入確認狀態，第二次才真正刪除。
    pub fn request_delete(&mut self, path: &WorkflowPath) -> Result<DeleteRequest, MenuError> {
        if self.armed_delete.as_ref() == Some(path) {
            self.armed_delete = None;
            return self.delete(path).map(DeleteRequest::Deleted);
        }
        self.armed_delete = Some(path.clone());
        Ok(DeleteRequest::Armed)
    }

    pub fn disarm_delete(&mut self) {
        self.armed_delete = None;
    }

    /// Deletes `path` from the store and, when present, from the tree.
    /// 刪除工作流程並同步更新樹、索引與我的最愛。
    ///
    /// Returns whether a node left the tree. If its folder is left empty the
    /// folder is removed too, one level only.
    pub fn delete(&mut self, path: &WorkflowPath) -> Result<bool, MenuError> {
        self.ensure_favorites()?;
        self.armed_delete = None;

        match self.config.delete_order {
            DeleteOrder::LocalFirst => {
                if self.favorites.remove(path) {
                    self.persist_favorites()?;
                }
                if self.active.is(path) {
                    self.active.clear();
                    self.refresh_label();
                }
                self.store.delete_blob(&self.config.namespace, path)?;
            }
            DeleteOrder::RemoteFirst => {
                self.store.delete_blob(&self.config.namespace, path)?;
                if self.active.is(path) {
                    self.active.clear();
                    self.refresh_label();
                }
                if self.favorites.remove(path) {
                    if let Err(err) = self.persist_favorites() {
                        // The entry stays in the sidecar as a stray, which
                        // every view already tolerates.
                        warn!(path = %path, error = %err, "favorites not persisted after delete");
                    }
                }
            }
        }

        let removed = match self.view.as_mut() {
            Some(view) if view.tree.contains_leaf(path) => {
                let collapsed = view.tree.remove_leaf(path, &mut view.registry)?;
                if let Some(folder) = &collapsed {
                    debug!(folder = %folder, "empty folder collapsed");
                }
                true
            }
            _ => false,
        };

        info!(path = %path, removed, "workflow deleted");
        Ok(removed)
    }

    /// Moves `old` to `new`, then rebuilds the open tree from a fresh listing.
    /// 移動／重新命名工作流程，成功後重建樹。
    ///
    /// An existing destination without `overwrite` yields a conflict error and
    /// changes nothing; the caller confirms and retries with `overwrite`.
    pub fn rename(
        &mut self,
        old: &WorkflowPath,
        new: &WorkflowPath,
        overwrite: bool,
    ) -> Result<(), MenuError> {
        self.store
            .move_blob(&self.config.namespace, old, new, overwrite)?;
        self.armed_delete = None;

        if self.active.is(old) {
            self.active.set(Some(new.clone()));
            self.refresh_label();
        }
        info!(from = %old, to = %new, overwrite, "workflow renamed");

        if self.is_open() {
            self.rebuild()?;
        }
        Ok(())
    }

    /// Stores `content` under `name`, or over the active workflow when `name`
    /// is `None`.
    /// 儲存工作流程；未指定名稱時覆寫目前的工作流程。
    ///
    /// A new name gets the configured extension appended when missing.
    pub fn save(
        &mut self,
        name: Option<&str>,
        content: &str,
        overwrite: bool,
    ) -> Result<WorkflowPath, MenuError> {
        let (target, overwrite) = match name {
            Some(name) => (
                WorkflowPath::parse(name)?.with_extension(&self.config.extension),
                overwrite,
            ),
            None => (self.active.get().ok_or(MenuError::NoActiveWorkflow)?, true),
        };

        self.store
            .put_blob(&self.config.namespace, &target, content, overwrite)?;
        self.unsaved = false;
        self.suppress_next_change = true;
        self.active.set(Some(target.clone()));
        self.refresh_label();
        info!(path = %target, overwrite, "workflow saved");

        if self.is_open() {
            self.rebuild()?;
        }
        Ok(target)
    }

    /// Fetches `path`, makes it the active workflow and closes the menu.
    /// 載入工作流程內容並設為目前工作流程。
    pub fn load_workflow(&mut self, path: &WorkflowPath) -> Result<String, MenuError> {
        let content = self.store.get_blob(&self.config.namespace, path)?;
        self.active.set(Some(path.clone()));
        self.unsaved = false;
        // Loading replaces the graph; that change is not an edit.
        self.suppress_next_change = true;
        self.refresh_label();
        self.close();
        info!(path = %path, "workflow loaded");
        Ok(content)
    }

    /// Content of `path` for insertion into the current graph. No state changes.
    pub fn fetch_workflow(&self, path: &WorkflowPath) -> Result<String, MenuError> {
        Ok(self.store.get_blob(&self.config.namespace, path)?)
    }

    /// Starts an empty, unnamed workflow.
    pub fn new_workflow(&mut self) {
        self.active.clear();
        self.unsaved = false;
        self.refresh_label();
        self.close();
    }

    /// Switches the host to its default graph: no active workflow, nothing
    /// unsaved, and the host's reload of the graph is not an edit.
    /// 載入預設工作流程：清除目前工作流程並關閉選單。
    pub fn load_default(&mut self) {
        self.active.clear();
        self.unsaved = false;
        self.suppress_next_change = true;
        self.refresh_label();
        self.close();
        info!("default workflow loaded");
    }

    /// Applies a notification from the host.
    /// 處理宿主送來的通知。
    pub fn notify(&mut self, event: HostEvent) {
        match event {
            HostEvent::WorkflowsChanged => self.refresh_label(),
            HostEvent::GraphChanged => {
                if self.suppress_next_change {
                    self.suppress_next_change = false;
                } else {
                    self.unsaved = true;
                }
            }
            HostEvent::UnsavedChanged(unsaved) => self.unsaved = unsaved,
            HostEvent::OpenSetChanged(entries) => self.overlay.replace(entries),
        }
    }

    pub fn is_unsaved(&self) -> bool {
        self.unsaved
    }

    pub fn label(&self) -> MenuLabel {
        let text = if self.current_label.is_empty() {
            UNSAVED_LABEL.to_string()
        } else {
            self.current_label.clone()
        };
        MenuLabel {
            title: text.clone(),
            text,
            unsaved: self.unsaved,
        }
    }

    fn refresh_label(&mut self) {
        self.current_label = self
            .active
            .get()
            .map(|path| path.display_name(&self.config.extension))
            .unwrap_or_default();
    }
}

/// Errors surfaced by menu actions.
/// 選單操作的錯誤。
#[derive(Debug, Error)]
pub enum MenuError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("workflow menu is not open")]
    MenuClosed,
    #[error("open workflow '{0}' cannot be changed from the menu")]
    OverlayReadOnly(String),
    #[error("no active workflow to save over; a name is required")]
    NoActiveWorkflow,
}

impl MenuError {
    /// Destination exists; retry with `overwrite` after confirmation.
    pub fn is_conflict(&self) -> bool {
        matches!(self, MenuError::Store(err) if err.is_conflict())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, MenuError::Store(err) if err.is_not_found())
    }
}
