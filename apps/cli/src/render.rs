//! Plain-text rendering of the menu sections.
//! 選單各區塊的純文字輸出。

use std::fmt::Write;

use workflowdeck_core::{FolderNode, NodeRegistry, TreeNode, WorkflowMenu, WorkflowStore};

const INDENT: &str = "  ";

/// Renders the whole tree, expanding every folder.
pub fn tree<S: WorkflowStore>(menu: &WorkflowMenu<S>) -> String {
    let mut out = String::new();
    if let (Some(tree), Some(registry)) = (menu.tree(), menu.registry()) {
        if tree.root().is_empty() {
            out.push_str("(no saved workflows)\n");
        } else {
            render_folder(&mut out, tree.root(), registry, 0);
        }
    }
    out
}

fn render_folder(out: &mut String, folder: &FolderNode, registry: &NodeRegistry, depth: usize) {
    for child in &folder.children {
        let indent = INDENT.repeat(depth);
        match child {
            TreeNode::Folder(sub) => {
                let _ = writeln!(out, "{indent}{}/", sub.name);
                render_folder(out, sub, registry, depth + 1);
            }
            TreeNode::File(path) => {
                let Some(node) = registry.get(path) else {
                    continue;
                };
                let marker = if node.is_favorite { '*' } else { '-' };
                let _ = writeln!(out, "{indent}{marker} {}  [{}]", node.label, node.path);
            }
        }
    }
}

pub fn favorites<S: WorkflowStore>(menu: &WorkflowMenu<S>) -> String {
    let view = menu.favorites_view();
    if view.is_empty() {
        return "(no favorites)\n".to_string();
    }
    let mut out = String::new();
    for node in view {
        let _ = writeln!(out, "* {}  [{}]", node.display_name, node.path);
    }
    out
}

pub fn open_list<S: WorkflowStore>(menu: &WorkflowMenu<S>) -> String {
    let entries = menu.open_view();
    if entries.is_empty() {
        return "(no open workflows)\n".to_string();
    }
    entries.iter().fold(String::new(), |mut out, entry| {
        let _ = writeln!(out, "{entry}");
        out
    })
}
