use std::error::Error;
use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn cli(root: &Path) -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("workflowdeck")?;
    cmd.arg("--root").arg(root).env_remove("RUST_LOG");
    Ok(cmd)
}

fn seed(root: &Path, files: &[&str], favorites: &[&str]) -> Result<(), Box<dyn Error>> {
    let ns = root.join("workflows");
    for file in files {
        let path = ns.join(file);
        fs::create_dir_all(path.parent().ok_or("no parent")?)?;
        fs::write(path, format!("{{\"name\":\"{file}\"}}"))?;
    }
    fs::create_dir_all(&ns)?;
    let index = serde_json::json!({ "favorites": favorites });
    fs::write(ns.join(".index.json"), serde_json::to_vec(&index)?)?;
    Ok(())
}

#[test]
fn tree_lists_folders_before_their_files_with_favorite_markers() -> Result<(), Box<dyn Error>> {
    let root = tempdir()?;
    seed(root.path(), &["a/b.json", "a/c.json", "d.json"], &["a/b.json"])?;

    cli(root.path())?
        .arg("tree")
        .assert()
        .success()
        .stdout("a/\n  * b  [a/b.json]\n  - c  [a/c.json]\n- d  [d.json]\n");
    Ok(())
}

#[test]
fn empty_namespace_prints_placeholder() -> Result<(), Box<dyn Error>> {
    let root = tempdir()?;
    cli(root.path())?
        .arg("tree")
        .assert()
        .success()
        .stdout("(no saved workflows)\n");
    cli(root.path())?
        .arg("favorites")
        .assert()
        .success()
        .stdout("(no favorites)\n");
    Ok(())
}

#[test]
fn favorite_toggles_and_persists_sidecar() -> Result<(), Box<dyn Error>> {
    let root = tempdir()?;
    seed(root.path(), &["a/b.json", "d.json"], &["a/b.json"])?;

    cli(root.path())?
        .args(["favorite", "d.json"])
        .assert()
        .success()
        .stdout("Favorited d.json\n");
    cli(root.path())?
        .arg("favorites")
        .assert()
        .success()
        .stdout("* a/b  [a/b.json]\n* d  [d.json]\n");

    cli(root.path())?
        .args(["favorite", "a/b.json"])
        .assert()
        .success()
        .stdout("Unfavorited a/b.json\n");
    let sidecar = fs::read_to_string(root.path().join("workflows").join(".index.json"))?;
    assert!(sidecar.contains("d.json"));
    assert!(!sidecar.contains("a/b.json"));
    Ok(())
}

#[test]
fn delete_requires_confirmation_and_collapses_empty_folder() -> Result<(), Box<dyn Error>> {
    let root = tempdir()?;
    seed(root.path(), &["a/b.json", "d.json"], &["a/b.json"])?;

    cli(root.path())?
        .args(["delete", "a/b.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("without --yes"));
    assert!(root.path().join("workflows/a/b.json").exists());

    cli(root.path())?
        .args(["delete", "a/b.json", "--yes"])
        .assert()
        .success()
        .stdout("Deleted a/b.json\n");
    assert!(!root.path().join("workflows/a/b.json").exists());

    cli(root.path())?
        .arg("tree")
        .assert()
        .success()
        .stdout("- d  [d.json]\n");
    cli(root.path())?
        .arg("favorites")
        .assert()
        .success()
        .stdout("(no favorites)\n");
    Ok(())
}

#[test]
fn delete_missing_workflow_reports_not_found() -> Result<(), Box<dyn Error>> {
    let root = tempdir()?;
    seed(root.path(), &["d.json"], &[])?;
    cli(root.path())?
        .args(["delete", "ghost.json", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("workflow 'ghost.json' not found"));
    Ok(())
}

#[test]
fn rename_conflict_needs_overwrite() -> Result<(), Box<dyn Error>> {
    let root = tempdir()?;
    seed(root.path(), &["a.json", "b.json"], &[])?;

    cli(root.path())?
        .args(["rename", "a.json", "b.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("re-run with --overwrite"));
    assert!(root.path().join("workflows/a.json").exists());

    cli(root.path())?
        .args(["rename", "a.json", "b.json", "--overwrite"])
        .assert()
        .success()
        .stdout("Renamed a.json -> b.json\n");
    let content = fs::read_to_string(root.path().join("workflows/b.json"))?;
    assert!(content.contains("a.json"));
    Ok(())
}

#[test]
fn rename_into_folder_moves_active_workflow() -> Result<(), Box<dyn Error>> {
    let root = tempdir()?;
    seed(root.path(), &["p.json"], &[])?;

    cli(root.path())?.args(["load", "p.json"]).assert().success();
    cli(root.path())?
        .args(["rename", "p.json", "team/p.json"])
        .assert()
        .success();
    cli(root.path())?
        .arg("status")
        .assert()
        .success()
        .stdout("team/p\n");
    Ok(())
}

#[test]
fn save_as_appends_extension_and_becomes_active() -> Result<(), Box<dyn Error>> {
    let root = tempdir()?;
    let input = root.path().join("graph.json");
    fs::write(&input, r#"{"nodes":[]}"#)?;

    cli(root.path())?
        .args(["save", "flows/render"])
        .arg("--input")
        .arg(&input)
        .assert()
        .success()
        .stdout("Saved flows/render.json\n");
    assert_eq!(
        fs::read_to_string(root.path().join("workflows/flows/render.json"))?,
        r#"{"nodes":[]}"#
    );
    cli(root.path())?
        .arg("status")
        .assert()
        .success()
        .stdout("flows/render\n");

    cli(root.path())?
        .args(["save", "flows/render.json"])
        .arg("--input")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    // Plain save writes over the active workflow.
    fs::write(&input, r#"{"nodes":[1]}"#)?;
    cli(root.path())?
        .arg("save")
        .arg("--input")
        .arg(&input)
        .assert()
        .success()
        .stdout("Saved flows/render.json\n");
    assert_eq!(
        fs::read_to_string(root.path().join("workflows/flows/render.json"))?,
        r#"{"nodes":[1]}"#
    );
    Ok(())
}

#[test]
fn save_without_active_workflow_fails() -> Result<(), Box<dyn Error>> {
    let root = tempdir()?;
    let input = root.path().join("graph.json");
    fs::write(&input, "{}")?;
    cli(root.path())?
        .arg("save")
        .arg("--input")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("Error:"));
    Ok(())
}

#[test]
fn load_sets_status_and_open_list() -> Result<(), Box<dyn Error>> {
    let root = tempdir()?;
    seed(root.path(), &["team/flow.json"], &[])?;

    cli(root.path())?
        .args(["load", "team/flow.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\":\"team/flow.json\""));
    cli(root.path())?
        .arg("status")
        .assert()
        .success()
        .stdout("team/flow\n");
    cli(root.path())?
        .arg("open-list")
        .assert()
        .success()
        .stdout("team/flow\n");

    cli(root.path())?.arg("new").assert().success().stdout("Unsaved workflow\n");
    cli(root.path())?
        .arg("status")
        .assert()
        .success()
        .stdout("Unsaved workflow\n");
    Ok(())
}

#[test]
fn load_default_clears_active_workflow() -> Result<(), Box<dyn Error>> {
    let root = tempdir()?;
    seed(root.path(), &["team/flow.json"], &[])?;

    cli(root.path())?.args(["load", "team/flow.json"]).assert().success();
    cli(root.path())?
        .arg("load-default")
        .assert()
        .success()
        .stdout("Unsaved workflow\n");
    cli(root.path())?
        .arg("status")
        .assert()
        .success()
        .stdout("Unsaved workflow\n");
    Ok(())
}

#[test]
fn insert_prints_content_without_changing_active() -> Result<(), Box<dyn Error>> {
    let root = tempdir()?;
    seed(root.path(), &["part.json"], &[])?;
    cli(root.path())?
        .args(["insert", "part.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("part.json"));
    cli(root.path())?
        .arg("status")
        .assert()
        .success()
        .stdout("Unsaved workflow\n");
    Ok(())
}

#[test]
fn open_and_close_workflow_notifications_update_overlay() -> Result<(), Box<dyn Error>> {
    let root = tempdir()?;
    cli(root.path())?
        .args(["open-workflow", "Unsaved Workflow (2)"])
        .assert()
        .success()
        .stdout("Unsaved Workflow (2)\n");
    cli(root.path())?
        .args(["open-workflow", "draft"])
        .assert()
        .success()
        .stdout("Unsaved Workflow (2)\ndraft\n");
    cli(root.path())?
        .args(["close-workflow", "Unsaved Workflow (2)"])
        .assert()
        .success()
        .stdout("draft\n");
    cli(root.path())?
        .args(["close-workflow", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not open"));
    Ok(())
}

#[test]
fn config_set_delete_order_persists() -> Result<(), Box<dyn Error>> {
    let root = tempdir()?;
    cli(root.path())?
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"delete_order\": \"remote_first\""));
    cli(root.path())?
        .args(["config", "set-delete-order", "local-first"])
        .assert()
        .success();
    cli(root.path())?
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"delete_order\": \"local_first\""));
    assert!(root
        .path()
        .join(".workflowdeck")
        .join("preferences.json")
        .exists());
    Ok(())
}

#[test]
fn invalid_path_is_rejected() -> Result<(), Box<dyn Error>> {
    let root = tempdir()?;
    cli(root.path())?
        .args(["favorite", "a//b.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid workflow path"));
    Ok(())
}
