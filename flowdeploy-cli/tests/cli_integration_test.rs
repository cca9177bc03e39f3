//! CLI integration tests covering argument parsing, exit codes and the
//! offline (network-free) command paths.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn flowdeploy() -> Command {
    Command::cargo_bin("flowdeploy").expect("binary builds")
}

fn write_backup(root: &std::path::Path, name: &str, file_count: usize) {
    let dir = root.join("backups").join(name);
    std::fs::create_dir_all(&dir).unwrap();
    for i in 0..file_count {
        std::fs::write(
            dir.join(format!("workflow_{i}.json")),
            serde_json::to_string_pretty(&serde_json::json!({
                "name": format!("Workflow {i}-prod"),
                "active": false,
                "nodes": [
                    {
                        "id": "n1",
                        "name": "Start",
                        "type": "n8n-nodes-base.manualTrigger",
                        "position": [0, 0],
                        "parameters": {"note": "padding so the backup is plausibly sized on disk"}
                    }
                ],
                "connections": {}
            }))
            .unwrap(),
        )
        .unwrap();
    }
    std::fs::write(
        dir.join("_backup_metadata.json"),
        serde_json::to_string_pretty(&serde_json::json!({
            "backupName": name,
            "environment": "prod",
            "createdAt": chrono::Utc::now().to_rfc3339(),
            "workflowCount": file_count,
            "failedCount": 0,
            "workflows": []
        }))
        .unwrap(),
    )
    .unwrap();
}

#[test]
fn test_help_lists_commands() {
    flowdeploy()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("export"))
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("restore"))
        .stdout(predicate::str::contains("compare"));
}

#[test]
fn test_no_command_prints_help() {
    flowdeploy()
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_missing_config_fails_with_exit_one() {
    let dir = TempDir::new().unwrap();
    flowdeploy()
        .current_dir(dir.path())
        .args(["--config", "does_not_exist.yaml", "list"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does_not_exist.yaml"));
}

#[test]
fn test_verify_passes_on_complete_backup() {
    let dir = TempDir::new().unwrap();
    write_backup(dir.path(), "good_backup", 3);

    flowdeploy()
        .args(["--dir", dir.path().to_str().unwrap(), "verify", "good_backup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PASS"));
}

#[test]
fn test_verify_fails_on_missing_manifest() {
    let dir = TempDir::new().unwrap();
    write_backup(dir.path(), "broken", 1);
    std::fs::remove_file(dir.path().join("backups/broken/_backup_metadata.json")).unwrap();

    flowdeploy()
        .args(["--dir", dir.path().to_str().unwrap(), "verify", "broken"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("FAIL"));
}

#[test]
fn test_verify_without_name_or_all_fails() {
    let dir = TempDir::new().unwrap();
    flowdeploy()
        .args(["--dir", dir.path().to_str().unwrap(), "verify"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--all"));
}

#[test]
fn test_compare_identical_backups_exits_zero() {
    let dir = TempDir::new().unwrap();
    write_backup(dir.path(), "a", 2);
    write_backup(dir.path(), "b", 2);

    flowdeploy()
        .args(["--dir", dir.path().to_str().unwrap(), "compare", "a", "b"])
        .assert()
        .success()
        .stdout(predicate::str::contains("identical"));
}

#[test]
fn test_compare_different_backups_exits_one() {
    let dir = TempDir::new().unwrap();
    write_backup(dir.path(), "a", 2);
    write_backup(dir.path(), "b", 3);

    flowdeploy()
        .args(["--dir", dir.path().to_str().unwrap(), "compare", "a", "b"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("differences found"));
}

#[test]
fn test_deploy_requires_workflow_argument() {
    flowdeploy().arg("deploy").assert().failure();
}
