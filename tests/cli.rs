use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn db(&self) -> PathBuf {
        self.path().join("jobs.db")
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_runplan"))
            .arg("--db")
            .arg(self.db())
            .arg("--config")
            .arg(self.path().join("runplan.toml"))
            .args(args)
            .env("HOME", self.path())
            .output()
            .expect("runplan binary runs")
    }

    fn json(&self, args: &[&str]) -> Value {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "runplan {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("stdout is JSON")
    }
}

#[test]
fn schema_lists_periodic_task_fields_in_declaration_order() {
    let ws = Workspace::new();
    let schema = ws.json(&["schema", "periodic-task"]);
    let names: Vec<&str> = schema["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|field| field["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            "id",
            "name",
            "kind",
            "mode",
            "inventory",
            "save_result",
            "template",
            "template_opt",
            "enabled",
            "type",
            "schedule",
            "notes"
        ]
    );
}

#[test]
fn unknown_schema_exits_with_failure() {
    let ws = Workspace::new();
    let output = ws.run(&["schema", "inventory"]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn playbook_task_runs_against_its_inventory() {
    let ws = Workspace::new();
    let task = ws.json(&[
        "task",
        "create",
        "--data",
        r#"{"name":"nightly","mode":"site.yml","inventory":"hosts","schedule":"0 3 * * *"}"#,
    ]);
    let id = task["id"].as_i64().unwrap().to_string();
    assert_eq!(task["kind"], "PLAYBOOK");

    let started = ws.json(&["task", "run", &id]);
    assert_eq!(started["detail"], "Started at inventory hosts.");
    let history_id = started["history_id"].as_i64().unwrap().to_string();

    let history = ws.json(&["task", "history", &history_id]);
    assert_eq!(history["mode"], "site.yml");
    assert_eq!(history["status"], "DELAY");
}

#[test]
fn template_task_clears_mode_and_inventory() {
    let ws = Workspace::new();
    let template = ws.json(&[
        "template",
        "create",
        "--data",
        r#"{"name":"deploy","kind":"Task","inventory":"hosts","data":{"playbook":"deploy.yml"}}"#,
    ]);
    let template_id = template["id"].as_i64().unwrap();

    let payload = format!(
        r#"{{"name":"deploy nightly","kind":"TEMPLATE","mode":"site.yml","inventory":"hosts","template":{}}}"#,
        template_id
    );
    let task = ws.json(&["task", "create", "--data", &payload]);
    assert_eq!(task["template"], template_id);
    assert!(task.get("mode").is_none());
    assert_eq!(task["inventory"], "");
}

#[test]
fn invalid_payload_reports_field_errors_on_stderr() {
    let ws = Workspace::new();
    let output = ws.run(&[
        "task",
        "create",
        "--data",
        r#"{"name":"bad","type":"CRONTAB","schedule":"every day"}"#,
    ]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("\"schedule\""), "stderr was: {}", stderr);
}

#[test]
fn settings_round_trip_for_a_user() {
    let ws = Workspace::new();
    let user = ws.json(&["user", "add", "alice"]);
    let user_id = user["id"].as_i64().unwrap().to_string();

    assert_eq!(ws.json(&["settings", "get", &user_id]), serde_json::json!({}));

    let saved = ws.json(&["settings", "set", &user_id, r#"{"autoupdateInterval":15}"#]);
    assert_eq!(saved["autoupdateInterval"], 15);
    assert_eq!(ws.json(&["settings", "get", &user_id]), saved);

    assert_eq!(ws.json(&["settings", "reset", &user_id]), serde_json::json!({}));
}

#[test]
fn permissions_belong_to_exactly_one_owner() {
    let ws = Workspace::new();
    let user_id = ws.json(&["user", "add", "bob"])["id"].as_i64().unwrap().to_string();
    let group_id = ws.json(&["group", "add", "ops"])["id"].as_i64().unwrap().to_string();
    let template = ws.json(&[
        "template",
        "create",
        "--data",
        r#"{"name":"ping","kind":"Module","data":{"module":"ping"}}"#,
    ]);
    let template_id = template["id"].as_i64().unwrap().to_string();

    let both = ws.run(&[
        "acl", "grant", "--template", &template_id, "--user", &user_id, "--group", &group_id,
    ]);
    assert!(!both.status.success());

    let granted = ws.json(&[
        "acl", "grant", "--template", &template_id, "--group", &group_id, "--role", "editor",
    ]);
    assert_eq!(granted["member_type"], "team");
    assert_eq!(granted["role"], "EDITOR");

    let listed = ws.json(&["acl", "list", "--template", &template_id]);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}
