use serde_json::json;

use super::registry;
use crate::core::jobs::periodic::DEFAULT_CRONTAB;

#[test]
fn crontab_schedule_defaults_to_every_minute() {
    let validated = registry()
        .periodic_task
        .validate_create(&json!({ "name": "nightly", "type": "CRONTAB", "mode": "site.yml" }))
        .unwrap();
    assert_eq!(validated["schedule"], DEFAULT_CRONTAB);
}

#[test]
fn interval_schedule_defaults_to_zero() {
    let validated = registry()
        .periodic_task
        .validate_create(&json!({ "name": "poll", "type": "INTERVAL" }))
        .unwrap();
    assert_eq!(validated["schedule"], 0);
}

#[test]
fn entity_defaults_are_applied_on_create() {
    let validated = registry()
        .periodic_task
        .validate_create(&json!({ "name": "nightly" }))
        .unwrap();
    assert_eq!(validated["kind"], "PLAYBOOK");
    assert_eq!(validated["type"], "CRONTAB");
    assert_eq!(validated["enabled"], true);
    assert_eq!(validated["save_result"], true);
    assert!(!validated.contains_key("template"));
}

#[tokio::test]
async fn explicit_crontab_is_checked() {
    let schemas = registry();
    let ok = schemas
        .periodic_task
        .validate_create(&json!({ "name": "n", "schedule": "30 2 * * 1-5" }))
        .unwrap();
    assert_eq!(ok["schedule"], "30 2 * * 1-5");

    let errors = schemas
        .periodic_task
        .validate_create(&json!({ "name": "n", "schedule": "every day" }))
        .unwrap_err();
    assert!(errors.contains("schedule"));
}

#[test]
fn blank_crontab_is_kept_blank() {
    let validated = registry()
        .periodic_task
        .validate_create(&json!({ "name": "paused", "type": "CRONTAB", "schedule": "  " }))
        .unwrap();
    assert_eq!(validated["schedule"], "");
}

#[test]
fn blank_interval_is_rejected() {
    let errors = registry()
        .periodic_task
        .validate_create(&json!({ "name": "n", "type": "INTERVAL", "schedule": "" }))
        .unwrap_err();
    assert!(errors.contains("schedule"));
}

#[test]
fn interval_accepts_clock_notation() {
    let validated = registry()
        .periodic_task
        .validate_create(&json!({ "name": "n", "type": "INTERVAL", "schedule": "01:00:00" }))
        .unwrap();
    assert_eq!(validated["schedule"], 3600);
}

#[test]
fn template_kind_drops_mode_input() {
    let validated = registry()
        .periodic_task
        .validate_create(&json!({
            "name": "from template",
            "kind": "TEMPLATE",
            "template": 1,
            "mode": "site.yml",
            "inventory": "5"
        }))
        .unwrap();
    assert!(!validated.contains_key("mode"));
    assert_eq!(validated["template"], 1);
}

#[test]
fn template_reference_must_be_a_pk() {
    let errors = registry()
        .periodic_task
        .validate_create(&json!({ "name": "n", "kind": "TEMPLATE", "template": "T1" }))
        .unwrap_err();
    assert!(errors.contains("template"));
}

#[test]
fn unknown_kind_is_rejected_and_dependents_skipped() {
    let errors = registry()
        .periodic_task
        .validate_create(&json!({ "name": "n", "kind": "SHELL", "mode": "ls" }))
        .unwrap_err();
    assert!(errors.contains("kind"));
    assert!(!errors.contains("mode"));
}
