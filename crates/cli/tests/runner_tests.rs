// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Task files run against scripted servers

use mysql_accounts_cli::{TaskFile, run_tasks};
use mysql_accounts_test_utils::{TranscriptAssertions, fixtures, rows};

fn task_file(yaml: &str) -> TaskFile {
    TaskFile::from_yaml(yaml).unwrap()
}

// ============================================================================
// Successful runs
// ============================================================================

#[tokio::test]
async fn test_tasks_run_in_order() {
    let mut conn = fixtures::mysql_80()
        .respond("SELECT count(*) FROM mysql.user", rows::count(1))
        .build();
    let file = task_file(
        r#"
tasks:
  - name: drop legacy account
    state: absent
    user: {name: legacy, host: "%"}
  - replication: {mode: stop_replica}
"#,
    );

    let report = run_tasks(&mut conn, &file).await;

    assert!(report.changed);
    assert!(!report.failed);
    assert!(report.server.as_deref().unwrap().contains("8.0.36"));
    assert_eq!(report.results.len(), 2);
    assert_eq!(report.results[0].task, "drop legacy account");
    assert_eq!(report.results[0].state, Some("absent"));
    assert_eq!(report.results[1].kind, "replication");
    assert_eq!(report.results[1].task, "replication StopReplica");
    TranscriptAssertions::assert_mutations(&conn, &["DROP USER IF EXISTS 'legacy'@'%'", "STOP REPLICA"]);
}

#[tokio::test]
async fn test_check_mode_is_read_only() {
    let mut conn = fixtures::mysql_80()
        .respond("SELECT count(*) FROM mysql.user", rows::count(0))
        .build();
    let file = task_file(
        r#"
check_mode: true
tasks:
  - user: {name: app, host: "%", password: secret}
  - replication: {mode: reset_primary}
"#,
    );

    let report = run_tasks(&mut conn, &file).await;

    assert!(report.check_mode);
    assert!(report.changed);
    assert_eq!(report.results[0].result.as_ref().unwrap()["msg"], "User added");
    TranscriptAssertions::assert_read_only(&conn);
}

#[tokio::test]
async fn test_envelope_serializes_outcomes() {
    let mut conn = fixtures::mariadb_1011().build();
    let file = task_file("tasks:\n  - replication: {mode: replica_status}\n");

    let report = run_tasks(&mut conn, &file).await;
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["failed"], false);
    assert_eq!(json["results"][0]["result"]["status"]["Is_Replica"], false);
    assert_eq!(json["results"][0]["result"]["statements"][0], "SHOW REPLICA STATUS");
    assert!(json["results"][0].get("error").is_none());
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_first_failure_stops_the_run() {
    let mut conn = fixtures::mysql_80()
        .fail("STOP REPLICA", 1200, "The server is not configured as replica")
        .build();
    let file = task_file(
        r#"
tasks:
  - replication: {mode: stop_replica, fail_on_error: true}
  - state: absent
    user: {name: legacy}
"#,
    );

    let report = run_tasks(&mut conn, &file).await;

    assert!(report.failed);
    assert!(!report.changed);
    assert_eq!(report.results.len(), 1);
    let error = report.results[0].error.as_ref().unwrap();
    assert_eq!(error.msg, "STOP REPLICA failed: The server is not configured as replica");
    TranscriptAssertions::assert_not_sent(&conn, "mysql.user");
}

#[tokio::test]
async fn test_partial_application_is_reported() {
    let mut conn = fixtures::mysql_80()
        .respond("SELECT count(*) FROM mysql.user", rows::count(0))
        .fail("GRANT SELECT", 1044, "Access denied")
        .build();
    let file = task_file(
        r#"
tasks:
  - user: {name: app, host: "%", priv: "db.*:SELECT"}
"#,
    );

    let report = run_tasks(&mut conn, &file).await;

    let task = &report.results[0];
    assert!(task.failed);
    assert!(task.changed);
    assert!(report.changed);
    let error = task.error.as_ref().unwrap();
    assert!(error.applied[0].starts_with("CREATE USER 'app'@'%'"));
}

#[tokio::test]
async fn test_capability_error_reported_per_task() {
    let mut conn = fixtures::mysql_57().build();
    let file = task_file("tasks:\n  - role: {name: readers}\n");

    let report = run_tasks(&mut conn, &file).await;

    assert!(report.failed);
    assert_eq!(report.results[0].kind, "role");
    assert!(report.results[0].error.as_ref().unwrap().msg.starts_with("roles is not supported"));
}

#[tokio::test]
async fn test_unreachable_probe_is_fatal() {
    let mut conn = fixtures::mysql_80()
        .fail("SELECT VERSION()", 2013, "Lost connection to MySQL server during query")
        .build();
    let file = task_file("tasks:\n  - replication: {mode: primary_status}\n");

    let report = run_tasks(&mut conn, &file).await;

    assert!(report.failed);
    assert!(report.results.is_empty());
    assert!(report.msg.contains("Lost connection"));
}
