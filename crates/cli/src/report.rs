// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! JSON result envelope written to stdout

use serde::Serialize;
use serde_json::Value as Json;

/// Result of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    pub changed: bool,
    pub failed: bool,
    pub check_mode: bool,
    /// Server the tasks ran against, e.g. `mariadb 10.11.6-MariaDB`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    /// Set when the run stopped before any task
    #[serde(skip_serializing_if = "String::is_empty")]
    pub msg: String,
    pub results: Vec<TaskReport>,
}

impl Report {
    pub fn new(check_mode: bool) -> Self {
        Self {
            check_mode,
            ..Default::default()
        }
    }

    /// Run that failed before any task could start
    pub fn fatal(check_mode: bool, msg: impl Into<String>) -> Self {
        Self {
            failed: true,
            check_mode,
            msg: msg.into(),
            ..Default::default()
        }
    }

    pub fn push(&mut self, task: TaskReport) {
        self.changed |= task.changed;
        self.failed |= task.failed;
        self.results.push(task);
    }
}

/// Result of one task
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskReport {
    pub task: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<&'static str>,
    pub changed: bool,
    pub failed: bool,
    /// Serialized outcome on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Json>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
}

/// Why a task failed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskError {
    pub msg: String,
    /// Statements that took effect before the failure
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub applied: Vec<String>,
}

impl TaskReport {
    pub fn succeeded(task: String, kind: &'static str, state: Option<&'static str>, changed: bool, result: Json) -> Self {
        Self {
            task,
            kind,
            state,
            changed,
            failed: false,
            result: Some(result),
            error: None,
        }
    }

    /// A failure that still applied statements counts as a change
    pub fn failed(task: String, kind: &'static str, state: Option<&'static str>, error: TaskError) -> Self {
        Self {
            task,
            kind,
            state,
            changed: !error.applied.is_empty(),
            failed: true,
            result: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_aggregates_flags() {
        let mut report = Report::new(false);
        report.push(TaskReport::succeeded(
            "a".into(),
            "user",
            Some("present"),
            true,
            Json::Null,
        ));
        assert!(report.changed);
        assert!(!report.failed);

        report.push(TaskReport::failed(
            "b".into(),
            "role",
            Some("present"),
            TaskError {
                msg: "boom".into(),
                applied: vec![],
            },
        ));
        assert!(report.failed);
        assert!(!report.results[1].changed);
    }

    #[test]
    fn test_fatal_envelope_shape() {
        let json = serde_json::to_value(Report::fatal(true, "cannot connect")).unwrap();
        assert_eq!(json["failed"], true);
        assert_eq!(json["msg"], "cannot connect");
        assert!(json.get("server").is_none());
        assert_eq!(json["results"], serde_json::json!([]));
    }
}
