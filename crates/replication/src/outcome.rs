// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Result of one replication operation

use mysql_accounts_connection::{Row, Value};
use serde::Serialize;
use serde_json::{Map, Value as Json};

/// What a replication operation did or found
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplicationOutcome {
    pub changed: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub msg: String,
    /// Status row, with an `Is_Primary` / `Is_Replica` flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Map<String, Json>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<Map<String, Json>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Statements issued, secrets masked
    pub statements: Vec<String>,
}

impl ReplicationOutcome {
    pub fn changed(msg: impl Into<String>) -> Self {
        Self {
            changed: true,
            msg: msg.into(),
            ..Default::default()
        }
    }

    pub fn unchanged(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            ..Default::default()
        }
    }

    /// Outcome of a status read; `flag` tells whether a row came back
    pub fn status(row: Option<&Row>, flag: &str, missing: &str) -> Self {
        let mut status = row.map(row_to_map).unwrap_or_default();
        status.insert(flag.to_string(), Json::Bool(row.is_some()));
        Self {
            msg: if row.is_some() { String::new() } else { missing.to_string() },
            status: Some(status),
            ..Default::default()
        }
    }

    /// Whether the status read found a row
    pub fn flag(&self, flag: &str) -> bool {
        self.status
            .as_ref()
            .and_then(|s| s.get(flag))
            .and_then(Json::as_bool)
            .unwrap_or(false)
    }

    pub fn status_text(&self, column: &str) -> Option<&str> {
        self.status.as_ref()?.get(column)?.as_str()
    }
}

/// Column name to value, in column order
pub fn row_to_map(row: &Row) -> Map<String, Json> {
    row.columns()
        .iter()
        .zip(row.values())
        .map(|(column, value)| (column.clone(), to_json(value)))
        .collect()
}

fn to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Int(n) => Json::from(*n),
        Value::Secret(_) => Json::from("********"),
        other => other.as_text().map(|t| Json::from(t.into_owned())).unwrap_or(Json::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_flags_present_row() {
        let row = Row::new(
            vec!["File".into(), "Position".into()],
            vec![Value::from("binlog.000003"), Value::Int(157)],
        );
        let outcome = ReplicationOutcome::status(Some(&row), "Is_Primary", "not a primary");
        assert!(outcome.flag("Is_Primary"));
        assert_eq!(outcome.status_text("File"), Some("binlog.000003"));
        assert_eq!(outcome.status.as_ref().unwrap()["Position"], Json::from(157));
        assert!(outcome.msg.is_empty());
    }

    #[test]
    fn test_status_flags_missing_row() {
        let outcome = ReplicationOutcome::status(None, "Is_Replica", "not a replica");
        assert!(!outcome.flag("Is_Replica"));
        assert_eq!(outcome.msg, "not a replica");
    }

    #[test]
    fn test_serialized_shape() {
        let outcome = ReplicationOutcome::changed("Replica started");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["changed"], true);
        assert!(json.get("status").is_none());
        assert_eq!(json["statements"], serde_json::json!([]));
    }
}
