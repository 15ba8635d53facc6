// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Result of one lifecycle operation

use serde::Serialize;

/// What an operation did, or in dry-run mode would do
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub changed: bool,
    pub msg: String,
    /// `None` when the answer is unknown (dry-run creation)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_changed: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Mutating statements sent, secrets masked
    pub statements: Vec<String>,
}

impl Outcome {
    pub fn unchanged(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            ..Default::default()
        }
    }

    pub fn changed(msg: impl Into<String>) -> Self {
        Self {
            changed: true,
            msg: msg.into(),
            ..Default::default()
        }
    }

    pub fn with_password_changed(mut self, password_changed: Option<bool>) -> Self {
        self.password_changed = password_changed;
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}
