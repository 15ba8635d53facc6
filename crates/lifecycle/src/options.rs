// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Lifecycle options
//!
//! Options shared by every user and role operation of one run.

use serde::{Deserialize, Serialize};
use thiserror::Error;

fn default_true() -> bool {
    true
}

fn default_protected_accounts() -> Vec<String> {
    vec!["root".to_string()]
}

/// Options for a lifecycle session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleOptions {
    /// Perform every read and comparison, but no writes
    #[serde(default)]
    pub dry_run: bool,

    /// Reject privilege tokens outside the known list
    #[serde(default = "default_true")]
    pub enforce_known_privilege_tokens: bool,

    /// Run `SET DEFAULT ROLE ALL TO` for new role members (MySQL only)
    #[serde(default = "default_true")]
    pub set_default_role_all: bool,

    /// Accounts that never lose whole privilege scopes under replace
    #[serde(default = "default_protected_accounts")]
    pub protected_accounts: Vec<String>,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            enforce_known_privilege_tokens: true,
            set_default_role_all: true,
            protected_accounts: default_protected_accounts(),
        }
    }
}

impl LifecycleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_enforce_known_privilege_tokens(mut self, enforce: bool) -> Self {
        self.enforce_known_privilege_tokens = enforce;
        self
    }

    pub fn with_set_default_role_all(mut self, enabled: bool) -> Self {
        self.set_default_role_all = enabled;
        self
    }

    pub fn with_protected_accounts<S: Into<String>>(mut self, accounts: impl IntoIterator<Item = S>) -> Self {
        self.protected_accounts = accounts.into_iter().map(Into::into).collect();
        self
    }

    /// Whether `name` is a protected account
    pub fn is_protected(&self, name: &str) -> bool {
        self.protected_accounts.iter().any(|p| p == name)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protected_accounts.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "protected_accounts",
                reason: "account names cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}

/// Invalid lifecycle options
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid option '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}
