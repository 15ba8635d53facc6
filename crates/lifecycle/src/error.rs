// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Error types for user and role lifecycle

use mysql_accounts_auth::HashError;
use mysql_accounts_connection::ConnectionError;
use mysql_accounts_privileges::PrivilegeError;
use serde::Serialize;
use thiserror::Error;

use crate::options::ConfigError;

/// Result type alias for lifecycle operations
pub type LifecycleResult<T> = Result<T, LifecycleError>;

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
pub enum LifecycleError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Privilege(#[from] PrivilegeError),

    #[error(transparent)]
    Hash(#[from] HashError),

    /// The server lacks a feature the request depends on
    #[error("{feature} is not supported by {server}")]
    Capability { feature: String, server: String },

    /// The request itself is invalid
    #[error("{0}")]
    Configuration(String),

    /// A step failed after earlier statements for the same entity succeeded
    ///
    /// MySQL DDL commits implicitly, so those statements stay applied.
    #[error("{source} ({} statement(s) were already applied)", .applied.len())]
    PartiallyApplied {
        applied: Vec<String>,
        source: Box<LifecycleError>,
    },
}

impl LifecycleError {
    pub fn configuration(message: impl Into<String>) -> Self {
        LifecycleError::Configuration(message.into())
    }

    /// Whether the entity was left with some statements applied
    pub fn partially_applied(&self) -> bool {
        matches!(self, LifecycleError::PartiallyApplied { .. })
    }

    /// Statements applied before the failure
    pub fn applied(&self) -> &[String] {
        match self {
            LifecycleError::PartiallyApplied { applied, .. } => applied,
            _ => &[],
        }
    }
}

impl From<ConfigError> for LifecycleError {
    fn from(error: ConfigError) -> Self {
        LifecycleError::Configuration(error.to_string())
    }
}
