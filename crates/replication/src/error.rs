// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Error types for replication operations

use mysql_accounts_connection::ConnectionError;
use mysql_accounts_dialect::DialectError;
use serde::Serialize;
use thiserror::Error;

/// Result type alias for replication operations
pub type ReplicationResult<T> = Result<T, ReplicationError>;

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
pub enum ReplicationError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// A keyword or option has no form on this server
    #[error(transparent)]
    Dialect(#[from] DialectError),

    /// The request itself is invalid
    #[error("{0}")]
    Configuration(String),

    /// A topology statement was rejected and failures are not tolerated
    #[error("{operation} failed: {message}")]
    OperationFailed { operation: String, message: String },
}

impl ReplicationError {
    pub fn configuration(message: impl Into<String>) -> Self {
        ReplicationError::Configuration(message.into())
    }

    pub(crate) fn failed(operation: &str, error: &ConnectionError) -> Self {
        let message = match error {
            ConnectionError::Execution { message, .. } => message.clone(),
            other => other.to_string(),
        };
        ReplicationError::OperationFailed {
            operation: operation.to_string(),
            message,
        }
    }
}
