// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Error types for connection operations

use serde::Serialize;
use thiserror::Error;

/// Result type alias for connection operations
pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// Errors that can occur while talking to the server
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
pub enum ConnectionError {
    /// Failed to open the connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// A statement was rejected by the server or the driver
    ///
    /// `statement` is the rendered text with secrets masked.
    #[error("Statement failed: {message}. Query == {statement}")]
    Execution {
        statement: String,
        code: Option<u16>,
        message: String,
    },

    /// A read returned no row where one was required
    #[error("No row returned by: {statement}")]
    NoRows { statement: String },

    /// A row did not carry the expected column
    #[error("Column '{column}' missing from result of: {statement}")]
    MissingColumn { column: String, statement: String },

    /// Invalid connection configuration
    #[error("Invalid connection configuration: {0}")]
    ConfigurationError(String),
}

impl ConnectionError {
    /// Server error number of an execution failure, if known
    pub fn code(&self) -> Option<u16> {
        match self {
            ConnectionError::Execution { code, .. } => *code,
            _ => None,
        }
    }

    /// Attempted statement, if the error concerns one
    pub fn statement(&self) -> Option<&str> {
        match self {
            ConnectionError::Execution { statement, .. }
            | ConnectionError::NoRows { statement }
            | ConnectionError::MissingColumn { statement, .. } => Some(statement),
            _ => None,
        }
    }
}
