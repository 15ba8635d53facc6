// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Error types for dialect resolution

use serde::Serialize;
use thiserror::Error;

use crate::server::Implementation;

/// Result type alias for dialect operations
pub type DialectResult<T> = Result<T, DialectError>;

/// Errors raised while resolving dialect-specific SQL
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
pub enum DialectError {
    /// The command key is not present in the table at all
    #[error("Unsupported command: {key}")]
    UnsupportedCommand { key: String },

    /// The command key exists but has no entry for this implementation
    #[error("Command '{key}' is not available on {implementation}")]
    UnsupportedForImplementation {
        key: String,
        implementation: Implementation,
    },

    /// A table mentions an implementation for a key without giving it a default
    #[error("Command '{key}' has overrides for {implementation} but no default entry")]
    MissingDefault {
        key: String,
        implementation: Implementation,
    },
}
