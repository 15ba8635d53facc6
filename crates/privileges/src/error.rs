// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Error types for privilege handling

use serde::Serialize;
use thiserror::Error;

/// Result type alias for privilege operations
pub type PrivilegeResult<T> = Result<T, PrivilegeError>;

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
pub enum PrivilegeError {
    /// A privilege token is unknown, or not safe to write into a statement
    #[error("Invalid privileges specified: {token}")]
    InvalidPrivilegeSpec { token: String },

    /// A `scope:privileges` segment could not be split
    #[error("invalid privileges string: malformed segment '{segment}'")]
    MalformedSpec { segment: String },

    /// Server grant text matched no known shape
    #[error("unable to parse the MySQL grant string: {line}")]
    GrantParse { line: String },

    /// TLS requirement key outside `SSL`, `X509`, `CIPHER`, `ISSUER`, `SUBJECT`
    #[error("Unsupported TLS requirement: {key}")]
    InvalidTlsRequirement { key: String },
}
