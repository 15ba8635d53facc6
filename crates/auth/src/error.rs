// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

use serde::Serialize;
use thiserror::Error;

/// Result type alias for hashing operations
pub type HashResult<T> = Result<T, HashError>;

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
pub enum HashError {
    /// The salt must be exactly 20 bytes
    #[error("Salt must be 20 characters long, got {len}")]
    InvalidSaltLength { len: usize },
}
