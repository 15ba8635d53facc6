// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Testing utilities for MySQL Accounts
//!
//! This crate provides common testing components including:
//! - A scripted in-memory connection
//! - Version fixtures for the supported server families
//! - Assertions over the statements a run sent

pub mod assertions;
pub mod fixtures;
pub mod mock_connection;

// Re-exports for convenience
pub use assertions::TranscriptAssertions;
pub use fixtures::ServerFixtures;
pub use mock_connection::{MockConnection, MockConnectionBuilder, rows};
