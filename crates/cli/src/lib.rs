// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # MySQL Accounts - CLI
//!
//! Reads a YAML task file, runs its user, role and replication tasks on one
//! connection and reports the result as a JSON envelope. See [`task`] for the
//! file format and [`report`] for the envelope.

pub mod report;
pub mod runner;
pub mod task;

pub use report::{Report, TaskError, TaskReport};
pub use runner::run_tasks;
pub use task::{State, Task, TaskFile, TaskFileError, TaskFileResult, TaskKind};
