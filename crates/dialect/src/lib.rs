// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # MySQL Accounts - Dialect Resolution
//!
//! This crate decides which SQL a given server understands. Everything that
//! varies between MySQL and MariaDB, or between releases of either, is
//! answered here so the rest of the workspace can stay dialect-agnostic.
//!
//! ## Building Blocks
//!
//! - [`Version`]: loose, total-ordered version numbers (`10.5.1-MariaDB-log`)
//! - [`ServerIdentity`]: implementation plus version, parsed from `SELECT VERSION()`
//! - [`CommandTable`] / [`CommandResolver`]: version-bracketed keyword tables
//!   with a mandatory default per implementation
//! - [`DialectStrategy`]: capability checks (`supports_roles`,
//!   `supports_alter_user`, ...) passed explicitly to whoever needs them
//!
//! ## Usage
//!
//! ```rust
//! use mysql_accounts_dialect::{CommandResolver, ServerIdentity};
//!
//! let server = ServerIdentity::parse("8.4.1");
//! let resolver = CommandResolver::new(&server);
//! assert_eq!(resolver.resolve("CHANGE MASTER").unwrap(), "CHANGE REPLICATION SOURCE");
//! assert_eq!(resolver.resolve("MASTER_HOST").unwrap(), "SOURCE_HOST");
//! ```

pub mod command;
pub mod error;
pub mod server;
pub mod strategy;
pub mod version;

// Re-exports
pub use command::{CommandResolver, CommandTable, Floor, resolve_command};
pub use error::{DialectError, DialectResult};
pub use server::{Implementation, ServerIdentity};
pub use strategy::{
    DialectStrategy, MariaDBStrategy, MySQLStrategy, TlsRequiresSource, strategy_for,
};
pub use version::{Version, compare_versions};
