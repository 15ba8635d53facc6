// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # MySQL Accounts - Privileges
//!
//! Everything between a privilege string and the statements that
//! apply it:
//!
//! - [`decode`] / [`encode`]: the compact `db.table:PRIV,PRIV/...` form
//! - [`parse_grants`]: `SHOW GRANTS` output
//! - [`Reconciler`]: replace / append / subtract plans
//! - [`plan_statements`]: `GRANT` and `REVOKE` statements for a plan
//! - [`TlsRequires`]: the `REQUIRE` clause
//!
//! ## Example
//!
//! ```rust
//! use mysql_accounts_connection::Account;
//! use mysql_accounts_privileges::{DecodeOptions, Policy, decode, parse_grants, plan_statements, reconcile};
//!
//! let current = parse_grants(["GRANT SELECT ON *.* TO 'app'@'%'"]).unwrap();
//! let desired = decode("*.*:SELECT,INSERT", &DecodeOptions::default()).unwrap();
//!
//! let plan = reconcile(&current, &desired, Policy::Replace);
//! let statements = plan_statements(&plan, &Account::new("app", "%"), None).unwrap();
//! assert_eq!(statements[0].render(), "GRANT INSERT ON *.* TO 'app'@'%'");
//! ```

pub mod codec;
pub mod emit;
pub mod error;
pub mod known;
pub mod map;
pub mod reconcile;
pub mod scope;
pub mod tls;

// Re-exports
pub use codec::{DecodeOptions, decode, encode, normalize_column_grants, parse_grant_statement, parse_grants};
pub use emit::{PrivilegeList, grant_statement, plan_statements, revoke_statements};
pub use error::{PrivilegeError, PrivilegeResult};
pub use known::is_known_privilege;
pub use map::{GRANT_OPTION, PrivilegeMap, PrivilegeSet, USAGE};
pub use reconcile::{Policy, ReconciliationPlan, Reconciler, reconcile};
pub use scope::Scope;
pub use tls::{TlsAttribute, TlsRequires, append_require, parse_require_clause, strip_requiressl};
