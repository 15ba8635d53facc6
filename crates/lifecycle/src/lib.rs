// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # MySQL Accounts - Lifecycle
//!
//! Idempotent user and role management on top of a [`Session`]:
//!
//! - [`ensure_user_present`] / [`ensure_user_absent`]
//! - [`ensure_role_present`] / [`ensure_role_absent`]
//!
//! Every operation reads the current state first and only sends what
//! differs. With [`LifecycleOptions::dry_run`] set, reads and comparisons
//! still happen but no write is sent, and the [`Outcome`] reports what
//! would have changed.
//!
//! ## Example
//!
//! ```rust,ignore
//! use mysql_accounts_lifecycle::{LifecycleOptions, Session, UserSpec, ensure_user_present};
//!
//! let mut session = Session::open(&mut conn, LifecycleOptions::default()).await?;
//! let spec = UserSpec::new("app", "%").with_password("s3cret");
//! let outcome = ensure_user_present(&mut session, &spec).await?;
//! println!("{} ({} statements)", outcome.msg, outcome.statements.len());
//! ```

pub mod error;
pub mod grants;
pub mod limits;
pub mod options;
pub mod outcome;
pub mod password;
pub mod role;
pub mod session;
pub mod tls;
pub mod user;

// Re-exports
pub use error::{LifecycleError, LifecycleResult};
pub use limits::{LimitValue, ResourceLimit};
pub use options::{ConfigError, LifecycleOptions};
pub use outcome::Outcome;
pub use password::PluginCredential;
pub use role::{MemberPolicy, RoleSpec, ensure_role_absent, ensure_role_present};
pub use session::Session;
pub use user::{UpdatePassword, UserSpec, ensure_user_absent, ensure_user_present};
