// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # MySQL Accounts - Connection Layer
//!
//! The narrow database capability the account engine is written against:
//!
//! - [`Connection`]: run one [`Statement`], get a [`QueryResult`]
//! - [`Statement`] / [`StatementBuilder`]: typed slots for keywords,
//!   validated fragments, identifiers and bound values
//! - [`Row`] / [`Value`]: rows readable by position or by column name
//! - [`probe`]: `VERSION()` and `sql_mode` discovery
//! - `LiveMySqlConnection` (feature `mysql`): sqlx-backed implementation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mysql_accounts_connection::{Connection, Statement, probe_server};
//!
//! async fn show(conn: &mut dyn Connection) -> mysql_accounts_connection::ConnectionResult<()> {
//!     let server = probe_server(conn).await?;
//!     for row in conn.fetch_all(&Statement::new("SELECT User, Host FROM mysql.user")).await? {
//!         println!("{server}: {:?}", row.text_named("User"));
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod error;
#[cfg(feature = "mysql")]
pub mod live_mysql;
pub mod probe;
pub mod row;
pub mod statement;
pub mod value;

// Re-exports
pub use config::{ConfigError, ConnectionConfig, PASSWORD_ENV};
pub use connection::Connection;
pub use error::{ConnectionError, ConnectionResult};
#[cfg(feature = "mysql")]
pub use live_mysql::LiveMySqlConnection;
pub use probe::{IdentifierQuote, SqlMode, probe_server, server_version, session_sql_mode, sql_mode};
pub use row::{QueryResult, Row};
pub use statement::{Account, SqlFragment, Statement, StatementBuilder};
pub use value::{StringEscape, Value};
