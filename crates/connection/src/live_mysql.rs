// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Live MySQL connection
//!
//! A single exclusive sqlx connection. Statements are rendered to literal
//! SQL and sent over the text protocol, since account management statements
//! (`CREATE USER`, `GRANT`, `SHOW GRANTS`, ...) are not all preparable.
//! String literals are escaped for the session `sql_mode` read at connect,
//! so a backslash in a password survives `NO_BACKSLASH_ESCAPES`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mysql_accounts_connection::{ConnectionConfig, LiveMySqlConnection, probe_server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConnectionConfig::default().with_env_password();
//!     let mut conn = LiveMySqlConnection::connect(&config).await?;
//!     let server = probe_server(&mut conn).await?;
//!     println!("{server}");
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlDatabaseError, MySqlQueryResult, MySqlRow};
use sqlx::{Column, ConnectOptions, Connection as _, Row as _};
use tracing::{debug, trace};

use crate::config::ConnectionConfig;
use crate::connection::Connection;
use crate::error::{ConnectionError, ConnectionResult};
use crate::probe::session_sql_mode;
use crate::row::{QueryResult, Row};
use crate::statement::Statement;
use crate::value::{StringEscape, Value};

type SqlxFuture<'e, T> = Pin<Box<dyn Future<Output = Result<T, sqlx::Error>> + Send + 'e>>;

pub struct LiveMySqlConnection {
    conn: MySqlConnection,
    escape: StringEscape,
}

impl LiveMySqlConnection {
    /// Open a connection
    ///
    /// # Errors
    ///
    /// - `ConnectionError::ConfigurationError` if the configuration is invalid
    /// - `ConnectionError::ConnectionFailed` on connect errors or when the
    ///   connect timeout elapses
    pub async fn connect(config: &ConnectionConfig) -> ConnectionResult<Self> {
        config
            .validate()
            .map_err(|e| ConnectionError::ConfigurationError(e.to_string()))?;

        let mut options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user);
        if let Some(password) = &config.password {
            options = options.password(password);
        }
        if let Some(database) = &config.database {
            options = options.database(database);
        }
        if let Some(socket) = &config.unix_socket {
            options = options.socket(socket);
        }

        debug!(target = %config.display_url(), "connecting");

        let timeout = Duration::from_secs(config.connect_timeout_secs);
        let conn = tokio::time::timeout(timeout, options.connect())
            .await
            .map_err(|_| {
                ConnectionError::ConnectionFailed(format!(
                    "timed out after {}s connecting to {}",
                    config.connect_timeout_secs,
                    config.display_url()
                ))
            })?
            .map_err(|e| ConnectionError::ConnectionFailed(e.to_string()))?;

        let mut live = Self {
            conn,
            escape: StringEscape::Backslash,
        };
        let mode = session_sql_mode(&mut live).await?;
        live.escape = mode.string_escape();
        debug!(sql_mode = %mode.text, escape = ?live.escape, "session sql_mode");
        Ok(live)
    }

    /// Escaping applied to string literals on this session
    pub fn string_escape(&self) -> StringEscape {
        self.escape
    }

    /// Close the connection gracefully
    pub async fn close(self) -> ConnectionResult<()> {
        self.conn
            .close()
            .await
            .map_err(|e| ConnectionError::ConnectionFailed(e.to_string()))
    }
}

#[async_trait]
impl Connection for LiveMySqlConnection {
    async fn execute(&mut self, statement: &Statement) -> ConnectionResult<QueryResult> {
        let sql = statement.render_escaped(self.escape);
        trace!(statement = %statement, "sending");

        if statement.is_query() {
            let rows = fetch_rows(&mut self.conn, &sql)
                .await
                .map_err(|e| execution_error(statement, e))?;
            let rows = rows
                .iter()
                .map(|row| convert_row(statement, row))
                .collect::<ConnectionResult<Vec<_>>>()?;
            Ok(QueryResult::with_rows(rows))
        } else {
            let done = execute_raw(&mut self.conn, &sql)
                .await
                .map_err(|e| execution_error(statement, e))?;
            Ok(QueryResult::affected(done.rows_affected()))
        }
    }
}

// Boxed with concrete lifetimes so the `async_trait` future stays `Send`
// without a higher-ranked `Executor` bound.
fn fetch_rows<'e>(conn: &'e mut MySqlConnection, sql: &'e str) -> SqlxFuture<'e, Vec<MySqlRow>> {
    sqlx::Executor::fetch_all(conn, sqlx::raw_sql(sql))
}

fn execute_raw<'e>(conn: &'e mut MySqlConnection, sql: &'e str) -> SqlxFuture<'e, MySqlQueryResult> {
    sqlx::Executor::execute(conn, sqlx::raw_sql(sql))
}

fn execution_error(statement: &Statement, error: sqlx::Error) -> ConnectionError {
    let code = match &error {
        sqlx::Error::Database(db) => db
            .try_downcast_ref::<MySqlDatabaseError>()
            .map(MySqlDatabaseError::number),
        _ => None,
    };
    ConnectionError::Execution {
        statement: statement.masked(),
        code,
        message: error.to_string(),
    }
}

fn convert_row(statement: &Statement, row: &MySqlRow) -> ConnectionResult<Row> {
    let columns = row
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();

    let mut values = Vec::with_capacity(row.len());
    for index in 0..row.len() {
        // Text protocol: every value arrives as its textual bytes.
        let raw: Option<Vec<u8>> = row
            .try_get_unchecked(index)
            .map_err(|e| execution_error(statement, e))?;
        values.push(match raw {
            None => Value::Null,
            Some(bytes) => match String::from_utf8(bytes) {
                Ok(text) => Value::Text(text),
                Err(e) => Value::Bytes(e.into_bytes()),
            },
        });
    }

    Ok(Row::new(columns, values))
}
