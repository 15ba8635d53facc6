// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Server probes run once at the start of every operation

use mysql_accounts_dialect::ServerIdentity;
use tracing::debug;

use crate::connection::Connection;
use crate::error::{ConnectionError, ConnectionResult};
use crate::statement::Statement;
use crate::value::StringEscape;

/// Identifier quote used in privilege scopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentifierQuote {
    #[default]
    Backtick,
    /// `ANSI` or `ANSI_QUOTES` sql_mode
    DoubleQuote,
}

impl IdentifierQuote {
    pub fn as_char(&self) -> char {
        match self {
            IdentifierQuote::Backtick => '`',
            IdentifierQuote::DoubleQuote => '"',
        }
    }
}

/// A `sql_mode` value, global or session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SqlMode {
    pub text: String,
}

impl SqlMode {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn is_ansi(&self) -> bool {
        self.text.contains("ANSI")
    }

    pub fn identifier_quote(&self) -> IdentifierQuote {
        if self.is_ansi() {
            IdentifierQuote::DoubleQuote
        } else {
            IdentifierQuote::Backtick
        }
    }

    pub fn no_backslash_escapes(&self) -> bool {
        self.text.split(',').any(|flag| flag.trim() == "NO_BACKSLASH_ESCAPES")
    }

    /// Escaping that string literals need under this mode
    pub fn string_escape(&self) -> StringEscape {
        if self.no_backslash_escapes() {
            StringEscape::QuotesOnly
        } else {
            StringEscape::Backslash
        }
    }
}

/// Raw `VERSION()` text
pub async fn server_version(conn: &mut dyn Connection) -> ConnectionResult<String> {
    let stmt = Statement::new("SELECT VERSION() AS version");
    let row = conn.fetch_required(&stmt).await?;
    row.get_either("version", 0)
        .and_then(|v| v.as_text())
        .map(|v| v.into_owned())
        .ok_or_else(|| ConnectionError::MissingColumn {
            column: "version".to_string(),
            statement: stmt.masked(),
        })
}

/// Implementation and version of the server
pub async fn probe_server(conn: &mut dyn Connection) -> ConnectionResult<ServerIdentity> {
    let version = server_version(conn).await?;
    let identity = ServerIdentity::parse(&version);
    debug!(server = %identity, "probed server");
    Ok(identity)
}

/// Global `sql_mode`
pub async fn sql_mode(conn: &mut dyn Connection) -> ConnectionResult<SqlMode> {
    read_sql_mode(conn, Statement::new("SELECT @@GLOBAL.sql_mode AS sql_mode")).await
}

/// `sql_mode` of the current session, which decides how literals parse
pub async fn session_sql_mode(conn: &mut dyn Connection) -> ConnectionResult<SqlMode> {
    read_sql_mode(conn, Statement::new("SELECT @@SESSION.sql_mode AS sql_mode")).await
}

async fn read_sql_mode(conn: &mut dyn Connection, stmt: Statement) -> ConnectionResult<SqlMode> {
    let row = conn.fetch_one(&stmt).await?;
    let text = row
        .as_ref()
        .and_then(|r| r.get_either("sql_mode", 0))
        .and_then(|v| v.as_text())
        .map(|v| v.into_owned())
        .unwrap_or_default();
    Ok(SqlMode::new(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::{QueryResult, Row};
    use crate::value::Value;
    use async_trait::async_trait;

    struct Fixed(Vec<Row>);

    #[async_trait]
    impl Connection for Fixed {
        async fn execute(&mut self, _statement: &Statement) -> ConnectionResult<QueryResult> {
            Ok(QueryResult::with_rows(self.0.clone()))
        }
    }

    #[tokio::test]
    async fn test_probe_mapping_row() {
        let mut conn = Fixed(vec![Row::new(
            vec!["VERSION()".into()],
            vec![Value::from("10.6.17-MariaDB-log")],
        )]);
        let identity = probe_server(&mut conn).await.unwrap();
        assert!(identity.is_mariadb());
    }

    #[tokio::test]
    async fn test_probe_tuple_row() {
        let mut conn = Fixed(vec![Row::tuple(vec![Value::from("8.0.36")])]);
        assert_eq!(server_version(&mut conn).await.unwrap(), "8.0.36");
    }

    #[tokio::test]
    async fn test_probe_without_rows_fails() {
        let mut conn = Fixed(vec![]);
        let err = server_version(&mut conn).await.unwrap_err();
        assert!(matches!(err, ConnectionError::NoRows { .. }));
    }

    #[tokio::test]
    async fn test_ansi_sql_mode() {
        let mut conn = Fixed(vec![Row::tuple(vec![Value::from(
            "REAL_AS_FLOAT,PIPES_AS_CONCAT,ANSI_QUOTES,IGNORE_SPACE,ONLY_FULL_GROUP_BY,ANSI",
        )])]);
        let mode = sql_mode(&mut conn).await.unwrap();
        assert_eq!(mode.identifier_quote(), IdentifierQuote::DoubleQuote);

        let mut conn = Fixed(vec![Row::tuple(vec![Value::from("STRICT_TRANS_TABLES")])]);
        assert_eq!(sql_mode(&mut conn).await.unwrap().identifier_quote(), IdentifierQuote::Backtick);
    }

    #[tokio::test]
    async fn test_no_backslash_escapes_session_mode() {
        let mut conn = Fixed(vec![Row::new(
            vec!["sql_mode".into()],
            vec![Value::from("STRICT_TRANS_TABLES,NO_BACKSLASH_ESCAPES")],
        )]);
        let mode = session_sql_mode(&mut conn).await.unwrap();
        assert!(mode.no_backslash_escapes());
        assert_eq!(mode.string_escape(), StringEscape::QuotesOnly);

        let mut conn = Fixed(vec![Row::tuple(vec![Value::from("STRICT_TRANS_TABLES")])]);
        assert_eq!(session_sql_mode(&mut conn).await.unwrap().string_escape(), StringEscape::Backslash);
        assert_eq!(SqlMode::default().string_escape(), StringEscape::Backslash);
    }
}
