// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Mock connection implementation for testing
//!
//! Responses are scripted against substrings of the rendered statement.
//! Every statement that reaches the mock is kept in a transcript so tests
//! can assert on exactly what would have been sent to the server.

use async_trait::async_trait;
use mysql_accounts_connection::{
    Connection, ConnectionError, ConnectionResult, QueryResult, Row, Statement, Value,
};

#[derive(Debug, Clone)]
enum Response {
    Rows(Vec<Row>),
    Affected(u64),
    Error { code: u16, message: String },
}

#[derive(Debug, Clone)]
struct Rule {
    pattern: String,
    response: Response,
    /// One-shot rules are consumed by their first match
    once: bool,
    used: bool,
}

/// In-memory scripted connection
#[derive(Debug, Clone)]
pub struct MockConnection {
    version: String,
    sql_mode: String,
    rules: Vec<Rule>,
    transcript: Vec<Statement>,
}

impl Default for MockConnection {
    fn default() -> Self {
        Self::new("8.0.36")
    }
}

impl MockConnection {
    /// Create a mock answering `SELECT VERSION()` with `version`
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            sql_mode: String::new(),
            rules: Vec::new(),
            transcript: Vec::new(),
        }
    }

    pub fn builder(version: impl Into<String>) -> MockConnectionBuilder {
        MockConnectionBuilder {
            connection: MockConnection::new(version),
        }
    }

    /// Every statement received, rendered with secrets in clear
    pub fn executed(&self) -> Vec<String> {
        self.transcript.iter().map(Statement::render).collect()
    }

    /// Statements that do not return rows
    pub fn mutations(&self) -> Vec<String> {
        self.transcript
            .iter()
            .filter(|s| !s.is_query())
            .map(Statement::render)
            .collect()
    }

    /// The raw statements received
    pub fn statements(&self) -> &[Statement] {
        &self.transcript
    }

    /// Whether any received statement contains `needle`
    pub fn saw(&self, needle: &str) -> bool {
        self.transcript.iter().any(|s| s.render().contains(needle))
    }

    fn builtin(&self, rendered: &str) -> Option<QueryResult> {
        if rendered.starts_with("SELECT VERSION()") {
            return Some(QueryResult::with_rows(vec![rows::named(
                "version",
                self.version.as_str(),
            )]));
        }
        if rendered.contains("@@GLOBAL.sql_mode") {
            return Some(QueryResult::with_rows(vec![rows::named(
                "sql_mode",
                self.sql_mode.as_str(),
            )]));
        }
        None
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn execute(&mut self, statement: &Statement) -> ConnectionResult<QueryResult> {
        let rendered = statement.render();
        self.transcript.push(statement.clone());

        let index = self
            .rules
            .iter()
            .position(|r| !(r.once && r.used) && rendered.contains(&r.pattern));

        let Some(index) = index else {
            if let Some(result) = self.builtin(&rendered) {
                return Ok(result);
            }
            return Ok(if statement.is_query() {
                QueryResult::default()
            } else {
                QueryResult::affected(0)
            });
        };
        let rule = &mut self.rules[index];
        rule.used = true;

        match &rule.response {
            Response::Rows(rows) => Ok(QueryResult::with_rows(rows.clone())),
            Response::Affected(n) => Ok(QueryResult::affected(*n)),
            Response::Error { code, message } => Err(ConnectionError::Execution {
                statement: statement.masked(),
                code: Some(*code),
                message: message.clone(),
            }),
        }
    }
}

/// Builder for creating mock connections with a fluent API
pub struct MockConnectionBuilder {
    connection: MockConnection,
}

impl MockConnectionBuilder {
    /// Global `sql_mode` reported by the server
    pub fn sql_mode(mut self, mode: impl Into<String>) -> Self {
        self.connection.sql_mode = mode.into();
        self
    }

    /// Answer every statement containing `pattern` with `rows`
    pub fn respond(self, pattern: impl Into<String>, rows: Vec<Row>) -> Self {
        self.rule(pattern, Response::Rows(rows), false)
    }

    /// Answer the next statement containing `pattern` with `rows`, once
    ///
    /// One-shot rules registered first win over later ones, which lets a
    /// test script a value before and after a change.
    pub fn respond_once(self, pattern: impl Into<String>, rows: Vec<Row>) -> Self {
        self.rule(pattern, Response::Rows(rows), true)
    }

    /// Report `n` affected rows for statements containing `pattern`
    pub fn affected(self, pattern: impl Into<String>, n: u64) -> Self {
        self.rule(pattern, Response::Affected(n), false)
    }

    /// Fail statements containing `pattern` with a server error
    pub fn fail(self, pattern: impl Into<String>, code: u16, message: impl Into<String>) -> Self {
        self.rule(
            pattern,
            Response::Error {
                code,
                message: message.into(),
            },
            false,
        )
    }

    /// Fail the next statement containing `pattern`, once
    pub fn fail_once(self, pattern: impl Into<String>, code: u16, message: impl Into<String>) -> Self {
        self.rule(
            pattern,
            Response::Error {
                code,
                message: message.into(),
            },
            true,
        )
    }

    pub fn build(self) -> MockConnection {
        self.connection
    }

    fn rule(mut self, pattern: impl Into<String>, response: Response, once: bool) -> Self {
        self.connection.rules.push(Rule {
            pattern: pattern.into(),
            response,
            once,
            used: false,
        });
        self
    }
}

/// Row constructors for scripted responses
pub mod rows {
    use super::*;

    /// One named column
    pub fn named(column: &str, value: impl Into<Value>) -> Row {
        Row::new(vec![column.to_string()], vec![value.into()])
    }

    /// `SELECT count(*)` result
    pub fn count(n: i64) -> Vec<Row> {
        vec![Row::tuple(vec![Value::Int(n)])]
    }

    /// One single-column tuple row per value
    pub fn texts(values: &[&str]) -> Vec<Row> {
        values
            .iter()
            .map(|v| Row::tuple(vec![Value::from(*v)]))
            .collect()
    }

    /// `SHOW GRANTS` output
    pub fn grants(lines: &[&str]) -> Vec<Row> {
        texts(lines)
    }

    /// One row with named columns
    pub fn record(pairs: &[(&str, Value)]) -> Vec<Row> {
        let (columns, values) = pairs
            .iter()
            .map(|(c, v)| (c.to_string(), v.clone()))
            .unzip();
        vec![Row::new(columns, values)]
    }

    /// Rows of `(User, Host)` pairs
    pub fn accounts(pairs: &[(&str, &str)]) -> Vec<Row> {
        pairs
            .iter()
            .map(|(user, host)| {
                Row::new(
                    vec!["User".into(), "Host".into()],
                    vec![Value::from(*user), Value::from(*host)],
                )
            })
            .collect()
    }
}
