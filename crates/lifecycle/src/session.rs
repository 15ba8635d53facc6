// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Lifecycle session
//!
//! A [`Session`] owns the connection for the duration of a run, together
//! with everything derived from the server once: its dialect strategy and
//! identifier quoting. Every statement goes through [`Session::query`] or
//! [`Session::mutate`], which is where dry-run suppression and the record
//! of applied statements live.

use mysql_accounts_connection::{
    Connection, ConnectionResult, IdentifierQuote, QueryResult, Row, Statement, probe_server,
    sql_mode,
};
use mysql_accounts_dialect::{DialectStrategy, ServerIdentity, strategy_for};
use mysql_accounts_privileges::DecodeOptions;
use tracing::debug;

use crate::error::{LifecycleError, LifecycleResult};
use crate::options::LifecycleOptions;
use crate::outcome::Outcome;

/// Connection plus per-run server knowledge
pub struct Session<'c> {
    conn: &'c mut dyn Connection,
    strategy: Box<dyn DialectStrategy>,
    quote: Option<IdentifierQuote>,
    options: LifecycleOptions,
    applied: Vec<String>,
}

impl<'c> Session<'c> {
    /// Probe the server and open a session on `conn`
    pub async fn open(conn: &'c mut dyn Connection, options: LifecycleOptions) -> LifecycleResult<Self> {
        options.validate()?;
        let server = probe_server(&mut *conn).await?;
        Ok(Self::with_strategy(conn, strategy_for(&server), options))
    }

    /// Open a session with an explicit strategy, skipping the version probe
    pub fn with_strategy(
        conn: &'c mut dyn Connection,
        strategy: Box<dyn DialectStrategy>,
        options: LifecycleOptions,
    ) -> Self {
        Self {
            conn,
            strategy,
            quote: None,
            options,
            applied: Vec::new(),
        }
    }

    pub fn strategy(&self) -> &dyn DialectStrategy {
        self.strategy.as_ref()
    }

    pub fn server(&self) -> &ServerIdentity {
        self.strategy.identity()
    }

    pub fn options(&self) -> &LifecycleOptions {
        &self.options
    }

    pub fn dry_run(&self) -> bool {
        self.options.dry_run
    }

    /// Identifier quote for the server's `sql_mode`, fetched once
    pub async fn identifier_quote(&mut self) -> LifecycleResult<IdentifierQuote> {
        if let Some(quote) = self.quote {
            return Ok(quote);
        }
        let quote = sql_mode(&mut *self.conn).await?.identifier_quote();
        self.quote = Some(quote);
        Ok(quote)
    }

    /// Options for decoding a privilege string on this server
    pub async fn decode_options(&mut self, ensure_usage: bool) -> LifecycleResult<DecodeOptions> {
        let quote = self.identifier_quote().await?;
        Ok(DecodeOptions::default()
            .with_quote(quote)
            .with_ensure_usage(ensure_usage)
            .with_enforce_known(self.options.enforce_known_privilege_tokens))
    }

    /// Run a read-only statement
    pub async fn query(&mut self, statement: &Statement) -> LifecycleResult<Vec<Row>> {
        debug!(statement = %statement, "query");
        Ok(self.conn.fetch_all(statement).await?)
    }

    /// Run a read-only statement expected to return a row
    pub async fn query_required(&mut self, statement: &Statement) -> LifecycleResult<Row> {
        debug!(statement = %statement, "query");
        Ok(self.conn.fetch_required(statement).await?)
    }

    /// Run a `SELECT count(*)` statement
    pub async fn count(&mut self, statement: &Statement) -> LifecycleResult<i64> {
        let row = self.query_required(statement).await?;
        Ok(row.get(0).and_then(|v| v.as_i64()).unwrap_or(0))
    }

    /// Run a mutating statement, or skip it in dry-run mode
    pub async fn mutate(&mut self, statement: Statement) -> LifecycleResult<QueryResult> {
        Ok(self.try_mutate(&statement).await?)
    }

    /// Like [`Session::mutate`], but hands the driver error back for fallbacks
    pub async fn try_mutate(&mut self, statement: &Statement) -> ConnectionResult<QueryResult> {
        if self.options.dry_run {
            debug!(statement = %statement, "check mode, not executing");
            return Ok(QueryResult::default());
        }
        debug!(statement = %statement, "execute");
        let result = self.conn.execute(statement).await?;
        self.applied.push(statement.masked());
        Ok(result)
    }

    /// Run a session setting such as `SET SQL_LOG_BIN=0`
    ///
    /// Settings only affect this connection, so they run in dry-run mode too
    /// and are not recorded as applied.
    pub async fn set(&mut self, statement: &Statement) -> LifecycleResult<()> {
        debug!(statement = %statement, "session setting");
        self.conn.execute(statement).await?;
        Ok(())
    }

    /// Start recording statements for a new entity
    pub(crate) fn begin(&mut self) {
        self.applied.clear();
    }

    /// Attach the recorded statements to `outcome`
    pub(crate) fn finish(&mut self, mut outcome: Outcome) -> Outcome {
        outcome.statements = std::mem::take(&mut self.applied);
        outcome
    }

    /// Wrap `error` when statements were already applied for this entity
    pub(crate) fn failure(&mut self, error: LifecycleError) -> LifecycleError {
        let applied = std::mem::take(&mut self.applied);
        if applied.is_empty() || error.partially_applied() {
            return error;
        }
        LifecycleError::PartiallyApplied {
            applied,
            source: Box::new(error),
        }
    }

    /// Capability error for `feature` on this server
    pub(crate) fn unsupported(&self, feature: &str) -> LifecycleError {
        LifecycleError::Capability {
            feature: feature.to_string(),
            server: self.server().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mysql_accounts_test_utils::{MockConnection, fixtures};

    #[tokio::test]
    async fn test_open_probes_server() {
        let mut conn = fixtures::mariadb_105().build();
        let session = Session::open(&mut conn, LifecycleOptions::default()).await.unwrap();
        assert!(session.server().is_mariadb());
        assert!(session.strategy().hostless_roles());
    }

    #[tokio::test]
    async fn test_dry_run_suppresses_mutations() {
        let mut conn = MockConnection::default();
        {
            let options = LifecycleOptions::default().with_dry_run(true);
            let mut session = Session::open(&mut conn, options).await.unwrap();
            session.mutate(Statement::new("DROP USER 'x'@'%'")).await.unwrap();
            let outcome = session.finish(Outcome::changed("User deleted"));
            assert!(outcome.statements.is_empty());
        }
        assert!(conn.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_failure_after_applied_statement_is_partial() {
        let mut conn = MockConnection::builder("8.0.36")
            .fail("GRANT", 1044, "Access denied")
            .build();
        let mut session = Session::open(&mut conn, LifecycleOptions::default()).await.unwrap();
        session.begin();
        session.mutate(Statement::new("CREATE USER 'x'@'%'")).await.unwrap();
        let err = session
            .mutate(Statement::new("GRANT SELECT ON *.* TO 'x'@'%'"))
            .await
            .unwrap_err();
        let err = session.failure(err);
        assert!(err.partially_applied());
        assert_eq!(err.applied(), ["CREATE USER 'x'@'%'"]);
    }

    #[tokio::test]
    async fn test_identifier_quote_follows_sql_mode() {
        let mut conn = MockConnection::builder("8.0.36").sql_mode("ANSI_QUOTES,ANSI").build();
        let mut session = Session::open(&mut conn, LifecycleOptions::default()).await.unwrap();
        assert_eq!(session.identifier_quote().await.unwrap(), IdentifierQuote::DoubleQuote);
        // cached
        assert_eq!(session.identifier_quote().await.unwrap(), IdentifierQuote::DoubleQuote);
        drop(session);
        assert_eq!(conn.executed().iter().filter(|s| s.contains("sql_mode")).count(), 1);
    }
}
