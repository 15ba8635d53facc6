// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Connection trait
//!
//! The only capability the account engine needs from a database: run one
//! statement and hand back its rows. Operations hold `&mut` access for
//! their whole duration and await each round-trip before issuing the next.
//!
//! ## Implementing the Connection Trait
//!
//! ```rust
//! use async_trait::async_trait;
//! use mysql_accounts_connection::{Connection, ConnectionResult, QueryResult, Statement};
//!
//! struct Discard;
//!
//! #[async_trait]
//! impl Connection for Discard {
//!     async fn execute(&mut self, _statement: &Statement) -> ConnectionResult<QueryResult> {
//!         Ok(QueryResult::default())
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::{ConnectionError, ConnectionResult};
use crate::row::{QueryResult, Row};
use crate::statement::Statement;

/// An exclusive session with a MySQL-compatible server
#[async_trait]
pub trait Connection: Send {
    /// Run a statement
    ///
    /// # Errors
    ///
    /// [`ConnectionError::Execution`] carrying the masked statement text and
    /// the server error number when the server rejects it.
    async fn execute(&mut self, statement: &Statement) -> ConnectionResult<QueryResult>;

    /// Run a statement and return every row
    async fn fetch_all(&mut self, statement: &Statement) -> ConnectionResult<Vec<Row>> {
        Ok(self.execute(statement).await?.rows)
    }

    /// Run a statement and return its first row, if any
    async fn fetch_one(&mut self, statement: &Statement) -> ConnectionResult<Option<Row>> {
        Ok(self.execute(statement).await?.rows.into_iter().next())
    }

    /// Run a statement that must return a row
    async fn fetch_required(&mut self, statement: &Statement) -> ConnectionResult<Row> {
        self.fetch_one(statement)
            .await?
            .ok_or_else(|| ConnectionError::NoRows {
                statement: statement.masked(),
            })
    }
}

#[async_trait]
impl<C: Connection + ?Sized> Connection for Box<C> {
    async fn execute(&mut self, statement: &Statement) -> ConnectionResult<QueryResult> {
        (**self).execute(statement).await
    }
}
