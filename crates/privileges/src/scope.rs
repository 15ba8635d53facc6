// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Grant scopes
//!
//! A scope is the `ON` target of a grant: `*.*`, `` `db`.* ``,
//! `` `db`.`table` `` or `` PROCEDURE `db`.`proc` ``. Its text is written
//! into statements verbatim, so it is only built by [`Scope::from_spec`]
//! (which quotes every concrete name) or [`Scope::from_server`] (which
//! keeps text the server produced).

use std::borrow::Borrow;
use std::fmt;

use mysql_accounts_connection::{IdentifierQuote, SqlFragment};
use serde::Serialize;

use crate::error::{PrivilegeError, PrivilegeResult};

const GLOBAL: &str = "*.*";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Scope(String);

impl Scope {
    /// `*.*`
    pub fn global() -> Self {
        Scope(GLOBAL.to_string())
    }

    /// Build from the `db.table` part of a privilege string
    ///
    /// Concrete names are wrapped in `quote`; `*` never is. A leading
    /// `FUNCTION` or `PROCEDURE` qualifier is kept.
    ///
    /// ```rust
    /// use mysql_accounts_connection::IdentifierQuote;
    /// use mysql_accounts_privileges::Scope;
    ///
    /// let scope = Scope::from_spec("mydb.*", IdentifierQuote::Backtick).unwrap();
    /// assert_eq!(scope.as_str(), "`mydb`.*");
    ///
    /// let scope = Scope::from_spec("PROCEDURE db.proc", IdentifierQuote::DoubleQuote).unwrap();
    /// assert_eq!(scope.as_str(), "PROCEDURE \"db\".\"proc\"");
    /// ```
    pub fn from_spec(text: &str, quote: IdentifierQuote) -> PrivilegeResult<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PrivilegeError::MalformedSpec {
                segment: text.to_string(),
            });
        }

        let (object_type, target) = match text.split_once(' ') {
            Some((head, rest)) if head.eq_ignore_ascii_case("FUNCTION") => ("FUNCTION ", rest),
            Some((head, rest)) if head.eq_ignore_ascii_case("PROCEDURE") => ("PROCEDURE ", rest),
            _ => ("", text),
        };

        let quoted = match target.rsplit_once('.') {
            Some((db, table)) => format!("{}.{}", quote_side(db, quote), quote_side(table, quote)),
            None => quote_side(target, quote),
        };

        Ok(Scope(format!("{object_type}{quoted}")))
    }

    /// Keep scope text exactly as returned by `SHOW GRANTS`
    pub fn from_server(text: &str) -> Self {
        Scope(text.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_global(&self) -> bool {
        self.0 == GLOBAL
    }
}

fn quote_side(side: &str, quote: IdentifierQuote) -> String {
    let q = quote.as_char();
    let bare = side.trim_matches(|c| c == '`' || c == q);
    if bare == "*" {
        return bare.to_string();
    }
    let doubled: String = [q, q].iter().collect();
    format!("{q}{}{q}", bare.replace(q, &doubled))
}

impl SqlFragment for Scope {
    fn sql_text(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Scope {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
