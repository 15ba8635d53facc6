// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Typed statements
//!
//! Statements are assembled from four kinds of slots:
//!
//! - **keywords**: `&'static str` text written by the program itself
//! - **fragments**: values of types implementing [`SqlFragment`], whose
//!   constructors validate their text (privilege scopes, privilege lists)
//! - **identifiers**: runtime names, always backtick-quoted
//! - **values**: runtime data, bound as parameters and rendered as literals
//!
//! A runtime `String` cannot be passed as keyword text, so untrusted input
//! only ever reaches the server quoted.
//!
//! The template uses `%s` for parameters; literal `%` in keyword and
//! fragment text is escaped to `%%` on the way in.
//!
//! ```rust
//! use mysql_accounts_connection::{Account, Statement};
//!
//! let account = Account::new("app", "10.0.%");
//! let stmt = Statement::builder()
//!     .keyword("DROP USER ")
//!     .account(&account)
//!     .build();
//!
//! assert_eq!(stmt.template(), "DROP USER %s@%s");
//! assert_eq!(stmt.render(), "DROP USER 'app'@'10.0.%'");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::{StringEscape, Value};

/// Text that may be written into a statement verbatim
///
/// Implementors guarantee their text is safe SQL by construction.
pub trait SqlFragment {
    fn sql_text(&self) -> &str;
}

/// An account or role name with optional host part
///
/// MariaDB roles have no host; everything else does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    pub host: Option<String>,
}

impl Account {
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: Some(host.into()),
        }
    }

    /// An account without a host part (MariaDB role)
    pub fn hostless(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: None,
        }
    }

    /// Host part, empty when hostless
    pub fn host_or_empty(&self) -> &str {
        self.host.as_deref().unwrap_or("")
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.host {
            Some(host) => write!(f, "'{}'@'{}'", self.name, host),
            None => write!(f, "'{}'", self.name),
        }
    }
}

/// A statement template with bound parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    template: String,
    params: Vec<Value>,
}

impl Statement {
    /// A statement made of program text only
    pub fn new(text: &'static str) -> Self {
        Self::builder().keyword(text).build()
    }

    pub fn builder() -> StatementBuilder {
        StatementBuilder::default()
    }

    /// Template with `%s` placeholders and `%%` escapes
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Whether the statement returns a result set
    pub fn is_query(&self) -> bool {
        let head = self
            .template
            .trim_start()
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_ascii_uppercase();
        matches!(head.as_str(), "SELECT" | "SHOW" | "WITH")
    }

    /// Literal SQL with parameters substituted
    pub fn render(&self) -> String {
        self.render_escaped(StringEscape::Backslash)
    }

    /// Like [`Statement::render`] for a session whose sql_mode decides how
    /// string literals are escaped
    pub fn render_escaped(&self, escape: StringEscape) -> String {
        self.render_with(|value| value.to_sql_literal_with(escape))
    }

    /// Literal SQL with secrets masked, for logs and error messages
    pub fn masked(&self) -> String {
        self.render_with(Value::to_masked_literal)
    }

    fn render_with(&self, literal: impl Fn(&Value) -> String) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut params = self.params.iter();
        let mut chars = self.template.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            match chars.peek() {
                Some('%') => {
                    chars.next();
                    out.push('%');
                }
                Some('s') => {
                    chars.next();
                    match params.next() {
                        Some(value) => out.push_str(&literal(value)),
                        None => out.push_str("NULL"),
                    }
                }
                _ => out.push('%'),
            }
        }

        out
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

/// Builder for [`Statement`]
#[derive(Debug, Default)]
pub struct StatementBuilder {
    template: String,
    params: Vec<Value>,
}

impl StatementBuilder {
    /// Program text
    pub fn keyword(mut self, text: &'static str) -> Self {
        self.push_escaped(text);
        self
    }

    /// Validated fragment text
    pub fn fragment(mut self, fragment: &impl SqlFragment) -> Self {
        self.push_escaped(fragment.sql_text());
        self
    }

    /// Backtick-quoted identifier
    pub fn ident(mut self, name: &str) -> Self {
        let quoted = format!("`{}`", name.replace('`', "``"));
        self.push_escaped(&quoted);
        self
    }

    /// Bound parameter
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.template.push_str("%s");
        self.params.push(value.into());
        self
    }

    /// Bound parameter masked in logs
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.template.push_str("%s");
        self.params.push(Value::Secret(secret.into()));
        self
    }

    /// `%s@%s`, or `%s` for a hostless account
    pub fn account(self, account: &Account) -> Self {
        let name = self.value(account.name.as_str());
        match &account.host {
            Some(host) => name.keyword("@").value(host.as_str()),
            None => name,
        }
    }

    /// Apply `f` to each item, writing `separator` in between
    pub fn join<T>(
        mut self,
        items: impl IntoIterator<Item = T>,
        separator: &'static str,
        mut f: impl FnMut(Self, T) -> Self,
    ) -> Self {
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                self = self.keyword(separator);
            }
            self = f(self, item);
        }
        self
    }

    /// Apply `f` only when `condition` holds
    pub fn when(self, condition: bool, f: impl FnOnce(Self) -> Self) -> Self {
        if condition { f(self) } else { self }
    }

    pub fn build(self) -> Statement {
        Statement {
            template: self.template,
            params: self.params,
        }
    }

    fn push_escaped(&mut self, text: &str) {
        for c in text.chars() {
            if c == '%' {
                self.template.push_str("%%");
            } else {
                self.template.push(c);
            }
        }
    }
}
