// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # TLS requirements
//!
//! The `REQUIRE` clause of an account: `SSL`, `X509`, or a list of
//! `CIPHER` / `ISSUER` / `SUBJECT` attributes. `REQUIRE NONE` is
//! represented as the absence of a [`TlsRequires`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use mysql_accounts_connection::StatementBuilder;
use regex::Regex;
use serde::Serialize;

use crate::error::{PrivilegeError, PrivilegeResult};

static REQUIRE_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bREQUIRE\b(.*?)(?:\bPASSWORD\b|$)").expect("require pattern is valid")
});

const REQUIRESSL: &str = "REQUIRESSL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TlsAttribute {
    Cipher,
    Issuer,
    Subject,
}

impl TlsAttribute {
    pub fn as_str(&self) -> &'static str {
        match self {
            TlsAttribute::Cipher => "CIPHER",
            TlsAttribute::Issuer => "ISSUER",
            TlsAttribute::Subject => "SUBJECT",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        match key.to_ascii_uppercase().as_str() {
            "CIPHER" => Some(TlsAttribute::Cipher),
            "ISSUER" => Some(TlsAttribute::Issuer),
            "SUBJECT" => Some(TlsAttribute::Subject),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TlsRequires {
    Ssl,
    X509,
    Attributes(BTreeMap<TlsAttribute, String>),
}

impl TlsRequires {
    /// Sanitize a user-supplied requirement map
    ///
    /// Keys are case-insensitive. Any attribute key wins over `SSL` and
    /// `X509`; otherwise `X509` wins over `SSL`. An empty map means no
    /// requirement.
    pub fn from_map<I, K>(entries: I) -> PrivilegeResult<Option<Self>>
    where
        I: IntoIterator<Item = (K, Option<String>)>,
        K: AsRef<str>,
    {
        let mut attributes = BTreeMap::new();
        let mut x509 = false;
        let mut any = false;

        for (key, value) in entries {
            let key = key.as_ref().to_ascii_uppercase();
            any = true;
            match key.as_str() {
                "SSL" => {}
                "X509" => x509 = true,
                _ => {
                    let attribute = TlsAttribute::parse(&key)
                        .ok_or_else(|| PrivilegeError::InvalidTlsRequirement { key: key.clone() })?;
                    let value =
                        value.ok_or_else(|| PrivilegeError::InvalidTlsRequirement { key: key.clone() })?;
                    attributes.insert(attribute, value);
                }
            }
        }

        Ok(if !attributes.is_empty() {
            Some(TlsRequires::Attributes(attributes))
        } else if x509 {
            Some(TlsRequires::X509)
        } else if any {
            Some(TlsRequires::Ssl)
        } else {
            None
        })
    }

    /// Append ` REQUIRE ...` to a statement
    pub fn append_to(&self, builder: StatementBuilder) -> StatementBuilder {
        let builder = builder.keyword(" REQUIRE ");
        match self {
            TlsRequires::Ssl => builder.keyword("SSL"),
            TlsRequires::X509 => builder.keyword("X509"),
            TlsRequires::Attributes(attributes) => {
                builder.join(attributes, " AND ", |b, (attribute, value)| {
                    b.keyword(attribute.as_str()).keyword(" ").value(value.as_str())
                })
            }
        }
    }
}

impl fmt::Display for TlsRequires {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlsRequires::Ssl => f.write_str("SSL"),
            TlsRequires::X509 => f.write_str("X509"),
            TlsRequires::Attributes(attributes) => {
                for (i, (attribute, value)) in attributes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" AND ")?;
                    }
                    write!(f, "{} '{}'", attribute.as_str(), value)?;
                }
                Ok(())
            }
        }
    }
}

/// Append the `REQUIRE` clause for `requires`, or `REQUIRE NONE`
pub fn append_require(builder: StatementBuilder, requires: Option<&TlsRequires>) -> StatementBuilder {
    match requires {
        Some(requires) => requires.append_to(builder),
        None => builder.keyword(" REQUIRE NONE"),
    }
}

/// Read the requirement out of `SHOW CREATE USER` or `SHOW GRANTS` text
///
/// The clause runs from `REQUIRE` up to `PASSWORD` or the end of the
/// text. Attribute values may be quoted with `'` or `"`.
pub fn parse_require_clause(text: &str) -> Option<TlsRequires> {
    let clause = REQUIRE_CLAUSE.captures(text)?.get(1)?.as_str().trim();

    if clause.starts_with("NONE") {
        return None;
    }
    if clause.starts_with("SSL") {
        return Some(TlsRequires::Ssl);
    }
    if clause.starts_with("X509") {
        return Some(TlsRequires::X509);
    }

    let words = quoted_words(clause);
    let mut words = words.iter().filter(|w| !w.eq_ignore_ascii_case("AND"));
    let mut attributes = BTreeMap::new();
    while let Some(key) = words.next() {
        let Some(attribute) = TlsAttribute::parse(key) else {
            break;
        };
        let Some(value) = words.next() else {
            break;
        };
        attributes.insert(attribute, value.clone());
    }

    (!attributes.is_empty()).then_some(TlsRequires::Attributes(attributes))
}

/// Split on whitespace, keeping quoted runs together
///
/// A doubled quote inside a quoted run stands for one quote character.
fn quoted_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) if c == q => {
                if chars.peek() == Some(&q) {
                    chars.next();
                    current.push(q);
                } else {
                    quote = None;
                }
            }
            Some(_) if c == '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(current);
    }

    words
}

/// Remove the deprecated `REQUIRESSL` pseudo-privilege from a privilege string
///
/// Returns the remaining privilege string (`None` when nothing is left) and
/// whether the token was present.
pub fn strip_requiressl(spec: &str) -> (Option<String>, bool) {
    let mut found = false;
    let mut kept = Vec::new();

    for segment in spec.split('/') {
        let Some((scope, privileges)) = segment.rsplit_once(':') else {
            kept.push(segment.to_string());
            continue;
        };
        let remaining: Vec<&str> = privileges
            .split(',')
            .filter(|p| {
                let is_requiressl = p.trim().eq_ignore_ascii_case(REQUIRESSL);
                found |= is_requiressl;
                !is_requiressl
            })
            .collect();
        if !remaining.is_empty() {
            kept.push(format!("{scope}:{}", remaining.join(",")));
        }
    }

    let spec = (!kept.is_empty()).then(|| kept.join("/"));
    (spec, found)
}
