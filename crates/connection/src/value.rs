// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Values bound to statements and returned in rows

use std::borrow::Cow;
use std::fmt;

use serde::Serialize;

/// A single SQL value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Text(String),
    Bytes(Vec<u8>),
    /// Text that must never reach logs; rendered as a literal but displayed
    /// masked
    #[serde(serialize_with = "serialize_masked")]
    Secret(String),
}

const MASK: &str = "********";

/// How string literals are escaped
///
/// Under the `NO_BACKSLASH_ESCAPES` sql_mode a backslash is an ordinary
/// character, so only the quote may be escaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringEscape {
    #[default]
    Backslash,
    QuotesOnly,
}

fn serialize_masked<S: serde::Serializer>(_: &String, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(MASK)
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Textual view of the value; bytes are decoded lossily
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Null => None,
            Value::Int(n) => Some(Cow::Owned(n.to_string())),
            Value::Text(s) | Value::Secret(s) => Some(Cow::Borrowed(s)),
            Value::Bytes(b) => Some(String::from_utf8_lossy(b)),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            other => other.as_text().and_then(|t| t.trim().parse().ok()),
        }
    }

    /// SQL literal for this value, with backslash escapes
    pub fn to_sql_literal(&self) -> String {
        self.to_sql_literal_with(StringEscape::Backslash)
    }

    pub fn to_sql_literal_with(&self, escape: StringEscape) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Int(n) => n.to_string(),
            Value::Text(s) | Value::Secret(s) => quote_string(s, escape),
            Value::Bytes(b) => format!("X'{}'", hex::encode_upper(b)),
        }
    }

    /// Like [`Value::to_sql_literal`] but secrets are masked
    pub fn to_masked_literal(&self) -> String {
        match self {
            Value::Secret(_) => format!("'{MASK}'"),
            other => other.to_sql_literal(),
        }
    }
}

/// Quote a string literal the way client libraries escape parameters
fn quote_string(text: &str, escape: StringEscape) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    if escape == StringEscape::QuotesOnly {
        out.push_str(&text.replace('\'', "''"));
        out.push('\'');
        return out;
    }
    for c in text.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{1a}' => out.push_str("\\Z"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_masked_literal())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Text(value.clone())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Int(i64::from(value))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_literal_escaping() {
        assert_eq!(Value::from("it's").to_sql_literal(), "'it''s'");
        assert_eq!(Value::from("a\\b").to_sql_literal(), "'a\\\\b'");
    }

    #[test]
    fn test_quotes_only_escaping_keeps_backslashes() {
        let value = Value::Secret("p\\w'\n".into());
        assert_eq!(value.to_sql_literal_with(StringEscape::Backslash), "'p\\\\w''\\n'");
        assert_eq!(value.to_sql_literal_with(StringEscape::QuotesOnly), "'p\\w''\n'");
    }

    #[test]
    fn test_secret_masked_in_display() {
        let secret = Value::Secret("hunter2".into());
        assert_eq!(secret.to_string(), "'********'");
        assert_eq!(secret.to_sql_literal(), "'hunter2'");
        assert_eq!(serde_json::to_string(&secret).unwrap(), "\"********\"");
    }

    #[test]
    fn test_bytes_as_hex_literal() {
        assert_eq!(Value::Bytes(vec![0xab, 0x01]).to_sql_literal(), "X'AB01'");
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(Value::Text(" 42".into()).as_i64(), Some(42));
        assert_eq!(Value::Bytes(b"7".to_vec()).as_i64(), Some(7));
        assert_eq!(Value::Null.as_i64(), None);
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }
}
