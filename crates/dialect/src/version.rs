// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Loose version numbers
//!
//! Server versions arrive as free text such as `8.0.22-standard`,
//! `10.5.1-MariaDB-log` or `5.7.30-0ubuntu0.18.04.1`. Parsing never fails:
//!
//! - the text is split on `.`
//! - each part contributes its leading digits as a numeric component
//! - a part without leading digits becomes a text component
//! - the first part carrying anything after its digits ends the numeric
//!   sequence; the remainder is kept as a suffix and ignored for ordering
//!
//! Ordering is lexicographic over components, a shorter sequence sorting
//! before a longer one that shares its prefix (`5.5 < 5.5.1`). Numbers sort
//! after text at the same position.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One dot-separated piece of a version
#[derive(Debug, Clone, PartialEq, Eq)]
enum Component {
    Number(u64),
    Text(String),
}

impl Ord for Component {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Component::Number(a), Component::Number(b)) => a.cmp(b),
            (Component::Text(a), Component::Text(b)) => a.cmp(b),
            (Component::Number(_), Component::Text(_)) => Ordering::Greater,
            (Component::Text(_), Component::Number(_)) => Ordering::Less,
        }
    }
}

impl PartialOrd for Component {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A permissively parsed, totally ordered version
///
/// Equality and ordering only look at the parsed components; the suffix and
/// the original text are kept for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Version {
    raw: String,
    components: Vec<Component>,
    suffix: String,
}

impl Version {
    /// Parse a version string. Never fails.
    pub fn parse(text: &str) -> Self {
        let raw = text.trim().to_string();
        let mut components = Vec::new();
        let mut suffix = String::new();

        let mut parts = raw.split('.').peekable();
        while let Some(part) = parts.next() {
            let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();

            if digits.is_empty() {
                if !part.is_empty() {
                    components.push(Component::Text(part.to_string()));
                }
                continue;
            }

            // Digit runs too long for u64 are ordered as text.
            match digits.parse::<u64>() {
                Ok(number) => components.push(Component::Number(number)),
                Err(_) => components.push(Component::Text(digits.clone())),
            }

            if digits.len() < part.len() {
                suffix.push_str(&part[digits.len()..]);
                for rest in parts.by_ref() {
                    suffix.push('.');
                    suffix.push_str(rest);
                }
                break;
            }
        }

        Self {
            raw,
            components,
            suffix,
        }
    }

    /// Major version, or 0 when the text had no leading number
    pub fn major(&self) -> u64 {
        self.number_at(0)
    }

    /// Minor version, or 0 when absent
    pub fn minor(&self) -> u64 {
        self.number_at(1)
    }

    fn number_at(&self, index: usize) -> u64 {
        match self.components.get(index) {
            Some(Component::Number(n)) => *n,
            _ => 0,
        }
    }

    /// Trailing free text that does not take part in ordering
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// The version text as received
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// `self >= floor`, where `floor` is a version literal such as `"8.0.22"`
    pub fn at_least(&self, floor: &str) -> bool {
        *self >= Version::parse(floor)
    }

    /// `self < ceiling`
    pub fn below(&self, ceiling: &str) -> bool {
        *self < Version::parse(ceiling)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
    }
}

impl Eq for Version {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        // Vec's ordering is exactly "element-wise, then shorter first".
        self.components.cmp(&other.components)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Version {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Version::parse(s))
    }
}

impl From<String> for Version {
    fn from(value: String) -> Self {
        Version::parse(&value)
    }
}

impl From<&str> for Version {
    fn from(value: &str) -> Self {
        Version::parse(value)
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.raw
    }
}

/// Compare two version strings with loose semantics
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    Version::parse(a).cmp(&Version::parse(b))
}
