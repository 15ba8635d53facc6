// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Server identity
//!
//! A server is identified once per operation from the text returned by
//! `SELECT VERSION()`. The implementation is inferred from the `MariaDB`
//! marker that MariaDB appends to its version string; anything else is
//! treated as MySQL.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::version::Version;

/// Server implementation family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Implementation {
    /// Oracle MySQL (and compatible forks without a MariaDB marker)
    MySQL,
    /// MariaDB
    MariaDB,
}

impl Implementation {
    /// Lowercase name as used in command tables and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Implementation::MySQL => "mysql",
            Implementation::MariaDB => "mariadb",
        }
    }
}

impl fmt::Display for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implementation and version of the connected server
///
/// Immutable once fetched; every dialect decision of an operation is made
/// against the same identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerIdentity {
    pub implementation: Implementation,
    pub version: Version,
}

impl ServerIdentity {
    /// Create an identity from already separated parts
    pub fn new(implementation: Implementation, version: impl Into<Version>) -> Self {
        Self {
            implementation,
            version: version.into(),
        }
    }

    /// Shorthand for a MySQL identity
    pub fn mysql(version: &str) -> Self {
        Self::new(Implementation::MySQL, version)
    }

    /// Shorthand for a MariaDB identity
    pub fn mariadb(version: &str) -> Self {
        Self::new(Implementation::MariaDB, version)
    }

    /// Parse the raw `VERSION()` text
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mysql_accounts_dialect::{Implementation, ServerIdentity};
    ///
    /// let server = ServerIdentity::parse("10.5.1-MariaDB-log");
    /// assert_eq!(server.implementation, Implementation::MariaDB);
    /// assert_eq!(server.version.major(), 10);
    ///
    /// let server = ServerIdentity::parse("8.0.22-standard");
    /// assert_eq!(server.implementation, Implementation::MySQL);
    /// ```
    pub fn parse(version_text: &str) -> Self {
        let implementation = if version_text.to_lowercase().contains("mariadb") {
            Implementation::MariaDB
        } else {
            Implementation::MySQL
        };

        Self::new(implementation, Version::parse(version_text))
    }

    pub fn is_mariadb(&self) -> bool {
        self.implementation == Implementation::MariaDB
    }

    pub fn is_mysql(&self) -> bool {
        self.implementation == Implementation::MySQL
    }
}

impl fmt::Display for ServerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.implementation, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults_to_mysql() {
        assert!(ServerIdentity::parse("5.7.44").is_mysql());
        assert!(ServerIdentity::parse("").is_mysql());
    }

    #[test]
    fn test_parse_mariadb_marker_case_insensitive() {
        assert!(ServerIdentity::parse("10.11.6-MariaDB-1:10.11.6+maria~ubu2204").is_mariadb());
        assert!(ServerIdentity::parse("5.5.5-10.4.32-mariadb").is_mariadb());
    }

    #[test]
    fn test_display() {
        let server = ServerIdentity::mysql("8.0.36");
        assert_eq!(server.to_string(), "mysql 8.0.36");
    }

    #[test]
    fn test_implementation_serde_lowercase() {
        let json = serde_json::to_string(&Implementation::MariaDB).unwrap();
        assert_eq!(json, "\"mariadb\"");
    }
}
