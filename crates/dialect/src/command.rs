// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Command tables
//!
//! A command table maps a canonical dialect key (`"SHOW MASTER STATUS"`,
//! `"MASTER_HOST"`) to the literal text each server understands. Entries are
//! bracketed by a version floor; every implementation mentioned for a key
//! also carries a default entry that applies below the lowest floor.
//!
//! Resolution picks the entry with the highest floor not above the server
//! version, falling back to the default. The same lookup serves whole
//! statements and single option keywords, so resolved strings compose into
//! larger statements.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use tracing::trace;

use crate::error::{DialectError, DialectResult};
use crate::server::{Implementation, ServerIdentity};
use crate::version::Version;

/// Version bracket of a command table entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Floor {
    /// Applies when no versioned entry matches
    Default,
    /// Applies from this version upward
    At(Version),
}

impl Floor {
    pub fn at(version: &str) -> Self {
        Floor::At(Version::parse(version))
    }
}

#[derive(Debug, Clone)]
struct Entry {
    implementation: Implementation,
    floor: Floor,
    text: String,
}

/// Version-bracketed dialect strings keyed by canonical command
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    commands: BTreeMap<String, Vec<Entry>>,
}

impl CommandTable {
    /// Build a table, checking that every implementation mentioned for a key
    /// has a default entry for it.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::MissingDefault`] naming the first key and
    /// implementation without a default.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mysql_accounts_dialect::{CommandTable, Floor, Implementation};
    ///
    /// let table = CommandTable::new([
    ///     ("SHOW MASTER STATUS", Implementation::MySQL, Floor::Default, "SHOW MASTER STATUS"),
    ///     ("SHOW MASTER STATUS", Implementation::MySQL, Floor::at("8.2.0"), "SHOW BINARY LOG STATUS"),
    /// ]);
    /// assert!(table.is_ok());
    ///
    /// let broken = CommandTable::new([
    ///     ("SHOW MASTER STATUS", Implementation::MySQL, Floor::at("8.2.0"), "SHOW BINARY LOG STATUS"),
    /// ]);
    /// assert!(broken.is_err());
    /// ```
    pub fn new<K, T>(entries: impl IntoIterator<Item = (K, Implementation, Floor, T)>) -> DialectResult<Self>
    where
        K: AsRef<str>,
        T: Into<String>,
    {
        let table = Self::from_entries(entries);
        table.check_defaults()?;
        Ok(table)
    }

    fn from_entries<K, T>(entries: impl IntoIterator<Item = (K, Implementation, Floor, T)>) -> Self
    where
        K: AsRef<str>,
        T: Into<String>,
    {
        let mut commands: BTreeMap<String, Vec<Entry>> = BTreeMap::new();
        for (key, implementation, floor, text) in entries {
            commands
                .entry(key.as_ref().to_uppercase())
                .or_default()
                .push(Entry {
                    implementation,
                    floor,
                    text: text.into(),
                });
        }
        Self { commands }
    }

    fn check_defaults(&self) -> DialectResult<()> {
        for (key, entries) in &self.commands {
            for entry in entries {
                let has_default = entries.iter().any(|candidate| {
                    candidate.implementation == entry.implementation
                        && candidate.floor == Floor::Default
                });
                if !has_default {
                    return Err(DialectError::MissingDefault {
                        key: key.clone(),
                        implementation: entry.implementation,
                    });
                }
            }
        }
        Ok(())
    }

    /// The table shipped with the library
    pub fn builtin() -> &'static CommandTable {
        &BUILTIN
    }

    /// Whether the table knows `key` at all
    pub fn contains(&self, key: &str) -> bool {
        self.commands.contains_key(&key.to_uppercase())
    }

    /// All canonical keys, uppercased
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Resolve `key` for the given server
    ///
    /// # Errors
    ///
    /// - [`DialectError::UnsupportedCommand`] when the key is unknown
    /// - [`DialectError::UnsupportedForImplementation`] when the key exists
    ///   but has no entry for the server's implementation
    pub fn resolve(&self, server: &ServerIdentity, key: &str) -> DialectResult<&str> {
        let key = key.to_uppercase();
        let entries = self
            .commands
            .get(&key)
            .ok_or_else(|| DialectError::UnsupportedCommand { key: key.clone() })?;

        let mut versioned: Vec<(&Version, &str)> = Vec::new();
        let mut default = None;
        let mut mentioned = false;
        for entry in entries.iter().filter(|e| e.implementation == server.implementation) {
            mentioned = true;
            match &entry.floor {
                Floor::Default => default = Some(entry.text.as_str()),
                Floor::At(floor) => versioned.push((floor, entry.text.as_str())),
            }
        }

        if !mentioned {
            return Err(DialectError::UnsupportedForImplementation {
                key,
                implementation: server.implementation,
            });
        }

        // Stable sort keeps table order between equal floors.
        versioned.sort_by(|a, b| b.0.cmp(a.0));

        if let Some((floor, text)) = versioned
            .into_iter()
            .find(|(floor, _)| server.version >= **floor)
        {
            trace!(key = %key, server = %server, floor = %floor, resolved = text, "resolved command");
            return Ok(text);
        }

        match default {
            Some(text) => {
                trace!(key = %key, server = %server, resolved = text, "resolved command to default");
                Ok(text)
            }
            None => Err(DialectError::MissingDefault {
                key,
                implementation: server.implementation,
            }),
        }
    }
}

/// Resolver bound to one server identity and one table
#[derive(Debug, Clone)]
pub struct CommandResolver<'t> {
    server: ServerIdentity,
    table: &'t CommandTable,
}

impl CommandResolver<'static> {
    /// Resolver over the built-in table
    pub fn new(server: &ServerIdentity) -> Self {
        Self {
            server: server.clone(),
            table: CommandTable::builtin(),
        }
    }
}

impl<'t> CommandResolver<'t> {
    /// Resolver over a caller-supplied table
    pub fn with_table(server: &ServerIdentity, table: &'t CommandTable) -> Self {
        Self {
            server: server.clone(),
            table,
        }
    }

    pub fn server(&self) -> &ServerIdentity {
        &self.server
    }

    /// Resolve a statement or keyword; see [`CommandTable::resolve`]
    pub fn resolve(&self, key: &str) -> DialectResult<&'t str> {
        self.table.resolve(&self.server, key)
    }
}

/// Resolve against the built-in table without holding a resolver
pub fn resolve_command(
    implementation: Implementation,
    version: &str,
    key: &str,
) -> DialectResult<String> {
    let server = ServerIdentity::new(implementation, version);
    CommandTable::builtin()
        .resolve(&server, key)
        .map(str::to_string)
}

static BUILTIN: LazyLock<CommandTable> = LazyLock::new(|| CommandTable::from_entries(builtin_entries()));

const MYSQL_SOURCE_RENAME: &str = "8.0.23";
const MYSQL_REPLICA_TERM: &str = "8.0.22";
const MARIADB_REPLICA_TERM: &str = "10.5.1";

/// `CHANGE MASTER TO` options renamed to `SOURCE_*` on newer MySQL
const RENAMED_OPTIONS: &[(&str, &str)] = &[
    ("MASTER_HOST", "SOURCE_HOST"),
    ("MASTER_USER", "SOURCE_USER"),
    ("MASTER_PASSWORD", "SOURCE_PASSWORD"),
    ("MASTER_PORT", "SOURCE_PORT"),
    ("MASTER_CONNECT_RETRY", "SOURCE_CONNECT_RETRY"),
    ("MASTER_LOG_FILE", "SOURCE_LOG_FILE"),
    ("MASTER_LOG_POS", "SOURCE_LOG_POS"),
    ("MASTER_DELAY", "SOURCE_DELAY"),
    ("MASTER_SSL", "SOURCE_SSL"),
    ("MASTER_SSL_CA", "SOURCE_SSL_CA"),
    ("MASTER_SSL_CAPATH", "SOURCE_SSL_CAPATH"),
    ("MASTER_SSL_CERT", "SOURCE_SSL_CERT"),
    ("MASTER_SSL_KEY", "SOURCE_SSL_KEY"),
    ("MASTER_SSL_CIPHER", "SOURCE_SSL_CIPHER"),
];

type RawEntry = (&'static str, Implementation, Floor, &'static str);

fn builtin_entries() -> Vec<RawEntry> {
    use Implementation::{MariaDB, MySQL};

    let mut entries: Vec<RawEntry> = vec![
        ("SHOW MASTER STATUS", MySQL, Floor::Default, "SHOW MASTER STATUS"),
        ("SHOW MASTER STATUS", MySQL, Floor::at("8.2.0"), "SHOW BINARY LOG STATUS"),
        ("SHOW MASTER STATUS", MariaDB, Floor::Default, "SHOW MASTER STATUS"),
        ("SHOW MASTER STATUS", MariaDB, Floor::at("10.5.2"), "SHOW BINLOG STATUS"),
        ("SHOW SLAVE STATUS", MySQL, Floor::Default, "SHOW SLAVE STATUS"),
        ("SHOW SLAVE STATUS", MySQL, Floor::at(MYSQL_REPLICA_TERM), "SHOW REPLICA STATUS"),
        ("SHOW SLAVE STATUS", MariaDB, Floor::Default, "SHOW SLAVE STATUS"),
        ("SHOW SLAVE STATUS", MariaDB, Floor::at(MARIADB_REPLICA_TERM), "SHOW REPLICA STATUS"),
        ("SHOW SLAVE HOSTS", MySQL, Floor::Default, "SHOW SLAVE HOSTS"),
        ("SHOW SLAVE HOSTS", MySQL, Floor::at(MYSQL_REPLICA_TERM), "SHOW REPLICAS"),
        ("SHOW SLAVE HOSTS", MariaDB, Floor::Default, "SHOW SLAVE HOSTS"),
        ("SHOW SLAVE HOSTS", MariaDB, Floor::at(MARIADB_REPLICA_TERM), "SHOW REPLICA HOSTS"),
        ("SLAVE", MySQL, Floor::Default, "SLAVE"),
        ("SLAVE", MySQL, Floor::at(MYSQL_REPLICA_TERM), "REPLICA"),
        ("SLAVE", MariaDB, Floor::Default, "SLAVE"),
        ("SLAVE", MariaDB, Floor::at(MARIADB_REPLICA_TERM), "REPLICA"),
        ("CHANGE MASTER", MySQL, Floor::Default, "CHANGE MASTER"),
        ("CHANGE MASTER", MySQL, Floor::at(MYSQL_SOURCE_RENAME), "CHANGE REPLICATION SOURCE"),
        ("CHANGE MASTER", MariaDB, Floor::Default, "CHANGE MASTER"),
        ("RESET MASTER", MySQL, Floor::Default, "RESET MASTER"),
        ("RESET MASTER", MySQL, Floor::at("8.4.0"), "RESET BINARY LOGS AND GTIDS"),
        ("RESET MASTER", MariaDB, Floor::Default, "RESET MASTER"),
        ("RELAY_LOG_FILE", MySQL, Floor::Default, "RELAY_LOG_FILE"),
        ("RELAY_LOG_FILE", MariaDB, Floor::Default, "RELAY_LOG_FILE"),
        ("RELAY_LOG_POS", MySQL, Floor::Default, "RELAY_LOG_POS"),
        ("RELAY_LOG_POS", MariaDB, Floor::Default, "RELAY_LOG_POS"),
        ("MASTER_AUTO_POSITION", MySQL, Floor::Default, "MASTER_AUTO_POSITION"),
        ("MASTER_AUTO_POSITION", MySQL, Floor::at(MYSQL_SOURCE_RENAME), "SOURCE_AUTO_POSITION"),
        ("MASTER_USE_GTID", MariaDB, Floor::Default, "MASTER_USE_GTID"),
    ];

    for &(legacy, renamed) in RENAMED_OPTIONS {
        entries.push((legacy, MySQL, Floor::Default, legacy));
        entries.push((legacy, MySQL, Floor::at(MYSQL_SOURCE_RENAME), renamed));
        entries.push((legacy, MariaDB, Floor::Default, legacy));
    }

    entries
}
