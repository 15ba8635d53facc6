// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Dialect strategies
//!
//! Capability checks that differ between MySQL and MariaDB. A strategy is
//! built once from the [`ServerIdentity`] and handed to every component
//! that needs to ask what the server supports.

use std::fmt;

use crate::server::{Implementation, ServerIdentity};

/// Where the current `REQUIRE` clause of an account is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsRequiresSource {
    /// `SHOW CREATE USER`
    ShowCreateUser,
    /// `SHOW GRANTS FOR`, on servers with the old user management
    ShowGrants,
}

/// Server capability checks
///
/// Implementations must be pure functions of the identity they were built
/// from. Tests can substitute their own implementation to force a branch.
pub trait DialectStrategy: Send + Sync + fmt::Debug {
    /// The identity this strategy answers for
    fn identity(&self) -> &ServerIdentity;

    /// Accounts are managed through `GRANT ... IDENTIFIED BY` and
    /// `SET PASSWORD` rather than `CREATE USER` / `ALTER USER`
    fn use_old_user_management(&self) -> bool;

    /// `CREATE USER ... IDENTIFIED BY PASSWORD '<hash>'` is accepted
    fn supports_identified_by_password(&self) -> bool;

    /// `ALTER USER` exists, including `ALTER USER ... WITH <limit>`
    fn supports_alter_user(&self) -> bool;

    fn supports_password_expire(&self) -> bool;

    fn supports_roles(&self) -> bool;

    /// `REPLICA` replaces `SLAVE` in replication statements
    fn uses_replica_terminology(&self) -> bool;

    /// Roles carry no host part
    fn hostless_roles(&self) -> bool;

    /// `CREATE ROLE ... WITH ADMIN` is available
    fn supports_role_admin(&self) -> bool;

    /// `SET DEFAULT ROLE ALL TO <member>` is available
    fn supports_set_default_role_all(&self) -> bool;

    /// Host given to a member named without one
    fn default_member_host(&self) -> &'static str;

    fn tls_requires_source(&self) -> TlsRequiresSource {
        if self.use_old_user_management() {
            TlsRequiresSource::ShowGrants
        } else {
            TlsRequiresSource::ShowCreateUser
        }
    }

    /// Whether every returned row is searched for the `REQUIRE` clause,
    /// rather than only the first one
    fn scans_all_rows_for_requires(&self) -> bool;

    fn implementation(&self) -> Implementation {
        self.identity().implementation
    }
}

/// Oracle MySQL
#[derive(Debug, Clone)]
pub struct MySQLStrategy {
    server: ServerIdentity,
}

impl MySQLStrategy {
    pub fn new(server: ServerIdentity) -> Self {
        Self { server }
    }
}

impl DialectStrategy for MySQLStrategy {
    fn identity(&self) -> &ServerIdentity {
        &self.server
    }

    fn use_old_user_management(&self) -> bool {
        self.server.version.below("5.7")
    }

    fn supports_identified_by_password(&self) -> bool {
        self.server.version.below("8")
    }

    fn supports_alter_user(&self) -> bool {
        self.server.version.at_least("5.6")
    }

    fn supports_password_expire(&self) -> bool {
        self.server.version.at_least("5.7")
    }

    fn supports_roles(&self) -> bool {
        self.server.version.at_least("8")
    }

    fn uses_replica_terminology(&self) -> bool {
        self.server.version.at_least("8.0.22")
    }

    fn hostless_roles(&self) -> bool {
        false
    }

    fn supports_role_admin(&self) -> bool {
        false
    }

    fn supports_set_default_role_all(&self) -> bool {
        true
    }

    fn default_member_host(&self) -> &'static str {
        "%"
    }

    fn scans_all_rows_for_requires(&self) -> bool {
        false
    }
}

/// MariaDB
#[derive(Debug, Clone)]
pub struct MariaDBStrategy {
    server: ServerIdentity,
}

impl MariaDBStrategy {
    pub fn new(server: ServerIdentity) -> Self {
        Self { server }
    }
}

impl DialectStrategy for MariaDBStrategy {
    fn identity(&self) -> &ServerIdentity {
        &self.server
    }

    fn use_old_user_management(&self) -> bool {
        self.server.version.below("10.2")
    }

    fn supports_identified_by_password(&self) -> bool {
        true
    }

    fn supports_alter_user(&self) -> bool {
        self.server.version.at_least("10.2")
    }

    fn supports_password_expire(&self) -> bool {
        self.server.version.at_least("10.4.3")
    }

    fn supports_roles(&self) -> bool {
        self.server.version.at_least("10.0.5")
    }

    fn uses_replica_terminology(&self) -> bool {
        self.server.version.at_least("10.5.1")
    }

    fn hostless_roles(&self) -> bool {
        true
    }

    fn supports_role_admin(&self) -> bool {
        true
    }

    fn supports_set_default_role_all(&self) -> bool {
        false
    }

    fn default_member_host(&self) -> &'static str {
        ""
    }

    fn scans_all_rows_for_requires(&self) -> bool {
        true
    }
}

/// Pick the strategy matching the server implementation
pub fn strategy_for(server: &ServerIdentity) -> Box<dyn DialectStrategy> {
    match server.implementation {
        Implementation::MySQL => Box::new(MySQLStrategy::new(server.clone())),
        Implementation::MariaDB => Box::new(MariaDBStrategy::new(server.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_for_picks_implementation() {
        let strategy = strategy_for(&ServerIdentity::parse("10.6.17-MariaDB"));
        assert_eq!(strategy.implementation(), Implementation::MariaDB);
        assert!(strategy.hostless_roles());

        let strategy = strategy_for(&ServerIdentity::parse("8.0.36"));
        assert_eq!(strategy.implementation(), Implementation::MySQL);
        assert_eq!(strategy.default_member_host(), "%");
    }

    #[test]
    fn test_tls_source_follows_user_management() {
        let old = MySQLStrategy::new(ServerIdentity::mysql("5.6.51"));
        assert_eq!(old.tls_requires_source(), TlsRequiresSource::ShowGrants);
        let new = MySQLStrategy::new(ServerIdentity::mysql("5.7.0"));
        assert_eq!(new.tls_requires_source(), TlsRequiresSource::ShowCreateUser);
    }
}
