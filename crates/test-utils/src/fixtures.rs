// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Server fixtures and sample account data

use crate::mock_connection::{MockConnection, MockConnectionBuilder};

/// Version strings as reported by `SELECT VERSION()`
pub struct ServerFixtures;

impl ServerFixtures {
    // ===== MySQL =====

    /// No roles, `IDENTIFIED BY PASSWORD` still accepted
    pub const fn mysql_57() -> &'static str {
        "5.7.44-log"
    }

    /// Roles and `ALTER USER`, `REPLICA` keywords with `CHANGE REPLICATION SOURCE`
    pub const fn mysql_80() -> &'static str {
        "8.0.36"
    }

    /// Source/replica keywords only
    pub const fn mysql_84() -> &'static str {
        "8.4.1"
    }

    // ===== MariaDB =====

    /// Replica keywords with `SHOW REPLICA STATUS`
    pub const fn mariadb_105() -> &'static str {
        "10.5.23-MariaDB-log"
    }

    pub const fn mariadb_1011() -> &'static str {
        "10.11.6-MariaDB"
    }

    /// Before `ALTER USER`
    pub const fn mariadb_100() -> &'static str {
        "10.0.38-MariaDB"
    }

    // ===== Passwords =====

    /// `mysql_native_password` hash of `secret`
    pub const fn native_hash_of_secret() -> &'static str {
        "*14E65567ABDB5135D0CFD9A70B3032C179A49EE7"
    }
}

/// Mock builders preconfigured for each fixture server
pub fn mysql_57() -> MockConnectionBuilder {
    MockConnection::builder(ServerFixtures::mysql_57())
}

pub fn mysql_80() -> MockConnectionBuilder {
    MockConnection::builder(ServerFixtures::mysql_80())
}

pub fn mysql_84() -> MockConnectionBuilder {
    MockConnection::builder(ServerFixtures::mysql_84())
}

pub fn mariadb_100() -> MockConnectionBuilder {
    MockConnection::builder(ServerFixtures::mariadb_100())
}

pub fn mariadb_105() -> MockConnectionBuilder {
    MockConnection::builder(ServerFixtures::mariadb_105())
}

pub fn mariadb_1011() -> MockConnectionBuilder {
    MockConnection::builder(ServerFixtures::mariadb_1011())
}
