// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Privilege names accepted in user-supplied privilege strings
//!
//! Covers static MySQL privileges, MySQL 8 dynamic privileges, Aurora
//! extensions and MariaDB names. Only checked when the caller asks for it.

const KNOWN_PRIVILEGES: &[&str] = &[
    "ALL",
    "ALL PRIVILEGES",
    "ALTER",
    "ALTER ROUTINE",
    "APPLICATION_PASSWORD_ADMIN",
    "AUDIT_ADMIN",
    "BACKUP_ADMIN",
    "BINLOG ADMIN",
    "BINLOG MONITOR",
    "BINLOG REPLAY",
    "BINLOG_ADMIN",
    "BINLOG_ENCRYPTION_ADMIN",
    "CLONE_ADMIN",
    "CONNECTION ADMIN",
    "CONNECTION_ADMIN",
    "CREATE",
    "CREATE ROLE",
    "CREATE ROUTINE",
    "CREATE TABLESPACE",
    "CREATE TEMPORARY TABLES",
    "CREATE USER",
    "CREATE VIEW",
    "DELETE",
    "DELETE HISTORY",
    "DROP",
    "DROP ROLE",
    "ENCRYPTION_KEY_ADMIN",
    "EVENT",
    "EXECUTE",
    "FILE",
    "FIREWALL_ADMIN",
    "FIREWALL_USER",
    "GRANT",
    "GRANT OPTION",
    "GROUP_REPLICATION_ADMIN",
    "INDEX",
    "INNODB_REDO_LOG_ARCHIVE",
    "INSERT",
    "INVOKE LAMBDA",
    "LOAD FROM S3",
    "LOCK TABLES",
    "NDB_STORED_USER",
    "PERSIST_RO_VARIABLES_ADMIN",
    "PROCESS",
    "PROXY",
    "READ_ONLY ADMIN",
    "REFERENCES",
    "RELOAD",
    "REPLICA MONITOR",
    "REPLICATION CLIENT",
    "REPLICATION MASTER ADMIN",
    "REPLICATION SLAVE",
    "REPLICATION SLAVE ADMIN",
    "REPLICATION_APPLIER",
    "REPLICATION_SLAVE_ADMIN",
    "REQUIRESSL",
    "RESOURCE_GROUP_ADMIN",
    "RESOURCE_GROUP_USER",
    "ROLE_ADMIN",
    "SELECT",
    "SELECT INTO S3",
    "SESSION_VARIABLES_ADMIN",
    "SET USER",
    "SET_USER_ID",
    "SHOW DATABASES",
    "SHOW VIEW",
    "SHOW_ROUTINE",
    "SHUTDOWN",
    "SLAVE MONITOR",
    "SUPER",
    "SYSTEM_USER",
    "SYSTEM_VARIABLES_ADMIN",
    "TABLE_ENCRYPTION_ADMIN",
    "TRIGGER",
    "UPDATE",
    "USAGE",
    "VERSION_TOKEN_ADMIN",
    "XA_RECOVER_ADMIN",
];

/// Whether `name` (without any column list) is a known privilege
pub fn is_known_privilege(name: &str) -> bool {
    KNOWN_PRIVILEGES.binary_search(&name).is_ok()
}
