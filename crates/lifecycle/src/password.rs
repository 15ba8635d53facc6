// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Passwords and authentication plugins
//!
//! Clear-text passwords never get compared directly: the server hashes
//! them (`PASSWORD()` or double SHA1) and the hash is compared with what
//! `mysql.user` holds. Plugin credentials are compared against
//! `authentication_string`; salted `caching_sha2_password` digests are
//! computed locally and compared in hex.

use mysql_accounts_auth::{PasswordHasher, is_native_hash};
use mysql_accounts_connection::{Account, Statement, StatementBuilder, Value};
use tracing::{debug, info};

use crate::error::{LifecycleError, LifecycleResult};
use crate::session::Session;

pub const NATIVE_PLUGIN: &str = "mysql_native_password";
pub const CACHING_SHA2_PLUGIN: &str = "caching_sha2_password";

/// Server error raised when an empty root password is replaced through `ALTER USER`
const ER_CANNOT_USER: u16 = 1396;

/// Requested authentication plugin and its credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginCredential {
    /// `IDENTIFIED WITH plugin`
    Bare { plugin: String },
    /// `IDENTIFIED WITH plugin AS 'hash'`
    Hash { plugin: String, hash: String },
    /// `IDENTIFIED WITH plugin BY 'secret'`
    Auth { plugin: String, auth: String },
    /// `caching_sha2_password` digest computed from a secret and a salt
    Salted { digest: String, digest_hex: String },
}

impl PluginCredential {
    /// Build the credential from the user-facing options
    pub fn from_options(
        plugin: &str,
        hash: Option<&str>,
        auth: Option<&str>,
        salt: Option<&str>,
    ) -> LifecycleResult<Self> {
        if let Some(salt) = salt {
            if plugin != CACHING_SHA2_PLUGIN {
                return Err(LifecycleError::configuration(format!(
                    "salt requires plugin {CACHING_SHA2_PLUGIN}, got {plugin}"
                )));
            }
            let Some(auth) = auth else {
                return Err(LifecycleError::configuration("salt requires plugin_auth_string"));
            };
            let hasher = PasswordHasher::new();
            return Ok(PluginCredential::Salted {
                digest: hasher.hash(auth.as_bytes(), salt)?,
                digest_hex: hasher.hash_hex(auth.as_bytes(), salt)?,
            });
        }

        Ok(match (hash, auth) {
            (Some(hash), _) => PluginCredential::Hash {
                plugin: plugin.to_string(),
                hash: hash.to_string(),
            },
            (None, Some(auth)) => PluginCredential::Auth {
                plugin: plugin.to_string(),
                auth: auth.to_string(),
            },
            (None, None) => PluginCredential::Bare {
                plugin: plugin.to_string(),
            },
        })
    }

    pub fn plugin(&self) -> &str {
        match self {
            PluginCredential::Bare { plugin }
            | PluginCredential::Hash { plugin, .. }
            | PluginCredential::Auth { plugin, .. } => plugin,
            PluginCredential::Salted { .. } => CACHING_SHA2_PLUGIN,
        }
    }

    /// Append ` IDENTIFIED WITH ...` to a statement
    pub fn append_to(&self, builder: StatementBuilder) -> StatementBuilder {
        let builder = builder.keyword(" IDENTIFIED WITH ").value(self.plugin());
        match self {
            PluginCredential::Bare { .. } => builder,
            PluginCredential::Hash { hash, .. } => builder.keyword(" AS ").value(hash.as_str()),
            PluginCredential::Auth { auth, .. } => builder.keyword(" BY ").secret(auth.as_str()),
            PluginCredential::Salted { digest, .. } => {
                builder.keyword(" AS ").value(Value::Bytes(digest.clone().into_bytes()))
            }
        }
    }

    /// Whether the stored plugin and authentication string differ from this credential
    ///
    /// Plugins may transform a clear-text `BY` secret arbitrarily, so an
    /// `Auth` credential is reported as differing whenever the stored string
    /// is not the secret itself.
    pub fn differs_from(&self, stored: &StoredCredential) -> bool {
        if stored.plugin != self.plugin() {
            return true;
        }
        match self {
            PluginCredential::Bare { .. } => false,
            PluginCredential::Hash { hash, .. } => stored.auth != *hash,
            PluginCredential::Auth { auth, .. } => stored.auth != *auth,
            PluginCredential::Salted { digest_hex, .. } => !stored.auth_hex.eq_ignore_ascii_case(digest_hex),
        }
    }
}

/// Plugin and authentication string stored in `mysql.user`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredCredential {
    pub plugin: String,
    pub auth: String,
    pub auth_hex: String,
}

/// Read the stored credential of `account`
pub async fn stored_credential(session: &mut Session<'_>, account: &Account) -> LifecycleResult<StoredCredential> {
    let statement = Statement::builder()
        .keyword("SELECT plugin, authentication_string, HEX(authentication_string) AS auth_hex FROM mysql.user WHERE user = ")
        .value(account.name.as_str())
        .keyword(" AND host = ")
        .value(account.host_or_empty())
        .build();
    let row = session.query_required(&statement).await?;
    let text = |name: &str, index: usize| {
        row.get_either(name, index)
            .and_then(|v| v.as_text())
            .map(|t| t.into_owned())
            .unwrap_or_default()
    };
    Ok(StoredCredential {
        plugin: text("plugin", 0),
        auth: text("authentication_string", 1),
        auth_hex: text("auth_hex", 2),
    })
}

/// Native hash for `password`, either given pre-hashed or hashed by the server
pub async fn native_hash(session: &mut Session<'_>, password: &str, encrypted: bool) -> LifecycleResult<String> {
    if encrypted {
        if !is_native_hash(password) {
            return Err(LifecycleError::configuration(
                "encrypted was specified however it does not appear to be a valid hash expecting: *SHA1(SHA1(your_password))",
            ));
        }
        return Ok(password.to_string());
    }

    let statement = if session.strategy().use_old_user_management() {
        Statement::builder()
            .keyword("SELECT PASSWORD(")
            .secret(password)
            .keyword(")")
            .build()
    } else {
        Statement::builder()
            .keyword("SELECT CONCAT('*', UCASE(SHA1(UNHEX(SHA1(")
            .secret(password)
            .keyword(")))))")
            .build()
    };
    let row = session.query_required(&statement).await?;
    row.text(0)
        .map(|t| t.into_owned())
        .ok_or_else(|| LifecycleError::configuration("server returned no password hash"))
}

/// Hash currently stored for `account`, from `Password` or `authentication_string`
///
/// Which of the two columns exists and is filled depends on the server
/// release, so both are discovered and coalesced.
pub async fn current_hash(session: &mut Session<'_>, account: &Account) -> LifecycleResult<Option<String>> {
    let first = password_column(session, "DESC").await?;
    let second = password_column(session, "ASC").await?;

    let statement = Statement::builder()
        .keyword("SELECT COALESCE(CASE WHEN ")
        .ident(&first)
        .keyword(" = '' THEN NULL ELSE ")
        .ident(&first)
        .keyword(" END, CASE WHEN ")
        .ident(&second)
        .keyword(" = '' THEN NULL ELSE ")
        .ident(&second)
        .keyword(" END) FROM mysql.user WHERE user = ")
        .value(account.name.as_str())
        .keyword(" AND host = ")
        .value(account.host_or_empty())
        .build();
    let row = session.query(&statement).await?;
    Ok(row.first().and_then(|r| r.text(0)).map(|t| t.into_owned()))
}

async fn password_column(session: &mut Session<'_>, order: &'static str) -> LifecycleResult<String> {
    let statement = Statement::builder()
        .keyword(
            "SELECT COLUMN_NAME FROM information_schema.COLUMNS WHERE TABLE_SCHEMA = 'mysql' \
             AND TABLE_NAME = 'user' AND COLUMN_NAME IN ('Password', 'authentication_string') \
             ORDER BY COLUMN_NAME ",
        )
        .keyword(order)
        .keyword(" LIMIT 1")
        .build();
    let row = session.query_required(&statement).await?;
    row.text(0)
        .map(|t| t.into_owned())
        .ok_or_else(|| LifecycleError::configuration("mysql.user has no password column"))
}

/// Outcome of a password update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordUpdate {
    OldStyle,
    NewStyle,
    Forced,
}

impl PasswordUpdate {
    pub fn message(&self) -> &'static str {
        match self {
            PasswordUpdate::OldStyle => "Password updated (old style)",
            PasswordUpdate::NewStyle => "Password updated (new style)",
            PasswordUpdate::Forced => "Password forced update",
        }
    }
}

/// Set the native hash of `account`
///
/// `ALTER USER` refuses to replace an empty root password on some releases
/// (error 1396); `mysql.user` is then updated directly.
pub async fn set_native_hash(
    session: &mut Session<'_>,
    account: &Account,
    hash: &str,
) -> LifecycleResult<PasswordUpdate> {
    if session.strategy().use_old_user_management() {
        let statement = Statement::builder()
            .keyword("SET PASSWORD FOR ")
            .account(account)
            .keyword(" = ")
            .secret(hash)
            .build();
        session.mutate(statement).await?;
        return Ok(PasswordUpdate::OldStyle);
    }

    let statement = Statement::builder()
        .keyword("ALTER USER ")
        .account(account)
        .keyword(" IDENTIFIED WITH mysql_native_password AS ")
        .secret(hash)
        .build();
    match session.try_mutate(&statement).await {
        Ok(_) => Ok(PasswordUpdate::NewStyle),
        Err(error) if error.code() == Some(ER_CANNOT_USER) => {
            debug!(account = %account, "ALTER USER rejected, updating mysql.user directly");
            let update = Statement::builder()
                .keyword("UPDATE mysql.user SET plugin = ")
                .value(NATIVE_PLUGIN)
                .keyword(", authentication_string = ")
                .secret(hash)
                .keyword(", Password = '' WHERE User = ")
                .value(account.name.as_str())
                .keyword(" AND Host = ")
                .value(account.host_or_empty())
                .build();
            session.mutate(update).await?;
            session.mutate(Statement::new("FLUSH PRIVILEGES")).await?;
            info!(account = %account, "password forced through mysql.user");
            Ok(PasswordUpdate::Forced)
        }
        Err(error) => Err(error.into()),
    }
}

/// Switch `account` to `credential`
pub async fn set_plugin(
    session: &mut Session<'_>,
    account: &Account,
    credential: &PluginCredential,
) -> LifecycleResult<()> {
    let builder = Statement::builder().keyword("ALTER USER ").account(account);
    session.mutate(credential.append_to(builder).build()).await?;
    Ok(())
}

/// The single `(plugin, auth)` pair used by `name` on every host, if there is one
pub async fn existing_credential(session: &mut Session<'_>, name: &str) -> LifecycleResult<Option<PluginCredential>> {
    let statement = if session.server().is_mariadb() {
        Statement::builder()
            .keyword("SELECT plugin, auth FROM (SELECT plugin, password AS auth FROM mysql.user WHERE user = ")
            .value(name)
            .keyword(" UNION SELECT plugin, authentication_string AS auth FROM mysql.user WHERE user = ")
            .value(name)
            .keyword(") x GROUP BY plugin, auth LIMIT 2")
            .build()
    } else {
        Statement::builder()
            .keyword("SELECT plugin, authentication_string AS auth FROM mysql.user WHERE user = ")
            .value(name)
            .keyword(" GROUP BY plugin, authentication_string LIMIT 2")
            .build()
    };

    let rows = session.query(&statement).await?;
    let [row] = rows.as_slice() else {
        return Ok(None);
    };
    let plugin = row.text(0).map(|t| t.into_owned()).unwrap_or_default();
    let hash = row.text(1).map(|t| t.into_owned()).unwrap_or_default();
    Ok(Some(PluginCredential::Hash { plugin, hash }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salt_requires_caching_sha2() {
        let err = PluginCredential::from_options("mysql_native_password", None, Some("x"), Some("a".repeat(20).as_str()))
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Configuration(_)));
    }

    #[test]
    fn test_salt_length_is_checked() {
        let err = PluginCredential::from_options(CACHING_SHA2_PLUGIN, None, Some("secret"), Some("short")).unwrap_err();
        assert!(matches!(err, LifecycleError::Hash(_)));
    }

    #[test]
    fn test_salted_credential_renders_hex_literal() {
        let salt = "abcdefghijklmnopqrst";
        let credential = PluginCredential::from_options(CACHING_SHA2_PLUGIN, None, Some("secret"), Some(salt)).unwrap();
        let rendered = credential
            .append_to(Statement::builder().keyword("ALTER USER ").account(&Account::new("u", "%")))
            .build()
            .render();
        assert!(rendered.starts_with("ALTER USER 'u'@'%' IDENTIFIED WITH 'caching_sha2_password' AS X'2441243030352461"));
    }

    #[test]
    fn test_credential_comparison() {
        let stored = StoredCredential {
            plugin: "auth_socket".into(),
            auth: String::new(),
            auth_hex: String::new(),
        };
        let bare = PluginCredential::from_options("auth_socket", None, None, None).unwrap();
        assert!(!bare.differs_from(&stored));

        let hashed = PluginCredential::from_options("auth_socket", Some("x"), None, None).unwrap();
        assert!(hashed.differs_from(&stored));

        let other = PluginCredential::from_options("mysql_native_password", None, None, None).unwrap();
        assert!(other.differs_from(&stored));
    }

    #[test]
    fn test_auth_secret_is_masked() {
        let credential = PluginCredential::from_options("sha256_password", None, Some("hunter2"), None).unwrap();
        let statement = credential
            .append_to(Statement::builder().keyword("CREATE USER ").account(&Account::new("u", "%")))
            .build();
        assert_eq!(
            statement.masked(),
            "CREATE USER 'u'@'%' IDENTIFIED WITH 'sha256_password' BY '********'"
        );
    }
}
