// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # User lifecycle
//!
//! [`ensure_user_present`] creates a missing account or reconciles an
//! existing one in this order: password, plugin, privileges, TLS
//! requirements and finally resource limits. In dry-run mode it returns as
//! soon as the first difference is found.
//!
//! [`ensure_user_absent`] drops the account, on every host when
//! `host_all` is set.

use std::collections::BTreeMap;

use mysql_accounts_connection::{Account, Statement};
use mysql_accounts_privileges::{Policy, PrivilegeMap, TlsRequires, append_require, strip_requiressl};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{LifecycleError, LifecycleResult};
use crate::grants::{desired_privileges, grant_all, reconcile_privileges};
use crate::limits::{LimitValue, reconcile_limits};
use crate::outcome::Outcome;
use crate::password::{
    PluginCredential, current_hash, existing_credential, native_hash, set_native_hash, set_plugin,
    stored_credential,
};
use crate::session::Session;
use crate::tls::{reconcile_requires, require_statement};

fn default_host() -> String {
    "localhost".to_string()
}

fn default_true() -> bool {
    true
}

/// When the password of an existing user is reconciled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePassword {
    #[default]
    Always,
    OnCreate,
}

/// Desired state of a user account
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserSpec {
    pub name: String,

    #[serde(default = "default_host")]
    pub host: String,

    /// Apply to every host the user exists on
    #[serde(default)]
    pub host_all: bool,

    #[serde(default)]
    pub password: Option<String>,

    /// `password` is already a native hash
    #[serde(default)]
    pub encrypted: bool,

    #[serde(default)]
    pub update_password: UpdatePassword,

    #[serde(default)]
    pub plugin: Option<String>,

    #[serde(default)]
    pub plugin_hash_string: Option<String>,

    #[serde(default)]
    pub plugin_auth_string: Option<String>,

    /// 20-byte salt for a locally computed `caching_sha2_password` digest
    #[serde(default)]
    pub salt: Option<String>,

    /// Compact privilege string, `db.table:PRIV,PRIV/...`
    #[serde(default, alias = "priv")]
    pub privileges: Option<String>,

    #[serde(default)]
    pub policy: Policy,

    /// `SSL`, `X509` or `CIPHER` / `ISSUER` / `SUBJECT` values; an empty
    /// map removes any requirement
    #[serde(default)]
    pub tls_requires: Option<BTreeMap<String, Option<String>>>,

    #[serde(default)]
    pub resource_limits: BTreeMap<String, LimitValue>,

    /// On creation, reuse the credential the user has on its other hosts
    #[serde(default)]
    pub reuse_existing_password: bool,

    /// `false` keeps the changes out of the binary log
    #[serde(default = "default_true")]
    pub sql_log_bin: bool,
}

impl UserSpec {
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            host_all: false,
            password: None,
            encrypted: false,
            update_password: UpdatePassword::Always,
            plugin: None,
            plugin_hash_string: None,
            plugin_auth_string: None,
            salt: None,
            privileges: None,
            policy: Policy::Replace,
            tls_requires: None,
            resource_limits: BTreeMap::new(),
            reuse_existing_password: false,
            sql_log_bin: true,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_privileges(mut self, privileges: impl Into<String>, policy: Policy) -> Self {
        self.privileges = Some(privileges.into());
        self.policy = policy;
        self
    }

    pub fn account(&self) -> Account {
        Account::new(self.name.as_str(), self.host.as_str())
    }

    fn plugin_credential(&self) -> LifecycleResult<Option<PluginCredential>> {
        let Some(plugin) = &self.plugin else {
            return Ok(None);
        };
        PluginCredential::from_options(
            plugin,
            self.plugin_hash_string.as_deref(),
            self.plugin_auth_string.as_deref(),
            self.salt.as_deref(),
        )
        .map(Some)
    }
}

/// Privileges and TLS requirements after `REQUIRESSL` handling
struct Requested {
    privileges: Option<PrivilegeMap>,
    /// `None`: leave TLS alone; `Some(None)`: no requirement
    requires: Option<Option<TlsRequires>>,
    warnings: Vec<String>,
}

async fn requested(session: &mut Session<'_>, spec: &UserSpec) -> LifecycleResult<Requested> {
    let mut warnings = Vec::new();
    let mut requires = match &spec.tls_requires {
        Some(map) => Some(TlsRequires::from_map(map.iter().map(|(k, v)| (k.as_str(), v.clone())))?),
        None => None,
    };

    let mut privileges = None;
    if let Some(text) = &spec.privileges {
        let (remaining, requiressl) = strip_requiressl(text);
        if requiressl {
            let message = "The \"REQUIRESSL\" privilege is deprecated, use the \"tls_requires\" option instead.";
            warn!("{}", message);
            warnings.push(message.to_string());
            if requires.is_none() {
                requires = Some(Some(TlsRequires::Ssl));
            }
        }
        if let Some(remaining) = remaining {
            privileges = Some(desired_privileges(session, &remaining, spec.policy).await?);
        }
    }

    Ok(Requested {
        privileges,
        requires,
        warnings,
    })
}

async fn user_exists(session: &mut Session<'_>, spec: &UserSpec) -> LifecycleResult<bool> {
    let statement = Statement::builder()
        .keyword("SELECT count(*) FROM mysql.user WHERE user = ")
        .value(spec.name.as_str())
        .when(!spec.host_all, |b| b.keyword(" AND host = ").value(spec.host.as_str()))
        .build();
    Ok(session.count(&statement).await? > 0)
}

async fn hostnames(session: &mut Session<'_>, spec: &UserSpec) -> LifecycleResult<Vec<String>> {
    if !spec.host_all {
        return Ok(vec![spec.host.clone()]);
    }
    let statement = Statement::builder()
        .keyword("SELECT Host FROM mysql.user WHERE user = ")
        .value(spec.name.as_str())
        .build();
    let rows = session.query(&statement).await?;
    Ok(rows
        .iter()
        .filter_map(|row| row.text(0).map(|t| t.into_owned()))
        .collect())
}

/// Create or reconcile a user
pub async fn ensure_user_present(session: &mut Session<'_>, spec: &UserSpec) -> LifecycleResult<Outcome> {
    session.begin();
    match user_present(session, spec).await {
        Ok(outcome) => Ok(session.finish(outcome)),
        Err(error) => Err(session.failure(error)),
    }
}

/// Drop a user if it exists
pub async fn ensure_user_absent(session: &mut Session<'_>, spec: &UserSpec) -> LifecycleResult<Outcome> {
    session.begin();
    match user_absent(session, spec).await {
        Ok(outcome) => Ok(session.finish(outcome)),
        Err(error) => Err(session.failure(error)),
    }
}

async fn user_present(session: &mut Session<'_>, spec: &UserSpec) -> LifecycleResult<Outcome> {
    if !spec.sql_log_bin {
        session.set(&Statement::new("SET SQL_LOG_BIN=0")).await?;
    }

    let requested = requested(session, spec).await?;

    let outcome = if user_exists(session, spec).await? {
        modify_user(session, spec, &requested).await?
    } else {
        add_user(session, spec, &requested).await?
    };
    let mut outcome = outcome.with_warnings(requested.warnings);

    if !spec.resource_limits.is_empty() && reconcile_limits(session, &spec.account(), &spec.resource_limits).await? {
        outcome.changed = true;
        if outcome.msg == "User unchanged" {
            outcome.msg = "Resource limits updated".to_string();
        }
    }

    Ok(outcome)
}

async fn add_user(session: &mut Session<'_>, spec: &UserSpec, requested: &Requested) -> LifecycleResult<Outcome> {
    if spec.host_all {
        return Err(LifecycleError::configuration(
            "host_all parameter cannot be used when adding a user",
        ));
    }
    let plugin = spec.plugin_credential()?;
    if session.dry_run() {
        return Ok(Outcome::changed("User added").with_password_changed(None));
    }

    let account = spec.account();
    let old_user_management = session.strategy().use_old_user_management();

    let mut plugin = plugin;
    let mut password = spec.password.as_deref();
    let mut reused = false;
    if spec.reuse_existing_password
        && let Some(existing) = existing_credential(session, &spec.name).await?
    {
        plugin = Some(existing);
        password = None;
        reused = true;
    }

    let create = Statement::builder().keyword("CREATE USER ").account(&account);
    let create = match (password, &plugin) {
        (Some(password), _) if spec.encrypted => {
            let hash = native_hash(session, password, true).await?;
            if session.strategy().supports_identified_by_password() {
                create.keyword(" IDENTIFIED BY PASSWORD ").secret(hash)
            } else {
                create.keyword(" IDENTIFIED WITH mysql_native_password AS ").secret(hash)
            }
        }
        (Some(password), _) if old_user_management => create.keyword(" IDENTIFIED BY ").secret(password),
        (Some(password), _) => {
            let hash = native_hash(session, password, false).await?;
            create.keyword(" IDENTIFIED WITH mysql_native_password AS ").secret(hash)
        }
        (None, Some(credential)) => credential.append_to(create),
        (None, None) => create,
    };

    let requires = requested.requires.as_ref().and_then(Option::as_ref);
    let create = match requires {
        Some(requires) if !old_user_management => append_require(create, Some(requires)),
        _ => create,
    };
    session.mutate(create.build()).await?;
    info!(account = %account, "user created");

    let grant_requires = if old_user_management { requires } else { None };
    if let Some(privileges) = &requested.privileges {
        grant_all(session, &account, privileges, grant_requires).await?;
    }
    if old_user_management && requires.is_some() {
        let statement = require_statement(session, &account, requires).await?;
        session.mutate(statement).await?;
    }

    Ok(Outcome::changed("User added").with_password_changed(Some(!reused)))
}

async fn modify_user(session: &mut Session<'_>, spec: &UserSpec, requested: &Requested) -> LifecycleResult<Outcome> {
    let plugin = spec.plugin_credential()?;
    let password = match spec.update_password {
        UpdatePassword::Always => spec.password.as_deref(),
        UpdatePassword::OnCreate => None,
    };
    let requires = requested.requires.as_ref().map(Option::as_ref);
    let grant_requires = if session.strategy().use_old_user_management() {
        requires.flatten()
    } else {
        None
    };

    let mut changed = false;
    let mut password_changed = false;
    let mut msg = "User unchanged".to_string();

    for host in hostnames(session, spec).await? {
        let account = Account::new(spec.name.as_str(), host);

        if let Some(password) = password {
            let current = current_hash(session, &account).await?;
            let desired = native_hash(session, password, spec.encrypted).await?;
            if current.as_deref() != Some(desired.as_str()) {
                password_changed = true;
                if session.dry_run() {
                    return Ok(Outcome::changed("Password updated").with_password_changed(Some(true)));
                }
                let update = set_native_hash(session, &account, &desired).await?;
                msg = update.message().to_string();
                changed = true;
            }
        }

        if let Some(credential) = &plugin {
            let stored = stored_credential(session, &account).await?;
            if credential.differs_from(&stored) {
                password_changed = true;
                if session.dry_run() {
                    return Ok(Outcome::changed("Plugin updated").with_password_changed(Some(true)));
                }
                set_plugin(session, &account, credential).await?;
                msg = "Plugin updated".to_string();
                changed = true;
            }
        }

        if let Some(privileges) = &requested.privileges {
            let change = reconcile_privileges(session, &account, privileges, spec.policy, grant_requires).await?;
            if change.changed {
                if session.dry_run() {
                    return Ok(Outcome::changed(change.msg).with_password_changed(Some(password_changed)));
                }
                msg = change.msg;
                changed = true;
            }
        }

        if let Some(requires) = requires
            && reconcile_requires(session, &account, requires).await?
        {
            if session.dry_run() {
                return Ok(Outcome::changed("TLS requires updated").with_password_changed(Some(password_changed)));
            }
            msg = "TLS requires updated".to_string();
            changed = true;
        }
    }

    let outcome = if changed {
        Outcome::changed(msg)
    } else {
        Outcome::unchanged(msg)
    };
    Ok(outcome.with_password_changed(Some(password_changed)))
}

async fn user_absent(session: &mut Session<'_>, spec: &UserSpec) -> LifecycleResult<Outcome> {
    if !spec.sql_log_bin {
        session.set(&Statement::new("SET SQL_LOG_BIN=0")).await?;
    }
    if !user_exists(session, spec).await? {
        return Ok(Outcome::unchanged("User doesn't exist"));
    }
    if session.dry_run() {
        return Ok(Outcome::changed("User deleted"));
    }

    for host in hostnames(session, spec).await? {
        let account = Account::new(spec.name.as_str(), host);
        let statement = Statement::builder()
            .keyword("DROP USER IF EXISTS ")
            .account(&account)
            .build();
        if session.try_mutate(&statement).await.is_err() {
            let statement = Statement::builder().keyword("DROP USER ").account(&account).build();
            session.mutate(statement).await?;
        }
        info!(account = %account, "user dropped");
    }

    Ok(Outcome::changed("User deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_defaults_from_yaml() {
        let spec: UserSpec = serde_yaml::from_str("name: app\npriv: 'db.*:SELECT'\n").unwrap();
        assert_eq!(spec.host, "localhost");
        assert_eq!(spec.privileges.as_deref(), Some("db.*:SELECT"));
        assert_eq!(spec.policy, Policy::Replace);
        assert_eq!(spec.update_password, UpdatePassword::Always);
        assert!(spec.sql_log_bin);
    }

    #[test]
    fn test_spec_policy_and_limits_from_yaml() {
        let yaml = "name: app\nhost: '%'\npolicy: append\nupdate_password: on_create\n\
                    resource_limits:\n  MAX_USER_CONNECTIONS: 5\n  MAX_QUERIES_PER_HOUR: '10'\n";
        let spec: UserSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.policy, Policy::Append);
        assert_eq!(spec.update_password, UpdatePassword::OnCreate);
        assert_eq!(spec.resource_limits["MAX_USER_CONNECTIONS"], LimitValue::Int(5));
        assert_eq!(spec.resource_limits["MAX_QUERIES_PER_HOUR"], LimitValue::Text("10".into()));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let parsed: Result<UserSpec, _> = serde_yaml::from_str("name: app\npasswrd: x\n");
        assert!(parsed.is_err());
    }
}
