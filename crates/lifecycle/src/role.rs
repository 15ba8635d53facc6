// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Role lifecycle
//!
//! Roles are accounts on MySQL (`'role'@'%'`) and hostless entries on
//! MariaDB. Membership is read back from `SHOW GRANTS` of every account,
//! since neither server offers a portable membership view.

use std::collections::BTreeSet;

use mysql_accounts_connection::{Account, Statement};
use mysql_accounts_privileges::{Policy, PrivilegeMap};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{LifecycleError, LifecycleResult};
use crate::grants::{desired_privileges, grant_all, reconcile_privileges};
use crate::outcome::Outcome;
use crate::session::Session;

/// How requested members relate to current ones
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberPolicy {
    /// Requested members become the only members
    #[default]
    Replace,
    /// Add requested members, keep the others
    Append,
    /// Remove requested members
    Detach,
}

/// Desired state of a role
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleSpec {
    pub name: String,

    /// `user` or `user@host`
    #[serde(default)]
    pub members: Vec<String>,

    #[serde(default)]
    pub member_policy: MemberPolicy,

    #[serde(default, alias = "priv")]
    pub privileges: Option<String>,

    #[serde(default)]
    pub policy: Policy,

    /// Role administrator (MariaDB only), `user` or `user@host`
    #[serde(default)]
    pub admin: Option<String>,

    /// Overrides the session-wide `set_default_role_all`
    #[serde(default)]
    pub set_default_role_all: Option<bool>,
}

impl RoleSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            member_policy: MemberPolicy::Replace,
            privileges: None,
            policy: Policy::Replace,
            admin: None,
            set_default_role_all: None,
        }
    }

    pub fn with_members<I, S>(mut self, members: I, policy: MemberPolicy) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.members = members.into_iter().map(Into::into).collect();
        self.member_policy = policy;
        self
    }

    pub fn with_privileges(mut self, privileges: impl Into<String>, policy: Policy) -> Self {
        self.privileges = Some(privileges.into());
        self.policy = policy;
        self
    }

    pub fn with_admin(mut self, admin: impl Into<String>) -> Self {
        self.admin = Some(admin.into());
        self
    }
}

/// Split `user@host`; a missing host becomes `default_host`, an empty one hostless
pub fn parse_member(text: &str, default_host: &str) -> LifecycleResult<Account> {
    let (name, host) = match text.split_once('@') {
        Some((name, host)) => (name, Some(host)),
        None => (text, None),
    };
    if name.is_empty() {
        return Err(LifecycleError::configuration("Member's name cannot be empty."));
    }
    if host.is_some_and(|h| h.contains('@')) {
        return Err(LifecycleError::configuration(format!(
            "Error occured while parsing the name \"{text}\". It must be in the format \"username\" or \"username@hostname\""
        )));
    }
    Ok(match host.unwrap_or(default_host) {
        "" => Account::hostless(name),
        host => Account::new(name, host),
    })
}

fn role_account(session: &Session<'_>, name: &str) -> Account {
    if session.strategy().hostless_roles() {
        Account::hostless(name)
    } else {
        Account::new(name, "%")
    }
}

/// How the role shows up in a member's `SHOW GRANTS` output
fn membership_token(role: &Account) -> String {
    match &role.host {
        Some(host) => format!("`{}`@`{}`", role.name, host),
        None => format!("`{}`", role.name),
    }
}

fn same_account(a: &Account, b: &Account) -> bool {
    a.name == b.name && a.host_or_empty() == b.host_or_empty()
}

/// Every `(User, Host)` pair of `mysql.user`
async fn all_accounts(session: &mut Session<'_>) -> LifecycleResult<Vec<Account>> {
    let rows = session.query(&Statement::new("SELECT User, Host FROM mysql.user")).await?;
    Ok(rows
        .iter()
        .map(|row| {
            let name = row.text(0).map(|t| t.into_owned()).unwrap_or_default();
            match row.text(1).filter(|h| !h.is_empty()) {
                Some(host) => Account::new(name, host.into_owned()),
                None => Account::hostless(name),
            }
        })
        .collect())
}

fn check_exist(accounts: &[Account], wanted: &[Account]) -> LifecycleResult<()> {
    for account in wanted {
        if !accounts.iter().any(|a| same_account(a, account)) {
            return Err(LifecycleError::configuration(format!(
                "User / role `{}` with host `{}` does not exist",
                account.name,
                account.host_or_empty()
            )));
        }
    }
    Ok(())
}

async fn role_exists(session: &mut Session<'_>, role: &Account) -> LifecycleResult<bool> {
    let statement = match &role.host {
        Some(host) => Statement::builder()
            .keyword("SELECT count(*) FROM mysql.user WHERE user = ")
            .value(role.name.as_str())
            .keyword(" AND host = ")
            .value(host.as_str())
            .build(),
        None => Statement::builder()
            .keyword("SELECT count(*) FROM mysql.user WHERE user = ")
            .value(role.name.as_str())
            .keyword(" AND is_role = 'Y'")
            .build(),
    };
    Ok(session.count(&statement).await? > 0)
}

/// Accounts holding `role`, found by scanning their grants
async fn current_members(
    session: &mut Session<'_>,
    role: &Account,
    accounts: &[Account],
) -> LifecycleResult<BTreeSet<Account>> {
    let token = membership_token(role);
    let mut members = BTreeSet::new();

    for account in accounts {
        if same_account(account, role) {
            continue;
        }
        let statement = Statement::builder()
            .keyword("SHOW GRANTS FOR ")
            .account(account)
            .build();
        let rows = session.query(&statement).await?;
        let is_member = rows
            .iter()
            .filter_map(|row| row.text(0))
            .any(|line| line.contains(&token) && !line.contains(" ON "));
        if is_member {
            members.insert(account.clone());
        }
    }

    Ok(members)
}

struct RoleRequest {
    role: Account,
    members: Vec<Account>,
    admin: Option<Account>,
    privileges: Option<PrivilegeMap>,
    set_default_role_all: bool,
}

async fn prepare(session: &mut Session<'_>, spec: &RoleSpec) -> LifecycleResult<RoleRequest> {
    if !session.strategy().supports_roles() {
        return Err(session.unsupported("roles"));
    }

    let admin = match &spec.admin {
        Some(_) if !session.strategy().supports_role_admin() => {
            return Err(LifecycleError::configuration(
                "The \"admin\" option can be used only with MariaDB.",
            ));
        }
        Some(_) if spec.member_policy != MemberPolicy::Replace => {
            return Err(LifecycleError::configuration(
                "The \"admin\" option cannot be combined with appending or detaching members.",
            ));
        }
        Some(admin) => Some(parse_member(admin, "%")?),
        None => None,
    };

    let default_host = session.strategy().default_member_host();
    let members = spec
        .members
        .iter()
        .map(|member| parse_member(member, default_host))
        .collect::<LifecycleResult<Vec<_>>>()?;

    if admin.is_some() || !members.is_empty() {
        let accounts = all_accounts(session).await?;
        check_exist(&accounts, admin.as_slice())?;
        check_exist(&accounts, &members)?;
    }

    let privileges = match &spec.privileges {
        Some(text) => Some(desired_privileges(session, text, spec.policy).await?),
        None => None,
    };

    let set_default_role_all = session.strategy().supports_set_default_role_all()
        && spec
            .set_default_role_all
            .unwrap_or(session.options().set_default_role_all);

    Ok(RoleRequest {
        role: role_account(session, &spec.name),
        members,
        admin,
        privileges,
        set_default_role_all,
    })
}

/// Create or reconcile a role
pub async fn ensure_role_present(session: &mut Session<'_>, spec: &RoleSpec) -> LifecycleResult<Outcome> {
    session.begin();
    match role_present(session, spec).await {
        Ok(outcome) => Ok(session.finish(outcome)),
        Err(error) => Err(session.failure(error)),
    }
}

/// Drop a role if it exists
pub async fn ensure_role_absent(session: &mut Session<'_>, spec: &RoleSpec) -> LifecycleResult<Outcome> {
    session.begin();
    match role_absent(session, spec).await {
        Ok(outcome) => Ok(session.finish(outcome)),
        Err(error) => Err(session.failure(error)),
    }
}

async fn role_present(session: &mut Session<'_>, spec: &RoleSpec) -> LifecycleResult<Outcome> {
    let request = prepare(session, spec).await?;
    if role_exists(session, &request.role).await? {
        update_role(session, spec, &request).await
    } else {
        create_role(session, &request).await
    }
}

async fn add_member(session: &mut Session<'_>, request: &RoleRequest, member: &Account) -> LifecycleResult<()> {
    let grant = Statement::builder()
        .keyword("GRANT ")
        .account(&request.role)
        .keyword(" TO ")
        .account(member)
        .build();
    session.mutate(grant).await?;

    if request.set_default_role_all {
        let statement = Statement::builder()
            .keyword("SET DEFAULT ROLE ALL TO ")
            .account(member)
            .build();
        session.mutate(statement).await?;
    }
    Ok(())
}

async fn remove_member(session: &mut Session<'_>, role: &Account, member: &Account) -> LifecycleResult<()> {
    let revoke = Statement::builder()
        .keyword("REVOKE ")
        .account(role)
        .keyword(" FROM ")
        .account(member)
        .build();
    session.mutate(revoke).await?;
    Ok(())
}

async fn create_role(session: &mut Session<'_>, request: &RoleRequest) -> LifecycleResult<Outcome> {
    if session.dry_run() {
        return Ok(Outcome::changed("Role added"));
    }

    let create = Statement::builder().keyword("CREATE ROLE ").account(&request.role);
    let create = match &request.admin {
        Some(admin) => create.keyword(" WITH ADMIN ").account(admin),
        None => create,
    };
    session.mutate(create.build()).await?;
    info!(role = %request.role, "role created");

    for member in &request.members {
        add_member(session, request, member).await?;
    }
    if let Some(privileges) = &request.privileges {
        grant_all(session, &request.role, privileges, None).await?;
    }

    Ok(Outcome::changed("Role added"))
}

async fn update_role(session: &mut Session<'_>, spec: &RoleSpec, request: &RoleRequest) -> LifecycleResult<Outcome> {
    let mut changed = false;
    let mut warnings = Vec::new();

    if !request.members.is_empty() {
        let accounts = all_accounts(session).await?;
        let current = current_members(session, &request.role, &accounts).await?;
        let root = Account::new("root", "localhost");

        let (to_add, to_remove): (Vec<&Account>, Vec<&Account>) = match spec.member_policy {
            MemberPolicy::Detach => (
                Vec::new(),
                current
                    .iter()
                    .filter(|m| request.members.iter().any(|r| same_account(r, m)))
                    .collect(),
            ),
            policy => (
                request
                    .members
                    .iter()
                    .filter(|r| !current.iter().any(|m| same_account(r, m)))
                    .collect(),
                if policy == MemberPolicy::Replace {
                    current
                        .iter()
                        .filter(|m| !request.members.iter().any(|r| same_account(r, m)))
                        .filter(|m| !same_account(m, &root))
                        .collect()
                } else {
                    Vec::new()
                },
            ),
        };

        if !to_add.is_empty() || !to_remove.is_empty() {
            if session.dry_run() {
                return Ok(Outcome::changed("Role members updated"));
            }
            for member in to_add {
                add_member(session, request, member).await?;
            }
            for member in to_remove {
                remove_member(session, &request.role, member).await?;
            }
            changed = true;
        }
    }

    if let Some(privileges) = &request.privileges {
        let change = reconcile_privileges(session, &request.role, privileges, spec.policy, None).await?;
        if change.changed {
            if session.dry_run() {
                return Ok(Outcome::changed(change.msg));
            }
            changed = true;
        }
    }

    if let Some(admin) = &request.admin
        && let Some(message) = admin_mismatch(session, &request.role, admin).await?
    {
        warn!(role = %request.role, "{}", message);
        warnings.push(message);
    }

    let outcome = if changed {
        Outcome::changed("Role updated")
    } else {
        Outcome::unchanged("Role unchanged")
    };
    Ok(outcome.with_warnings(warnings))
}

/// Warning when the role's current admin differs from `admin`
///
/// An admin can only be set at creation, so a mismatch is reported and
/// otherwise left alone.
async fn admin_mismatch(
    session: &mut Session<'_>,
    role: &Account,
    admin: &Account,
) -> LifecycleResult<Option<String>> {
    let statement = Statement::builder()
        .keyword("SELECT User, Host FROM mysql.roles_mapping WHERE Role = ")
        .value(role.name.as_str())
        .keyword(" AND Admin_option = 'Y'")
        .build();
    let rows = session.query(&statement).await?;
    let current = rows.first().map(|row| {
        (
            row.text(0).map(|t| t.into_owned()).unwrap_or_default(),
            row.text(1).map(|t| t.into_owned()).unwrap_or_default(),
        )
    });

    match current {
        Some((name, host)) if name == admin.name && host == admin.host_or_empty() => Ok(None),
        Some((name, host)) => Ok(Some(format!(
            "The \"admin\" option value and the current role's admin ({name}@{host}) do not match. \
             Ignored. To change the admin, you need to drop and create the role again."
        ))),
        None => Ok(Some(
            "The role has no admin and one cannot be added to an existing role. Ignored.".to_string(),
        )),
    }
}

async fn role_absent(session: &mut Session<'_>, spec: &RoleSpec) -> LifecycleResult<Outcome> {
    if !session.strategy().supports_roles() {
        return Err(session.unsupported("roles"));
    }
    let role = role_account(session, &spec.name);
    if !role_exists(session, &role).await? {
        return Ok(Outcome::unchanged("Role doesn't exist"));
    }
    if session.dry_run() {
        return Ok(Outcome::changed("Role deleted"));
    }

    let statement = Statement::builder().keyword("DROP ROLE ").account(&role).build();
    session.mutate(statement).await?;
    info!(role = %role, "role dropped");
    Ok(Outcome::changed("Role deleted"))
}
