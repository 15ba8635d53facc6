// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Privilege reconciliation against a live account

use mysql_accounts_connection::{Account, Statement};
use mysql_accounts_privileges::{
    Policy, PrivilegeMap, Reconciler, TlsRequires, decode, grant_statement, parse_grants,
    plan_statements,
};
use tracing::{debug, info};

use crate::error::LifecycleResult;
use crate::session::Session;

/// Result of reconciling one account's privileges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegeChange {
    pub changed: bool,
    pub msg: String,
}

/// Decode a privilege string with the server's quoting
///
/// `USAGE` on `*.*` is only implied when the policy can grant.
pub async fn desired_privileges(
    session: &mut Session<'_>,
    spec: &str,
    policy: Policy,
) -> LifecycleResult<PrivilegeMap> {
    let options = session.decode_options(policy != Policy::Subtract).await?;
    Ok(decode(spec, &options)?)
}

/// Current privileges of `account`, from `SHOW GRANTS`
pub async fn current_privileges(session: &mut Session<'_>, account: &Account) -> LifecycleResult<PrivilegeMap> {
    let statement = Statement::builder()
        .keyword("SHOW GRANTS FOR ")
        .account(account)
        .build();
    let rows = session.query(&statement).await?;
    let lines: Vec<String> = rows
        .iter()
        .filter_map(|row| row.text(0).map(|text| text.into_owned()))
        .collect();
    Ok(parse_grants(&lines)?)
}

/// Grant every scope of `privileges` to a freshly created account
pub async fn grant_all(
    session: &mut Session<'_>,
    account: &Account,
    privileges: &PrivilegeMap,
    requires: Option<&TlsRequires>,
) -> LifecycleResult<()> {
    for (scope, set) in privileges.iter() {
        let statement = grant_statement(scope, set, account, requires)?;
        session.mutate(statement).await?;
    }
    Ok(())
}

/// Bring `account` to `desired` under `policy`
///
/// `requires` is attached to grants on servers that set TLS requirements
/// through `GRANT`. In dry-run mode the plan is computed and reported but
/// nothing is sent.
pub async fn reconcile_privileges(
    session: &mut Session<'_>,
    account: &Account,
    desired: &PrivilegeMap,
    policy: Policy,
    requires: Option<&TlsRequires>,
) -> LifecycleResult<PrivilegeChange> {
    let before = current_privileges(session, account).await?;
    let reconciler = Reconciler::for_account(policy, &account.name, &session.options().protected_accounts);
    let plan = reconciler.reconcile(&before, desired);
    let msg = plan.summary();

    if !plan.changed {
        return Ok(PrivilegeChange { changed: false, msg });
    }
    if session.dry_run() {
        return Ok(PrivilegeChange { changed: true, msg });
    }

    for statement in plan_statements(&plan, account, requires)? {
        session.mutate(statement).await?;
    }

    let after = current_privileges(session, account).await?;
    if after != before {
        info!(account = %account, "{}", msg);
    } else {
        debug!(account = %account, "privileges unchanged after applying plan");
    }

    Ok(PrivilegeChange {
        changed: plan.changed || after != before,
        msg,
    })
}
