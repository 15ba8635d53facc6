// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! TLS requirements of an existing account

use std::collections::BTreeSet;

use mysql_accounts_connection::{Account, Statement};
use mysql_accounts_dialect::TlsRequiresSource;
use mysql_accounts_privileges::{PrivilegeList, TlsRequires, USAGE, append_require, parse_require_clause};

use crate::error::LifecycleResult;
use crate::grants::current_privileges;
use crate::session::Session;

/// Current requirement of `account`, `None` for `REQUIRE NONE`
pub async fn current_requires(session: &mut Session<'_>, account: &Account) -> LifecycleResult<Option<TlsRequires>> {
    let statement = match session.strategy().tls_requires_source() {
        TlsRequiresSource::ShowCreateUser => Statement::builder().keyword("SHOW CREATE USER "),
        TlsRequiresSource::ShowGrants => Statement::builder().keyword("SHOW GRANTS FOR "),
    }
    .account(account)
    .build();

    let rows = session.query(&statement).await?;
    let line = if session.strategy().scans_all_rows_for_requires() {
        rows.iter()
            .filter_map(|row| row.text(0))
            .find(|text| text.contains("REQUIRE"))
            .map(|text| text.into_owned())
    } else {
        rows.first().map(|row| row.joined_text())
    };

    Ok(line.and_then(|line| parse_require_clause(&line)))
}

/// Statement setting `desired` on `account`
///
/// Old user management has no `ALTER USER`, so the requirement rides on a
/// re-grant of the account's global privileges.
pub async fn require_statement(
    session: &mut Session<'_>,
    account: &Account,
    desired: Option<&TlsRequires>,
) -> LifecycleResult<Statement> {
    let builder = if session.strategy().use_old_user_management() {
        let current = current_privileges(session, account).await?;
        let mut global: BTreeSet<&str> = current.global_privileges().into_iter().collect();
        if global.is_empty() {
            global.insert(USAGE);
        }
        let list = PrivilegeList::new(global)?;
        Statement::builder()
            .keyword("GRANT ")
            .fragment(&list)
            .keyword(" ON *.* TO ")
            .account(account)
    } else {
        Statement::builder().keyword("ALTER USER ").account(account)
    };

    Ok(append_require(builder, desired).build())
}

/// Bring the requirement of `account` to `desired`
///
/// Returns whether the requirement differed.
pub async fn reconcile_requires(
    session: &mut Session<'_>,
    account: &Account,
    desired: Option<&TlsRequires>,
) -> LifecycleResult<bool> {
    let current = current_requires(session, account).await?;
    if current.as_ref() == desired {
        return Ok(false);
    }
    if session.dry_run() {
        return Ok(true);
    }

    let statement = require_statement(session, account, desired).await?;
    session.mutate(statement).await?;
    Ok(true)
}
