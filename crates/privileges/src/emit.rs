// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # GRANT / REVOKE emission
//!
//! Turns a [`ReconciliationPlan`] into statements. The `GRANT` pseudo-token
//! never reaches a privilege list: it becomes `WITH GRANT OPTION` on
//! grants and a separate `REVOKE GRANT OPTION` on revokes.

use mysql_accounts_connection::{Account, SqlFragment, Statement};

use crate::codec::{base_name, is_safe_token};
use crate::error::{PrivilegeError, PrivilegeResult};
use crate::map::{GRANT_OPTION, PrivilegeSet, USAGE};
use crate::reconcile::ReconciliationPlan;
use crate::scope::Scope;
use crate::tls::TlsRequires;

/// A validated, comma-separated privilege list
///
/// Column names are written back-quoted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegeList(String);

impl PrivilegeList {
    pub fn new<'a>(tokens: impl IntoIterator<Item = &'a str>) -> PrivilegeResult<Self> {
        let mut rendered = Vec::new();
        for token in tokens {
            if !is_safe_token(token) {
                return Err(PrivilegeError::InvalidPrivilegeSpec {
                    token: token.to_string(),
                });
            }
            rendered.push(render_token(token));
        }
        Ok(PrivilegeList(rendered.join(", ")))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl SqlFragment for PrivilegeList {
    fn sql_text(&self) -> &str {
        &self.0
    }
}

fn render_token(token: &str) -> String {
    let Some((_, rest)) = token.split_once('(') else {
        return token.to_string();
    };
    let columns = rest.trim_end_matches(')');
    let quoted: Vec<String> = columns
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| format!("`{c}`"))
        .collect();
    format!("{} ({})", base_name(token), quoted.join(", "))
}

/// Statements revoking `privileges` on `scope`
///
/// Returns nothing when there is nothing to revoke. Always ends with
/// `FLUSH PRIVILEGES` otherwise.
pub fn revoke_statements(
    scope: &Scope,
    privileges: &PrivilegeSet,
    account: &Account,
) -> PrivilegeResult<Vec<Statement>> {
    let mut statements = Vec::new();

    if privileges.contains(GRANT_OPTION) {
        statements.push(
            Statement::builder()
                .keyword("REVOKE GRANT OPTION ON ")
                .fragment(scope)
                .keyword(" FROM ")
                .account(account)
                .build(),
        );
    }

    let list = PrivilegeList::new(
        privileges
            .iter()
            .map(String::as_str)
            .filter(|p| *p != GRANT_OPTION),
    )?;
    if !list.is_empty() {
        statements.push(
            Statement::builder()
                .keyword("REVOKE ")
                .fragment(&list)
                .keyword(" ON ")
                .fragment(scope)
                .keyword(" FROM ")
                .account(account)
                .build(),
        );
    }

    if !statements.is_empty() {
        statements.push(Statement::new("FLUSH PRIVILEGES"));
    }
    Ok(statements)
}

/// Statement granting `privileges` on `scope`
///
/// `requires` is only passed on servers that set TLS requirements through
/// `GRANT` rather than `ALTER USER`.
pub fn grant_statement(
    scope: &Scope,
    privileges: &PrivilegeSet,
    account: &Account,
    requires: Option<&TlsRequires>,
) -> PrivilegeResult<Statement> {
    let tokens: Vec<&str> = privileges
        .iter()
        .map(String::as_str)
        .filter(|p| *p != GRANT_OPTION)
        .collect();
    let list = if tokens.is_empty() {
        PrivilegeList::new([USAGE])?
    } else {
        PrivilegeList::new(tokens)?
    };

    let mut builder = Statement::builder()
        .keyword("GRANT ")
        .fragment(&list)
        .keyword(" ON ")
        .fragment(scope)
        .keyword(" TO ")
        .account(account);
    if let Some(requires) = requires {
        builder = requires.append_to(builder);
    }
    Ok(builder
        .when(privileges.contains(GRANT_OPTION), |b| b.keyword(" WITH GRANT OPTION"))
        .build())
}

/// All statements for a plan, scope by scope, revokes before grants
pub fn plan_statements(
    plan: &ReconciliationPlan,
    account: &Account,
    requires: Option<&TlsRequires>,
) -> PrivilegeResult<Vec<Statement>> {
    let mut statements = Vec::new();

    for scope in plan.scopes() {
        if let Some(revoke) = plan.grants_to_remove.get(scope.as_str()) {
            statements.extend(revoke_statements(scope, revoke, account)?);
        }
        if let Some(grant) = plan.grants_to_add.get(scope.as_str()) {
            statements.push(grant_statement(scope, grant, account, requires)?);
        }
    }

    Ok(statements)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(tokens: &[&str]) -> PrivilegeSet {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_grant_with_grant_option() {
        let stmt = grant_statement(
            &Scope::from_server("`db`.*"),
            &set(&["SELECT", "GRANT"]),
            &Account::new("u", "%"),
            None,
        )
        .unwrap();
        assert_eq!(stmt.render(), "GRANT SELECT ON `db`.* TO 'u'@'%' WITH GRANT OPTION");
    }

    #[test]
    fn test_grant_option_alone_grants_usage() {
        let stmt = grant_statement(
            &Scope::global(),
            &set(&["GRANT"]),
            &Account::new("u", "localhost"),
            None,
        )
        .unwrap();
        assert_eq!(stmt.render(), "GRANT USAGE ON *.* TO 'u'@'localhost' WITH GRANT OPTION");
    }

    #[test]
    fn test_wildcard_scope_is_escaped_in_template() {
        let stmt = grant_statement(
            &Scope::from_server("`app_%`.*"),
            &set(&["SELECT"]),
            &Account::new("u", "%"),
            None,
        )
        .unwrap();
        assert_eq!(stmt.template(), "GRANT SELECT ON `app_%%`.* TO %s@%s");
        assert_eq!(stmt.render(), "GRANT SELECT ON `app_%`.* TO 'u'@'%'");
    }

    #[test]
    fn test_column_list_is_quoted() {
        let stmt = grant_statement(
            &Scope::from_server("`db`.`t`"),
            &set(&["SELECT (a, b)", "INSERT"]),
            &Account::new("u", "%"),
            None,
        )
        .unwrap();
        assert_eq!(
            stmt.render(),
            "GRANT INSERT, SELECT (`a`, `b`) ON `db`.`t` TO 'u'@'%'"
        );
    }

    #[test]
    fn test_revoke_grant_option_first() {
        let stmts = revoke_statements(
            &Scope::global(),
            &set(&["GRANT", "SELECT"]),
            &Account::hostless("role1"),
        )
        .unwrap();
        let rendered: Vec<String> = stmts.iter().map(Statement::render).collect();
        assert_eq!(
            rendered,
            vec![
                "REVOKE GRANT OPTION ON *.* FROM 'role1'",
                "REVOKE SELECT ON *.* FROM 'role1'",
                "FLUSH PRIVILEGES",
            ]
        );
    }

    #[test]
    fn test_revoke_only_grant_option_skips_empty_list() {
        let stmts = revoke_statements(&Scope::global(), &set(&["GRANT"]), &Account::new("u", "%"))
            .unwrap();
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn test_unsafe_token_rejected() {
        let err = PrivilegeList::new(["SELECT; DROP USER root"]).unwrap_err();
        assert!(matches!(err, PrivilegeError::InvalidPrivilegeSpec { .. }));
    }

    #[test]
    fn test_old_user_management_grant_carries_require() {
        let stmt = grant_statement(
            &Scope::global(),
            &set(&["SELECT"]),
            &Account::new("u", "%"),
            Some(&TlsRequires::Ssl),
        )
        .unwrap();
        assert_eq!(stmt.render(), "GRANT SELECT ON *.* TO 'u'@'%' REQUIRE SSL");
    }
}
