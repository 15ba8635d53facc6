// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Privilege reconciliation
//!
//! Pure comparison of current and desired privilege maps. The result is a
//! [`ReconciliationPlan`]; turning it into statements is [`crate::emit`]'s
//! job.
//!
//! ## Policies
//!
//! | Policy | Grants | Revokes |
//! |---|---|---|
//! | [`Policy::Replace`] | `desired - current` | `current - desired` |
//! | [`Policy::Append`] | `desired - current` | never |
//! | [`Policy::Subtract`] | never | `desired ∩ current` |
//!
//! Under `Replace`, a scope held now but missing from the desired map is
//! revoked wholesale, except for protected accounts and scopes that carry
//! `PROXY`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::map::{GRANT_OPTION, PrivilegeMap, PrivilegeSet, USAGE};
use crate::scope::Scope;

const ALL: &str = "ALL";
const PROXY: &str = "PROXY";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Make the account hold exactly the desired privileges
    #[default]
    Replace,
    /// Only grant what is missing
    Append,
    /// Only revoke what is requested and held
    Subtract,
}

/// Grants and revokes needed to move from current to desired
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationPlan {
    pub grants_to_add: PrivilegeMap,
    pub grants_to_remove: PrivilegeMap,
    pub changed: bool,
}

impl ReconciliationPlan {
    /// Scopes touched by the plan, in order
    pub fn scopes(&self) -> BTreeSet<&Scope> {
        self.grants_to_add
            .scopes()
            .chain(self.grants_to_remove.scopes())
            .collect()
    }

    /// Human-readable summary of the plan
    pub fn summary(&self) -> String {
        if !self.changed {
            return "Privileges unchanged".to_string();
        }
        format!(
            "Privileges updated: granted {}, revoked {}",
            crate::codec::encode(&self.grants_to_add),
            crate::codec::encode(&self.grants_to_remove)
        )
    }
}

/// Compares privilege maps for one account
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    policy: Policy,
    protected: bool,
}

impl Reconciler {
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            protected: false,
        }
    }

    /// Protected accounts never lose whole scopes under [`Policy::Replace`]
    pub fn protected(mut self, protected: bool) -> Self {
        self.protected = protected;
        self
    }

    /// Reconciler for `name`, protected when it appears in `protected_accounts`
    pub fn for_account<S: AsRef<str>>(policy: Policy, name: &str, protected_accounts: &[S]) -> Self {
        let protected = protected_accounts.iter().any(|p| p.as_ref() == name);
        Self::new(policy).protected(protected)
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn reconcile(&self, current: &PrivilegeMap, desired: &PrivilegeMap) -> ReconciliationPlan {
        let mut plan = ReconciliationPlan::default();

        if self.policy == Policy::Replace {
            for (scope, held) in current.iter() {
                if desired.contains_scope(scope.as_str()) {
                    continue;
                }
                if self.protected || held.contains(PROXY) {
                    trace!(scope = %scope, "Keeping scope absent from desired privileges");
                    continue;
                }
                plan.grants_to_remove.insert(scope.clone(), held.clone());
            }
        }

        if self.policy != Policy::Subtract {
            for (scope, wanted) in desired.iter() {
                if !current.contains_scope(scope.as_str()) {
                    plan.grants_to_add.insert(scope.clone(), with_usage(wanted.clone()));
                }
            }
        }

        for (scope, wanted) in desired.iter() {
            let Some(held) = current.get(scope.as_str()) else {
                continue;
            };

            let (grant, revoke) = match self.policy {
                Policy::Append => (difference(wanted, held), PrivilegeSet::new()),
                Policy::Subtract => (PrivilegeSet::new(), intersection(wanted, held)),
                Policy::Replace => {
                    let grant = difference(wanted, held);
                    let mut revoke = difference(held, wanted);
                    if grant.contains(ALL) {
                        revoke.retain(|p| p == GRANT_OPTION || p == PROXY);
                    }
                    (grant, revoke)
                }
            };

            if !grant.is_empty() {
                plan.grants_to_add.insert(scope.clone(), with_usage(grant));
            }
            if !revoke.is_empty() {
                plan.grants_to_remove.insert(scope.clone(), revoke);
            }
        }

        plan.changed = !plan.grants_to_add.is_empty() || !plan.grants_to_remove.is_empty();
        trace!(policy = ?self.policy, changed = plan.changed, "Reconciled privileges");
        plan
    }
}

/// Reconcile with an unprotected account
pub fn reconcile(current: &PrivilegeMap, desired: &PrivilegeMap, policy: Policy) -> ReconciliationPlan {
    Reconciler::new(policy).reconcile(current, desired)
}

fn difference(a: &PrivilegeSet, b: &PrivilegeSet) -> PrivilegeSet {
    a.difference(b).cloned().collect()
}

fn intersection(a: &PrivilegeSet, b: &PrivilegeSet) -> PrivilegeSet {
    a.intersection(b).cloned().collect()
}

/// `WITH GRANT OPTION` cannot stand alone, so a lone grant option grants `USAGE`
fn with_usage(mut set: PrivilegeSet) -> PrivilegeSet {
    if set.len() == 1 && set.contains(GRANT_OPTION) {
        set.insert(USAGE.to_string());
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &[&str])]) -> PrivilegeMap {
        entries
            .iter()
            .map(|(scope, tokens)| (Scope::from_server(scope), tokens.to_vec()))
            .collect()
    }

    #[test]
    fn test_replace_all_suppresses_pointless_revokes() {
        let current = map(&[("`db`.*", &["SELECT", "INSERT", "GRANT"])]);
        let desired = map(&[("`db`.*", &["ALL"])]);
        let plan = reconcile(&current, &desired, Policy::Replace);

        assert_eq!(plan.grants_to_add, map(&[("`db`.*", &["ALL"])]));
        assert_eq!(plan.grants_to_remove, map(&[("`db`.*", &["GRANT"])]));
    }

    #[test]
    fn test_lone_grant_option_adds_usage() {
        let current = map(&[("*.*", &["SELECT"])]);
        let desired = map(&[("*.*", &["SELECT", "GRANT"])]);
        let plan = reconcile(&current, &desired, Policy::Append);
        assert_eq!(plan.grants_to_add, map(&[("*.*", &["GRANT", "USAGE"])]));
    }

    #[test]
    fn test_proxy_scope_never_revoked_wholesale() {
        let current = map(&[
            ("*.*", &["USAGE"]),
            ("''@''", &["PROXY", "GRANT"]),
        ]);
        let desired = map(&[("*.*", &["USAGE"])]);
        let plan = reconcile(&current, &desired, Policy::Replace);
        assert!(!plan.changed);
    }

    #[test]
    fn test_protected_account_membership() {
        let reconciler = Reconciler::for_account(Policy::Replace, "root", &["root"]);
        let current = map(&[("`db`.*", &["SELECT"])]);
        let plan = reconciler.reconcile(&current, &PrivilegeMap::new());
        assert!(!plan.changed);

        let reconciler = Reconciler::for_account(Policy::Replace, "app", &["root"]);
        let plan = reconciler.reconcile(&current, &PrivilegeMap::new());
        assert_eq!(plan.grants_to_remove, current);
    }

    #[test]
    fn test_summary() {
        let plan = reconcile(
            &map(&[("*.*", &["SELECT"])]),
            &map(&[("*.*", &["INSERT"])]),
            Policy::Replace,
        );
        assert_eq!(
            plan.summary(),
            "Privileges updated: granted *.*:INSERT, revoked *.*:SELECT"
        );
    }
}
