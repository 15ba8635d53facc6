// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Privilege maps
//!
//! Scope → set of privilege tokens. Both the decoded privilege string
//! and the parsed `SHOW GRANTS` output land in this shape so they can be
//! compared directly.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::scope::Scope;

/// Pseudo-token standing for `WITH GRANT OPTION`
pub const GRANT_OPTION: &str = "GRANT";

/// Token meaning "no privileges"
pub const USAGE: &str = "USAGE";

/// A set of privilege tokens for one scope
pub type PrivilegeSet = BTreeSet<String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PrivilegeMap(BTreeMap<Scope, PrivilegeSet>);

impl PrivilegeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, scope: &str) -> Option<&PrivilegeSet> {
        self.0.get(scope)
    }

    pub fn contains_scope(&self, scope: &str) -> bool {
        self.0.contains_key(scope)
    }

    /// Add tokens to a scope, merging with any already present
    pub fn extend<I, S>(&mut self, scope: Scope, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .entry(scope)
            .or_default()
            .extend(tokens.into_iter().map(Into::into));
    }

    /// Replace the tokens of a scope
    pub fn insert(&mut self, scope: Scope, tokens: PrivilegeSet) {
        self.0.insert(scope, tokens);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Scope, &PrivilegeSet)> {
        self.0.iter()
    }

    pub fn scopes(&self) -> impl Iterator<Item = &Scope> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Tokens on `*.*`, excluding the grant option
    pub fn global_privileges(&self) -> Vec<&str> {
        self.0
            .get(Scope::global().as_str())
            .map(|set| {
                set.iter()
                    .map(String::as_str)
                    .filter(|t| *t != GRANT_OPTION)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl<S: Into<String>> FromIterator<(Scope, Vec<S>)> for PrivilegeMap {
    fn from_iter<T: IntoIterator<Item = (Scope, Vec<S>)>>(iter: T) -> Self {
        let mut map = PrivilegeMap::new();
        for (scope, tokens) in iter {
            map.extend(scope, tokens);
        }
        map
    }
}

impl IntoIterator for PrivilegeMap {
    type Item = (Scope, PrivilegeSet);
    type IntoIter = std::collections::btree_map::IntoIter<Scope, PrivilegeSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_merges_duplicate_scopes() {
        let mut map = PrivilegeMap::new();
        map.extend(Scope::global(), ["SELECT"]);
        map.extend(Scope::global(), ["INSERT", "SELECT"]);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("*.*").unwrap().len(), 2);
    }

    #[test]
    fn test_global_privileges_skip_grant_option() {
        let map: PrivilegeMap = [(Scope::global(), vec!["SELECT", "GRANT"])]
            .into_iter()
            .collect();
        assert_eq!(map.global_privileges(), vec!["SELECT"]);
    }

    #[test]
    fn test_serializes_as_object() {
        let map: PrivilegeMap = [(Scope::global(), vec!["USAGE"])].into_iter().collect();
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"*.*":["USAGE"]}"#);
    }
}
