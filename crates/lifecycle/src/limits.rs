// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Per-account resource limits

use std::collections::BTreeMap;
use std::fmt;

use mysql_accounts_connection::{Account, Statement};
use serde::{Deserialize, Serialize};

use crate::error::{LifecycleError, LifecycleResult};
use crate::session::Session;

/// A limit settable through `ALTER USER ... WITH`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceLimit {
    MaxQueriesPerHour,
    MaxUpdatesPerHour,
    MaxConnectionsPerHour,
    MaxUserConnections,
}

impl ResourceLimit {
    pub const ALL: [ResourceLimit; 4] = [
        ResourceLimit::MaxQueriesPerHour,
        ResourceLimit::MaxUpdatesPerHour,
        ResourceLimit::MaxConnectionsPerHour,
        ResourceLimit::MaxUserConnections,
    ];

    /// Keyword in `ALTER USER ... WITH`
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceLimit::MaxQueriesPerHour => "MAX_QUERIES_PER_HOUR",
            ResourceLimit::MaxUpdatesPerHour => "MAX_UPDATES_PER_HOUR",
            ResourceLimit::MaxConnectionsPerHour => "MAX_CONNECTIONS_PER_HOUR",
            ResourceLimit::MaxUserConnections => "MAX_USER_CONNECTIONS",
        }
    }

    /// Column of `mysql.user` holding the limit
    pub fn column(&self) -> &'static str {
        match self {
            ResourceLimit::MaxQueriesPerHour => "max_questions",
            ResourceLimit::MaxUpdatesPerHour => "max_updates",
            ResourceLimit::MaxConnectionsPerHour => "max_connections",
            ResourceLimit::MaxUserConnections => "max_user_connections",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        let key = key.to_ascii_uppercase();
        Self::ALL.into_iter().find(|limit| limit.as_str() == key)
    }
}

impl fmt::Display for ResourceLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A limit value as written in a task file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LimitValue {
    Int(i64),
    Text(String),
}

impl LimitValue {
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            LimitValue::Int(n) => Some(*n),
            LimitValue::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl fmt::Display for LimitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitValue::Int(n) => write!(f, "{n}"),
            LimitValue::Text(text) => f.write_str(text),
        }
    }
}

/// Validate requested limits
pub fn parse_limits(requested: &BTreeMap<String, LimitValue>) -> LifecycleResult<BTreeMap<ResourceLimit, i64>> {
    let mut limits = BTreeMap::new();
    for (key, value) in requested {
        let limit = ResourceLimit::parse(key)
            .ok_or_else(|| LifecycleError::configuration(format!("resource_limits: key '{key}' is unsupported.")))?;
        let value = value
            .to_i64()
            .ok_or_else(|| LifecycleError::configuration(format!("Can't convert value '{value}' to integer.")))?;
        limits.insert(limit, value);
    }
    Ok(limits)
}

/// Current limits of `account`, `None` when the account does not exist
pub async fn current_limits(
    session: &mut Session<'_>,
    account: &Account,
) -> LifecycleResult<Option<BTreeMap<ResourceLimit, i64>>> {
    let statement = Statement::builder()
        .keyword("SELECT ")
        .join(ResourceLimit::ALL, ", ", |b, limit| {
            b.keyword(limit.column()).keyword(" AS ").keyword(limit.as_str())
        })
        .keyword(" FROM mysql.user WHERE User = ")
        .value(account.name.as_str())
        .keyword(" AND Host = ")
        .value(account.host_or_empty())
        .build();

    let rows = session.query(&statement).await?;
    let Some(row) = rows.first() else {
        return Ok(None);
    };

    let limits = ResourceLimit::ALL
        .into_iter()
        .enumerate()
        .filter_map(|(i, limit)| {
            row.get_either(limit.as_str(), i)
                .and_then(|v| v.as_i64())
                .map(|v| (limit, v))
        })
        .collect();
    Ok(Some(limits))
}

/// Bring the limits of `account` to `requested`
///
/// Only differing limits are sent. Returns whether anything differed.
pub async fn reconcile_limits(
    session: &mut Session<'_>,
    account: &Account,
    requested: &BTreeMap<String, LimitValue>,
) -> LifecycleResult<bool> {
    if !session.strategy().supports_alter_user() {
        return Err(session.unsupported("resource_limits"));
    }

    let desired = parse_limits(requested)?;
    let current = current_limits(session, account).await?;

    let changes: Vec<(ResourceLimit, i64)> = desired
        .into_iter()
        .filter(|(limit, value)| {
            current
                .as_ref()
                .is_none_or(|current| current.get(limit) != Some(value))
        })
        .collect();

    if changes.is_empty() {
        return Ok(false);
    }
    if session.dry_run() {
        return Ok(true);
    }

    let statement = Statement::builder()
        .keyword("ALTER USER ")
        .account(account)
        .keyword(" WITH ")
        .join(changes, " ", |b, (limit, value)| b.keyword(limit.as_str()).keyword(" ").value(value))
        .build();
    session.mutate(statement).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requested(pairs: &[(&str, LimitValue)]) -> BTreeMap<String, LimitValue> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_parse_accepts_text_numbers_and_any_case() {
        let limits = parse_limits(&requested(&[
            ("max_user_connections", LimitValue::Text("5".into())),
            ("MAX_QUERIES_PER_HOUR", LimitValue::Int(100)),
        ]))
        .unwrap();
        assert_eq!(limits[&ResourceLimit::MaxUserConnections], 5);
        assert_eq!(limits[&ResourceLimit::MaxQueriesPerHour], 100);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = parse_limits(&requested(&[("MAX_FUN", LimitValue::Int(1))])).unwrap_err();
        assert_eq!(err.to_string(), "resource_limits: key 'MAX_FUN' is unsupported.");
    }

    #[test]
    fn test_non_integer_rejected() {
        let err = parse_limits(&requested(&[("MAX_USER_CONNECTIONS", LimitValue::Text("many".into()))])).unwrap_err();
        assert_eq!(err.to_string(), "Can't convert value 'many' to integer.");
    }
}
