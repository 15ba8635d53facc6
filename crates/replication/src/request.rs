// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Replication requests as read from a task file

use serde::Deserialize;

use crate::error::{ReplicationError, ReplicationResult};

/// What to do with the server's replication setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[serde(alias = "getprimary", alias = "getmaster")]
    PrimaryStatus,
    #[serde(alias = "getreplica", alias = "getslave")]
    ReplicaStatus,
    #[serde(alias = "getreplicahosts", alias = "getslavehosts")]
    ReplicaHosts,
    #[serde(alias = "changeprimary", alias = "changemaster")]
    ChangePrimary,
    #[serde(alias = "startreplica", alias = "startslave")]
    StartReplica,
    #[serde(alias = "stopreplica", alias = "stopslave")]
    StopReplica,
    #[serde(alias = "resetreplica", alias = "resetslave")]
    ResetReplica,
    #[serde(alias = "resetreplicaall", alias = "resetslaveall")]
    ResetReplicaAll,
    #[serde(alias = "resetprimary", alias = "resetmaster")]
    ResetPrimary,
}

impl Mode {
    /// Whether the mode changes server state
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Mode::PrimaryStatus | Mode::ReplicaStatus | Mode::ReplicaHosts)
    }
}

/// Replication stream a statement applies to
///
/// MariaDB names streams with a connection name, MySQL with a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Target {
    #[serde(default)]
    pub connection_name: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
}

impl Target {
    pub fn connection(name: impl Into<String>) -> Self {
        Self {
            connection_name: Some(name.into()),
            channel: None,
        }
    }

    pub fn channel(name: impl Into<String>) -> Self {
        Self {
            connection_name: None,
            channel: Some(name.into()),
        }
    }

    pub fn validate(&self) -> ReplicationResult<()> {
        if self.connection_name.is_some() && self.channel.is_some() {
            return Err(ReplicationError::configuration(
                "connection_name and channel are mutually exclusive",
            ));
        }
        Ok(())
    }
}

/// `MASTER_USE_GTID` setting (MariaDB)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UseGtid {
    CurrentPos,
    ReplicaPos,
    /// Older spelling of `replica_pos`
    SlavePos,
    Disabled,
}

/// Options of `CHANGE MASTER TO`
///
/// Field names follow the primary/replica terms; the `master_*` spellings
/// are accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChangePrimary {
    #[serde(default, alias = "master_host")]
    pub primary_host: Option<String>,
    #[serde(default, alias = "master_user")]
    pub primary_user: Option<String>,
    #[serde(default, alias = "master_password")]
    pub primary_password: Option<String>,
    #[serde(default, alias = "master_port")]
    pub primary_port: Option<u16>,
    #[serde(default, alias = "master_connect_retry")]
    pub primary_connect_retry: Option<u32>,
    #[serde(default, alias = "master_log_file")]
    pub primary_log_file: Option<String>,
    #[serde(default, alias = "master_log_pos")]
    pub primary_log_pos: Option<i64>,
    #[serde(default, alias = "master_delay")]
    pub primary_delay: Option<u32>,
    #[serde(default)]
    pub relay_log_file: Option<String>,
    #[serde(default)]
    pub relay_log_pos: Option<i64>,
    #[serde(default, alias = "master_ssl")]
    pub primary_ssl: bool,
    #[serde(default, alias = "master_ssl_ca")]
    pub primary_ssl_ca: Option<String>,
    #[serde(default, alias = "master_ssl_capath")]
    pub primary_ssl_capath: Option<String>,
    #[serde(default, alias = "master_ssl_cert")]
    pub primary_ssl_cert: Option<String>,
    #[serde(default, alias = "master_ssl_key")]
    pub primary_ssl_key: Option<String>,
    #[serde(default, alias = "master_ssl_cipher")]
    pub primary_ssl_cipher: Option<String>,
    /// MySQL only
    #[serde(default, alias = "master_auto_position")]
    pub primary_auto_position: bool,
    /// MariaDB only
    #[serde(default, alias = "master_use_gtid")]
    pub primary_use_gtid: Option<UseGtid>,
}

/// One replication task
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReplicationRequest {
    pub mode: Mode,
    #[serde(flatten)]
    pub target: Target,
    /// Report failed start/stop/reset statements as errors instead of `changed: false`
    #[serde(default)]
    pub fail_on_error: bool,
    #[serde(flatten)]
    pub change: ChangePrimary,
}

impl ReplicationRequest {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            target: Target::default(),
            fail_on_error: false,
            change: ChangePrimary::default(),
        }
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn with_fail_on_error(mut self, fail_on_error: bool) -> Self {
        self.fail_on_error = fail_on_error;
        self
    }

    pub fn with_change(mut self, change: ChangePrimary) -> Self {
        self.change = change;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_mode_names_accepted() {
        let request: ReplicationRequest = serde_yaml::from_str("mode: changemaster\nmaster_host: db1\n").unwrap();
        assert_eq!(request.mode, Mode::ChangePrimary);
        assert_eq!(request.change.primary_host.as_deref(), Some("db1"));

        let request: ReplicationRequest = serde_yaml::from_str("mode: stop_replica\nchannel: c1\n").unwrap();
        assert_eq!(request.mode, Mode::StopReplica);
        assert_eq!(request.target, Target::channel("c1"));
    }

    #[test]
    fn test_use_gtid_values() {
        let request: ReplicationRequest =
            serde_yaml::from_str("mode: change_primary\nprimary_use_gtid: slave_pos\n").unwrap();
        assert_eq!(request.change.primary_use_gtid, Some(UseGtid::SlavePos));
    }

    #[test]
    fn test_target_exclusivity() {
        let target = Target {
            connection_name: Some("a".into()),
            channel: Some("b".into()),
        };
        assert!(target.validate().is_err());
        assert!(Target::connection("a").validate().is_ok());
    }

    #[test]
    fn test_read_only_modes() {
        assert!(!Mode::ReplicaHosts.is_mutating());
        assert!(Mode::ResetPrimary.is_mutating());
    }
}
