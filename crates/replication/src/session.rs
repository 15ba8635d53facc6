// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Replication session
//!
//! Every keyword sent by this module goes through [`CommandResolver`], so
//! the same request produces `CHANGE MASTER TO MASTER_HOST=...` on MySQL 5.7
//! and `CHANGE REPLICATION SOURCE TO SOURCE_HOST=...` on MySQL 8.4.

use mysql_accounts_connection::{Connection, ConnectionResult, QueryResult, Statement, StatementBuilder, probe_server};
use mysql_accounts_dialect::{CommandResolver, DialectStrategy, ServerIdentity, strategy_for};
use tracing::{debug, info, warn};

use crate::error::{ReplicationError, ReplicationResult};
use crate::outcome::ReplicationOutcome;
use crate::request::{ChangePrimary, Mode, ReplicationRequest, Target, UseGtid};

pub const IS_PRIMARY: &str = "Is_Primary";
pub const IS_REPLICA: &str = "Is_Replica";

/// Start, stop and reset verbs applied to the replica term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicaCommand {
    Start,
    Stop,
    Reset,
    ResetAll,
}

impl ReplicaCommand {
    fn verb(&self) -> &'static str {
        match self {
            ReplicaCommand::Start => "START ",
            ReplicaCommand::Stop => "STOP ",
            ReplicaCommand::Reset | ReplicaCommand::ResetAll => "RESET ",
        }
    }

    fn messages(&self) -> (&'static str, &'static str) {
        match self {
            ReplicaCommand::Start => ("Replica started", "Replica already started (or cannot be started)"),
            ReplicaCommand::Stop => ("Replica stopped", "Replica already stopped"),
            ReplicaCommand::Reset | ReplicaCommand::ResetAll => ("Replica reset", "Replica already reset"),
        }
    }
}

/// Connection plus the resolved dialect of its server
pub struct ReplicationSession<'c> {
    conn: &'c mut dyn Connection,
    strategy: Box<dyn DialectStrategy>,
    resolver: CommandResolver<'static>,
    dry_run: bool,
}

impl<'c> ReplicationSession<'c> {
    /// Probe the server and open a session on `conn`
    pub async fn open(conn: &'c mut dyn Connection, dry_run: bool) -> ReplicationResult<Self> {
        let server = probe_server(&mut *conn).await?;
        Ok(Self {
            resolver: CommandResolver::new(&server),
            strategy: strategy_for(&server),
            conn,
            dry_run,
        })
    }

    pub fn server(&self) -> &ServerIdentity {
        self.resolver.server()
    }

    fn keyword(&self, key: &str) -> ReplicationResult<&'static str> {
        Ok(self.resolver.resolve(key)?)
    }

    /// Run any request
    pub async fn run(&mut self, request: &ReplicationRequest) -> ReplicationResult<ReplicationOutcome> {
        request.target.validate()?;
        debug!(mode = ?request.mode, server = %self.server(), "replication request");
        match request.mode {
            Mode::PrimaryStatus => self.primary_status().await,
            Mode::ReplicaStatus => self.replica_status(&request.target).await,
            Mode::ReplicaHosts => self.replica_hosts().await,
            Mode::ChangePrimary => self.change_primary(&request.target, &request.change).await,
            Mode::StartReplica => {
                self.replica_command(ReplicaCommand::Start, &request.target, request.fail_on_error)
                    .await
            }
            Mode::StopReplica => {
                self.replica_command(ReplicaCommand::Stop, &request.target, request.fail_on_error)
                    .await
            }
            Mode::ResetReplica => {
                self.replica_command(ReplicaCommand::Reset, &request.target, request.fail_on_error)
                    .await
            }
            Mode::ResetReplicaAll => {
                self.replica_command(ReplicaCommand::ResetAll, &request.target, request.fail_on_error)
                    .await
            }
            Mode::ResetPrimary => self.reset_primary(request.fail_on_error).await,
        }
    }

    // ===== Read-only modes =====

    /// Binary log coordinates of this server as a primary
    pub async fn primary_status(&mut self) -> ReplicationResult<ReplicationOutcome> {
        let statement = Statement::builder().keyword(self.keyword("SHOW MASTER STATUS")?).build();
        let rows = self.conn.fetch_all(&statement).await?;
        let mut outcome = ReplicationOutcome::status(rows.first(), IS_PRIMARY, "Server is not configured as a primary");
        outcome.statements.push(statement.masked());
        Ok(outcome)
    }

    /// Replica thread status, optionally for one named stream
    pub async fn replica_status(&mut self, target: &Target) -> ReplicationResult<ReplicationOutcome> {
        target.validate()?;
        let builder = match &target.connection_name {
            Some(_) => named(Statement::builder().keyword("SHOW ").keyword(self.keyword("SLAVE")?), target)
                .keyword(" STATUS"),
            None => Statement::builder().keyword(self.keyword("SHOW SLAVE STATUS")?),
        };
        let statement = for_channel(builder, target).build();

        let rows = self.conn.fetch_all(&statement).await?;
        let mut outcome = ReplicationOutcome::status(rows.first(), IS_REPLICA, "Server is not configured as a replica");
        outcome.statements.push(statement.masked());
        Ok(outcome)
    }

    /// Replicas registered with this primary
    pub async fn replica_hosts(&mut self) -> ReplicationResult<ReplicationOutcome> {
        let statement = Statement::builder().keyword(self.keyword("SHOW SLAVE HOSTS")?).build();
        let rows = self.conn.fetch_all(&statement).await?;
        let mut outcome = ReplicationOutcome::unchanged(format!("{} replica(s) registered", rows.len()));
        outcome.hosts = rows.iter().map(crate::outcome::row_to_map).collect();
        outcome.statements.push(statement.masked());
        Ok(outcome)
    }

    // ===== Mutating modes =====

    /// Point this replica at a primary
    pub async fn change_primary(
        &mut self,
        target: &Target,
        change: &ChangePrimary,
    ) -> ReplicationResult<ReplicationOutcome> {
        target.validate()?;
        let mut warnings = Vec::new();
        let options = self.change_options(change, &mut warnings)?;
        if options.is_empty() {
            return Err(ReplicationError::configuration(
                "change_primary needs at least one option",
            ));
        }

        let command = self.keyword("CHANGE MASTER")?;
        let builder = named(Statement::builder().keyword(command), target)
            .keyword(" TO ")
            .join(options, ", ", |b, (key, value)| value.append_to(b.keyword(key).keyword("=")));
        let statement = for_channel(builder, target).build();

        let mut outcome = ReplicationOutcome::changed("Primary changed");
        outcome.warnings = warnings;
        if self.dry_run {
            return Ok(outcome);
        }

        outcome.statements.push(statement.masked());
        match self.execute(&statement).await {
            Ok(_) => {
                info!(statement = %statement, "replication source changed");
                Ok(outcome)
            }
            Err(error) => Err(ReplicationError::failed(command, &error)),
        }
    }

    fn change_options(
        &self,
        change: &ChangePrimary,
        warnings: &mut Vec<String>,
    ) -> ReplicationResult<Vec<(&'static str, OptionValue)>> {
        let mut options = Vec::new();
        let mut push = |key: &str, value: Option<OptionValue>| -> ReplicationResult<()> {
            if let Some(value) = value {
                options.push((self.keyword(key)?, value));
            }
            Ok(())
        };

        push("MASTER_HOST", change.primary_host.clone().map(OptionValue::Text))?;
        push("MASTER_USER", change.primary_user.clone().map(OptionValue::Text))?;
        push("MASTER_PASSWORD", change.primary_password.clone().map(OptionValue::Secret))?;
        push("MASTER_PORT", change.primary_port.map(|v| OptionValue::Int(v.into())))?;
        push(
            "MASTER_CONNECT_RETRY",
            change.primary_connect_retry.map(|v| OptionValue::Int(v.into())),
        )?;
        push("MASTER_LOG_FILE", change.primary_log_file.clone().map(OptionValue::Text))?;
        push("MASTER_LOG_POS", change.primary_log_pos.map(OptionValue::Int))?;
        push("MASTER_DELAY", change.primary_delay.map(|v| OptionValue::Int(v.into())))?;
        push("RELAY_LOG_FILE", change.relay_log_file.clone().map(OptionValue::Text))?;
        push("RELAY_LOG_POS", change.relay_log_pos.map(OptionValue::Int))?;
        push("MASTER_SSL", change.primary_ssl.then_some(OptionValue::Int(1)))?;
        push("MASTER_SSL_CA", change.primary_ssl_ca.clone().map(OptionValue::Text))?;
        push("MASTER_SSL_CAPATH", change.primary_ssl_capath.clone().map(OptionValue::Text))?;
        push("MASTER_SSL_CERT", change.primary_ssl_cert.clone().map(OptionValue::Text))?;
        push("MASTER_SSL_KEY", change.primary_ssl_key.clone().map(OptionValue::Text))?;
        push("MASTER_SSL_CIPHER", change.primary_ssl_cipher.clone().map(OptionValue::Text))?;
        push(
            "MASTER_AUTO_POSITION",
            change.primary_auto_position.then_some(OptionValue::Int(1)),
        )?;

        let gtid = change.primary_use_gtid.map(|mode| {
            let replica_term = self.strategy.uses_replica_terminology();
            if mode == UseGtid::SlavePos && replica_term {
                let message = "primary_use_gtid \"slave_pos\" is deprecated, use \"replica_pos\" instead.";
                warn!("{}", message);
                warnings.push(message.to_string());
            }
            OptionValue::Keyword(gtid_keyword(mode, replica_term))
        });
        push("MASTER_USE_GTID", gtid)?;

        Ok(options)
    }

    /// `START`, `STOP` or `RESET` of the replica threads
    pub async fn replica_command(
        &mut self,
        command: ReplicaCommand,
        target: &Target,
        fail_on_error: bool,
    ) -> ReplicationResult<ReplicationOutcome> {
        target.validate()?;
        let term = self.keyword("SLAVE")?;
        let builder = named(Statement::builder().keyword(command.verb()).keyword(term), target)
            .when(command == ReplicaCommand::ResetAll, |b| b.keyword(" ALL"));
        let statement = for_channel(builder, target).build();

        let (done, already) = command.messages();
        self.tolerant(&statement, fail_on_error, done, already).await
    }

    /// Drop the binary logs of this server
    pub async fn reset_primary(&mut self, fail_on_error: bool) -> ReplicationResult<ReplicationOutcome> {
        let statement = Statement::builder().keyword(self.keyword("RESET MASTER")?).build();
        self.tolerant(&statement, fail_on_error, "Primary reset", "Primary already reset")
            .await
    }

    /// Execute a statement whose failure only means "nothing changed"
    /// unless `fail_on_error` is set
    async fn tolerant(
        &mut self,
        statement: &Statement,
        fail_on_error: bool,
        done: &str,
        already: &str,
    ) -> ReplicationResult<ReplicationOutcome> {
        if self.dry_run {
            return Ok(ReplicationOutcome::changed(done));
        }

        let result = self.execute(statement).await;
        let mut outcome = match result {
            Ok(_) => ReplicationOutcome::changed(done),
            Err(error) if fail_on_error => {
                return Err(ReplicationError::failed(&statement.masked(), &error));
            }
            Err(error) => {
                warn!(statement = %statement, error = %error, "replication statement failed");
                ReplicationOutcome::unchanged(already)
            }
        };
        outcome.statements.push(statement.masked());
        Ok(outcome)
    }

    async fn execute(&mut self, statement: &Statement) -> ConnectionResult<QueryResult> {
        debug!(statement = %statement, "execute");
        self.conn.execute(statement).await
    }
}

/// Append the MariaDB connection name, if any
fn named(builder: StatementBuilder, target: &Target) -> StatementBuilder {
    match &target.connection_name {
        Some(name) => builder.keyword(" ").value(name.as_str()),
        None => builder,
    }
}

fn for_channel(builder: StatementBuilder, target: &Target) -> StatementBuilder {
    match &target.channel {
        Some(channel) => builder.keyword(" FOR CHANNEL ").value(channel.as_str()),
        None => builder,
    }
}

fn gtid_keyword(mode: UseGtid, replica_term: bool) -> &'static str {
    match mode {
        UseGtid::CurrentPos => "current_pos",
        UseGtid::ReplicaPos | UseGtid::SlavePos if replica_term => "replica_pos",
        UseGtid::ReplicaPos | UseGtid::SlavePos => "slave_pos",
        UseGtid::Disabled => "no",
    }
}

/// Right-hand side of a `CHANGE MASTER TO` option
#[derive(Debug, Clone, PartialEq, Eq)]
enum OptionValue {
    Text(String),
    Secret(String),
    Int(i64),
    Keyword(&'static str),
}

impl OptionValue {
    fn append_to(self, builder: StatementBuilder) -> StatementBuilder {
        match self {
            OptionValue::Text(text) => builder.value(text),
            OptionValue::Secret(secret) => builder.secret(secret),
            OptionValue::Int(n) => builder.value(n),
            OptionValue::Keyword(keyword) => builder.keyword(keyword),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gtid_keyword_follows_terminology() {
        assert_eq!(gtid_keyword(UseGtid::ReplicaPos, false), "slave_pos");
        assert_eq!(gtid_keyword(UseGtid::SlavePos, true), "replica_pos");
        assert_eq!(gtid_keyword(UseGtid::CurrentPos, true), "current_pos");
        assert_eq!(gtid_keyword(UseGtid::Disabled, false), "no");
    }

    #[test]
    fn test_reset_all_shares_reset_messages() {
        assert_eq!(ReplicaCommand::ResetAll.messages(), ReplicaCommand::Reset.messages());
        assert_eq!(ReplicaCommand::Stop.verb(), "STOP ");
    }
}
