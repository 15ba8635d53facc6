// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Task file
//!
//! A YAML document naming the server to connect to and the desired state to
//! reach on it:
//!
//! ```yaml
//! connection:
//!   host: db1
//!   user: admin
//! check_mode: false
//! tasks:
//!   - name: application account
//!     user:
//!       name: app
//!       host: "%"
//!       password: s3cret
//!       priv: "appdb.*:SELECT,INSERT"
//!   - role:
//!       name: readers
//!       members: [app]
//!   - state: absent
//!     user:
//!       name: legacy
//!   - replication:
//!       mode: stop_replica
//! ```
//!
//! Each task carries exactly one of `user`, `role` or `replication`.

use mysql_accounts_connection::{ConfigError as ConnectionConfigError, ConnectionConfig};
use mysql_accounts_lifecycle::{ConfigError as OptionsError, LifecycleOptions, RoleSpec, UserSpec};
use mysql_accounts_replication::ReplicationRequest;
use serde::Deserialize;
use thiserror::Error;

/// Result type alias for task file handling
pub type TaskFileResult<T> = Result<T, TaskFileError>;

#[derive(Debug, Error)]
pub enum TaskFileError {
    #[error("Cannot parse task file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid connection settings: {0}")]
    Connection(#[from] ConnectionConfigError),

    #[error(transparent)]
    Options(#[from] OptionsError),

    /// Task `index` (zero-based) is malformed
    #[error("Task {index}: {reason}")]
    InvalidTask { index: usize, reason: String },
}

fn default_true() -> bool {
    true
}

/// Whole task file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskFile {
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Report what would change without changing it
    #[serde(default)]
    pub check_mode: bool,

    #[serde(default = "default_true")]
    pub enforce_known_privilege_tokens: bool,

    #[serde(default = "default_true")]
    pub set_default_role_all: bool,

    /// Overrides the built-in protected account list
    #[serde(default)]
    pub protected_accounts: Option<Vec<String>>,

    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl TaskFile {
    /// Parse and validate a task file
    pub fn from_yaml(text: &str) -> TaskFileResult<Self> {
        let file: TaskFile = serde_yaml::from_str(text)?;
        file.validate()?;
        Ok(file)
    }

    pub fn validate(&self) -> TaskFileResult<()> {
        self.connection.validate()?;
        self.lifecycle_options().validate()?;
        for (index, task) in self.tasks.iter().enumerate() {
            task.kind().map_err(|reason| TaskFileError::InvalidTask { index, reason })?;
        }
        Ok(())
    }

    /// Options for every user and role task of this file
    pub fn lifecycle_options(&self) -> LifecycleOptions {
        let options = LifecycleOptions::new()
            .with_dry_run(self.check_mode)
            .with_enforce_known_privilege_tokens(self.enforce_known_privilege_tokens)
            .with_set_default_role_all(self.set_default_role_all);
        match &self.protected_accounts {
            Some(accounts) => options.with_protected_accounts(accounts.iter().cloned()),
            None => options,
        }
    }
}

/// Requested state of a user or role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    #[default]
    Present,
    Absent,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Present => "present",
            State::Absent => "absent",
        }
    }
}

/// One entry of `tasks`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Task {
    /// Label echoed in the report
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub state: Option<State>,

    #[serde(default)]
    pub user: Option<UserSpec>,

    #[serde(default)]
    pub role: Option<RoleSpec>,

    #[serde(default)]
    pub replication: Option<ReplicationRequest>,
}

/// What a task operates on
#[derive(Debug, Clone, Copy)]
pub enum TaskKind<'a> {
    User(State, &'a UserSpec),
    Role(State, &'a RoleSpec),
    Replication(&'a ReplicationRequest),
}

impl TaskKind<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::User(..) => "user",
            TaskKind::Role(..) => "role",
            TaskKind::Replication(_) => "replication",
        }
    }
}

impl Task {
    /// The single target of this task
    pub fn kind(&self) -> Result<TaskKind<'_>, String> {
        let state = self.state.unwrap_or_default();
        match (&self.user, &self.role, &self.replication) {
            (Some(user), None, None) => Ok(TaskKind::User(state, user)),
            (None, Some(role), None) => Ok(TaskKind::Role(state, role)),
            (None, None, Some(request)) => {
                if self.state.is_some() {
                    return Err("state cannot be used with replication tasks".to_string());
                }
                request.target.validate().map_err(|e| e.to_string())?;
                Ok(TaskKind::Replication(request))
            }
            (None, None, None) => Err("expected one of user, role or replication".to_string()),
            _ => Err("only one of user, role or replication can be set".to_string()),
        }
    }

    /// Label for the report, defaulting to the entity name
    pub fn label(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        match (&self.user, &self.role, &self.replication) {
            (Some(user), _, _) => format!("user {}@{}", user.name, user.host),
            (_, Some(role), _) => format!("role {}", role.name),
            (_, _, Some(request)) => format!("replication {:?}", request.mode),
            _ => "task".to_string(),
        }
    }
}
