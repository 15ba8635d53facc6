// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Task runner
//!
//! Runs the tasks of a [`TaskFile`] one after another on a single
//! connection. The first failing task stops the run; its report carries the
//! statements that were applied before the failure.

use mysql_accounts_connection::{Connection, probe_server};
use mysql_accounts_lifecycle::{
    LifecycleOptions, LifecycleResult, Outcome, Session, ensure_role_absent, ensure_role_present, ensure_user_absent,
    ensure_user_present,
};
use mysql_accounts_replication::{ReplicationOutcome, ReplicationResult, ReplicationSession};
use serde::Serialize;
use serde_json::Value as Json;
use tracing::{info, warn};

use crate::report::{Report, TaskError, TaskReport};
use crate::task::{State, Task, TaskFile, TaskKind};

/// Run every task of `file` on `conn`
pub async fn run_tasks(conn: &mut dyn Connection, file: &TaskFile) -> Report {
    let mut report = Report::new(file.check_mode);
    match probe_server(&mut *conn).await {
        Ok(server) => {
            info!(server = %server, tasks = file.tasks.len(), check_mode = file.check_mode, "starting run");
            report.server = Some(server.to_string());
        }
        Err(error) => return Report::fatal(file.check_mode, error.to_string()),
    }

    let options = file.lifecycle_options();
    for task in &file.tasks {
        let entry = run_task(&mut *conn, task, &options).await;
        let failed = entry.failed;
        report.push(entry);
        if failed {
            warn!(task = %task.label(), "task failed, stopping");
            break;
        }
    }
    report
}

async fn run_task(conn: &mut dyn Connection, task: &Task, options: &LifecycleOptions) -> TaskReport {
    let label = task.label();
    let kind = match task.kind() {
        Ok(kind) => kind,
        Err(msg) => {
            return TaskReport::failed(label, "task", None, TaskError { msg, applied: Vec::new() });
        }
    };
    info!(task = %label, kind = kind.name(), "running task");

    match kind {
        TaskKind::User(state, spec) => {
            let result: LifecycleResult<Outcome> = async {
                let mut session = Session::open(&mut *conn, options.clone()).await?;
                match state {
                    State::Present => ensure_user_present(&mut session, spec).await,
                    State::Absent => ensure_user_absent(&mut session, spec).await,
                }
            }
            .await;
            lifecycle_report(label, kind.name(), state, result)
        }
        TaskKind::Role(state, spec) => {
            let result: LifecycleResult<Outcome> = async {
                let mut session = Session::open(&mut *conn, options.clone()).await?;
                match state {
                    State::Present => ensure_role_present(&mut session, spec).await,
                    State::Absent => ensure_role_absent(&mut session, spec).await,
                }
            }
            .await;
            lifecycle_report(label, kind.name(), state, result)
        }
        TaskKind::Replication(request) => {
            let result: ReplicationResult<ReplicationOutcome> = async {
                let mut session = ReplicationSession::open(&mut *conn, options.dry_run).await?;
                session.run(request).await
            }
            .await;
            match result {
                Ok(outcome) => TaskReport::succeeded(label, kind.name(), None, outcome.changed, to_json(&outcome)),
                Err(error) => TaskReport::failed(
                    label,
                    kind.name(),
                    None,
                    TaskError {
                        msg: error.to_string(),
                        applied: Vec::new(),
                    },
                ),
            }
        }
    }
}

fn lifecycle_report(label: String, kind: &'static str, state: State, result: LifecycleResult<Outcome>) -> TaskReport {
    match result {
        Ok(outcome) => TaskReport::succeeded(label, kind, Some(state.as_str()), outcome.changed, to_json(&outcome)),
        Err(error) => TaskReport::failed(
            label,
            kind,
            Some(state.as_str()),
            TaskError {
                msg: error.to_string(),
                applied: error.applied().to_vec(),
            },
        ),
    }
}

fn to_json(value: &impl Serialize) -> Json {
    serde_json::to_value(value).unwrap_or_default()
}
