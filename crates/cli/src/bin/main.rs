// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use mysql_accounts_cli::{Report, TaskFile, run_tasks};
use mysql_accounts_connection::LiveMySqlConnection;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "mysql-accounts")]
#[command(about = "Reconcile MySQL and MariaDB accounts, roles and replication", long_about = None)]
#[command(version)]
struct Cli {
    /// YAML task file
    #[arg(value_name = "TASK_FILE")]
    task_file: PathBuf,

    /// Report what would change without changing it
    #[arg(long)]
    check: bool,

    /// Password for the connection user, overriding the task file and environment
    #[arg(long, env = "MYSQL_ACCOUNTS_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout stays a clean JSON document
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    if let Err(error) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {error}");
    }

    let cli = Cli::parse();
    let report = match run(&cli).await {
        Ok(report) => report,
        Err(error) => Report::fatal(cli.check, format!("{error:#}")),
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(error) => {
            eprintln!("Failed to serialize report: {error}");
            return ExitCode::FAILURE;
        }
    }

    if report.failed { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

async fn run(cli: &Cli) -> anyhow::Result<Report> {
    let text = std::fs::read_to_string(&cli.task_file)
        .with_context(|| format!("Cannot read {}", cli.task_file.display()))?;
    let mut file = TaskFile::from_yaml(&text)?;
    file.check_mode |= cli.check;

    let config = file.connection.clone().with_password_override(cli.password.clone());
    let mut conn = LiveMySqlConnection::connect(&config)
        .await
        .with_context(|| format!("Cannot connect to {}", config.display_url()))?;

    let report = run_tasks(&mut conn, &file).await;

    if let Err(error) = conn.close().await {
        tracing::warn!(error = %error, "closing connection failed");
    }
    Ok(report)
}
