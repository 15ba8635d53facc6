// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # MySQL Accounts - Replication
//!
//! Replication topology statements built from dialect-resolved keywords:
//!
//! - status reads: [`ReplicationSession::primary_status`],
//!   [`ReplicationSession::replica_status`], [`ReplicationSession::replica_hosts`]
//! - [`ReplicationSession::change_primary`]: `CHANGE MASTER TO` or
//!   `CHANGE REPLICATION SOURCE TO`, depending on the server
//! - start / stop / reset of the replica threads and reset of the binary logs
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mysql_accounts_replication::{Mode, ReplicationRequest, ReplicationSession};
//!
//! let mut session = ReplicationSession::open(&mut conn, false).await?;
//! let outcome = session.run(&ReplicationRequest::new(Mode::StopReplica)).await?;
//! println!("{}", outcome.msg);
//! ```

pub mod error;
pub mod outcome;
pub mod request;
pub mod session;

// Re-exports
pub use error::{ReplicationError, ReplicationResult};
pub use outcome::ReplicationOutcome;
pub use request::{ChangePrimary, Mode, ReplicationRequest, Target, UseGtid};
pub use session::{IS_PRIMARY, IS_REPLICA, ReplicaCommand, ReplicationSession};
