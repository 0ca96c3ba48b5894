// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Backup and restore of the credential table.
//!
//! A [`CredentialSnapshot`] captures every credential record, field for field,
//! plus the target exclusion list. [`SnapshotService`] writes it to a
//! [`SnapshotSink`] (a local file or a file in a GitHub repository) and reads
//! it back at startup. [`SnapshotJob`] runs the backup on the job scheduler,
//! pushing only when the content changed.

pub mod document;
pub mod error;
pub mod file;
pub mod github;
pub mod job;
pub mod service;
pub mod sink;

pub use document::{CredentialSnapshot, SnapshotRecord, SNAPSHOT_VERSION};
pub use error::SnapshotError;
pub use file::FileSnapshotSink;
pub use github::{GitHubSnapshotConfig, GitHubSnapshotSink};
pub use job::SnapshotJob;
pub use service::{BackupOutcome, RestoreOutcome, SnapshotService};
pub use sink::SnapshotSink;
