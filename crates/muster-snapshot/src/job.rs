// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;
use muster_jobs::{Job, JobContext, JobError, JobOutput};
use tracing::instrument;

use crate::error::SnapshotError;
use crate::service::{BackupOutcome, SnapshotService};

pub struct SnapshotJob {
	service: Arc<SnapshotService>,
}

impl SnapshotJob {
	pub fn new(service: Arc<SnapshotService>) -> Self {
		Self { service }
	}
}

#[async_trait]
impl Job for SnapshotJob {
	fn id(&self) -> &str {
		"credential-snapshot"
	}

	fn name(&self) -> &str {
		"Credential Snapshot"
	}

	fn description(&self) -> &str {
		"Back up the credential table when it has changed"
	}

	#[instrument(skip(self, ctx), fields(job_id = "credential-snapshot"))]
	async fn run(&self, ctx: &JobContext) -> Result<JobOutput, JobError> {
		ctx.checkpoint()?;

		match self.service.backup().await {
			Ok(BackupOutcome::Pushed { records, digest }) => Ok(JobOutput {
				message: format!("Pushed snapshot of {records} credentials"),
				metadata: Some(serde_json::json!({ "records": records, "digest": digest })),
			}),
			Ok(BackupOutcome::Unchanged) => Ok(JobOutput {
				message: "Snapshot unchanged".to_string(),
				metadata: None,
			}),
			Err(e @ (SnapshotError::Malformed(_) | SnapshotError::UnsupportedVersion { .. })) => {
				Err(JobError::fatal(e.to_string()))
			}
			Err(e) => Err(JobError::retryable(e.to_string())),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use muster_db::MemoryCredentialStore;
	use muster_jobs::{StopSignal, TriggerSource};
	use muster_provisioning::ExclusionList;

	use crate::file::FileSnapshotSink;

	fn ctx() -> JobContext {
		JobContext {
			run_id: "run-1".to_string(),
			triggered_by: TriggerSource::Manual,
			stop: StopSignal::new(),
		}
	}

	#[tokio::test]
	async fn reports_pushed_then_unchanged() {
		let dir = tempfile::tempdir().unwrap();
		let service = Arc::new(SnapshotService::new(
			Arc::new(MemoryCredentialStore::new()),
			Arc::new(ExclusionList::new()),
			Arc::new(FileSnapshotSink::new(dir.path().join("snap.json"))),
		));
		let job = SnapshotJob::new(service);

		let first = job.run(&ctx()).await.unwrap();
		assert!(first.message.starts_with("Pushed"));
		assert!(first.metadata.is_some());

		let second = job.run(&ctx()).await.unwrap();
		assert_eq!(second.message, "Snapshot unchanged");
	}

	#[tokio::test]
	async fn sink_failure_is_retryable() {
		let dir = tempfile::tempdir().unwrap();
		// A directory in place of the file makes the rename fail.
		let target = dir.path().join("occupied");
		std::fs::create_dir_all(target.join("child")).unwrap();
		let service = Arc::new(SnapshotService::new(
			Arc::new(MemoryCredentialStore::new()),
			Arc::new(ExclusionList::new()),
			Arc::new(FileSnapshotSink::new(&target)),
		));

		let err = SnapshotJob::new(service).run(&ctx()).await.unwrap_err();
		assert!(matches!(err, JobError::Failed { retryable: true, .. }));
	}

	#[tokio::test]
	async fn cancelled_before_start() {
		let dir = tempfile::tempdir().unwrap();
		let service = Arc::new(SnapshotService::new(
			Arc::new(MemoryCredentialStore::new()),
			Arc::new(ExclusionList::new()),
			Arc::new(FileSnapshotSink::new(dir.path().join("snap.json"))),
		));
		let context = ctx();
		context.stop.request();

		assert!(matches!(
			SnapshotJob::new(service).run(&context).await,
			Err(JobError::Cancelled)
		));
	}
}
