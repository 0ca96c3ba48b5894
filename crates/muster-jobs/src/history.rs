// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory record of job runs.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;

use crate::types::{JobRun, JobStatus};

#[derive(Debug, Default)]
struct JobRecord {
	last_run: Option<JobRun>,
	consecutive_failures: u32,
}

/// Last run and failure streak per job.
#[derive(Debug, Default)]
pub struct RunHistory {
	jobs: Mutex<HashMap<String, JobRecord>>,
}

impl RunHistory {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn record_run_start(&self, run: &JobRun) {
		let mut jobs = self.lock();
		jobs.entry(run.job_id.clone()).or_default().last_run = Some(run.clone());
	}

	pub fn record_run_complete(
		&self,
		job_id: &str,
		run_id: &str,
		status: JobStatus,
		error_message: Option<String>,
		metadata: Option<serde_json::Value>,
	) {
		let mut jobs = self.lock();
		let record = jobs.entry(job_id.to_string()).or_default();

		match status {
			JobStatus::Succeeded => record.consecutive_failures = 0,
			JobStatus::Failed => record.consecutive_failures += 1,
			JobStatus::Running | JobStatus::Cancelled => {}
		}

		if let Some(run) = record.last_run.as_mut().filter(|r| r.id == run_id) {
			let now = Utc::now();
			run.status = status;
			run.duration_ms = Some((now - run.started_at).num_milliseconds());
			run.completed_at = Some(now);
			run.error_message = error_message;
			run.metadata = metadata;
		}
	}

	pub fn last_run(&self, job_id: &str) -> Option<JobRun> {
		self.lock().get(job_id).and_then(|r| r.last_run.clone())
	}

	pub fn consecutive_failures(&self, job_id: &str) -> u32 {
		self
			.lock()
			.get(job_id)
			.map(|r| r.consecutive_failures)
			.unwrap_or(0)
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, JobRecord>> {
		self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}
}
