// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::context::{JobContext, StopSignal};
use crate::error::{JobError, Result};
use crate::health::{determine_health_state, HealthState, JobHealthStatus, JobsHealthStatus};
use crate::history::RunHistory;
use crate::job::Job;
use crate::types::{JobRun, JobStatus, TriggerSource};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

const BASE_RETRY_DELAY_SECS: u64 = 1;
const MAX_RETRY_DELAY_SECS: u64 = 60;
const RETRY_FACTOR: f64 = 2.0;
const MAX_RETRIES: u32 = 3;

struct RegisteredJob {
	job: Arc<dyn Job>,
	interval: Duration,
	stop: StopSignal,
}

#[derive(Default)]
struct RunIds(AtomicU64);

impl RunIds {
	fn next(&self, job_id: &str) -> String {
		let seq = self.0.fetch_add(1, Ordering::Relaxed) + 1;
		format!("{job_id}-{}-{seq}", Utc::now().timestamp_millis())
	}
}

pub struct JobScheduler {
	jobs: HashMap<String, RegisteredJob>,
	history: Arc<RunHistory>,
	run_ids: Arc<RunIds>,
	shutdown_tx: broadcast::Sender<()>,
	handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for JobScheduler {
	fn default() -> Self {
		Self::new()
	}
}

impl JobScheduler {
	pub fn new() -> Self {
		let (shutdown_tx, _) = broadcast::channel(1);
		Self {
			jobs: HashMap::new(),
			history: Arc::new(RunHistory::new()),
			run_ids: Arc::new(RunIds::default()),
			shutdown_tx,
			handles: Mutex::new(Vec::new()),
		}
	}

	pub fn register_periodic(&mut self, job: Arc<dyn Job>, interval: Duration) {
		let id = job.id().to_string();
		self.jobs.insert(
			id,
			RegisteredJob {
				job,
				interval,
				stop: StopSignal::new(),
			},
		);
	}

	/// Spawn a loop per registered job that runs it every interval.
	#[instrument(skip(self))]
	pub async fn start(&self) {
		let mut handles = self.handles.lock().await;

		for (job_id, registered) in &self.jobs {
			let job = Arc::clone(&registered.job);
			let history = Arc::clone(&self.history);
			let run_ids = Arc::clone(&self.run_ids);
			let mut shutdown_rx = self.shutdown_tx.subscribe();
			let stop = registered.stop.clone();
			let interval = registered.interval;
			let job_id = job_id.clone();

			let handle = tokio::spawn(async move {
				loop {
					tokio::select! {
						_ = tokio::time::sleep(interval) => {
							let _ = run_job_with_retry(
								&job,
								&history,
								run_ids.next(&job_id),
								TriggerSource::Schedule,
								&stop,
							).await;
						}
						_ = shutdown_rx.recv() => {
							info!(job_id = %job_id, "Shutting down periodic job");
							break;
						}
					}
				}
			});

			handles.push(handle);
		}

		info!(job_count = handles.len(), "Job scheduler started");
	}

	#[instrument(skip(self))]
	pub async fn trigger_job(&self, job_id: &str, triggered_by: TriggerSource) -> Result<String> {
		let registered = self
			.jobs
			.get(job_id)
			.ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

		run_job_with_retry(
			&registered.job,
			&self.history,
			self.run_ids.next(job_id),
			triggered_by,
			&registered.stop,
		)
		.await
	}

	/// Ask the job's in-flight run to stop. Returns whether a run was in
	/// flight; the next scheduled or manual run proceeds normally.
	#[instrument(skip(self))]
	pub fn cancel_job(&self, job_id: &str) -> Result<bool> {
		let registered = self
			.jobs
			.get(job_id)
			.ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

		let running = self
			.history
			.last_run(job_id)
			.is_some_and(|run| run.status == JobStatus::Running);
		if running {
			registered.stop.request();
			info!(job_id = %job_id, "Stop requested for running job");
		}
		Ok(running)
	}

	/// Stop the schedule loops, then ask in-flight runs to stop so a retry
	/// backoff does not hold up process exit.
	#[instrument(skip(self))]
	pub async fn shutdown(&self) {
		let _ = self.shutdown_tx.send(());
		for registered in self.jobs.values() {
			registered.stop.request();
		}

		let mut handles = self.handles.lock().await;
		for handle in handles.drain(..) {
			let _ = handle.await;
		}

		info!("Job scheduler shut down");
	}

	pub fn job_ids(&self) -> Vec<String> {
		self.jobs.keys().cloned().collect()
	}

	pub fn job_status(&self, job_id: &str) -> Option<JobHealthStatus> {
		let registered = self.jobs.get(job_id)?;

		let last_run = self.history.last_run(job_id);
		let consecutive_failures = self.history.consecutive_failures(job_id);
		let status = determine_health_state(last_run.as_ref(), consecutive_failures);

		Some(JobHealthStatus {
			job_id: job_id.to_string(),
			name: registered.job.name().to_string(),
			status,
			last_run: last_run.map(Into::into),
			consecutive_failures,
		})
	}

	pub fn health_status(&self) -> JobsHealthStatus {
		let mut jobs: Vec<JobHealthStatus> = self
			.jobs
			.keys()
			.filter_map(|job_id| self.job_status(job_id))
			.collect();
		jobs.sort_by(|a, b| a.job_id.cmp(&b.job_id));

		let status = jobs
			.iter()
			.map(|j| j.status)
			.max()
			.unwrap_or(HealthState::Healthy);

		JobsHealthStatus { status, jobs }
	}
}

async fn run_job_with_retry(
	job: &Arc<dyn Job>,
	history: &RunHistory,
	run_id: String,
	triggered_by: TriggerSource,
	stop: &StopSignal,
) -> Result<String> {
	let mut retry_count = 0u32;
	stop.clear();

	loop {
		let ctx = JobContext {
			run_id: run_id.clone(),
			triggered_by: if retry_count > 0 {
				TriggerSource::Retry
			} else {
				triggered_by
			},
			stop: stop.clone(),
		};

		if retry_count == 0 {
			history.record_run_start(&JobRun {
				id: run_id.clone(),
				job_id: job.id().to_string(),
				status: JobStatus::Running,
				started_at: Utc::now(),
				completed_at: None,
				duration_ms: None,
				error_message: None,
				retry_count,
				triggered_by: ctx.triggered_by,
				metadata: None,
			});
		}

		match job.run(&ctx).await {
			Ok(output) => {
				history.record_run_complete(job.id(), &run_id, JobStatus::Succeeded, None, output.metadata);
				info!(job_id = %job.id(), run_id = %run_id, message = %output.message, "Job completed successfully");
				return Ok(run_id);
			}
			Err(JobError::Cancelled) => {
				history.record_run_complete(job.id(), &run_id, JobStatus::Cancelled, None, None);
				info!(job_id = %job.id(), run_id = %run_id, "Job cancelled");
				return Err(JobError::Cancelled);
			}
			Err(JobError::Failed { message, retryable }) => {
				if retryable && retry_count < MAX_RETRIES && !stop.is_requested() {
					retry_count += 1;
					let delay_secs = calculate_backoff_delay(retry_count);
					warn!(
						job_id = %job.id(),
						run_id = %run_id,
						retry_count,
						delay_secs,
						error = %message,
						"Job failed, retrying"
					);
					tokio::select! {
						_ = tokio::time::sleep(Duration::from_secs(delay_secs)) => continue,
						_ = stop.requested() => {
							history.record_run_complete(job.id(), &run_id, JobStatus::Cancelled, None, None);
							info!(job_id = %job.id(), run_id = %run_id, "Job cancelled during retry backoff");
							return Err(JobError::Cancelled);
						}
					}
				}

				history.record_run_complete(job.id(), &run_id, JobStatus::Failed, Some(message.clone()), None);
				warn!(job_id = %job.id(), run_id = %run_id, error = %message, "Job failed");
				return Err(JobError::Failed { message, retryable });
			}
			Err(e) => {
				let message = e.to_string();
				history.record_run_complete(job.id(), &run_id, JobStatus::Failed, Some(message.clone()), None);
				warn!(job_id = %job.id(), run_id = %run_id, error = %message, "Job failed with error");
				return Err(e);
			}
		}
	}
}

pub(crate) fn calculate_backoff_delay(retry_count: u32) -> u64 {
	let exponent = i32::try_from(retry_count.saturating_sub(1)).unwrap_or(i32::MAX);
	let delay = BASE_RETRY_DELAY_SECS as f64 * RETRY_FACTOR.powi(exponent);
	(delay as u64).min(MAX_RETRY_DELAY_SECS)
}
