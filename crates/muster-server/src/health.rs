// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Component health checks.

use std::sync::Arc;
use std::time::Duration;

use muster_db::CredentialStore;
use muster_jobs::{HealthState, JobScheduler};
use serde::Serialize;
use tokio::time::{timeout, Instant};

const DB_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
	Healthy,
	Degraded,
	Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
	pub status: HealthStatus,
	pub latency_ms: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JobsHealth {
	pub status: HealthStatus,
	pub jobs_total: usize,
	pub jobs_healthy: usize,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub failing_jobs: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct HealthComponents {
	pub database: DatabaseHealth,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub jobs: Option<JobsHealth>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
	pub status: HealthStatus,
	pub timestamp: String,
	pub duration_ms: u64,
	pub version: &'static str,
	pub run_active: bool,
	pub components: HealthComponents,
}

pub async fn check_database(store: &dyn CredentialStore) -> DatabaseHealth {
	let start = Instant::now();
	let result = timeout(DB_CHECK_TIMEOUT, store.ping()).await;
	let latency_ms = start.elapsed().as_millis() as u64;

	match result {
		Ok(Ok(())) => DatabaseHealth {
			status: HealthStatus::Healthy,
			latency_ms,
			error: None,
		},
		Ok(Err(e)) => DatabaseHealth {
			status: HealthStatus::Unhealthy,
			latency_ms,
			error: Some(e.to_string()),
		},
		Err(_) => DatabaseHealth {
			status: HealthStatus::Unhealthy,
			latency_ms,
			error: Some("database health check timed out".to_string()),
		},
	}
}

pub fn check_jobs(scheduler: Option<&Arc<JobScheduler>>) -> Option<JobsHealth> {
	let health = scheduler?.health_status();

	let failing: Vec<String> = health
		.jobs
		.iter()
		.filter(|j| j.status == HealthState::Unhealthy)
		.map(|j| j.job_id.clone())
		.collect();

	Some(JobsHealth {
		status: match health.status {
			HealthState::Healthy => HealthStatus::Healthy,
			HealthState::Degraded => HealthStatus::Degraded,
			HealthState::Unhealthy => HealthStatus::Unhealthy,
		},
		jobs_total: health.jobs.len(),
		jobs_healthy: health
			.jobs
			.iter()
			.filter(|j| j.status == HealthState::Healthy)
			.count(),
		failing_jobs: (!failing.is_empty()).then_some(failing),
	})
}

pub fn aggregate_status(components: &HealthComponents) -> HealthStatus {
	let mut statuses = vec![components.database.status];
	if let Some(ref jobs) = components.jobs {
		statuses.push(jobs.status);
	}

	if statuses.contains(&HealthStatus::Unhealthy) {
		HealthStatus::Unhealthy
	} else if statuses.contains(&HealthStatus::Degraded) {
		HealthStatus::Degraded
	} else {
		HealthStatus::Healthy
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn database(status: HealthStatus) -> DatabaseHealth {
		DatabaseHealth {
			status,
			latency_ms: 1,
			error: None,
		}
	}

	#[test]
	fn worst_component_wins() {
		let components = HealthComponents {
			database: database(HealthStatus::Healthy),
			jobs: Some(JobsHealth {
				status: HealthStatus::Degraded,
				jobs_total: 1,
				jobs_healthy: 0,
				failing_jobs: None,
			}),
		};
		assert_eq!(aggregate_status(&components), HealthStatus::Degraded);

		let components = HealthComponents {
			database: database(HealthStatus::Unhealthy),
			jobs: None,
		};
		assert_eq!(aggregate_status(&components), HealthStatus::Unhealthy);
	}

	#[test]
	fn no_scheduler_means_no_jobs_component() {
		assert!(check_jobs(None).is_none());
	}

	#[test]
	fn empty_scheduler_is_healthy() {
		let scheduler = Arc::new(JobScheduler::new());
		let jobs = check_jobs(Some(&scheduler)).unwrap();
		assert_eq!(jobs.status, HealthStatus::Healthy);
		assert_eq!(jobs.jobs_total, 0);
	}
}
