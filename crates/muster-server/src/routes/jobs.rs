// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background job inspection and manual triggers.

use axum::{
	extract::{Path, State},
	Json,
};
use muster_jobs::{JobsHealthStatus, TriggerSource};
use serde::Serialize;

use crate::api::AppState;
use crate::error::ServerError;

#[derive(Debug, Serialize)]
pub struct TriggerJobResponse {
	pub job_id: String,
	pub run_id: String,
}

#[derive(Debug, Serialize)]
pub struct CancelJobResponse {
	pub job_id: String,
	/// False when no run was in flight.
	pub cancelled: bool,
}

pub async fn list_jobs(State(state): State<AppState>) -> Result<Json<JobsHealthStatus>, ServerError> {
	let scheduler = state
		.scheduler
		.as_ref()
		.ok_or_else(|| ServerError::Internal("job scheduler not configured".to_string()))?;
	Ok(Json(scheduler.health_status()))
}

/// Runs the job to completion (including retries) before responding.
#[tracing::instrument(skip(state))]
pub async fn trigger_job(
	State(state): State<AppState>,
	Path(job_id): Path<String>,
) -> Result<Json<TriggerJobResponse>, ServerError> {
	let scheduler = state
		.scheduler
		.as_ref()
		.ok_or_else(|| ServerError::Internal("job scheduler not configured".to_string()))?;

	let run_id = scheduler.trigger_job(&job_id, TriggerSource::Manual).await?;
	tracing::info!(run_id = %run_id, "job triggered manually");

	Ok(Json(TriggerJobResponse { job_id, run_id }))
}

/// Stops the job's in-flight run. Later scheduled runs are unaffected.
#[tracing::instrument(skip(state))]
pub async fn cancel_job(
	State(state): State<AppState>,
	Path(job_id): Path<String>,
) -> Result<Json<CancelJobResponse>, ServerError> {
	let scheduler = state
		.scheduler
		.as_ref()
		.ok_or_else(|| ServerError::Internal("job scheduler not configured".to_string()))?;

	let cancelled = scheduler.cancel_job(&job_id)?;
	Ok(Json(CancelJobResponse { job_id, cancelled }))
}
