// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use tokio::time::Instant;

use crate::api::AppState;
use crate::health::{
	aggregate_status, check_database, check_jobs, HealthComponents, HealthResponse, HealthStatus,
};

/// Returns 503 only when a component is unhealthy.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
	let start = Instant::now();

	let database = check_database(state.store.as_ref()).await;
	let jobs = check_jobs(state.scheduler.as_ref());

	let components = HealthComponents { database, jobs };
	let status = aggregate_status(&components);

	let response = HealthResponse {
		status,
		timestamp: Utc::now().to_rfc3339(),
		duration_ms: start.elapsed().as_millis() as u64,
		version: env!("CARGO_PKG_VERSION"),
		run_active: state.orchestrator.is_running(),
		components,
	};

	let http_status = match status {
		HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
		HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
	};

	(http_status, Json(response))
}
