// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Application state and router construction.

use std::sync::Arc;

use axum::{
	middleware,
	routing::{get, post},
	Router,
};
use muster_core::SecretString;
use muster_db::CredentialStore;
use muster_discord::DiscordOAuthClient;
use muster_jobs::JobScheduler;
use muster_provisioning::BatchJoinOrchestrator;

use crate::auth::operator_auth_middleware;
use crate::routes::{exclusions, health, jobs, oauth, runs, stock};

#[derive(Clone)]
pub struct AppState {
	pub orchestrator: Arc<BatchJoinOrchestrator>,
	pub store: Arc<dyn CredentialStore>,
	pub oauth: Arc<DiscordOAuthClient>,
	pub scheduler: Option<Arc<JobScheduler>>,
	pub admin_token: Option<SecretString>,
}

pub fn create_router(state: AppState) -> Router {
	let operator = Router::new()
		.route("/runs", post(runs::start_run))
		.route(
			"/exclusions",
			get(exclusions::list_exclusions).post(exclusions::add_exclusion),
		)
		.route("/stock", get(stock::get_stock))
		.route("/jobs", get(jobs::list_jobs))
		.route("/jobs/{job_id}/run", post(jobs::trigger_job))
		.route("/jobs/{job_id}/cancel", post(jobs::cancel_job))
		.layer(middleware::from_fn_with_state(
			state.admin_token.clone(),
			operator_auth_middleware,
		));

	Router::new()
		.route("/", get(oauth::index))
		.route("/callback", get(oauth::callback))
		.route("/health", get(health::health_check))
		.nest("/api", operator)
		.with_state(state)
}
