// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::{extract::State, Json};
use muster_core::CollectionId;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::error::ServerError;

#[derive(Debug, Deserialize)]
pub struct AddExclusionRequest {
	pub target: String,
}

#[derive(Debug, Serialize)]
pub struct AddExclusionResponse {
	pub target: CollectionId,
	/// False when the target was already excluded.
	pub added: bool,
}

#[derive(Debug, Serialize)]
pub struct ExclusionListResponse {
	pub targets: Vec<CollectionId>,
}

pub async fn add_exclusion(
	State(state): State<AppState>,
	Json(request): Json<AddExclusionRequest>,
) -> Result<Json<AddExclusionResponse>, ServerError> {
	let target = request.target.trim();
	if target.is_empty() {
		return Err(ServerError::BadRequest("target must not be empty".to_string()));
	}

	let target = CollectionId::new(target);
	let added = state.orchestrator.exclude(target.clone()).await;
	if added {
		tracing::info!(target = %target, "target excluded");
	}

	Ok(Json(AddExclusionResponse { target, added }))
}

pub async fn list_exclusions(State(state): State<AppState>) -> Json<ExclusionListResponse> {
	Json(ExclusionListResponse {
		targets: state.orchestrator.exclusions().list().await,
	})
}
