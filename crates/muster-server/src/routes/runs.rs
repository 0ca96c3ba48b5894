// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::{extract::State, Json};
use muster_core::{CollectionId, PrivilegeTier, ProvisioningReport};
use serde::Deserialize;

use crate::api::AppState;
use crate::error::ServerError;

/// Body of `POST /api/runs`.
///
/// The caller's privilege is the highest of `tier` and every entry of
/// `tiers`. Names that are not a known tier are ignored.
#[derive(Debug, Deserialize)]
pub struct StartRunRequest {
	pub target: String,
	#[serde(default)]
	pub quantity: Option<usize>,
	#[serde(default)]
	pub tier: Option<String>,
	#[serde(default)]
	pub tiers: Vec<String>,
}

impl StartRunRequest {
	pub fn effective_tier(&self) -> PrivilegeTier {
		PrivilegeTier::highest(
			self.tier
				.iter()
				.chain(self.tiers.iter())
				.filter_map(|name| name.parse().ok()),
		)
	}
}

/// Blocks until the run completes and returns its report.
///
/// The run executes on its own task: once admitted it drains to completion
/// even if the client goes away before the report is ready.
pub async fn start_run(
	State(state): State<AppState>,
	Json(request): Json<StartRunRequest>,
) -> Result<Json<ProvisioningReport>, ServerError> {
	let target = request.target.trim();
	if target.is_empty() {
		return Err(ServerError::BadRequest("target must not be empty".to_string()));
	}

	let tier = request.effective_tier();
	let target = CollectionId::new(target);
	let quantity = request.quantity;
	let orchestrator = state.orchestrator.clone();
	let run = tokio::spawn(async move { orchestrator.run(target, quantity, tier).await });

	let report = run
		.await
		.map_err(|e| ServerError::Internal(format!("run task failed: {e}")))??;

	Ok(Json(report))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn request(tier: Option<&str>, tiers: &[&str]) -> StartRunRequest {
		StartRunRequest {
			target: "g".to_string(),
			quantity: None,
			tier: tier.map(str::to_string),
			tiers: tiers.iter().map(|t| t.to_string()).collect(),
		}
	}

	#[test]
	fn highest_named_tier_wins() {
		assert_eq!(
			request(Some("silver"), &["Gold", "moderator", "bronze"]).effective_tier(),
			PrivilegeTier::Gold
		);
	}

	#[test]
	fn unknown_or_missing_tiers_are_none() {
		assert_eq!(request(None, &[]).effective_tier(), PrivilegeTier::None);
		assert_eq!(request(Some("vip"), &[]).effective_tier(), PrivilegeTier::None);
	}
}
