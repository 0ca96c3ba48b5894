// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The batch join state machine.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use muster_core::{
	now_millis, CollectionId, EnrollOutcome, IdentityCredential, IdentityProvider, PrivilegeTier,
	ProvisioningReport, RejectReason, TargetPlatform, TierQuotas,
};
use muster_db::{CredentialStore, DbError};
use tokio::time::Instant;

use crate::error::ProvisionError;
use crate::exclusion::ExclusionList;
use crate::guard::RunGuard;
use crate::lifecycle::TokenLifecycle;
use crate::selection::SelectionPolicy;

pub const DEFAULT_PACING_INTERVAL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone)]
pub struct ProvisioningSettings {
	/// Minimum delay between consecutive identities in a run.
	pub pacing_interval: Duration,
	pub quotas: TierQuotas,
}

impl Default for ProvisioningSettings {
	fn default() -> Self {
		Self {
			pacing_interval: DEFAULT_PACING_INTERVAL,
			quotas: TierQuotas::default(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdentityOutcome {
	Succeeded,
	Failed,
	Pruned,
}

/// Drives provisioning runs. Share it behind an `Arc`; every trigger path
/// goes through the same instance and therefore the same [`RunGuard`].
pub struct BatchJoinOrchestrator {
	store: Arc<dyn CredentialStore>,
	lifecycle: TokenLifecycle,
	platform: Arc<dyn TargetPlatform>,
	selection: SelectionPolicy,
	exclusions: Arc<ExclusionList>,
	guard: RunGuard,
	pacing_interval: Duration,
}

impl BatchJoinOrchestrator {
	pub fn new(
		store: Arc<dyn CredentialStore>,
		provider: Arc<dyn IdentityProvider>,
		platform: Arc<dyn TargetPlatform>,
		exclusions: Arc<ExclusionList>,
		settings: ProvisioningSettings,
	) -> Self {
		Self {
			lifecycle: TokenLifecycle::new(provider, store.clone()),
			store,
			platform,
			selection: SelectionPolicy::new(settings.quotas),
			exclusions,
			guard: RunGuard::new(),
			pacing_interval: settings.pacing_interval,
		}
	}

	pub fn exclusions(&self) -> &Arc<ExclusionList> {
		&self.exclusions
	}

	pub fn is_running(&self) -> bool {
		self.guard.is_active()
	}

	pub async fn exclude(&self, target: CollectionId) -> bool {
		self.exclusions.add(target).await
	}

	pub async fn stock_count(&self) -> Result<usize, DbError> {
		self.store.count().await
	}

	/// Run one provisioning pass against `target`.
	///
	/// Admission failures return [`ProvisionError::Rejected`] with no side
	/// effects. Once admitted the run always completes and returns exact counts;
	/// per-identity failures are absorbed into the report.
	#[tracing::instrument(skip(self), fields(target = %target, tier = %tier))]
	pub async fn run(
		&self,
		target: CollectionId,
		requested: Option<usize>,
		tier: PrivilegeTier,
	) -> Result<ProvisioningReport, ProvisionError> {
		let plan = self.selection.plan(tier, requested).map_err(|reason| {
			tracing::info!(run_outcome = %reason, ?requested, "run rejected");
			ProvisionError::Rejected(reason)
		})?;

		self.admit(&target).await.map_err(|reason| {
			tracing::info!(run_outcome = %reason, "run rejected");
			ProvisionError::Rejected(reason)
		})?;

		let Some(_permit) = self.guard.permit() else {
			tracing::info!(run_outcome = %RejectReason::AlreadyRunning, "run rejected");
			return Err(ProvisionError::Rejected(RejectReason::AlreadyRunning));
		};

		let started_at = Utc::now();
		let clock = Instant::now();

		let work = SelectionPolicy::apply(plan, self.store.get_all().await?);
		tracing::info!(work_list = work.len(), ?plan, "run admitted");

		let mut report = ProvisioningReport::empty(target.clone(), started_at);
		let total = work.len();
		for (index, record) in work.iter().enumerate() {
			report.attempted += 1;
			match self.provision_identity(&target, record).await {
				IdentityOutcome::Succeeded => report.succeeded += 1,
				IdentityOutcome::Failed => report.failed += 1,
				IdentityOutcome::Pruned => {
					report.failed += 1;
					report.pruned += 1;
				}
			}

			if index + 1 < total {
				tokio::time::sleep(self.pacing_interval).await;
			}
		}

		report.duration_ms = u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX);
		tracing::info!(
			run_outcome = "completed",
			attempted = report.attempted,
			succeeded = report.succeeded,
			failed = report.failed,
			pruned = report.pruned,
			duration_ms = report.duration_ms,
			"run completed"
		);
		Ok(report)
	}

	async fn admit(&self, target: &CollectionId) -> Result<(), RejectReason> {
		if self.exclusions.contains(target).await {
			return Err(RejectReason::TargetExcluded);
		}

		match self.platform.can_reach(target).await {
			Ok(true) => Ok(()),
			Ok(false) => Err(RejectReason::TargetUnreachable),
			Err(e) => {
				tracing::warn!(error = %e, "reachability check failed");
				Err(RejectReason::TargetUnreachable)
			}
		}
	}

	/// The whole per-identity retry policy.
	///
	/// An unexpired record is tried as stored. An unauthorized answer, or a
	/// record already past `expires_at`, leads to one refresh followed by one
	/// enroll with the new token. Credentials that fail to refresh, or are
	/// refused again after refreshing, are deleted.
	#[tracing::instrument(skip(self, target, record), fields(identity_id = %record.identity_id))]
	async fn provision_identity(
		&self,
		target: &CollectionId,
		record: &IdentityCredential,
	) -> IdentityOutcome {
		if !TokenLifecycle::is_expired(record, now_millis()) {
			let outcome = self
				.platform
				.enroll(target, &record.identity_id, &record.access_token)
				.await;
			match outcome {
				EnrollOutcome::Enrolled { already_member } => {
					tracing::debug!(already_member, "identity enrolled");
					return IdentityOutcome::Succeeded;
				}
				EnrollOutcome::Unauthorized => {
					tracing::debug!("stored token refused, refreshing");
				}
				other => {
					tracing::warn!(outcome = ?other, "enroll failed");
					return IdentityOutcome::Failed;
				}
			}
		}

		let renewed = match self.lifecycle.renew(record).await {
			Ok(renewed) => renewed,
			Err(e) if e.is_credential_invalid() => {
				tracing::warn!(error = %e, "refresh rejected");
				return self.prune(record).await;
			}
			Err(e) => {
				tracing::warn!(error = %e, "refresh failed, keeping credential");
				return IdentityOutcome::Failed;
			}
		};

		match self
			.platform
			.enroll(target, &renewed.identity_id, &renewed.access_token)
			.await
		{
			EnrollOutcome::Enrolled { already_member } => {
				tracing::debug!(already_member, "identity enrolled after refresh");
				IdentityOutcome::Succeeded
			}
			EnrollOutcome::Unauthorized => {
				tracing::warn!("refreshed token refused");
				self.prune(record).await
			}
			other => {
				tracing::warn!(outcome = ?other, "enroll failed after refresh");
				IdentityOutcome::Failed
			}
		}
	}

	async fn prune(&self, record: &IdentityCredential) -> IdentityOutcome {
		match self.store.delete(&record.identity_id).await {
			Ok(_) => {
				tracing::info!(identity_id = %record.identity_id, "dead credential pruned");
				IdentityOutcome::Pruned
			}
			Err(e) => {
				tracing::error!(identity_id = %record.identity_id, error = %e, "failed to prune credential");
				IdentityOutcome::Failed
			}
		}
	}
}
