// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::CollectionId;

/// Outcome counts for one completed provisioning run.
///
/// `succeeded + failed == attempted` always holds once a report is returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningReport {
	pub target: CollectionId,
	pub attempted: usize,
	pub succeeded: usize,
	pub failed: usize,
	/// Records deleted during the run because their credentials were dead.
	pub pruned: usize,
	pub started_at: DateTime<Utc>,
	pub duration_ms: u64,
}

impl ProvisioningReport {
	pub fn empty(target: CollectionId, started_at: DateTime<Utc>) -> Self {
		Self {
			target,
			attempted: 0,
			succeeded: 0,
			failed: 0,
			pruned: 0,
			started_at,
			duration_ms: 0,
		}
	}
}

/// Why a run was refused at admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
	AlreadyRunning,
	TargetExcluded,
	TargetUnreachable,
	QuantityInvalidForTier,
}

impl RejectReason {
	pub fn as_str(&self) -> &'static str {
		match self {
			RejectReason::AlreadyRunning => "already-running",
			RejectReason::TargetExcluded => "target-excluded",
			RejectReason::TargetUnreachable => "target-unreachable",
			RejectReason::QuantityInvalidForTier => "quantity-invalid-for-tier",
		}
	}
}

impl fmt::Display for RejectReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
