// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Caller privilege tiers and their per-run quotas.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Authorization level of the operator triggering a run.
///
/// Tiers are totally ordered; `Admin` is the top tier and is not bound by a
/// quota. `None` is the lowest tier and may not start runs at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivilegeTier {
	None,
	Bronze,
	Silver,
	Gold,
	Platinum,
	Diamond,
	Admin,
}

impl PrivilegeTier {
	pub const ALL: [PrivilegeTier; 7] = [
		PrivilegeTier::None,
		PrivilegeTier::Bronze,
		PrivilegeTier::Silver,
		PrivilegeTier::Gold,
		PrivilegeTier::Platinum,
		PrivilegeTier::Diamond,
		PrivilegeTier::Admin,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			PrivilegeTier::None => "none",
			PrivilegeTier::Bronze => "bronze",
			PrivilegeTier::Silver => "silver",
			PrivilegeTier::Gold => "gold",
			PrivilegeTier::Platinum => "platinum",
			PrivilegeTier::Diamond => "diamond",
			PrivilegeTier::Admin => "admin",
		}
	}

	/// Highest tier in `tiers`, or `None` when the caller holds nothing.
	pub fn highest(tiers: impl IntoIterator<Item = PrivilegeTier>) -> PrivilegeTier {
		tiers.into_iter().max().unwrap_or(PrivilegeTier::None)
	}
}

impl fmt::Display for PrivilegeTier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown privilege tier: {0}")]
pub struct ParseTierError(pub String);

impl FromStr for PrivilegeTier {
	type Err = ParseTierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		PrivilegeTier::ALL
			.into_iter()
			.find(|tier| tier.as_str().eq_ignore_ascii_case(s.trim()))
			.ok_or_else(|| ParseTierError(s.to_string()))
	}
}

/// What a tier is allowed to request in a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierAllowance {
	Unlimited,
	Quota(usize),
	Denied,
}

/// Fixed per-tier quotas for everything below the top tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierQuotas {
	pub bronze: usize,
	pub silver: usize,
	pub gold: usize,
	pub platinum: usize,
	pub diamond: usize,
}

impl Default for TierQuotas {
	fn default() -> Self {
		Self {
			bronze: 4,
			silver: 10,
			gold: 15,
			platinum: 25,
			diamond: 30,
		}
	}
}

impl TierQuotas {
	pub fn allowance(&self, tier: PrivilegeTier) -> TierAllowance {
		match tier {
			PrivilegeTier::None => TierAllowance::Denied,
			PrivilegeTier::Bronze => TierAllowance::Quota(self.bronze),
			PrivilegeTier::Silver => TierAllowance::Quota(self.silver),
			PrivilegeTier::Gold => TierAllowance::Quota(self.gold),
			PrivilegeTier::Platinum => TierAllowance::Quota(self.platinum),
			PrivilegeTier::Diamond => TierAllowance::Quota(self.diamond),
			PrivilegeTier::Admin => TierAllowance::Unlimited,
		}
	}

	/// True when quotas never decrease as the tier rises.
	pub fn is_monotonic(&self) -> bool {
		let ordered = [
			self.bronze,
			self.silver,
			self.gold,
			self.platinum,
			self.diamond,
		];
		ordered.windows(2).all(|pair| pair[0] <= pair[1])
	}
}
