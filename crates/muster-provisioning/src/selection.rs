// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Which stored identities a run attempts.
//!
//! Sampling is a partial Fisher-Yates shuffle. [`SelectionPolicy::select`]
//! draws from `rand::thread_rng()`, which is seeded from the OS, so two runs
//! over the same store pick different subsets. [`SelectionPolicy::select_with`]
//! takes any [`Rng`] for reproducible tests.

use muster_core::{PrivilegeTier, RejectReason, TierAllowance, TierQuotas};
use rand::Rng;

/// How many identities an admitted run will take from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPlan {
	All,
	Sample(usize),
}

#[derive(Debug, Clone, Default)]
pub struct SelectionPolicy {
	quotas: TierQuotas,
}

impl SelectionPolicy {
	pub fn new(quotas: TierQuotas) -> Self {
		Self { quotas }
	}

	pub fn quotas(&self) -> &TierQuotas {
		&self.quotas
	}

	/// Validate a request against the caller's tier without touching the store.
	///
	/// The top tier takes `requested` identities, or all of them when no
	/// positive quantity is given. Other tiers take their quota when nothing is
	/// requested and may ask for anything in `1..=quota`.
	pub fn plan(
		&self,
		tier: PrivilegeTier,
		requested: Option<usize>,
	) -> Result<SelectionPlan, RejectReason> {
		match (self.quotas.allowance(tier), requested) {
			(TierAllowance::Denied, _) => Err(RejectReason::QuantityInvalidForTier),
			(TierAllowance::Unlimited, Some(n)) if n > 0 => Ok(SelectionPlan::Sample(n)),
			(TierAllowance::Unlimited, _) => Ok(SelectionPlan::All),
			(TierAllowance::Quota(0), _) => Err(RejectReason::QuantityInvalidForTier),
			(TierAllowance::Quota(quota), None) => Ok(SelectionPlan::Sample(quota)),
			(TierAllowance::Quota(quota), Some(n)) if (1..=quota).contains(&n) => {
				Ok(SelectionPlan::Sample(n))
			}
			(TierAllowance::Quota(_), Some(_)) => Err(RejectReason::QuantityInvalidForTier),
		}
	}

	pub fn select<T>(
		&self,
		records: Vec<T>,
		requested: Option<usize>,
		tier: PrivilegeTier,
	) -> Result<Vec<T>, RejectReason> {
		self.select_with(&mut rand::thread_rng(), records, requested, tier)
	}

	pub fn select_with<T, R: Rng + ?Sized>(
		&self,
		rng: &mut R,
		records: Vec<T>,
		requested: Option<usize>,
		tier: PrivilegeTier,
	) -> Result<Vec<T>, RejectReason> {
		let plan = self.plan(tier, requested)?;
		Ok(Self::apply_with(rng, plan, records))
	}

	/// Carry out an already-validated plan.
	pub fn apply<T>(plan: SelectionPlan, records: Vec<T>) -> Vec<T> {
		Self::apply_with(&mut rand::thread_rng(), plan, records)
	}

	fn apply_with<T, R: Rng + ?Sized>(rng: &mut R, plan: SelectionPlan, records: Vec<T>) -> Vec<T> {
		match plan {
			SelectionPlan::All => records,
			SelectionPlan::Sample(n) => sample_without_replacement(rng, records, n),
		}
	}
}

/// Uniformly pick `k` items without replacement. Returns everything if `k >= len`.
pub fn sample_without_replacement<T, R: Rng + ?Sized>(rng: &mut R, mut items: Vec<T>, k: usize) -> Vec<T> {
	let n = items.len();
	if k >= n {
		return items;
	}
	for i in 0..k {
		let j = rng.gen_range(i..n);
		items.swap(i, j);
	}
	items.truncate(k);
	items
}
