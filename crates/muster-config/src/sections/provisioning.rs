// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Run pacing and per-tier quotas.

use std::time::Duration;

use muster_core::TierQuotas;
use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_PACING_INTERVAL_MS: u64 = 3000;

#[derive(Debug, Clone)]
pub struct ProvisioningConfig {
	pub pacing_interval: Duration,
	pub quotas: TierQuotas,
}

impl Default for ProvisioningConfig {
	fn default() -> Self {
		Self {
			pacing_interval: Duration::from_millis(DEFAULT_PACING_INTERVAL_MS),
			quotas: TierQuotas::default(),
		}
	}
}

/// Overrides for individual tier quotas.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuotasConfigLayer {
	#[serde(default)]
	pub bronze: Option<usize>,
	#[serde(default)]
	pub silver: Option<usize>,
	#[serde(default)]
	pub gold: Option<usize>,
	#[serde(default)]
	pub platinum: Option<usize>,
	#[serde(default)]
	pub diamond: Option<usize>,
}

impl QuotasConfigLayer {
	pub fn merge(&mut self, other: QuotasConfigLayer) {
		if other.bronze.is_some() {
			self.bronze = other.bronze;
		}
		if other.silver.is_some() {
			self.silver = other.silver;
		}
		if other.gold.is_some() {
			self.gold = other.gold;
		}
		if other.platinum.is_some() {
			self.platinum = other.platinum;
		}
		if other.diamond.is_some() {
			self.diamond = other.diamond;
		}
	}

	fn finalize(self) -> TierQuotas {
		let defaults = TierQuotas::default();
		TierQuotas {
			bronze: self.bronze.unwrap_or(defaults.bronze),
			silver: self.silver.unwrap_or(defaults.silver),
			gold: self.gold.unwrap_or(defaults.gold),
			platinum: self.platinum.unwrap_or(defaults.platinum),
			diamond: self.diamond.unwrap_or(defaults.diamond),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvisioningConfigLayer {
	#[serde(default)]
	pub pacing_interval_ms: Option<u64>,
	#[serde(default)]
	pub quotas: Option<QuotasConfigLayer>,
}

impl ProvisioningConfigLayer {
	pub fn merge(&mut self, other: ProvisioningConfigLayer) {
		if other.pacing_interval_ms.is_some() {
			self.pacing_interval_ms = other.pacing_interval_ms;
		}
		match (self.quotas.as_mut(), other.quotas) {
			(Some(base), Some(overlay)) => base.merge(overlay),
			(None, Some(overlay)) => self.quotas = Some(overlay),
			_ => {}
		}
	}

	pub fn finalize(self) -> Result<ProvisioningConfig, ConfigError> {
		let quotas = self.quotas.unwrap_or_default().finalize();
		if !quotas.is_monotonic() {
			return Err(ConfigError::Validation(format!(
				"provisioning.quotas must not decrease from bronze to diamond (got {}/{}/{}/{}/{})",
				quotas.bronze, quotas.silver, quotas.gold, quotas.platinum, quotas.diamond
			)));
		}

		let pacing_interval_ms = self
			.pacing_interval_ms
			.unwrap_or(DEFAULT_PACING_INTERVAL_MS);
		if pacing_interval_ms == 0 {
			return Err(ConfigError::Validation(
				"provisioning.pacing_interval_ms must be greater than zero".to_string(),
			));
		}

		Ok(ProvisioningConfig {
			pacing_interval: Duration::from_millis(pacing_interval_ms),
			quotas,
		})
	}
}
