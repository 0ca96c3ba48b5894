// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Operator API credentials.

use muster_core::SecretString;
use serde::Deserialize;

#[derive(Debug, Clone, Default)]
pub struct AdminConfig {
	/// Bearer token for `/api/*`. When unset every operator request is refused.
	pub api_token: Option<SecretString>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminConfigLayer {
	#[serde(default)]
	pub api_token: Option<SecretString>,
}

impl AdminConfigLayer {
	pub fn merge(&mut self, other: AdminConfigLayer) {
		if other.api_token.is_some() {
			self.api_token = other.api_token;
		}
	}

	pub fn finalize(self) -> AdminConfig {
		AdminConfig {
			api_token: self.api_token.filter(|t| !t.is_empty()),
		}
	}
}
