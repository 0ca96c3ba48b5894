// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stored delegated-access credentials.

use chrono::Utc;

use crate::ids::IdentityId;
use crate::secret::SecretString;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
	Utc::now().timestamp_millis()
}

/// Token triple minted by the identity provider on code exchange or refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
	pub access_token: SecretString,
	pub refresh_token: SecretString,
	/// Lifetime of `access_token` in seconds.
	pub expires_in: u64,
}

impl TokenGrant {
	pub fn new(
		access_token: impl Into<SecretString>,
		refresh_token: impl Into<SecretString>,
		expires_in: u64,
	) -> Self {
		Self {
			access_token: access_token.into(),
			refresh_token: refresh_token.into(),
			expires_in,
		}
	}

	/// Absolute expiry for a grant received at `now_ms`.
	pub fn expires_at(&self, now_ms: i64) -> i64 {
		let lifetime_ms = i64::try_from(self.expires_in)
			.unwrap_or(i64::MAX)
			.saturating_mul(1000);
		now_ms.saturating_add(lifetime_ms)
	}
}

/// One row of the credential table.
///
/// At most one record exists per `identity_id`; a refresh replaces all four
/// fields together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityCredential {
	pub identity_id: IdentityId,
	pub access_token: SecretString,
	pub refresh_token: SecretString,
	/// Milliseconds since the Unix epoch after which `access_token` is stale.
	pub expires_at: i64,
}

impl IdentityCredential {
	pub fn from_grant(identity_id: IdentityId, grant: &TokenGrant, now_ms: i64) -> Self {
		Self {
			identity_id,
			access_token: grant.access_token.clone(),
			refresh_token: grant.refresh_token.clone(),
			expires_at: grant.expires_at(now_ms),
		}
	}

	pub fn is_expired_at(&self, now_ms: i64) -> bool {
		now_ms >= self.expires_at
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn expires_at_adds_lifetime_in_millis() {
		let grant = TokenGrant::new("access", "refresh", 604_800);
		assert_eq!(grant.expires_at(1_000), 1_000 + 604_800_000);
	}

	#[test]
	fn expires_at_saturates() {
		let grant = TokenGrant::new("access", "refresh", u64::MAX);
		assert_eq!(grant.expires_at(1), i64::MAX);
	}

	#[test]
	fn expiry_boundary_is_inclusive() {
		let record = IdentityCredential {
			identity_id: IdentityId::new("1"),
			access_token: SecretString::new("a"),
			refresh_token: SecretString::new("r"),
			expires_at: 5_000,
		};
		assert!(!record.is_expired_at(4_999));
		assert!(record.is_expired_at(5_000));
		assert!(record.is_expired_at(5_001));
	}

	#[test]
	fn record_debug_hides_tokens() {
		let record = IdentityCredential::from_grant(
			IdentityId::new("42"),
			&TokenGrant::new("access-xyz", "refresh-xyz", 60),
			0,
		);
		let debug = format!("{record:?}");
		assert!(debug.contains("42"));
		assert!(!debug.contains("access-xyz"));
		assert!(!debug.contains("refresh-xyz"));
	}
}
