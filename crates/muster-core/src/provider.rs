// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! External collaborators driven by the provisioning engine.
//!
//! [`IdentityProvider`] mints fresh tokens from a refresh token and
//! [`TargetPlatform`] enrolls identities into a guild. The Discord crate
//! implements both over HTTP; tests implement them in memory.

use std::time::Duration;

use async_trait::async_trait;

use crate::credential::TokenGrant;
use crate::ids::{CollectionId, IdentityId};
use crate::secret::SecretString;

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
	/// The provider refused the refresh token; the user revoked consent or the
	/// token aged out. The credential is dead.
	#[error("refresh token rejected: {0}")]
	Rejected(String),

	/// The provider refused the request for a reason unrelated to the refresh
	/// token, such as bad client credentials. The credential is kept.
	#[error("refresh request refused: {0}")]
	Refused(String),

	/// The provider could not be reached or answered with a server error.
	#[error("refresh transport error: {0}")]
	Transport(String),
}

impl RefreshError {
	pub fn is_credential_invalid(&self) -> bool {
		matches!(self, RefreshError::Rejected(_))
	}
}

/// Result of a single enroll call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollOutcome {
	Enrolled { already_member: bool },
	Unauthorized,
	RateLimited { retry_after: Option<Duration> },
	Failed { status: Option<u16>, reason: String },
}

impl EnrollOutcome {
	pub fn is_success(&self) -> bool {
		matches!(self, EnrollOutcome::Enrolled { .. })
	}
}

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
	#[error("platform request failed: {0}")]
	Request(String),

	#[error("unexpected platform response ({status}): {body}")]
	Unexpected { status: u16, body: String },
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
	/// Exchange a refresh token for a new token triple. Never retries.
	async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenGrant, RefreshError>;
}

#[async_trait]
pub trait TargetPlatform: Send + Sync {
	/// Whether the acting principal can enroll members into `collection`.
	async fn can_reach(&self, collection: &CollectionId) -> Result<bool, PlatformError>;

	/// Add `identity` to `collection` on its own behalf.
	///
	/// Transport failures are folded into [`EnrollOutcome::Failed`]; an enroll
	/// attempt always produces an outcome.
	async fn enroll(
		&self,
		collection: &CollectionId,
		identity: &IdentityId,
		access_token: &SecretString,
	) -> EnrollOutcome;
}
