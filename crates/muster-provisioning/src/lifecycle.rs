// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use muster_core::{now_millis, IdentityCredential, IdentityProvider, RefreshError, SecretString, TokenGrant};
use muster_db::{CredentialStore, DbError};

#[derive(Debug, thiserror::Error)]
pub enum RenewError {
	#[error(transparent)]
	Refresh(#[from] RefreshError),

	#[error("failed to persist refreshed credential: {0}")]
	Store(#[from] DbError),
}

impl RenewError {
	/// True only when the provider refused the refresh token.
	pub fn is_credential_invalid(&self) -> bool {
		matches!(self, RenewError::Refresh(e) if e.is_credential_invalid())
	}
}

/// Decides whether a credential is stale and mints replacements.
#[derive(Clone)]
pub struct TokenLifecycle {
	provider: Arc<dyn IdentityProvider>,
	store: Arc<dyn CredentialStore>,
}

impl TokenLifecycle {
	pub fn new(provider: Arc<dyn IdentityProvider>, store: Arc<dyn CredentialStore>) -> Self {
		Self { provider, store }
	}

	pub fn is_expired(record: &IdentityCredential, now_ms: i64) -> bool {
		record.is_expired_at(now_ms)
	}

	/// One call to the provider. No retries.
	pub async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenGrant, RefreshError> {
		self.provider.refresh(refresh_token).await
	}

	/// Refresh `record` and persist the new triple before returning it.
	#[tracing::instrument(skip(self, record), fields(identity_id = %record.identity_id))]
	pub async fn renew(&self, record: &IdentityCredential) -> Result<IdentityCredential, RenewError> {
		let grant = self.refresh(&record.refresh_token).await?;
		let renewed = IdentityCredential::from_grant(record.identity_id.clone(), &grant, now_millis());
		self.store.put_record(&renewed).await?;

		tracing::debug!(expires_at = renewed.expires_at, "credential refreshed");
		Ok(renewed)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use muster_core::IdentityId;
	use muster_db::MemoryCredentialStore;

	struct FixedProvider(Result<TokenGrant, &'static str>);

	#[async_trait]
	impl IdentityProvider for FixedProvider {
		async fn refresh(&self, _refresh_token: &SecretString) -> Result<TokenGrant, RefreshError> {
			self.0.clone().map_err(|e| RefreshError::Rejected(e.to_string()))
		}
	}

	fn expired(id: &str) -> IdentityCredential {
		IdentityCredential {
			identity_id: IdentityId::new(id),
			access_token: SecretString::new("old"),
			refresh_token: SecretString::new("old-refresh"),
			expires_at: 0,
		}
	}

	#[tokio::test]
	async fn renew_persists_new_triple() {
		let store = Arc::new(MemoryCredentialStore::with_records([expired("1")]));
		let lifecycle = TokenLifecycle::new(
			Arc::new(FixedProvider(Ok(TokenGrant::new("new", "new-refresh", 3600)))),
			store.clone(),
		);

		let renewed = lifecycle.renew(&expired("1")).await.unwrap();
		assert!(!TokenLifecycle::is_expired(&renewed, now_millis()));

		let stored = store.get(&IdentityId::new("1")).await.unwrap().unwrap();
		assert_eq!(stored, renewed);
		assert_eq!(stored.refresh_token.expose(), "new-refresh");
	}

	#[tokio::test]
	async fn rejected_refresh_leaves_store_untouched() {
		let store = Arc::new(MemoryCredentialStore::with_records([expired("1")]));
		let lifecycle = TokenLifecycle::new(Arc::new(FixedProvider(Err("invalid_grant"))), store.clone());

		let err = lifecycle.renew(&expired("1")).await.unwrap_err();
		assert!(err.is_credential_invalid());
		assert_eq!(store.get(&IdentityId::new("1")).await.unwrap().unwrap(), expired("1"));
	}

	#[test]
	fn expiry_is_inclusive_of_now() {
		let record = expired("1");
		assert!(TokenLifecycle::is_expired(&record, 0));
		assert!(!TokenLifecycle::is_expired(&record, -1));
	}
}
