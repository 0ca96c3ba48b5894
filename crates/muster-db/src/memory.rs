// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::HashMap;

use async_trait::async_trait;
use muster_core::{now_millis, IdentityCredential, IdentityId, TokenGrant};
use tokio::sync::RwLock;

use crate::credential::CredentialStore;
use crate::error::DbError;

/// In-memory credential store, for tests and throwaway deployments.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
	records: RwLock<HashMap<IdentityId, IdentityCredential>>,
}

impl MemoryCredentialStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_records(records: impl IntoIterator<Item = IdentityCredential>) -> Self {
		let records = records
			.into_iter()
			.map(|r| (r.identity_id.clone(), r))
			.collect();
		Self {
			records: RwLock::new(records),
		}
	}
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
	async fn put(
		&self,
		identity_id: &IdentityId,
		grant: &TokenGrant,
	) -> Result<IdentityCredential, DbError> {
		let record = IdentityCredential::from_grant(identity_id.clone(), grant, now_millis());
		self.put_record(&record).await?;
		Ok(record)
	}

	async fn put_record(&self, record: &IdentityCredential) -> Result<(), DbError> {
		let mut records = self.records.write().await;
		records.insert(record.identity_id.clone(), record.clone());
		Ok(())
	}

	async fn get(&self, identity_id: &IdentityId) -> Result<Option<IdentityCredential>, DbError> {
		Ok(self.records.read().await.get(identity_id).cloned())
	}

	async fn get_all(&self) -> Result<Vec<IdentityCredential>, DbError> {
		Ok(self.records.read().await.values().cloned().collect())
	}

	async fn delete(&self, identity_id: &IdentityId) -> Result<bool, DbError> {
		Ok(self.records.write().await.remove(identity_id).is_some())
	}

	async fn count(&self) -> Result<usize, DbError> {
		Ok(self.records.read().await.len())
	}
}
