// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The versioned snapshot document.

use muster_core::{CollectionId, IdentityCredential, IdentityId, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::SnapshotError;

pub const SNAPSHOT_VERSION: u32 = 1;

/// One credential row in plain form. Fields mirror the table exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
	pub identity_id: String,
	pub access_token: String,
	pub refresh_token: String,
	pub expires_at: i64,
}

impl From<&IdentityCredential> for SnapshotRecord {
	fn from(record: &IdentityCredential) -> Self {
		Self {
			identity_id: record.identity_id.to_string(),
			access_token: record.access_token.expose().to_string(),
			refresh_token: record.refresh_token.expose().to_string(),
			expires_at: record.expires_at,
		}
	}
}

impl From<SnapshotRecord> for IdentityCredential {
	fn from(record: SnapshotRecord) -> Self {
		Self {
			identity_id: IdentityId::new(record.identity_id),
			access_token: SecretString::new(record.access_token),
			refresh_token: SecretString::new(record.refresh_token),
			expires_at: record.expires_at,
		}
	}
}

/// Serialized form is deterministic: records sorted by id, targets sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSnapshot {
	pub version: u32,
	pub credentials: Vec<SnapshotRecord>,
	#[serde(default)]
	pub excluded_targets: Vec<String>,
}

impl CredentialSnapshot {
	pub fn new(records: &[IdentityCredential], excluded: &[CollectionId]) -> Self {
		let mut credentials: Vec<SnapshotRecord> = records.iter().map(SnapshotRecord::from).collect();
		credentials.sort_by(|a, b| a.identity_id.cmp(&b.identity_id));

		let mut excluded_targets: Vec<String> = excluded.iter().map(|c| c.to_string()).collect();
		excluded_targets.sort();
		excluded_targets.dedup();

		Self {
			version: SNAPSHOT_VERSION,
			credentials,
			excluded_targets,
		}
	}

	pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
		Ok(serde_json::to_vec_pretty(self)?)
	}

	pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
		let snapshot: Self = serde_json::from_slice(bytes)?;
		if snapshot.version != SNAPSHOT_VERSION {
			return Err(SnapshotError::UnsupportedVersion {
				found: snapshot.version,
				expected: SNAPSHOT_VERSION,
			});
		}
		if snapshot.credentials.iter().any(|r| r.identity_id.is_empty()) {
			return Err(SnapshotError::Malformed("empty identity_id".to_string()));
		}
		Ok(snapshot)
	}

	pub fn into_parts(self) -> (Vec<IdentityCredential>, Vec<CollectionId>) {
		let records = self.credentials.into_iter().map(Into::into).collect();
		let targets = self.excluded_targets.into_iter().map(CollectionId::new).collect();
		(records, targets)
	}
}

/// Hex SHA-256 of serialized snapshot bytes.
pub fn digest(bytes: &[u8]) -> String {
	hex::encode(Sha256::digest(bytes))
}
