// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use muster_db::CredentialStore;
use muster_provisioning::ExclusionList;
use tokio::sync::Mutex;

use crate::document::{digest, CredentialSnapshot};
use crate::error::SnapshotError;
use crate::sink::SnapshotSink;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
	Pushed { records: usize, digest: String },
	/// Content identical to the last push or restore; nothing was written.
	Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
	Restored {
		/// Records written from the snapshot.
		records: usize,
		excluded: usize,
		/// Snapshot records skipped because the local copy is as new or newer.
		kept_local: usize,
	},
	/// The sink had nothing stored.
	Empty,
}

pub struct SnapshotService {
	store: Arc<dyn CredentialStore>,
	exclusions: Arc<ExclusionList>,
	sink: Arc<dyn SnapshotSink>,
	last_digest: Mutex<Option<String>>,
}

impl SnapshotService {
	pub fn new(
		store: Arc<dyn CredentialStore>,
		exclusions: Arc<ExclusionList>,
		sink: Arc<dyn SnapshotSink>,
	) -> Self {
		Self {
			store,
			exclusions,
			sink,
			last_digest: Mutex::new(None),
		}
	}

	pub fn sink_name(&self) -> &str {
		self.sink.name()
	}

	/// Capture the current store contents and exclusion list.
	pub async fn take(&self) -> Result<CredentialSnapshot, SnapshotError> {
		let records = self.store.get_all().await?;
		let excluded = self.exclusions.list().await;
		Ok(CredentialSnapshot::new(&records, &excluded))
	}

	/// Push a snapshot to the sink unless it matches the last one pushed.
	#[tracing::instrument(skip(self), fields(sink = self.sink.name()))]
	pub async fn backup(&self) -> Result<BackupOutcome, SnapshotError> {
		let snapshot = self.take().await?;
		let bytes = snapshot.to_bytes()?;
		let current = digest(&bytes);

		let mut last = self.last_digest.lock().await;
		if last.as_deref() == Some(current.as_str()) {
			tracing::debug!(digest = %current, "snapshot unchanged, skipping push");
			return Ok(BackupOutcome::Unchanged);
		}

		self.sink.store(&bytes).await?;
		*last = Some(current.clone());

		let records = snapshot.credentials.len();
		tracing::info!(records, digest = %current, "credential snapshot pushed");
		Ok(BackupOutcome::Pushed {
			records,
			digest: current,
		})
	}

	/// Load the stored snapshot and merge it into the store.
	///
	/// A snapshot record replaces the local one only when it expires later.
	/// Refresh tokens rotate on every refresh, so an older pair from the
	/// snapshot would already be dead. Records absent from the snapshot are
	/// left alone.
	#[tracing::instrument(skip(self), fields(sink = self.sink.name()))]
	pub async fn restore(&self) -> Result<RestoreOutcome, SnapshotError> {
		let Some(bytes) = self.sink.load().await? else {
			tracing::info!("no stored snapshot, starting empty");
			return Ok(RestoreOutcome::Empty);
		};

		let (records, excluded) = CredentialSnapshot::from_bytes(&bytes)?.into_parts();
		let mut written = 0;
		let mut kept_local = 0;
		for record in &records {
			match self.store.get(&record.identity_id).await? {
				Some(local) if local.expires_at >= record.expires_at => {
					tracing::debug!(identity_id = %record.identity_id, "local credential is newer, keeping it");
					kept_local += 1;
				}
				_ => {
					self.store.put_record(record).await?;
					written += 1;
				}
			}
		}
		let excluded_count = excluded.len();
		self.exclusions.extend(excluded).await;

		*self.last_digest.lock().await = Some(digest(&bytes));

		tracing::info!(
			records = written,
			excluded = excluded_count,
			kept_local,
			"credential snapshot restored"
		);
		Ok(RestoreOutcome::Restored {
			records: written,
			excluded: excluded_count,
			kept_local,
		})
	}
}
