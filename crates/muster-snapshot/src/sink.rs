// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;

use crate::error::SnapshotError;

/// Somewhere a serialized snapshot can be kept.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
	/// Short name for logs, e.g. `file` or `github`.
	fn name(&self) -> &str;

	/// The stored snapshot bytes, or `None` if nothing has been stored yet.
	async fn load(&self) -> Result<Option<Vec<u8>>, SnapshotError>;

	/// Replace the stored snapshot.
	async fn store(&self, bytes: &[u8]) -> Result<(), SnapshotError>;
}
