// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::SnapshotError;
use crate::sink::SnapshotSink;

/// Snapshot kept in a local file, replaced atomically via rename.
#[derive(Debug, Clone)]
pub struct FileSnapshotSink {
	path: PathBuf,
}

impl FileSnapshotSink {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn temp_path(&self) -> PathBuf {
		let mut name = self
			.path
			.file_name()
			.map(|n| n.to_os_string())
			.unwrap_or_else(|| "snapshot".into());
		name.push(".tmp");
		self.path.with_file_name(name)
	}
}

#[async_trait]
impl SnapshotSink for FileSnapshotSink {
	fn name(&self) -> &str {
		"file"
	}

	async fn load(&self) -> Result<Option<Vec<u8>>, SnapshotError> {
		match tokio::fs::read(&self.path).await {
			Ok(bytes) => Ok(Some(bytes)),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
			Err(e) => Err(e.into()),
		}
	}

	#[tracing::instrument(skip(self, bytes), fields(path = %self.path.display(), size = bytes.len()))]
	async fn store(&self, bytes: &[u8]) -> Result<(), SnapshotError> {
		if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
			tokio::fs::create_dir_all(parent).await?;
		}

		let temp = self.temp_path();
		tokio::fs::write(&temp, bytes).await?;
		tokio::fs::rename(&temp, &self.path).await?;
		Ok(())
	}
}
