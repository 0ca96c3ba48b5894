// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use muster_db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("HTTP request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("GitHub API error ({status}): {message}")]
	GitHub { status: u16, message: String },

	#[error("malformed snapshot: {0}")]
	Malformed(String),

	#[error("unsupported snapshot version {found}, expected {expected}")]
	UnsupportedVersion { found: u32, expected: u32 },

	#[error("credential store error: {0}")]
	Store(#[from] DbError),
}

impl From<serde_json::Error> for SnapshotError {
	fn from(e: serde_json::Error) -> Self {
		SnapshotError::Malformed(e.to_string())
	}
}
