// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use muster_core::RejectReason;
use muster_db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
	#[error("run rejected: {0}")]
	Rejected(RejectReason),

	#[error("credential store error: {0}")]
	Store(#[from] DbError),
}

impl ProvisionError {
	pub fn reject_reason(&self) -> Option<RejectReason> {
		match self {
			ProvisionError::Rejected(reason) => Some(*reason),
			ProvisionError::Store(_) => None,
		}
	}
}

impl From<RejectReason> for ProvisionError {
	fn from(reason: RejectReason) -> Self {
		ProvisionError::Rejected(reason)
	}
}
