// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::HashSet;

use muster_core::CollectionId;
use tokio::sync::RwLock;

/// Target guilds that runs are refused for. Entries never expire.
#[derive(Debug, Default)]
pub struct ExclusionList {
	targets: RwLock<HashSet<CollectionId>>,
}

impl ExclusionList {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns `true` if the target was not already excluded.
	#[tracing::instrument(skip(self), fields(target = %target))]
	pub async fn add(&self, target: CollectionId) -> bool {
		let added = self.targets.write().await.insert(target);
		if added {
			tracing::info!("target excluded");
		}
		added
	}

	pub async fn contains(&self, target: &CollectionId) -> bool {
		self.targets.read().await.contains(target)
	}

	/// Sorted copy of every excluded target.
	pub async fn list(&self) -> Vec<CollectionId> {
		let mut targets: Vec<_> = self.targets.read().await.iter().cloned().collect();
		targets.sort();
		targets
	}

	pub async fn extend(&self, targets: impl IntoIterator<Item = CollectionId>) {
		self.targets.write().await.extend(targets);
	}

	pub async fn len(&self) -> usize {
		self.targets.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.targets.read().await.is_empty()
	}
}
