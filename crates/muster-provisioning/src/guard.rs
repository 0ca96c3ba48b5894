// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Single-flight latch for provisioning runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Process-wide latch: at most one run holds it at a time.
///
/// Clones share the same latch.
#[derive(Debug, Clone, Default)]
pub struct RunGuard {
	active: Arc<AtomicBool>,
}

impl RunGuard {
	pub fn new() -> Self {
		Self::default()
	}

	/// Atomically take the latch. Returns `false` if it is already held.
	pub fn try_acquire(&self) -> bool {
		self
			.active
			.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.is_ok()
	}

	/// Clear the latch unconditionally.
	pub fn release(&self) {
		self.active.store(false, Ordering::Release);
	}

	pub fn is_active(&self) -> bool {
		self.active.load(Ordering::Acquire)
	}

	/// Take the latch and tie its release to the returned permit's lifetime.
	pub fn permit(&self) -> Option<RunPermit> {
		self.try_acquire().then(|| RunPermit {
			guard: self.clone(),
		})
	}
}

/// Releases the [`RunGuard`] when dropped, including during unwinding.
#[derive(Debug)]
pub struct RunPermit {
	guard: RunGuard,
}

impl Drop for RunPermit {
	fn drop(&mut self) {
		self.guard.release();
	}
}
