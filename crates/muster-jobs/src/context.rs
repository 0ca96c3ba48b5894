// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-run context handed to a [`Job`](crate::Job).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

use crate::error::JobError;
use crate::types::TriggerSource;

pub struct JobContext {
	pub run_id: String,
	pub triggered_by: TriggerSource,
	pub stop: StopSignal,
}

impl JobContext {
	/// Fails with [`JobError::Cancelled`] once a stop has been requested.
	/// Jobs call this between units of work they can abandon safely.
	pub fn checkpoint(&self) -> Result<(), JobError> {
		if self.stop.is_requested() {
			return Err(JobError::Cancelled);
		}
		Ok(())
	}
}

/// Stop request shared by the scheduler and a job's runs.
///
/// A request applies to the run in flight. The scheduler clears it when the
/// next run starts, so cancelling one backup does not disable the schedule.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
	requested: Arc<AtomicBool>,
	notify: Arc<Notify>,
}

impl StopSignal {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn request(&self) {
		self.requested.store(true, Ordering::SeqCst);
		self.notify.notify_waiters();
	}

	pub fn is_requested(&self) -> bool {
		self.requested.load(Ordering::SeqCst)
	}

	pub(crate) fn clear(&self) {
		self.requested.store(false, Ordering::SeqCst);
	}

	/// Resolves once a stop is requested.
	pub async fn requested(&self) {
		loop {
			let notified = self.notify.notified();
			if self.is_requested() {
				return;
			}
			notified.await;
		}
	}
}
