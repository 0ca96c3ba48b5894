// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background job scheduler for Muster server.
//!
//! Runs periodic background tasks (the credential snapshot) with retry
//! support and health reporting. Run history is kept in memory for the life
//! of the process.

pub mod context;
pub mod error;
pub mod health;
pub mod history;
pub mod job;
pub mod scheduler;
pub mod types;

pub use context::{JobContext, StopSignal};
pub use error::{JobError, Result};
pub use health::{HealthState, JobHealthStatus, JobsHealthStatus, LastRunInfo};
pub use history::RunHistory;
pub use job::Job;
pub use scheduler::JobScheduler;
pub use types::{JobOutput, JobRun, JobStatus, TriggerSource};
