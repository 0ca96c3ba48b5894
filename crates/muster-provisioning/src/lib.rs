// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bulk membership provisioning engine.
//!
//! A run takes a target guild, an optional quantity and the caller's
//! [`PrivilegeTier`](muster_core::PrivilegeTier), and moves through
//! `Idle → Admitted → Draining → Completed`:
//!
//! 1. Admission: quantity checked against the tier, target checked against the
//!    [`ExclusionList`] and for reachability, then the [`RunGuard`] is taken.
//! 2. The [`SelectionPolicy`] fixes the work list once.
//! 3. Each identity is enrolled in order, with one refresh-and-retry for stale
//!    credentials handled by [`TokenLifecycle`], and a fixed pacing delay
//!    between identities.
//! 4. The report is assembled and the guard released.

pub mod error;
pub mod exclusion;
pub mod guard;
pub mod lifecycle;
pub mod orchestrator;
pub mod selection;

pub use error::ProvisionError;
pub use exclusion::ExclusionList;
pub use guard::{RunGuard, RunPermit};
pub use lifecycle::{RenewError, TokenLifecycle};
pub use orchestrator::{BatchJoinOrchestrator, ProvisioningSettings, DEFAULT_PACING_INTERVAL};
pub use selection::{sample_without_replacement, SelectionPlan, SelectionPolicy};
