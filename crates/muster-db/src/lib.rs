// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Durable credential table for Muster.
//!
//! The [`CredentialStore`] trait is the only way the rest of the system reads
//! or mutates stored credentials. [`CredentialRepository`] backs it with SQLite
//! and [`MemoryCredentialStore`] keeps everything in a map for tests and
//! ephemeral deployments.

pub mod credential;
pub mod error;
pub mod memory;
pub mod migrations;
pub mod pool;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use credential::{CredentialRepository, CredentialStore};
pub use error::{DbError, Result};
pub use memory::MemoryCredentialStore;
pub use migrations::run_migrations;
pub use pool::create_pool;
pub use sqlx::sqlite::SqlitePool;
