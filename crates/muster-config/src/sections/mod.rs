// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections for muster-server.

pub mod admin;
pub mod database;
pub mod discord;
pub mod http;
pub mod logging;
pub mod provisioning;
pub mod snapshot;

pub use admin::{AdminConfig, AdminConfigLayer};
pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use discord::{DiscordConfig, DiscordConfigLayer, DEFAULT_DISCORD_API_BASE};
pub use http::{HttpConfig, HttpConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
pub use provisioning::{ProvisioningConfig, ProvisioningConfigLayer, QuotasConfigLayer};
pub use snapshot::{
	GitHubBackendConfig, GitHubBackendConfigLayer, SnapshotBackend, SnapshotConfig,
	SnapshotConfigLayer, SnapshotTarget,
};
