// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Discord clients for Muster.
//!
//! - [`DiscordOAuthClient`] drives the OAuth2 authorization code flow, refreshes
//!   delegated tokens and implements [`muster_core::IdentityProvider`].
//! - [`DiscordGuildClient`] uses the bot token to add members to a guild and
//!   implements [`muster_core::TargetPlatform`].
//!
//! Both clients take an `api_base` so they can be pointed at a mock server.

pub mod guild;
pub mod http;
pub mod oauth;

pub use guild::DiscordGuildClient;
pub use oauth::{
	ConfigError, DiscordOAuthClient, DiscordOAuthConfig, DiscordTokenResponse, DiscordUser,
	OAuthError,
};

/// Default Discord REST API base.
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";
