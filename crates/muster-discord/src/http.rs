// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared HTTP client with a consistent User-Agent header.

use reqwest::{Client, ClientBuilder};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client builder with the Muster User-Agent and a request timeout.
pub fn builder() -> ClientBuilder {
	Client::builder()
		.user_agent(user_agent())
		.timeout(REQUEST_TIMEOUT)
}

pub fn new_client() -> Result<Client, reqwest::Error> {
	builder().build()
}

/// Discord requires bots to send `DiscordBot (url, version)`.
pub fn user_agent() -> String {
	format!(
		"DiscordBot (https://github.com/ghuntley/muster, {})",
		env!("CARGO_PKG_VERSION")
	)
}
