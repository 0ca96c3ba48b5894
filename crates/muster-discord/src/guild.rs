// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Guild membership calls made with the bot token.

use std::time::Duration;

use async_trait::async_trait;
use muster_core::{
	CollectionId, EnrollOutcome, IdentityId, PlatformError, SecretString, TargetPlatform,
};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::DEFAULT_API_BASE;

/// Discord JSON error code: the user's OAuth2 access token is invalid.
const INVALID_OAUTH_TOKEN: u64 = 50025;

#[derive(Serialize)]
struct AddMemberRequest<'a> {
	access_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiError {
	#[serde(default)]
	code: Option<u64>,
	#[serde(default)]
	message: Option<String>,
	#[serde(default)]
	retry_after: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct DiscordGuildClient {
	http_client: reqwest::Client,
	api_base: String,
	bot_token: SecretString,
}

impl DiscordGuildClient {
	pub fn new(bot_token: SecretString) -> Result<Self, reqwest::Error> {
		Ok(Self::with_http_client(
			crate::http::new_client()?,
			DEFAULT_API_BASE,
			bot_token,
		))
	}

	pub fn with_http_client(
		http_client: reqwest::Client,
		api_base: impl Into<String>,
		bot_token: SecretString,
	) -> Self {
		Self {
			http_client,
			api_base: api_base.into().trim_end_matches('/').to_string(),
			bot_token,
		}
	}

	pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
		self.api_base = api_base.into().trim_end_matches('/').to_string();
		self
	}

	fn bot_auth(&self) -> String {
		format!("Bot {}", self.bot_token.expose())
	}

	async fn classify_enroll(response: Response) -> EnrollOutcome {
		let status = response.status();
		match status {
			StatusCode::CREATED => EnrollOutcome::Enrolled {
				already_member: false,
			},
			StatusCode::NO_CONTENT | StatusCode::OK => EnrollOutcome::Enrolled {
				already_member: true,
			},
			StatusCode::TOO_MANY_REQUESTS => {
				let header = retry_after_header(&response);
				let body = response.text().await.unwrap_or_default();
				let retry_after = header.or_else(|| {
					serde_json::from_str::<ApiError>(&body)
						.ok()
						.and_then(|e| e.retry_after)
						.and_then(seconds_to_duration)
				});
				EnrollOutcome::RateLimited { retry_after }
			}
			StatusCode::UNAUTHORIZED => EnrollOutcome::Unauthorized,
			StatusCode::FORBIDDEN => {
				let body = response.text().await.unwrap_or_default();
				let api_error = serde_json::from_str::<ApiError>(&body).ok();
				match api_error.as_ref().and_then(|e| e.code) {
					Some(INVALID_OAUTH_TOKEN) => EnrollOutcome::Unauthorized,
					// Bans, missing bot permissions and guild limits are about the
					// target, not the user's token.
					code => EnrollOutcome::Failed {
						status: Some(status.as_u16()),
						reason: api_error
							.and_then(|e| e.message)
							.or_else(|| code.map(|c| format!("discord error code {c}")))
							.unwrap_or(body),
					},
				}
			}
			_ => {
				let body = response.text().await.unwrap_or_default();
				let reason = serde_json::from_str::<ApiError>(&body)
					.ok()
					.and_then(|e| e.message)
					.unwrap_or(body);
				EnrollOutcome::Failed {
					status: Some(status.as_u16()),
					reason,
				}
			}
		}
	}
}

fn retry_after_header(response: &Response) -> Option<Duration> {
	response
		.headers()
		.get("retry-after")
		.and_then(|v| v.to_str().ok())
		.and_then(|v| v.trim().parse::<f64>().ok())
		.and_then(seconds_to_duration)
}

fn seconds_to_duration(secs: f64) -> Option<Duration> {
	Duration::try_from_secs_f64(secs).ok()
}

#[async_trait]
impl TargetPlatform for DiscordGuildClient {
	#[tracing::instrument(skip(self), fields(target = %collection))]
	async fn can_reach(&self, collection: &CollectionId) -> Result<bool, PlatformError> {
		let response = self
			.http_client
			.get(format!("{}/guilds/{}", self.api_base, collection))
			.header("Authorization", self.bot_auth())
			.send()
			.await
			.map_err(|e| PlatformError::Request(e.to_string()))?;

		match response.status() {
			StatusCode::OK => Ok(true),
			StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(false),
			status => {
				let body = response.text().await.unwrap_or_default();
				Err(PlatformError::Unexpected {
					status: status.as_u16(),
					body,
				})
			}
		}
	}

	#[tracing::instrument(skip(self, access_token), fields(target = %collection, identity_id = %identity))]
	async fn enroll(
		&self,
		collection: &CollectionId,
		identity: &IdentityId,
		access_token: &SecretString,
	) -> EnrollOutcome {
		let result = self
			.http_client
			.put(format!(
				"{}/guilds/{}/members/{}",
				self.api_base, collection, identity
			))
			.header("Authorization", self.bot_auth())
			.json(&AddMemberRequest {
				access_token: access_token.expose(),
			})
			.send()
			.await;

		let outcome = match result {
			Ok(response) => Self::classify_enroll(response).await,
			Err(e) => EnrollOutcome::Failed {
				status: None,
				reason: e.to_string(),
			},
		};

		tracing::debug!(?outcome, "enroll call finished");
		outcome
	}
}
