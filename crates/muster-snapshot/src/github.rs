// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Snapshot kept as a file in a GitHub repository via the contents API.
//!
//! `load` is a `GET /repos/{owner}/{repo}/contents/{path}?ref={branch}`; a 404
//! means nothing has been backed up yet. `store` looks up the current blob
//! sha (if any) and `PUT`s the new base64 content on top of it.

use async_trait::async_trait;
use base64::prelude::*;
use muster_core::SecretString;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;
use crate::sink::SnapshotSink;

pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_SNAPSHOT_PATH: &str = "data/credentials.json";
const COMMIT_MESSAGE: &str = "Automated credential snapshot";

#[derive(Debug, Clone)]
pub struct GitHubSnapshotConfig {
	pub owner: String,
	pub repo: String,
	pub branch: String,
	/// Path of the snapshot file inside the repository.
	pub path: String,
	pub token: SecretString,
	pub api_base: String,
}

impl GitHubSnapshotConfig {
	pub fn new(owner: impl Into<String>, repo: impl Into<String>, token: SecretString) -> Self {
		Self {
			owner: owner.into(),
			repo: repo.into(),
			branch: DEFAULT_BRANCH.to_string(),
			path: DEFAULT_SNAPSHOT_PATH.to_string(),
			token,
			api_base: DEFAULT_GITHUB_API.to_string(),
		}
	}
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
	sha: String,
	#[serde(default)]
	content: String,
	#[serde(default)]
	encoding: String,
}

#[derive(Serialize)]
struct PutContentsRequest<'a> {
	message: &'a str,
	content: String,
	branch: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct GitHubErrorBody {
	#[serde(default)]
	message: String,
}

pub struct GitHubSnapshotSink {
	config: GitHubSnapshotConfig,
	http_client: reqwest::Client,
}

impl GitHubSnapshotSink {
	pub fn new(config: GitHubSnapshotConfig, http_client: reqwest::Client) -> Self {
		Self {
			config,
			http_client,
		}
	}

	fn contents_url(&self) -> String {
		format!(
			"{}/repos/{}/{}/contents/{}",
			self.config.api_base.trim_end_matches('/'),
			self.config.owner,
			self.config.repo,
			self.config.path.trim_start_matches('/')
		)
	}

	fn request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
		self
			.http_client
			.request(method, self.contents_url())
			.header("Accept", "application/vnd.github+json")
			.header("X-GitHub-Api-Version", "2022-11-28")
			.bearer_auth(self.config.token.expose())
	}

	async fn fetch(&self) -> Result<Option<ContentsResponse>, SnapshotError> {
		let response = self
			.request(reqwest::Method::GET)
			.query(&[("ref", self.config.branch.as_str())])
			.send()
			.await?;

		match response.status() {
			StatusCode::NOT_FOUND => Ok(None),
			status if status.is_success() => Ok(Some(response.json().await?)),
			status => Err(github_error(status, response).await),
		}
	}
}

async fn github_error(status: StatusCode, response: reqwest::Response) -> SnapshotError {
	let body = response.text().await.unwrap_or_default();
	let message = serde_json::from_str::<GitHubErrorBody>(&body)
		.map(|b| b.message)
		.unwrap_or(body);
	SnapshotError::GitHub {
		status: status.as_u16(),
		message,
	}
}

#[async_trait]
impl SnapshotSink for GitHubSnapshotSink {
	fn name(&self) -> &str {
		"github"
	}

	#[tracing::instrument(skip(self), fields(repo = %self.config.repo, path = %self.config.path))]
	async fn load(&self) -> Result<Option<Vec<u8>>, SnapshotError> {
		let Some(file) = self.fetch().await? else {
			return Ok(None);
		};

		if !file.encoding.is_empty() && file.encoding != "base64" {
			return Err(SnapshotError::Malformed(format!(
				"unexpected content encoding {}",
				file.encoding
			)));
		}

		// GitHub wraps base64 content at 60 columns.
		let packed: String = file.content.split_whitespace().collect();
		let bytes = BASE64_STANDARD
			.decode(packed)
			.map_err(|e| SnapshotError::Malformed(format!("invalid base64 content: {e}")))?;
		Ok(Some(bytes))
	}

	#[tracing::instrument(skip(self, bytes), fields(repo = %self.config.repo, path = %self.config.path, size = bytes.len()))]
	async fn store(&self, bytes: &[u8]) -> Result<(), SnapshotError> {
		let existing = self.fetch().await?;
		let body = PutContentsRequest {
			message: COMMIT_MESSAGE,
			content: BASE64_STANDARD.encode(bytes),
			branch: &self.config.branch,
			sha: existing.as_ref().map(|f| f.sha.as_str()),
		};

		let response = self
			.request(reqwest::Method::PUT)
			.json(&body)
			.send()
			.await?;

		let status = response.status();
		if !status.is_success() {
			return Err(github_error(status, response).await);
		}

		tracing::debug!(created = existing.is_none(), "snapshot pushed to GitHub");
		Ok(())
	}
}
