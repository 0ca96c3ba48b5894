// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credential snapshot backend and schedule.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use muster_core::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_INTERVAL_SECS: u64 = 300;
const DEFAULT_FILE_PATH: &str = "./data/credentials.json";
const DEFAULT_GITHUB_API: &str = "https://api.github.com";
const DEFAULT_GITHUB_BRANCH: &str = "main";
const DEFAULT_GITHUB_PATH: &str = "data/credentials.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotBackend {
	#[default]
	None,
	File,
	Github,
}

impl FromStr for SnapshotBackend {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"none" | "off" | "" => Ok(SnapshotBackend::None),
			"file" => Ok(SnapshotBackend::File),
			"github" => Ok(SnapshotBackend::Github),
			other => Err(format!("unknown snapshot backend '{other}' (expected none, file or github)")),
		}
	}
}

impl fmt::Display for SnapshotBackend {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			SnapshotBackend::None => "none",
			SnapshotBackend::File => "file",
			SnapshotBackend::Github => "github",
		})
	}
}

#[derive(Debug, Clone)]
pub struct GitHubBackendConfig {
	pub owner: String,
	pub repo: String,
	pub branch: String,
	pub path: String,
	pub token: SecretString,
	pub api_base: String,
}

#[derive(Debug, Clone)]
pub enum SnapshotTarget {
	Disabled,
	File { path: PathBuf },
	GitHub(GitHubBackendConfig),
}

#[derive(Debug, Clone)]
pub struct SnapshotConfig {
	pub target: SnapshotTarget,
	pub interval: Duration,
}

impl SnapshotConfig {
	pub fn backend(&self) -> SnapshotBackend {
		match self.target {
			SnapshotTarget::Disabled => SnapshotBackend::None,
			SnapshotTarget::File { .. } => SnapshotBackend::File,
			SnapshotTarget::GitHub(_) => SnapshotBackend::Github,
		}
	}
}

impl Default for SnapshotConfig {
	fn default() -> Self {
		Self {
			target: SnapshotTarget::Disabled,
			interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubBackendConfigLayer {
	#[serde(default)]
	pub owner: Option<String>,
	#[serde(default)]
	pub repo: Option<String>,
	#[serde(default)]
	pub branch: Option<String>,
	#[serde(default)]
	pub path: Option<String>,
	#[serde(default)]
	pub token: Option<SecretString>,
	#[serde(default)]
	pub api_base: Option<String>,
}

impl GitHubBackendConfigLayer {
	pub fn merge(&mut self, other: GitHubBackendConfigLayer) {
		if other.owner.is_some() {
			self.owner = other.owner;
		}
		if other.repo.is_some() {
			self.repo = other.repo;
		}
		if other.branch.is_some() {
			self.branch = other.branch;
		}
		if other.path.is_some() {
			self.path = other.path;
		}
		if other.token.is_some() {
			self.token = other.token;
		}
		if other.api_base.is_some() {
			self.api_base = other.api_base;
		}
	}

	fn finalize(self) -> Result<GitHubBackendConfig, ConfigError> {
		let missing = |key: &str| {
			ConfigError::Validation(format!(
				"snapshot.github.{key} is required when snapshot.backend = \"github\""
			))
		};

		Ok(GitHubBackendConfig {
			owner: self
				.owner
				.filter(|v| !v.is_empty())
				.ok_or_else(|| missing("owner"))?,
			repo: self
				.repo
				.filter(|v| !v.is_empty())
				.ok_or_else(|| missing("repo"))?,
			token: self
				.token
				.filter(|v| !v.is_empty())
				.ok_or_else(|| missing("token"))?,
			branch: self
				.branch
				.unwrap_or_else(|| DEFAULT_GITHUB_BRANCH.to_string()),
			path: self.path.unwrap_or_else(|| DEFAULT_GITHUB_PATH.to_string()),
			api_base: self
				.api_base
				.unwrap_or_else(|| DEFAULT_GITHUB_API.to_string()),
		})
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotConfigLayer {
	#[serde(default)]
	pub backend: Option<SnapshotBackend>,
	#[serde(default)]
	pub interval_secs: Option<u64>,
	/// File backend location.
	#[serde(default)]
	pub path: Option<String>,
	#[serde(default)]
	pub github: Option<GitHubBackendConfigLayer>,
}

impl SnapshotConfigLayer {
	pub fn merge(&mut self, other: SnapshotConfigLayer) {
		if other.backend.is_some() {
			self.backend = other.backend;
		}
		if other.interval_secs.is_some() {
			self.interval_secs = other.interval_secs;
		}
		if other.path.is_some() {
			self.path = other.path;
		}
		match (self.github.as_mut(), other.github) {
			(Some(base), Some(overlay)) => base.merge(overlay),
			(None, Some(overlay)) => self.github = Some(overlay),
			_ => {}
		}
	}

	pub fn finalize(self) -> Result<SnapshotConfig, ConfigError> {
		let interval_secs = self.interval_secs.unwrap_or(DEFAULT_INTERVAL_SECS);
		if interval_secs == 0 {
			return Err(ConfigError::InvalidValue {
				key: "snapshot.interval_secs".to_string(),
				message: "must be greater than zero".to_string(),
			});
		}

		let target = match self.backend.unwrap_or_default() {
			SnapshotBackend::None => SnapshotTarget::Disabled,
			SnapshotBackend::File => SnapshotTarget::File {
				path: PathBuf::from(self.path.unwrap_or_else(|| DEFAULT_FILE_PATH.to_string())),
			},
			SnapshotBackend::Github => {
				SnapshotTarget::GitHub(self.github.unwrap_or_default().finalize()?)
			}
		};

		Ok(SnapshotConfig {
			target,
			interval: Duration::from_secs(interval_secs),
		})
	}
}
