// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: defaults, TOML files and environment variables.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::env::load_secret_env;
use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	AdminConfigLayer, DatabaseConfigLayer, DiscordConfigLayer, GitHubBackendConfigLayer,
	HttpConfigLayer, LoggingConfigLayer, ProvisioningConfigLayer, QuotasConfigLayer,
	SnapshotBackend, SnapshotConfigLayer,
};

pub const SYSTEM_CONFIG_PATH: &str = "/etc/muster/server.toml";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file yields an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new(SYSTEM_CONFIG_PATH)
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: MUSTER_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			http: Some(load_http_from_env()?),
			database: Some(load_database_from_env()),
			discord: Some(load_discord_from_env()?),
			provisioning: Some(load_provisioning_from_env()?),
			snapshot: Some(load_snapshot_from_env()?),
			admin: Some(load_admin_from_env()?),
			logging: Some(load_logging_from_env()),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str, kind: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => v.trim().parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid {kind} value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn env_list(name: &str) -> Option<Vec<String>> {
	env_var(name).map(|s| {
		s.split(',')
			.map(|s| s.trim().to_string())
			.filter(|s| !s.is_empty())
			.collect()
	})
}

fn load_http_from_env() -> Result<HttpConfigLayer, ConfigError> {
	Ok(HttpConfigLayer {
		host: env_var("MUSTER_HOST"),
		port: env_parse("MUSTER_PORT", "u16")?,
		base_url: env_var("MUSTER_BASE_URL"),
	})
}

fn load_database_from_env() -> DatabaseConfigLayer {
	DatabaseConfigLayer {
		url: env_var("MUSTER_DATABASE_URL"),
	}
}

fn load_discord_from_env() -> Result<DiscordConfigLayer, ConfigError> {
	Ok(DiscordConfigLayer {
		client_id: env_var("MUSTER_DISCORD_CLIENT_ID"),
		client_secret: load_secret_env("MUSTER_DISCORD_CLIENT_SECRET")?,
		redirect_uri: env_var("MUSTER_DISCORD_REDIRECT_URI"),
		bot_token: load_secret_env("MUSTER_DISCORD_BOT_TOKEN")?,
		api_base: env_var("MUSTER_DISCORD_API_BASE"),
		scopes: env_list("MUSTER_DISCORD_SCOPES"),
	})
}

fn load_provisioning_from_env() -> Result<ProvisioningConfigLayer, ConfigError> {
	let quotas = QuotasConfigLayer {
		bronze: env_parse("MUSTER_QUOTA_BRONZE", "usize")?,
		silver: env_parse("MUSTER_QUOTA_SILVER", "usize")?,
		gold: env_parse("MUSTER_QUOTA_GOLD", "usize")?,
		platinum: env_parse("MUSTER_QUOTA_PLATINUM", "usize")?,
		diamond: env_parse("MUSTER_QUOTA_DIAMOND", "usize")?,
	};

	Ok(ProvisioningConfigLayer {
		pacing_interval_ms: env_parse("MUSTER_PACING_INTERVAL_MS", "u64")?,
		quotas: Some(quotas),
	})
}

fn load_snapshot_from_env() -> Result<SnapshotConfigLayer, ConfigError> {
	let backend = match env_var("MUSTER_SNAPSHOT_BACKEND") {
		Some(v) => Some(v.parse::<SnapshotBackend>().map_err(|message| {
			ConfigError::InvalidValue {
				key: "MUSTER_SNAPSHOT_BACKEND".to_string(),
				message,
			}
		})?),
		None => None,
	};

	Ok(SnapshotConfigLayer {
		backend,
		interval_secs: env_parse("MUSTER_SNAPSHOT_INTERVAL_SECS", "u64")?,
		path: env_var("MUSTER_SNAPSHOT_PATH"),
		github: Some(GitHubBackendConfigLayer {
			owner: env_var("MUSTER_SNAPSHOT_GITHUB_OWNER"),
			repo: env_var("MUSTER_SNAPSHOT_GITHUB_REPO"),
			branch: env_var("MUSTER_SNAPSHOT_GITHUB_BRANCH"),
			path: env_var("MUSTER_SNAPSHOT_GITHUB_PATH"),
			token: load_secret_env("MUSTER_SNAPSHOT_GITHUB_TOKEN")?,
			api_base: env_var("MUSTER_SNAPSHOT_GITHUB_API_BASE"),
		}),
	})
}

fn load_admin_from_env() -> Result<AdminConfigLayer, ConfigError> {
	Ok(AdminConfigLayer {
		api_token: load_secret_env("MUSTER_ADMIN_API_TOKEN")?,
	})
}

fn load_logging_from_env() -> LoggingConfigLayer {
	LoggingConfigLayer {
		level: env_var("MUSTER_LOG_LEVEL"),
	}
}
