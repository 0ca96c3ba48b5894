// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Discord application and bot credentials.

use muster_core::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";

fn default_scopes() -> Vec<String> {
	vec!["identify".to_string(), "guilds.join".to_string()]
}

/// Validated Discord configuration.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
	pub client_id: String,
	pub client_secret: SecretString,
	/// Must match a redirect registered on the Discord application.
	pub redirect_uri: String,
	pub bot_token: SecretString,
	pub api_base: String,
	pub scopes: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscordConfigLayer {
	#[serde(default)]
	pub client_id: Option<String>,
	#[serde(default)]
	pub client_secret: Option<SecretString>,
	#[serde(default)]
	pub redirect_uri: Option<String>,
	#[serde(default)]
	pub bot_token: Option<SecretString>,
	#[serde(default)]
	pub api_base: Option<String>,
	#[serde(default)]
	pub scopes: Option<Vec<String>>,
}

impl DiscordConfigLayer {
	pub fn merge(&mut self, other: DiscordConfigLayer) {
		if other.client_id.is_some() {
			self.client_id = other.client_id;
		}
		if other.client_secret.is_some() {
			self.client_secret = other.client_secret;
		}
		if other.redirect_uri.is_some() {
			self.redirect_uri = other.redirect_uri;
		}
		if other.bot_token.is_some() {
			self.bot_token = other.bot_token;
		}
		if other.api_base.is_some() {
			self.api_base = other.api_base;
		}
		if other.scopes.is_some() {
			self.scopes = other.scopes;
		}
	}

	pub fn finalize(self) -> Result<DiscordConfig, ConfigError> {
		let client_id = required(self.client_id, "discord.client_id", "MUSTER_DISCORD_CLIENT_ID")?;
		let redirect_uri = required(
			self.redirect_uri,
			"discord.redirect_uri",
			"MUSTER_DISCORD_REDIRECT_URI",
		)?;
		let client_secret = required_secret(
			self.client_secret,
			"discord.client_secret",
			"MUSTER_DISCORD_CLIENT_SECRET",
		)?;
		let bot_token =
			required_secret(self.bot_token, "discord.bot_token", "MUSTER_DISCORD_BOT_TOKEN")?;

		let scopes = self.scopes.unwrap_or_else(default_scopes);
		if !scopes.iter().any(|s| s == "guilds.join") {
			return Err(ConfigError::Validation(
				"discord.scopes must include guilds.join".to_string(),
			));
		}

		Ok(DiscordConfig {
			client_id,
			client_secret,
			redirect_uri,
			bot_token,
			api_base: self
				.api_base
				.unwrap_or_else(|| DEFAULT_DISCORD_API_BASE.to_string()),
			scopes,
		})
	}
}

fn required(value: Option<String>, key: &str, env: &str) -> Result<String, ConfigError> {
	value
		.filter(|v| !v.is_empty())
		.ok_or_else(|| ConfigError::Validation(format!("{key} is required (or set {env})")))
}

fn required_secret(
	value: Option<SecretString>,
	key: &str,
	env: &str,
) -> Result<SecretString, ConfigError> {
	value
		.filter(|v| !v.is_empty())
		.ok_or_else(|| ConfigError::Validation(format!("{key} is required (or set {env} / {env}_FILE)")))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn complete() -> DiscordConfigLayer {
		DiscordConfigLayer {
			client_id: Some("123".to_string()),
			client_secret: Some(SecretString::new("secret")),
			redirect_uri: Some("https://muster.example.com/callback".to_string()),
			bot_token: Some(SecretString::new("bot")),
			api_base: None,
			scopes: None,
		}
	}

	#[test]
	fn complete_layer_finalizes_with_defaults() {
		let config = complete().finalize().unwrap();
		assert_eq!(config.api_base, DEFAULT_DISCORD_API_BASE);
		assert_eq!(config.scopes, vec!["identify", "guilds.join"]);
	}

	#[test]
	fn missing_bot_token_names_the_variable() {
		let layer = DiscordConfigLayer {
			bot_token: None,
			..complete()
		};
		let err = layer.finalize().unwrap_err().to_string();
		assert!(err.contains("MUSTER_DISCORD_BOT_TOKEN"));
	}

	#[test]
	fn scopes_without_guilds_join_are_rejected() {
		let layer = DiscordConfigLayer {
			scopes: Some(vec!["identify".to_string()]),
			..complete()
		};
		assert!(matches!(layer.finalize(), Err(ConfigError::Validation(_))));
	}

	#[test]
	fn deserializes_secrets_from_toml() {
		let layer: DiscordConfigLayer = toml::from_str(
			r#"
client_id = "123"
client_secret = "shh"
"#,
		)
		.unwrap();
		assert_eq!(layer.client_secret.unwrap().expose(), "shh");
	}
}
