// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Discord OAuth2 authorization code flow.
//!
//! # OAuth Flow
//!
//! 1. **Authorization URL**: the user is sent to Discord with the `identify` and
//!    `guilds.join` scopes.
//! 2. **Callback**: Discord redirects back to `redirect_uri` with a one-time `code`.
//! 3. **Code Exchange**: the code is exchanged for an access/refresh token pair.
//! 4. **Identity**: `/users/@me` yields the stable user id the pair is stored under.
//!
//! Later, [`DiscordOAuthClient::refresh`] trades the refresh token for a new pair.
//!
//! # Security Considerations
//!
//! - `client_secret` and every token are wrapped in [`SecretString`].
//! - Tracing instrumentation skips codes and tokens.

use async_trait::async_trait;
use muster_core::{IdentityProvider, RefreshError, SecretString, TokenGrant};
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::DEFAULT_API_BASE;

const AUTHORIZE_URL: &str = "https://discord.com/oauth2/authorize";

// =============================================================================
// Errors
// =============================================================================

/// Errors that can occur when validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("invalid configuration: {0}")]
	InvalidConfig(String),
}

/// Errors that can occur during OAuth operations.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
	/// The HTTP request to Discord failed (network error, timeout, etc.).
	#[error("HTTP request failed: {0}")]
	HttpRequest(#[from] reqwest::Error),

	/// The response from Discord could not be parsed as expected.
	#[error("failed to parse response: {0}")]
	ParseError(String),

	/// Discord returned an error response (invalid code, revoked grant, etc.).
	///
	/// `code` is the OAuth2 `error` field when the body carried one, e.g.
	/// `invalid_grant` or `invalid_client`.
	#[error("Discord API error ({status}): {message}")]
	DiscordError {
		status: u16,
		code: Option<String>,
		message: String,
	},

	#[error("invalid URL: {0}")]
	InvalidUrl(#[from] url::ParseError),
}

const INVALID_GRANT: &str = "invalid_grant";

impl OAuthError {
	/// True when Discord refused the grant itself (`400 invalid_grant`): the
	/// code or refresh token is revoked, expired or already used.
	pub fn is_grant_rejected(&self) -> bool {
		matches!(
			self,
			OAuthError::DiscordError { status: 400, code: Some(code), .. } if code == INVALID_GRANT
		)
	}

	/// True for any other 4xx except 429. For the token endpoint this means
	/// the application's own request was refused, typically `invalid_client`
	/// after a client secret rotation.
	pub fn is_client_rejected(&self) -> bool {
		match self {
			OAuthError::DiscordError { status, .. } => {
				(400..500).contains(status)
					&& *status != StatusCode::TOO_MANY_REQUESTS.as_u16()
					&& !self.is_grant_rejected()
			}
			_ => false,
		}
	}
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the Discord OAuth client.
#[derive(Debug, Clone)]
pub struct DiscordOAuthConfig {
	pub client_id: String,
	pub client_secret: SecretString,
	/// The callback URL registered with the Discord application.
	pub redirect_uri: String,
	pub scopes: Vec<String>,
	/// REST API base, e.g. `https://discord.com/api/v10`.
	pub api_base: String,
}

impl DiscordOAuthConfig {
	pub fn new(
		client_id: impl Into<String>,
		client_secret: SecretString,
		redirect_uri: impl Into<String>,
	) -> Self {
		Self {
			client_id: client_id.into(),
			client_secret,
			redirect_uri: redirect_uri.into(),
			scopes: Self::default_scopes(),
			api_base: DEFAULT_API_BASE.to_string(),
		}
	}

	pub fn default_scopes() -> Vec<String> {
		vec!["identify".to_string(), "guilds.join".to_string()]
	}

	pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
		self.api_base = api_base.into();
		self
	}

	/// Validate that all configuration fields are usable.
	///
	/// # Errors
	///
	/// Returns [`ConfigError::InvalidConfig`] if a field is empty or the scopes
	/// do not include `guilds.join`.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.client_id.is_empty() {
			return Err(ConfigError::InvalidConfig(
				"client_id cannot be empty".to_string(),
			));
		}
		if self.client_secret.is_empty() {
			return Err(ConfigError::InvalidConfig(
				"client_secret cannot be empty".to_string(),
			));
		}
		if self.redirect_uri.is_empty() {
			return Err(ConfigError::InvalidConfig(
				"redirect_uri cannot be empty".to_string(),
			));
		}
		if !self.scopes.iter().any(|s| s == "guilds.join") {
			return Err(ConfigError::InvalidConfig(
				"scopes must include guilds.join".to_string(),
			));
		}
		Ok(())
	}

	/// Join scopes into a space-separated string for the authorization URL.
	pub fn scopes_string(&self) -> String {
		self.scopes.join(" ")
	}

	fn endpoint(&self, path: &str) -> String {
		format!("{}{}", self.api_base.trim_end_matches('/'), path)
	}
}

// =============================================================================
// Response types
// =============================================================================

/// Token response from `POST /oauth2/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordTokenResponse {
	pub access_token: SecretString,
	pub refresh_token: SecretString,
	/// Lifetime of `access_token` in seconds.
	pub expires_in: u64,
	#[serde(default)]
	pub token_type: String,
	#[serde(default)]
	pub scope: String,
}

impl DiscordTokenResponse {
	pub fn into_grant(self) -> TokenGrant {
		TokenGrant {
			access_token: self.access_token,
			refresh_token: self.refresh_token,
			expires_in: self.expires_in,
		}
	}
}

/// The subset of `GET /users/@me` Muster needs.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordUser {
	pub id: String,
	pub username: String,
	#[serde(default)]
	pub global_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DiscordErrorResponse {
	#[serde(default)]
	error: Option<String>,
	#[serde(default)]
	error_description: Option<String>,
	#[serde(default)]
	message: Option<String>,
}

fn error_message(body: &str) -> String {
	match serde_json::from_str::<DiscordErrorResponse>(body) {
		Ok(parsed) => parsed
			.error_description
			.or(parsed.error)
			.or(parsed.message)
			.unwrap_or_else(|| body.to_string()),
		Err(_) => body.to_string(),
	}
}

fn discord_error(status: StatusCode, body: &str) -> OAuthError {
	let code = serde_json::from_str::<DiscordErrorResponse>(body)
		.ok()
		.and_then(|parsed| parsed.error);
	OAuthError::DiscordError {
		status: status.as_u16(),
		code,
		message: error_message(body),
	}
}

// =============================================================================
// Client
// =============================================================================

/// OAuth client for the Discord authorization code flow.
#[derive(Debug, Clone)]
pub struct DiscordOAuthClient {
	config: DiscordOAuthConfig,
	http_client: reqwest::Client,
}

impl DiscordOAuthClient {
	pub fn new(config: DiscordOAuthConfig) -> Result<Self, OAuthError> {
		let http_client = crate::http::new_client()?;
		Ok(Self::with_http_client(config, http_client))
	}

	pub fn with_http_client(config: DiscordOAuthConfig, http_client: reqwest::Client) -> Self {
		Self {
			config,
			http_client,
		}
	}

	pub fn config(&self) -> &DiscordOAuthConfig {
		&self.config
	}

	/// Build the URL users visit to grant `identify` and `guilds.join`.
	#[tracing::instrument(skip(self), fields(client_id = %self.config.client_id))]
	pub fn authorization_url(&self) -> Result<String, OAuthError> {
		let mut url = Url::parse(AUTHORIZE_URL)?;

		url
			.query_pairs_mut()
			.append_pair("client_id", &self.config.client_id)
			.append_pair("redirect_uri", &self.config.redirect_uri)
			.append_pair("response_type", "code")
			.append_pair("scope", &self.config.scopes_string());

		Ok(url.to_string())
	}

	/// Exchange an authorization code for an access/refresh token pair.
	///
	/// # Errors
	///
	/// - [`OAuthError::HttpRequest`]: Network error or timeout.
	/// - [`OAuthError::DiscordError`]: Discord rejected the code.
	/// - [`OAuthError::ParseError`]: Unexpected response format.
	#[tracing::instrument(skip(self, code), name = "DiscordOAuthClient::exchange_code")]
	pub async fn exchange_code(&self, code: &str) -> Result<DiscordTokenResponse, OAuthError> {
		tracing::debug!("exchanging authorization code for access token");

		self
			.token_request(&[
				("client_id", self.config.client_id.as_str()),
				("client_secret", self.config.client_secret.expose()),
				("grant_type", "authorization_code"),
				("code", code),
				("redirect_uri", self.config.redirect_uri.as_str()),
			])
			.await
	}

	/// Trade a refresh token for a fresh token pair. Never retries.
	#[tracing::instrument(skip(self, refresh_token), name = "DiscordOAuthClient::refresh_token")]
	pub async fn refresh_token(
		&self,
		refresh_token: &SecretString,
	) -> Result<DiscordTokenResponse, OAuthError> {
		tracing::debug!("refreshing delegated access token");

		self
			.token_request(&[
				("client_id", self.config.client_id.as_str()),
				("client_secret", self.config.client_secret.expose()),
				("grant_type", "refresh_token"),
				("refresh_token", refresh_token.expose()),
			])
			.await
	}

	/// Fetch the user the access token belongs to.
	#[tracing::instrument(skip(self, access_token), name = "DiscordOAuthClient::get_user")]
	pub async fn get_user(&self, access_token: &SecretString) -> Result<DiscordUser, OAuthError> {
		let response = self
			.http_client
			.get(self.config.endpoint("/users/@me"))
			.bearer_auth(access_token.expose())
			.send()
			.await?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(discord_error(status, &body));
		}

		response
			.json()
			.await
			.map_err(|e| OAuthError::ParseError(format!("failed to parse user response: {e}")))
	}

	async fn token_request(&self, form: &[(&str, &str)]) -> Result<DiscordTokenResponse, OAuthError> {
		let response = self
			.http_client
			.post(self.config.endpoint("/oauth2/token"))
			.header("Accept", "application/json")
			.form(form)
			.send()
			.await?;

		let status = response.status();
		let body = response.text().await?;

		if !status.is_success() {
			return Err(discord_error(status, &body));
		}

		serde_json::from_str(&body)
			.map_err(|e| OAuthError::ParseError(format!("failed to parse token response: {e}")))
	}
}

#[async_trait]
impl IdentityProvider for DiscordOAuthClient {
	async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenGrant, RefreshError> {
		match self.refresh_token(refresh_token).await {
			Ok(response) => Ok(response.into_grant()),
			Err(e) if e.is_grant_rejected() => Err(RefreshError::Rejected(e.to_string())),
			Err(e) if e.is_client_rejected() => Err(RefreshError::Refused(e.to_string())),
			Err(e) => Err(RefreshError::Transport(e.to_string())),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn config() -> DiscordOAuthConfig {
		DiscordOAuthConfig::new(
			"1234567890",
			SecretString::new("client-secret"),
			"https://muster.example.com/callback",
		)
	}

	#[test]
	fn authorization_url_contains_required_params() {
		let client = DiscordOAuthClient::new(config()).unwrap();
		let url = client.authorization_url().unwrap();

		assert!(url.starts_with(AUTHORIZE_URL));
		assert!(url.contains("client_id=1234567890"));
		assert!(url.contains("redirect_uri=https%3A%2F%2Fmuster.example.com%2Fcallback"));
		assert!(url.contains("response_type=code"));
		assert!(url.contains("scope=identify+guilds.join"));
	}

	#[test]
	fn validate_rejects_empty_fields() {
		let mut cfg = config();
		cfg.client_id.clear();
		assert!(cfg.validate().is_err());

		let mut cfg = config();
		cfg.client_secret = SecretString::new("");
		assert!(cfg.validate().is_err());

		let mut cfg = config();
		cfg.scopes = vec!["identify".to_string()];
		assert!(cfg.validate().is_err());

		assert!(config().validate().is_ok());
	}

	#[test]
	fn config_debug_hides_secret() {
		let debug = format!("{:?}", config());
		assert!(!debug.contains("client-secret"));
	}

	#[test]
	fn error_message_prefers_description() {
		assert_eq!(
			error_message(r#"{"error":"invalid_grant","error_description":"Invalid \"refresh_token\" in request."}"#),
			"Invalid \"refresh_token\" in request."
		);
		assert_eq!(error_message(r#"{"error":"invalid_client"}"#), "invalid_client");
		assert_eq!(error_message("bad gateway"), "bad gateway");
	}

	#[test]
	fn grant_rejection_classification() {
		let error = |status: u16, code: Option<&str>| OAuthError::DiscordError {
			status,
			code: code.map(str::to_string),
			message: "x".to_string(),
		};

		let revoked = error(400, Some("invalid_grant"));
		assert!(revoked.is_grant_rejected());
		assert!(!revoked.is_client_rejected());

		for refused in [
			error(401, Some("invalid_client")),
			error(400, Some("unauthorized_client")),
			error(400, None),
		] {
			assert!(!refused.is_grant_rejected());
			assert!(refused.is_client_rejected());
		}

		for transient in [error(429, None), error(502, None)] {
			assert!(!transient.is_grant_rejected());
			assert!(!transient.is_client_rejected());
		}
	}

	#[test]
	fn discord_error_keeps_oauth_code() {
		match discord_error(StatusCode::UNAUTHORIZED, r#"{"error":"invalid_client"}"#) {
			OAuthError::DiscordError { status, code, message } => {
				assert_eq!(status, 401);
				assert_eq!(code.as_deref(), Some("invalid_client"));
				assert_eq!(message, "invalid_client");
			}
			other => panic!("unexpected error: {other:?}"),
		}
		assert!(matches!(
			discord_error(StatusCode::BAD_GATEWAY, "bad gateway"),
			OAuthError::DiscordError { code: None, .. }
		));
	}

	#[test]
	fn token_response_deserializes() {
		let json = r#"{
			"access_token": "6qrZcUqja7812RVdnEKjpzOL4CvHBFG",
			"token_type": "Bearer",
			"expires_in": 604800,
			"refresh_token": "D43f5y0ahjqew82jZ4NViEr2YafMKhue",
			"scope": "identify guilds.join"
		}"#;

		let response: DiscordTokenResponse = serde_json::from_str(json).unwrap();
		let grant = response.into_grant();
		assert_eq!(grant.access_token.expose(), "6qrZcUqja7812RVdnEKjpzOL4CvHBFG");
		assert_eq!(grant.expires_in, 604_800);
	}
}
