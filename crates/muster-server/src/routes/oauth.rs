// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization landing page and OAuth callback.
//!
//! A user who follows the authorize link grants `identify` and `guilds.join`;
//! Discord redirects back to `/callback` with a one-time code, which is traded
//! for a token pair and stored against the user's id.

use axum::{
	extract::{Query, State},
	http::StatusCode,
	response::{Html, IntoResponse, Response},
};
use muster_core::IdentityId;
use serde::Deserialize;

use crate::api::AppState;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
	#[serde(default)]
	pub code: Option<String>,
	/// Set by Discord when the user denies the request.
	#[serde(default)]
	pub error: Option<String>,
}

fn page(status: StatusCode, heading: &str, body: &str) -> Response {
	(
		status,
		Html(format!(
			"<!doctype html><html><head><meta charset=\"utf-8\"><title>Muster</title></head>\
			 <body><h1>{heading}</h1>{body}</body></html>"
		)),
	)
		.into_response()
}

fn escape_html(s: &str) -> String {
	let mut out = String::with_capacity(s.len());
	for c in s.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&#39;"),
			c => out.push(c),
		}
	}
	out
}

/// GET / - authorize link.
pub async fn index(State(state): State<AppState>) -> Response {
	match state.oauth.authorization_url() {
		Ok(url) => page(
			StatusCode::OK,
			"Authorize Muster",
			&format!("<a href=\"{}\">Login with Discord</a>", escape_html(&url)),
		),
		Err(e) => {
			tracing::error!(error = %e, "failed to build authorization URL");
			page(
				StatusCode::INTERNAL_SERVER_ERROR,
				"Authorization unavailable",
				"<p>The authorization link could not be built.</p>",
			)
		}
	}
}

/// GET /callback - exchange the code and store the credential.
#[tracing::instrument(skip(state, query), fields(identity_id = tracing::field::Empty))]
pub async fn callback(State(state): State<AppState>, Query(query): Query<CallbackQuery>) -> Response {
	if let Some(error) = query.error {
		tracing::info!(error = %error, "authorization declined");
		return page(
			StatusCode::BAD_REQUEST,
			"Authorization cancelled",
			"<p>No access was granted.</p>",
		);
	}

	let Some(code) = query.code.filter(|c| !c.is_empty()) else {
		return page(
			StatusCode::BAD_REQUEST,
			"Missing code",
			"<p>No authorization code was provided.</p>",
		);
	};

	let tokens = match state.oauth.exchange_code(&code).await {
		Ok(tokens) => tokens,
		Err(e) => {
			tracing::error!(error = %e, "code exchange failed");
			return authorization_failed();
		}
	};

	let user = match state.oauth.get_user(&tokens.access_token).await {
		Ok(user) => user,
		Err(e) => {
			tracing::error!(error = %e, "failed to fetch authorizing user");
			return authorization_failed();
		}
	};

	tracing::Span::current().record("identity_id", user.id.as_str());
	let identity_id = IdentityId::new(user.id);
	if let Err(e) = state.store.put(&identity_id, &tokens.into_grant()).await {
		tracing::error!(error = %e, "failed to store credential");
		return authorization_failed();
	}

	tracing::info!(username = %user.username, "identity authorized");
	let display = user.global_name.as_deref().unwrap_or(&user.username);
	page(
		StatusCode::OK,
		&format!("Authorized {}", escape_html(display)),
		"<p>You can close this window.</p>",
	)
}

fn authorization_failed() -> Response {
	page(
		StatusCode::INTERNAL_SERVER_ERROR,
		"Authorization failed",
		"<p>Something went wrong while completing authorization.</p>",
	)
}
