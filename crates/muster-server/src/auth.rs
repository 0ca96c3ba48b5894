// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bearer token check for the operator API.

use axum::{
	extract::{Request, State},
	http::StatusCode,
	middleware::Next,
	response::Response,
};
use muster_core::SecretString;
use subtle::ConstantTimeEq;
use tracing::warn;

pub async fn operator_auth_middleware(
	State(expected_token): State<Option<SecretString>>,
	request: Request,
	next: Next,
) -> Result<Response, StatusCode> {
	let Some(expected) = expected_token else {
		warn!("operator auth failed: no API token configured");
		return Err(StatusCode::UNAUTHORIZED);
	};

	let Some(auth_value) = request
		.headers()
		.get("Authorization")
		.and_then(|h| h.to_str().ok())
	else {
		warn!("operator auth failed: missing Authorization header");
		return Err(StatusCode::UNAUTHORIZED);
	};

	let Some(token) = auth_value.strip_prefix("Bearer ").map(str::trim) else {
		warn!("operator auth failed: invalid Authorization format");
		return Err(StatusCode::UNAUTHORIZED);
	};

	let expected_bytes = expected.expose().as_bytes();
	let token_bytes = token.as_bytes();

	if expected_bytes.len() == token_bytes.len() && bool::from(expected_bytes.ct_eq(token_bytes)) {
		Ok(next.run(request).await)
	} else {
		warn!("operator auth failed: invalid token");
		Err(StatusCode::UNAUTHORIZED)
	}
}
