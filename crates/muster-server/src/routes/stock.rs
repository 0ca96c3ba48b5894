// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::AppState;
use crate::error::ServerError;

#[derive(Debug, Serialize)]
pub struct StockResponse {
	pub count: usize,
}

/// Number of stored credentials.
pub async fn get_stock(State(state): State<AppState>) -> Result<Json<StockResponse>, ServerError> {
	let count = state.orchestrator.stock_count().await?;
	Ok(Json(StockResponse { count }))
}
