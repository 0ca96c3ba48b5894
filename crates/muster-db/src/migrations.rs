// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

/// Apply schema migrations. Safe to run on every startup.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
	let m1 = include_str!("../migrations/001_identity_credentials.sql");
	for stmt in m1.split(';').filter(|s| !s.trim().is_empty()) {
		if let Err(e) = sqlx::query(stmt).execute(pool).await {
			if !e.to_string().contains("already exists") {
				return Err(e.into());
			}
		}
	}

	tracing::debug!("migrations applied");
	Ok(())
}
