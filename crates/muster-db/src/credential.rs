// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credential repository for database operations.
//!
//! One row per identity. Every write is a single upsert statement, so a
//! concurrent reader (the snapshot job) never sees a half-written record.

use async_trait::async_trait;
use muster_core::{now_millis, IdentityCredential, IdentityId, SecretString, TokenGrant};
use sqlx::{
	sqlite::{SqlitePool, SqliteRow},
	Row,
};

use crate::error::DbError;

#[async_trait]
pub trait CredentialStore: Send + Sync {
	/// Upsert the grant for `identity_id`, computing `expires_at` from now.
	async fn put(
		&self,
		identity_id: &IdentityId,
		grant: &TokenGrant,
	) -> Result<IdentityCredential, DbError>;

	/// Upsert a fully-formed record, preserving its `expires_at` verbatim.
	async fn put_record(&self, record: &IdentityCredential) -> Result<(), DbError>;

	async fn get(&self, identity_id: &IdentityId) -> Result<Option<IdentityCredential>, DbError>;

	/// Every stored record, in no particular order.
	async fn get_all(&self) -> Result<Vec<IdentityCredential>, DbError>;

	/// Remove the record if present. Returns whether a row was deleted.
	async fn delete(&self, identity_id: &IdentityId) -> Result<bool, DbError>;

	async fn count(&self) -> Result<usize, DbError>;

	/// Cheap liveness check for the health endpoint.
	async fn ping(&self) -> Result<(), DbError> {
		self.count().await.map(|_| ())
	}
}

#[async_trait]
impl CredentialStore for CredentialRepository {
	async fn put(
		&self,
		identity_id: &IdentityId,
		grant: &TokenGrant,
	) -> Result<IdentityCredential, DbError> {
		let record = IdentityCredential::from_grant(identity_id.clone(), grant, now_millis());
		self.upsert(&record).await?;
		Ok(record)
	}

	async fn put_record(&self, record: &IdentityCredential) -> Result<(), DbError> {
		self.upsert(record).await
	}

	async fn get(&self, identity_id: &IdentityId) -> Result<Option<IdentityCredential>, DbError> {
		self.get_credential(identity_id).await
	}

	async fn get_all(&self) -> Result<Vec<IdentityCredential>, DbError> {
		self.list_credentials().await
	}

	async fn delete(&self, identity_id: &IdentityId) -> Result<bool, DbError> {
		self.delete_credential(identity_id).await
	}

	async fn count(&self) -> Result<usize, DbError> {
		self.count_credentials().await
	}

	async fn ping(&self) -> Result<(), DbError> {
		CredentialRepository::ping(self).await
	}
}

/// SQLite-backed credential store.
#[derive(Clone)]
pub struct CredentialRepository {
	pool: SqlitePool,
}

impl CredentialRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Insert or replace all four fields of a record in one statement.
	#[tracing::instrument(skip(self, record), fields(identity_id = %record.identity_id))]
	pub async fn upsert(&self, record: &IdentityCredential) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO identity_credentials (identity_id, access_token, refresh_token, expires_at)
			VALUES (?, ?, ?, ?)
			ON CONFLICT(identity_id) DO UPDATE SET
				access_token = excluded.access_token,
				refresh_token = excluded.refresh_token,
				expires_at = excluded.expires_at
			"#,
		)
		.bind(record.identity_id.as_str())
		.bind(record.access_token.expose())
		.bind(record.refresh_token.expose())
		.bind(record.expires_at)
		.execute(&self.pool)
		.await?;

		tracing::debug!(expires_at = record.expires_at, "credential stored");
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(identity_id = %identity_id))]
	pub async fn get_credential(
		&self,
		identity_id: &IdentityId,
	) -> Result<Option<IdentityCredential>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT identity_id, access_token, refresh_token, expires_at
			FROM identity_credentials
			WHERE identity_id = ?
			"#,
		)
		.bind(identity_id.as_str())
		.fetch_optional(&self.pool)
		.await?;

		row.as_ref().map(parse_credential_row).transpose()
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_credentials(&self) -> Result<Vec<IdentityCredential>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT identity_id, access_token, refresh_token, expires_at
			FROM identity_credentials
			"#,
		)
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(parse_credential_row).collect()
	}

	#[tracing::instrument(skip(self), fields(identity_id = %identity_id))]
	pub async fn delete_credential(&self, identity_id: &IdentityId) -> Result<bool, DbError> {
		let result = sqlx::query("DELETE FROM identity_credentials WHERE identity_id = ?")
			.bind(identity_id.as_str())
			.execute(&self.pool)
			.await?;

		let deleted = result.rows_affected() > 0;
		if deleted {
			tracing::debug!("credential deleted");
		}
		Ok(deleted)
	}

	#[tracing::instrument(skip(self))]
	pub async fn count_credentials(&self) -> Result<usize, DbError> {
		let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM identity_credentials")
			.fetch_one(&self.pool)
			.await?;

		usize::try_from(count).map_err(|e| DbError::Internal(format!("negative row count: {e}")))
	}

	/// Cheap liveness check used by the health endpoint.
	pub async fn ping(&self) -> Result<(), DbError> {
		sqlx::query("SELECT 1").execute(&self.pool).await?;
		Ok(())
	}
}

fn parse_credential_row(row: &SqliteRow) -> Result<IdentityCredential, DbError> {
	let identity_id: String = row.try_get("identity_id")?;
	let access_token: String = row.try_get("access_token")?;
	let refresh_token: String = row.try_get("refresh_token")?;
	let expires_at: i64 = row.try_get("expires_at")?;

	if identity_id.is_empty() {
		return Err(DbError::Corrupt {
			identity_id,
			reason: "empty identity id".to_string(),
		});
	}

	Ok(IdentityCredential {
		identity_id: IdentityId::new(identity_id),
		access_token: SecretString::new(access_token),
		refresh_token: SecretString::new(refresh_token),
		expires_at,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;

	fn record(id: &str, access: &str, expires_at: i64) -> IdentityCredential {
		IdentityCredential {
			identity_id: IdentityId::new(id),
			access_token: SecretString::new(access),
			refresh_token: SecretString::new(format!("{access}-refresh")),
			expires_at,
		}
	}

	#[tokio::test]
	async fn put_computes_expiry_from_now() {
		let repo = CredentialRepository::new(create_test_pool().await);
		let before = now_millis();

		let stored = repo
			.put(&IdentityId::new("100"), &TokenGrant::new("a1", "r1", 604_800))
			.await
			.unwrap();

		assert!(stored.expires_at >= before + 604_800_000);
		assert!(stored.expires_at <= now_millis() + 604_800_000);

		let fetched = repo.get(&IdentityId::new("100")).await.unwrap().unwrap();
		assert_eq!(fetched, stored);
	}

	#[tokio::test]
	async fn put_twice_keeps_one_record_with_second_fields() {
		let repo = CredentialRepository::new(create_test_pool().await);
		let id = IdentityId::new("200");

		repo.put(&id, &TokenGrant::new("first", "first-r", 10)).await.unwrap();
		repo.put(&id, &TokenGrant::new("second", "second-r", 20)).await.unwrap();

		assert_eq!(repo.count().await.unwrap(), 1);
		let stored = repo.get(&id).await.unwrap().unwrap();
		assert_eq!(stored.access_token.expose(), "second");
		assert_eq!(stored.refresh_token.expose(), "second-r");
	}

	#[tokio::test]
	async fn put_record_preserves_expiry_verbatim() {
		let repo = CredentialRepository::new(create_test_pool().await);
		let original = record("300", "tok", 1_234_567);

		repo.put_record(&original).await.unwrap();

		let stored = repo.get(&original.identity_id).await.unwrap().unwrap();
		assert_eq!(stored.expires_at, 1_234_567);
	}

	#[tokio::test]
	async fn delete_missing_is_noop() {
		let repo = CredentialRepository::new(create_test_pool().await);
		assert!(!repo.delete(&IdentityId::new("ghost")).await.unwrap());

		repo.put_record(&record("400", "tok", 1)).await.unwrap();
		assert!(repo.delete(&IdentityId::new("400")).await.unwrap());
		assert!(repo.get(&IdentityId::new("400")).await.unwrap().is_none());
		assert_eq!(repo.count().await.unwrap(), 0);
	}

	#[tokio::test]
	async fn get_all_returns_every_record() {
		let repo = CredentialRepository::new(create_test_pool().await);
		for i in 0..5 {
			repo
				.put_record(&record(&format!("id-{i}"), &format!("tok-{i}"), i))
				.await
				.unwrap();
		}

		let mut ids: Vec<String> = repo
			.get_all()
			.await
			.unwrap()
			.into_iter()
			.map(|r| r.identity_id.into_inner())
			.collect();
		ids.sort();
		assert_eq!(ids, vec!["id-0", "id-1", "id-2", "id-3", "id-4"]);
	}

	#[tokio::test]
	async fn migrations_are_idempotent() {
		let pool = create_test_pool().await;
		crate::run_migrations(&pool).await.unwrap();
		CredentialRepository::new(pool).ping().await.unwrap();
	}
}
