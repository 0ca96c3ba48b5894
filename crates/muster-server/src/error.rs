// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server error types and HTTP response conversions.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use muster_core::RejectReason;
use muster_db::DbError;
use muster_jobs::JobError;
use muster_provisioning::ProvisionError;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	/// The run was refused at admission.
	#[error("Run rejected: {0}")]
	Rejected(RejectReason),

	#[error("Invalid request: {0}")]
	BadRequest(String),

	#[error("Not found: {0}")]
	NotFound(String),

	/// A manually triggered job ran and failed.
	#[error("Job failed: {0}")]
	JobFailed(String),

	#[error("Database error: {0}")]
	Db(#[from] DbError),

	#[error("Internal error: {0}")]
	Internal(String),
}

impl From<ProvisionError> for ServerError {
	fn from(e: ProvisionError) -> Self {
		match e {
			ProvisionError::Rejected(reason) => ServerError::Rejected(reason),
			ProvisionError::Store(e) => ServerError::Db(e),
		}
	}
}

impl From<JobError> for ServerError {
	fn from(e: JobError) -> Self {
		match e {
			JobError::NotFound(job_id) => ServerError::NotFound(format!("job {job_id}")),
			other => ServerError::JobFailed(other.to_string()),
		}
	}
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

fn rejection_status(reason: RejectReason) -> StatusCode {
	match reason {
		RejectReason::AlreadyRunning => StatusCode::CONFLICT,
		RejectReason::TargetExcluded => StatusCode::FORBIDDEN,
		RejectReason::TargetUnreachable => StatusCode::UNPROCESSABLE_ENTITY,
		RejectReason::QuantityInvalidForTier => StatusCode::BAD_REQUEST,
	}
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let (status, body) = match &self {
			ServerError::Rejected(reason) => (
				rejection_status(*reason),
				ErrorResponse {
					error: reason.as_str().to_string(),
					message: self.to_string(),
				},
			),
			ServerError::BadRequest(msg) => (
				StatusCode::BAD_REQUEST,
				ErrorResponse {
					error: "bad_request".to_string(),
					message: msg.clone(),
				},
			),
			ServerError::NotFound(what) => (
				StatusCode::NOT_FOUND,
				ErrorResponse {
					error: "not_found".to_string(),
					message: format!("{what} not found"),
				},
			),
			ServerError::JobFailed(msg) => (
				StatusCode::INTERNAL_SERVER_ERROR,
				ErrorResponse {
					error: "job_failed".to_string(),
					message: msg.clone(),
				},
			),
			ServerError::Db(e) => {
				tracing::error!(error = %e, "database error");
				(
					StatusCode::INTERNAL_SERVER_ERROR,
					ErrorResponse {
						error: "database_error".to_string(),
						message: "A database error occurred".to_string(),
					},
				)
			}
			ServerError::Internal(msg) => {
				tracing::error!(error = %msg, "internal error");
				(
					StatusCode::INTERNAL_SERVER_ERROR,
					ErrorResponse {
						error: "internal_error".to_string(),
						message: "An internal error occurred".to_string(),
					},
				)
			}
		};

		(status, Json(body)).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejections_map_to_distinct_statuses() {
		let cases = [
			(RejectReason::AlreadyRunning, StatusCode::CONFLICT),
			(RejectReason::TargetExcluded, StatusCode::FORBIDDEN),
			(RejectReason::TargetUnreachable, StatusCode::UNPROCESSABLE_ENTITY),
			(RejectReason::QuantityInvalidForTier, StatusCode::BAD_REQUEST),
		];
		for (reason, status) in cases {
			assert_eq!(ServerError::Rejected(reason).into_response().status(), status);
		}
	}

	#[test]
	fn unknown_job_is_not_found() {
		let err: ServerError = JobError::NotFound("nope".to_string()).into();
		assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
	}

	#[test]
	fn store_errors_are_internal() {
		let err: ServerError = ProvisionError::Store(DbError::Internal("boom".to_string())).into();
		assert_eq!(
			err.into_response().status(),
			StatusCode::INTERNAL_SERVER_ERROR
		);
	}
}
