// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP surface for Muster.
//!
//! Public routes serve the Discord authorization page and OAuth callback, and
//! a health endpoint. Operator routes under `/api` start provisioning runs,
//! manage the exclusion list and report stock; they require the admin bearer
//! token.

pub mod api;
pub mod auth;
pub mod error;
pub mod health;
pub mod routes;

pub use api::{create_router, AppState};
pub use error::{ErrorResponse, ServerError};
