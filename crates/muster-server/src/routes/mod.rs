// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub mod exclusions;
pub mod health;
pub mod jobs;
pub mod oauth;
pub mod runs;
pub mod stock;
