// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core domain types for Muster.
//!
//! Muster bulk-enrolls previously-authorized identities into a target guild
//! using their stored delegated-access credentials. This crate holds the types
//! every other crate agrees on:
//!
//! - [`IdentityCredential`] and [`TokenGrant`]: the stored credential record and
//!   the token triple minted by the identity provider
//! - [`PrivilegeTier`] and [`TierQuotas`]: how many identities a caller may request
//! - [`ProvisioningReport`] and [`RejectReason`]: the two possible results of a run
//! - [`IdentityProvider`] and [`TargetPlatform`]: the external seams the
//!   provisioning engine drives
//! - [`SecretString`]: a redacting wrapper for tokens

pub mod credential;
pub mod ids;
pub mod provider;
pub mod report;
pub mod secret;
pub mod tier;

pub use credential::{now_millis, IdentityCredential, TokenGrant};
pub use ids::{CollectionId, IdentityId};
pub use provider::{EnrollOutcome, IdentityProvider, PlatformError, RefreshError, TargetPlatform};
pub use report::{ProvisioningReport, RejectReason};
pub use secret::{SecretString, REDACTED};
pub use tier::{ParseTierError, PrivilegeTier, TierAllowance, TierQuotas};
