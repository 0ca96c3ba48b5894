// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use muster_core::{
	now_millis, CollectionId, EnrollOutcome, IdentityCredential, IdentityId, IdentityProvider,
	PlatformError, PrivilegeTier, RefreshError, RejectReason, SecretString, TargetPlatform,
	TokenGrant,
};
use muster_db::{CredentialRepository, CredentialStore, MemoryCredentialStore};
use muster_provisioning::{
	BatchJoinOrchestrator, ExclusionList, ProvisionError, ProvisioningSettings,
};
use tokio::sync::Notify;

const HOUR_MS: i64 = 3_600_000;

// =============================================================================
// Fakes
// =============================================================================

#[derive(Default)]
struct FakeProvider {
	/// refresh token -> grant; anything missing is rejected.
	grants: HashMap<String, TokenGrant>,
	/// refresh tokens whose refresh fails with a transport error.
	unavailable: HashSet<String>,
	/// refresh tokens the provider refuses for client-side reasons.
	refused: HashSet<String>,
	calls: Mutex<Vec<String>>,
}

impl FakeProvider {
	fn grant(mut self, refresh: &str, access: &str, new_refresh: &str) -> Self {
		self
			.grants
			.insert(refresh.to_string(), TokenGrant::new(access, new_refresh, 3600));
		self
	}

	fn unavailable(mut self, refresh: &str) -> Self {
		self.unavailable.insert(refresh.to_string());
		self
	}

	fn refusing(mut self, refresh: &str) -> Self {
		self.refused.insert(refresh.to_string());
		self
	}

	fn calls(&self) -> Vec<String> {
		self.calls.lock().unwrap().clone()
	}
}

#[async_trait]
impl IdentityProvider for FakeProvider {
	async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenGrant, RefreshError> {
		let token = refresh_token.expose().to_string();
		self.calls.lock().unwrap().push(token.clone());
		if self.unavailable.contains(&token) {
			return Err(RefreshError::Transport("connection reset".to_string()));
		}
		if self.refused.contains(&token) {
			return Err(RefreshError::Refused("invalid_client".to_string()));
		}
		self
			.grants
			.get(&token)
			.cloned()
			.ok_or_else(|| RefreshError::Rejected("invalid_grant".to_string()))
	}
}

#[derive(Default)]
struct FakePlatform {
	/// Tokens the platform accepts.
	valid: HashSet<String>,
	/// Tokens that always hit the rate limit.
	throttled: HashSet<String>,
	unreachable: HashSet<String>,
	calls: Mutex<Vec<(String, String)>>,
}

impl FakePlatform {
	fn accepting(tokens: &[&str]) -> Self {
		Self {
			valid: tokens.iter().map(|t| t.to_string()).collect(),
			..Default::default()
		}
	}

	fn throttling(mut self, token: &str) -> Self {
		self.throttled.insert(token.to_string());
		self
	}

	fn unreachable(mut self, guild: &str) -> Self {
		self.unreachable.insert(guild.to_string());
		self
	}

	fn calls(&self) -> Vec<(String, String)> {
		self.calls.lock().unwrap().clone()
	}
}

#[async_trait]
impl TargetPlatform for FakePlatform {
	async fn can_reach(&self, collection: &CollectionId) -> Result<bool, PlatformError> {
		if collection.as_str() == "error" {
			return Err(PlatformError::Request("dns failure".to_string()));
		}
		Ok(!self.unreachable.contains(collection.as_str()))
	}

	async fn enroll(
		&self,
		_collection: &CollectionId,
		identity: &IdentityId,
		access_token: &SecretString,
	) -> EnrollOutcome {
		let token = access_token.expose().to_string();
		self
			.calls
			.lock()
			.unwrap()
			.push((identity.to_string(), token.clone()));
		if self.throttled.contains(&token) {
			EnrollOutcome::RateLimited {
				retry_after: Some(Duration::from_secs(1)),
			}
		} else if self.valid.contains(&token) {
			EnrollOutcome::Enrolled {
				already_member: false,
			}
		} else {
			EnrollOutcome::Unauthorized
		}
	}
}

/// Blocks inside the first enroll call until released.
#[derive(Default)]
struct BlockingPlatform {
	entered: Notify,
	release: Notify,
	calls: Mutex<usize>,
}

#[async_trait]
impl TargetPlatform for BlockingPlatform {
	async fn can_reach(&self, _collection: &CollectionId) -> Result<bool, PlatformError> {
		Ok(true)
	}

	async fn enroll(
		&self,
		_collection: &CollectionId,
		_identity: &IdentityId,
		_access_token: &SecretString,
	) -> EnrollOutcome {
		let first = {
			let mut calls = self.calls.lock().unwrap();
			*calls += 1;
			*calls == 1
		};
		if first {
			self.entered.notify_one();
			self.release.notified().await;
		}
		EnrollOutcome::Enrolled {
			already_member: false,
		}
	}
}

struct PanickingPlatform;

#[async_trait]
impl TargetPlatform for PanickingPlatform {
	async fn can_reach(&self, _collection: &CollectionId) -> Result<bool, PlatformError> {
		Ok(true)
	}

	async fn enroll(
		&self,
		_collection: &CollectionId,
		_identity: &IdentityId,
		_access_token: &SecretString,
	) -> EnrollOutcome {
		panic!("platform exploded");
	}
}

// =============================================================================
// Helpers
// =============================================================================

fn record(id: &str, access: &str, refresh: &str, expires_at: i64) -> IdentityCredential {
	IdentityCredential {
		identity_id: IdentityId::new(id),
		access_token: SecretString::new(access),
		refresh_token: SecretString::new(refresh),
		expires_at,
	}
}

fn fresh(id: &str) -> IdentityCredential {
	record(
		id,
		&format!("{id}-access"),
		&format!("{id}-refresh"),
		now_millis() + HOUR_MS,
	)
}

fn orchestrator(
	store: Arc<dyn CredentialStore>,
	provider: Arc<dyn IdentityProvider>,
	platform: Arc<dyn TargetPlatform>,
) -> BatchJoinOrchestrator {
	BatchJoinOrchestrator::new(
		store,
		provider,
		platform,
		Arc::new(ExclusionList::new()),
		ProvisioningSettings::default(),
	)
}

fn guild() -> CollectionId {
	CollectionId::new("1417345946874019890")
}

fn reject_reason(result: Result<muster_core::ProvisioningReport, ProvisionError>) -> RejectReason {
	result
		.expect_err("run should have been rejected")
		.reject_reason()
		.expect("rejection, not a store error")
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test(start_paused = true)]
async fn valid_refreshable_and_dead_credentials() {
	let store = Arc::new(MemoryCredentialStore::with_records([
		record("A", "a-valid", "a-refresh", now_millis() + HOUR_MS),
		record("B", "b-stale", "b-refresh", 0),
		record("C", "c-stale", "c-refresh", 0),
	]));
	let provider = Arc::new(FakeProvider::default().grant("b-refresh", "b-fresh", "b-refresh-2"));
	let platform = Arc::new(FakePlatform::accepting(&["a-valid", "b-fresh"]));

	let orch = orchestrator(store.clone(), provider.clone(), platform.clone());
	let report = orch.run(guild(), Some(3), PrivilegeTier::Admin).await.unwrap();

	assert_eq!(report.attempted, 3);
	assert_eq!(report.succeeded, 2);
	assert_eq!(report.failed, 1);
	assert_eq!(report.pruned, 1);
	assert_eq!(report.target, guild());

	assert!(store.get(&IdentityId::new("C")).await.unwrap().is_none());
	assert!(store.get(&IdentityId::new("A")).await.unwrap().is_some());
	let b = store.get(&IdentityId::new("B")).await.unwrap().unwrap();
	assert!(b.expires_at > 0);
	assert_eq!(b.access_token.expose(), "b-fresh");
	assert_eq!(b.refresh_token.expose(), "b-refresh-2");

	// Expired tokens are never sent to the platform.
	let sent: Vec<String> = platform.calls().into_iter().map(|(_, t)| t).collect();
	assert!(!sent.contains(&"b-stale".to_string()));
	assert!(!sent.contains(&"c-stale".to_string()));
	assert!(!orch.is_running());
}

#[tokio::test(start_paused = true)]
async fn empty_store_completes_with_zero_counts() {
	let orch = orchestrator(
		Arc::new(MemoryCredentialStore::new()),
		Arc::new(FakeProvider::default()),
		Arc::new(FakePlatform::default()),
	);

	let report = orch.run(guild(), Some(5), PrivilegeTier::Admin).await.unwrap();
	assert_eq!(
		(report.attempted, report.succeeded, report.failed),
		(0, 0, 0)
	);
	assert!(!orch.is_running());
}

#[tokio::test(start_paused = true)]
async fn revoked_token_is_refreshed_and_retried_once() {
	let store = Arc::new(MemoryCredentialStore::with_records([fresh("A")]));
	let provider = Arc::new(FakeProvider::default().grant("A-refresh", "A-new", "A-refresh-2"));
	let platform = Arc::new(FakePlatform::accepting(&["A-new"]));

	let orch = orchestrator(store.clone(), provider.clone(), platform.clone());
	let report = orch.run(guild(), None, PrivilegeTier::Bronze).await.unwrap();

	assert_eq!((report.succeeded, report.failed), (1, 0));
	assert_eq!(provider.calls(), vec!["A-refresh".to_string()]);
	assert_eq!(
		platform.calls(),
		vec![
			("A".to_string(), "A-access".to_string()),
			("A".to_string(), "A-new".to_string()),
		]
	);
}

#[tokio::test(start_paused = true)]
async fn unauthorized_after_refresh_prunes() {
	let store = Arc::new(MemoryCredentialStore::with_records([fresh("A")]));
	let provider = Arc::new(FakeProvider::default().grant("A-refresh", "A-new", "A-refresh-2"));
	let platform = Arc::new(FakePlatform::default());

	let orch = orchestrator(store.clone(), provider, platform.clone());
	let report = orch.run(guild(), None, PrivilegeTier::Admin).await.unwrap();

	assert_eq!((report.succeeded, report.failed, report.pruned), (0, 1, 1));
	assert_eq!(platform.calls().len(), 2);
	assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn rate_limited_keeps_credential_without_refreshing() {
	let store = Arc::new(MemoryCredentialStore::with_records([fresh("A")]));
	let provider = Arc::new(FakeProvider::default());
	let platform = Arc::new(FakePlatform::default().throttling("A-access"));

	let orch = orchestrator(store.clone(), provider.clone(), platform);
	let report = orch.run(guild(), None, PrivilegeTier::Admin).await.unwrap();

	assert_eq!((report.succeeded, report.failed, report.pruned), (0, 1, 0));
	assert!(provider.calls().is_empty());
	assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn refresh_transport_error_keeps_credential() {
	let store = Arc::new(MemoryCredentialStore::with_records([record(
		"A", "a-stale", "a-refresh", 0,
	)]));
	let provider = Arc::new(FakeProvider::default().unavailable("a-refresh"));
	let platform = Arc::new(FakePlatform::default());

	let orch = orchestrator(store.clone(), provider, platform.clone());
	let report = orch.run(guild(), None, PrivilegeTier::Admin).await.unwrap();

	assert_eq!((report.failed, report.pruned), (1, 0));
	assert!(platform.calls().is_empty());
	assert!(store.get(&IdentityId::new("A")).await.unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn refresh_refused_for_client_reasons_keeps_credential() {
	let store = Arc::new(MemoryCredentialStore::with_records([
		record("A", "a-stale", "a-refresh", 0),
		record("B", "b-stale", "b-refresh", 0),
	]));
	let provider = Arc::new(
		FakeProvider::default()
			.refusing("a-refresh")
			.refusing("b-refresh"),
	);
	let platform = Arc::new(FakePlatform::default());

	let orch = orchestrator(store.clone(), provider, platform.clone());
	let report = orch.run(guild(), None, PrivilegeTier::Admin).await.unwrap();

	assert_eq!((report.failed, report.pruned), (2, 0));
	assert!(platform.calls().is_empty());
	assert_eq!(store.count().await.unwrap(), 2);
}

#[tokio::test(start_paused = true)]
async fn pruned_identity_is_absent_from_later_runs() {
	let store = Arc::new(MemoryCredentialStore::with_records([
		fresh("A"),
		record("dead", "dead-stale", "dead-refresh", 0),
	]));
	let platform = Arc::new(FakePlatform::accepting(&["A-access"]));
	let orch = orchestrator(store.clone(), Arc::new(FakeProvider::default()), platform.clone());

	let first = orch.run(guild(), None, PrivilegeTier::Admin).await.unwrap();
	assert_eq!((first.attempted, first.pruned), (2, 1));

	let second = orch.run(guild(), None, PrivilegeTier::Admin).await.unwrap();
	assert_eq!((second.attempted, second.succeeded), (1, 1));
	assert!(platform.calls().iter().all(|(id, _)| id != "dead"));
}

#[tokio::test(start_paused = true)]
async fn report_counts_are_conserved() {
	let mut records: Vec<IdentityCredential> = (0..6).map(|i| fresh(&format!("ok-{i}"))).collect();
	records.extend((0..4).map(|i| record(&format!("dead-{i}"), "x", &format!("dr-{i}"), 0)));
	records.push(fresh("slow"));

	let accepted: Vec<String> = (0..6).map(|i| format!("ok-{i}-access")).collect();
	let accepted_refs: Vec<&str> = accepted.iter().map(String::as_str).collect();

	let store = Arc::new(MemoryCredentialStore::with_records(records));
	let orch = orchestrator(
		store.clone(),
		Arc::new(FakeProvider::default()),
		Arc::new(FakePlatform::accepting(&accepted_refs).throttling("slow-access")),
	);

	let report = orch.run(guild(), None, PrivilegeTier::Admin).await.unwrap();
	assert_eq!(report.attempted, 11);
	assert_eq!(report.succeeded + report.failed, report.attempted);
	assert_eq!(report.succeeded, 6);
	assert_eq!(report.pruned, 4);
	assert_eq!(store.count().await.unwrap(), 7);
}

#[tokio::test(start_paused = true)]
async fn pacing_delay_separates_identities() {
	let store = Arc::new(MemoryCredentialStore::with_records([
		fresh("A"),
		fresh("B"),
		fresh("C"),
	]));
	let orch = orchestrator(
		store,
		Arc::new(FakeProvider::default()),
		Arc::new(FakePlatform::accepting(&["A-access", "B-access"])),
	);

	let started = tokio::time::Instant::now();
	let report = orch.run(guild(), None, PrivilegeTier::Admin).await.unwrap();

	// Two gaps for three identities, applied on the failure path too.
	assert_eq!(report.attempted, 3);
	assert!(started.elapsed() >= Duration::from_millis(6000));
	assert!(started.elapsed() < Duration::from_millis(9000));
	assert!(report.duration_ms >= 6000);
}

#[tokio::test(start_paused = true)]
async fn quota_tier_samples_its_quota() {
	let store = Arc::new(MemoryCredentialStore::with_records(
		(0..20).map(|i| fresh(&format!("id-{i}"))),
	));
	let tokens: Vec<String> = (0..20).map(|i| format!("id-{i}-access")).collect();
	let token_refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
	let orch = orchestrator(
		store.clone(),
		Arc::new(FakeProvider::default()),
		Arc::new(FakePlatform::accepting(&token_refs)),
	);

	let report = orch.run(guild(), None, PrivilegeTier::Bronze).await.unwrap();
	assert_eq!((report.attempted, report.succeeded), (4, 4));
	assert_eq!(store.count().await.unwrap(), 20);
}

// =============================================================================
// Admission
// =============================================================================

#[tokio::test]
async fn excluded_target_is_rejected_without_side_effects() {
	let store = Arc::new(MemoryCredentialStore::with_records([fresh("A")]));
	let platform = Arc::new(FakePlatform::accepting(&["A-access"]));
	let orch = orchestrator(store.clone(), Arc::new(FakeProvider::default()), platform.clone());

	assert!(orch.exclude(guild()).await);
	let reason = reject_reason(orch.run(guild(), Some(1), PrivilegeTier::Admin).await);

	assert_eq!(reason, RejectReason::TargetExcluded);
	assert!(platform.calls().is_empty());
	assert_eq!(orch.stock_count().await.unwrap(), 1);
	assert!(!orch.is_running());
}

#[tokio::test]
async fn unreachable_target_does_not_take_the_guard() {
	let orch = orchestrator(
		Arc::new(MemoryCredentialStore::with_records([fresh("A")])),
		Arc::new(FakeProvider::default()),
		Arc::new(FakePlatform::default().unreachable("foreign")),
	);

	let reason = reject_reason(
		orch
			.run(CollectionId::new("foreign"), None, PrivilegeTier::Admin)
			.await,
	);
	assert_eq!(reason, RejectReason::TargetUnreachable);

	let reason = reject_reason(
		orch
			.run(CollectionId::new("error"), None, PrivilegeTier::Admin)
			.await,
	);
	assert_eq!(reason, RejectReason::TargetUnreachable);
	assert!(!orch.is_running());
}

#[tokio::test]
async fn quantity_invalid_for_tier() {
	let orch = orchestrator(
		Arc::new(MemoryCredentialStore::new()),
		Arc::new(FakeProvider::default()),
		Arc::new(FakePlatform::default()),
	);

	for (tier, quantity) in [
		(PrivilegeTier::None, None),
		(PrivilegeTier::Bronze, Some(5)),
		(PrivilegeTier::Silver, Some(0)),
	] {
		let reason = reject_reason(orch.run(guild(), quantity, tier).await);
		assert_eq!(reason, RejectReason::QuantityInvalidForTier, "{tier} {quantity:?}");
	}
}

#[tokio::test]
async fn concurrent_run_is_rejected_with_no_side_effects() {
	let store = Arc::new(MemoryCredentialStore::with_records([fresh("A"), fresh("B")]));
	let platform = Arc::new(BlockingPlatform::default());
	let orch = Arc::new(BatchJoinOrchestrator::new(
		store.clone(),
		Arc::new(FakeProvider::default()),
		platform.clone(),
		Arc::new(ExclusionList::new()),
		ProvisioningSettings {
			pacing_interval: Duration::from_millis(1),
			..Default::default()
		},
	));

	let first = tokio::spawn({
		let orch = orch.clone();
		async move { orch.run(guild(), None, PrivilegeTier::Admin).await }
	});
	platform.entered.notified().await;
	assert!(orch.is_running());

	let before = store.get_all().await.unwrap().len();
	let reason = reject_reason(orch.run(guild(), None, PrivilegeTier::Admin).await);
	assert_eq!(reason, RejectReason::AlreadyRunning);
	assert_eq!(store.get_all().await.unwrap().len(), before);
	assert_eq!(*platform.calls.lock().unwrap(), 1);

	platform.release.notify_one();
	let report = first.await.unwrap().unwrap();
	assert_eq!(report.succeeded, 2);
	assert!(!orch.is_running());

	let again = orch.run(guild(), None, PrivilegeTier::Admin).await.unwrap();
	assert_eq!(again.attempted, 2);
}

#[tokio::test]
async fn guard_is_released_when_a_run_panics() {
	let orch = Arc::new(orchestrator(
		Arc::new(MemoryCredentialStore::with_records([fresh("A")])),
		Arc::new(FakeProvider::default()),
		Arc::new(PanickingPlatform),
	));

	let handle = tokio::spawn({
		let orch = orch.clone();
		async move { orch.run(guild(), None, PrivilegeTier::Admin).await }
	});
	let joined = handle.await;
	assert!(joined.unwrap_err().is_panic());
	assert!(!orch.is_running());
}

#[tokio::test]
async fn works_against_sqlite_store() {
	let repo = Arc::new(CredentialRepository::new(
		muster_db::testing::create_test_pool().await,
	));
	repo.put_record(&fresh("A")).await.unwrap();
	repo
		.put_record(&record("B", "b-stale", "b-refresh", 0))
		.await
		.unwrap();

	let orch = BatchJoinOrchestrator::new(
		repo.clone(),
		Arc::new(FakeProvider::default()),
		Arc::new(FakePlatform::accepting(&["A-access"])),
		Arc::new(ExclusionList::new()),
		ProvisioningSettings {
			pacing_interval: Duration::from_millis(1),
			..Default::default()
		},
	);
	let report = orch.run(guild(), None, PrivilegeTier::Admin).await.unwrap();

	assert_eq!((report.succeeded, report.pruned), (1, 1));
	assert_eq!(orch.stock_count().await.unwrap(), 1);
}
