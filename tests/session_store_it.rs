mod common;

// std
use std::{env, path::PathBuf, process};
// crates.io
use time::{Duration, OffsetDateTime, macros};
// self
use aad_session::{
	auth::{Account, AccountId, ProviderId, ScopeSet, TokenKey, TokenRecord, TokenStatus},
	identity::{AuthIntent, AuthorizeParams, PendingAuthorization},
	provider::ProviderDescriptor,
	store::{CompareAndSwapOutcome, FileStore, MemoryStore, SessionStore},
};

fn temp_path(label: &str) -> PathBuf {
	env::temp_dir().join(format!(
		"aad_session_store_it_{label}_{}_{}.json",
		process::id(),
		OffsetDateTime::now_utc().unix_timestamp_nanos(),
	))
}

/// Both cache locations, so every behavior is checked against each.
fn stores(label: &str) -> Vec<(&'static str, Box<dyn SessionStore>)> {
	vec![
		("memory", Box::new(MemoryStore::default()) as Box<dyn SessionStore>),
		(
			"file",
			Box::new(FileStore::open(temp_path(label)).expect("File store should open in the temp dir."))
				as Box<dyn SessionStore>,
		),
	]
}

fn scope() -> ScopeSet {
	ScopeSet::new(["email", "profile"]).expect("Failed to build default scope set for tests.")
}

fn build_record(account: &Account, scope: &ScopeSet, access: &str, refresh: Option<&str>) -> TokenRecord {
	let issued = macros::datetime!(2025-11-10 12:00 UTC);

	TokenRecord::builder(account.id.clone(), scope.clone())
		.access_token(access)
		.refresh_token(refresh)
		.issued_at(issued)
		.expires_at(issued + Duration::hours(1))
		.build()
		.expect("Token record fixture should build successfully.")
}

fn pending() -> PendingAuthorization {
	let descriptor = ProviderDescriptor::from_authority(
		ProviderId::new("aad").expect("Provider id should be valid."),
		&common::url("https://login.microsoftonline.com/common"),
	)
	.expect("Descriptor should build.");

	PendingAuthorization::start(
		&descriptor,
		"client-it",
		AuthorizeParams {
			intent: AuthIntent::AcquireToken,
			scope: scope(),
			redirect_uri: &common::url("http://localhost:3000/"),
			login_hint: Some("ada@contoso.com"),
			prompt: None,
		},
	)
}

#[tokio::test]
async fn save_and_fetch_round_trip() {
	for (name, store) in stores("round_trip") {
		let account = common::account();
		let record = build_record(&account, &scope(), "access-1", Some("refresh-1"));

		store.save(record.clone()).await.expect("Saving a record should succeed.");

		let fetched = store
			.fetch(&record.key())
			.await
			.expect("Fetching a record should succeed.")
			.unwrap_or_else(|| panic!("{name}: stored record should remain present."));

		assert_eq!(fetched.access_token.expose(), "access-1", "{name}");
		assert_eq!(fetched.refresh_token.as_ref().map(|s| s.expose()), Some("refresh-1"), "{name}");
	}
}

#[tokio::test]
async fn cas_success_mismatch_and_missing() {
	for (name, store) in stores("cas") {
		let account = common::account();
		let scope = scope();
		let key = TokenKey::new(account.id.clone(), scope.clone());

		assert_eq!(
			store
				.compare_and_swap_refresh(&key, None, build_record(&account, &scope, "a", Some("r")))
				.await
				.expect("CAS on an empty store should answer."),
			CompareAndSwapOutcome::Missing,
			"{name}"
		);

		store
			.save(build_record(&account, &scope, "access-initial", Some("refresh-old")))
			.await
			.expect("Saving the initial record should succeed.");

		let replacement = build_record(&account, &scope, "access-new", Some("refresh-new"));

		assert_eq!(
			store
				.compare_and_swap_refresh(&key, Some("refresh-old"), replacement.clone())
				.await
				.expect("Matching CAS should answer."),
			CompareAndSwapOutcome::Updated,
			"{name}"
		);
		assert_eq!(
			store
				.compare_and_swap_refresh(&key, Some("refresh-old"), replacement)
				.await
				.expect("Stale CAS should answer."),
			CompareAndSwapOutcome::RefreshMismatch,
			"{name}"
		);

		let stored = store.fetch(&key).await.expect("Fetch should succeed.").expect("Record should exist.");

		assert_eq!(stored.access_token.expose(), "access-new", "{name}");
	}
}

#[tokio::test]
async fn revoke_marks_without_removing() {
	for (name, store) in stores("revoke") {
		let account = common::account();
		let record = build_record(&account, &scope(), "access", Some("refresh"));
		let instant = macros::datetime!(2025-11-10 12:30 UTC);

		store.save(record.clone()).await.expect("Saving a record should succeed.");

		let revoked = store
			.revoke(&record.key(), instant)
			.await
			.expect("Revoke should succeed.")
			.expect("Revoke should return the record.");

		assert_eq!(revoked.status_at(instant), TokenStatus::Revoked, "{name}");
		assert!(
			store
				.fetch(&record.key())
				.await
				.expect("Fetch should succeed.")
				.is_some_and(|r| r.is_revoked()),
			"{name}"
		);
	}
}

#[tokio::test]
async fn pending_authorization_is_taken_once() {
	for (name, store) in stores("pending") {
		let pending = pending();
		let state = pending.state.clone();

		store.save_pending(pending).await.expect("Saving the handshake should succeed.");

		let taken = store.take_pending(&state).await.expect("Take should succeed.");

		assert_eq!(taken.map(|p| p.scope), Some(scope()), "{name}");
		assert!(store.take_pending(&state).await.expect("Take should succeed.").is_none(), "{name}");
	}
}

#[tokio::test]
async fn removing_an_account_drops_its_tokens_only() {
	for (name, store) in stores("remove") {
		let ada = common::account();
		let other = Account {
			id: AccountId::from_parts("oid-2", &ada.tenant).expect("Account id should build."),
			username: "grace@contoso.com".into(),
			..ada.clone()
		};
		let kept = build_record(&other, &scope(), "access-other", None);

		store.save_account(ada.clone()).await.expect("Account should save.");
		store.save_account(other.clone()).await.expect("Account should save.");
		store.save(build_record(&ada, &scope(), "access-ada", None)).await.expect("Record should save.");
		store.save(kept.clone()).await.expect("Record should save.");

		assert_eq!(
			store.remove_account(&ada.id).await.expect("Removal should succeed."),
			Some(ada.clone()),
			"{name}"
		);
		assert_eq!(store.accounts().await.expect("Accounts should load."), vec![other], "{name}");
		assert!(store.account_tokens(&ada.id).await.expect("Tokens should load.").is_empty(), "{name}");
		assert!(store.fetch(&kept.key()).await.expect("Fetch should succeed.").is_some(), "{name}");
	}
}
