//! JSON file [`SessionStore`], the persistent cache location.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{Account, AccountId, TokenKey, TokenRecord},
	identity::PendingAuthorization,
	store::{CacheState, CompareAndSwapOutcome, SessionStore, StoreError, StoreFuture},
};

/// Cache persisted to a JSON file after every mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<CacheState>>,
}
impl FileStore {
	/// Opens the store at `path`, loading existing contents. A missing or empty file starts
	/// an empty cache.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();
		let state = load(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(state)) })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn read<T>(&self, f: impl FnOnce(&CacheState) -> T) -> T {
		f(&self.inner.read())
	}

	/// Applies `f` and writes the new contents while still holding the lock, so the file
	/// never lags behind a concurrent mutation.
	fn write<T>(&self, f: impl FnOnce(&mut CacheState) -> T) -> Result<T, StoreError> {
		let mut guard = self.inner.write();
		let value = f(&mut guard);

		persist(&self.path, &guard)?;

		Ok(value)
	}
}
impl SessionStore for FileStore {
	fn save_account(&self, account: Account) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.write(|state| state.upsert_account(account)) })
	}

	fn accounts(&self) -> StoreFuture<'_, Vec<Account>> {
		Box::pin(async move { Ok(self.read(|state| state.accounts.clone())) })
	}

	fn remove_account<'a>(&'a self, id: &'a AccountId) -> StoreFuture<'a, Option<Account>> {
		Box::pin(async move { self.write(|state| state.remove_account(id)) })
	}

	fn save(&self, record: TokenRecord) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.write(|state| state.put_token(record)) })
	}

	fn fetch<'a>(&'a self, key: &'a TokenKey) -> StoreFuture<'a, Option<TokenRecord>> {
		Box::pin(async move { Ok(self.read(|state| state.token(key))) })
	}

	fn account_tokens<'a>(&'a self, id: &'a AccountId) -> StoreFuture<'a, Vec<TokenRecord>> {
		Box::pin(async move { Ok(self.read(|state| state.account_tokens(id))) })
	}

	fn compare_and_swap_refresh<'a>(
		&'a self,
		key: &'a TokenKey,
		expected_refresh: Option<&'a str>,
		replacement: TokenRecord,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		Box::pin(async move {
			self.write(|state| state.compare_and_swap_refresh(key, expected_refresh, replacement))
		})
	}

	fn revoke<'a>(
		&'a self,
		key: &'a TokenKey,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, Option<TokenRecord>> {
		Box::pin(async move { self.write(|state| state.revoke(key, instant)) })
	}

	fn clear_tokens(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.write(CacheState::clear_tokens) })
	}

	fn save_pending(&self, pending: PendingAuthorization) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			self.write(|state| state.put_pending(pending, OffsetDateTime::now_utc()))
		})
	}

	fn take_pending<'a>(&'a self, state: &'a str) -> StoreFuture<'a, Option<PendingAuthorization>> {
		Box::pin(async move {
			self.write(|cache| cache.take_pending(state, OffsetDateTime::now_utc()))
		})
	}
}

fn backend(action: &str, path: &Path, e: impl Display) -> StoreError {
	StoreError::Backend { message: format!("Failed to {action} {}: {e}", path.display()) }
}

fn load(path: &Path) -> Result<CacheState, StoreError> {
	if !path.exists() {
		return Ok(CacheState::default());
	}

	let bytes = fs::read(path).map_err(|e| backend("read", path, e))?;

	if bytes.is_empty() {
		return Ok(CacheState::default());
	}

	serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
		message: format!("Failed to parse {}: {e}", path.display()),
	})
}

fn persist(path: &Path, state: &CacheState) -> Result<(), StoreError> {
	if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
		fs::create_dir_all(parent).map_err(|e| backend("create directory", parent, e))?;
	}

	let serialized = serde_json::to_vec_pretty(state).map_err(|e| StoreError::Serialization {
		message: format!("Failed to serialize session cache: {e}"),
	})?;
	let tmp_path = path.with_extension("tmp");

	{
		let mut file = File::create(&tmp_path).map_err(|e| backend("create", &tmp_path, e))?;

		file.write_all(&serialized).map_err(|e| backend("write", &tmp_path, e))?;
		file.sync_all().map_err(|e| backend("sync", &tmp_path, e))?;
	}

	fs::rename(&tmp_path, path).map_err(|e| backend("replace", path, e))
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;
	use crate::auth::{ScopeSet, TenantId};

	fn temp_path(label: &str) -> PathBuf {
		env::temp_dir().join(format!(
			"aad_session_file_store_{label}_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		))
	}

	fn fixture() -> (Account, TokenRecord) {
		let tenant = TenantId::new("tid").expect("Tenant fixture should be valid.");
		let account = Account {
			id: AccountId::from_parts("oid", &tenant).expect("Account id should build."),
			tenant,
			name: Some("Ada".into()),
			username: "ada@contoso.com".into(),
		};
		let record = TokenRecord::builder(
			account.id.clone(),
			ScopeSet::from_str("api://demo/access_as_user").expect("Scopes should parse."),
		)
		.access_token("access-token")
		.refresh_token(Some("refresh-token"))
		.expires_in(Duration::hours(1))
		.build()
		.expect("Record should build.");

		(account, record)
	}

	#[test]
	fn contents_survive_reopen() {
		let path = temp_path("reopen");
		let rt = Runtime::new().expect("Tokio runtime should build.");
		let (account, record) = fixture();
		let store = FileStore::open(&path).expect("Store should open.");

		rt.block_on(store.save_account(account.clone())).expect("Account should save.");
		rt.block_on(store.save(record.clone())).expect("Record should save.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Store should reopen.");
		let fetched = rt
			.block_on(reopened.fetch(&record.key()))
			.expect("Fetch should succeed.")
			.expect("Record should survive reopen.");

		assert_eq!(fetched.access_token.expose(), "access-token");
		assert_eq!(rt.block_on(reopened.accounts()).expect("Accounts should load."), vec![account]);

		fs::remove_file(&path).expect("Temporary store file should be removable.");
	}

	#[test]
	fn clear_tokens_keeps_accounts_on_disk() {
		let path = temp_path("clear");
		let rt = Runtime::new().expect("Tokio runtime should build.");
		let (account, record) = fixture();
		let store = FileStore::open(&path).expect("Store should open.");

		rt.block_on(store.save_account(account.clone())).expect("Account should save.");
		rt.block_on(store.save(record.clone())).expect("Record should save.");
		rt.block_on(store.clear_tokens()).expect("Clear should succeed.");

		let reopened = FileStore::open(&path).expect("Store should reopen.");

		assert!(rt.block_on(reopened.fetch(&record.key())).expect("Fetch should succeed.").is_none());
		assert_eq!(rt.block_on(reopened.accounts()).expect("Accounts should load.").len(), 1);

		fs::remove_file(&path).expect("Temporary store file should be removable.");
	}

	#[test]
	fn corrupt_file_is_a_serialization_error() {
		let path = temp_path("corrupt");

		fs::write(&path, b"{not json").expect("Fixture file should be writable.");

		assert!(matches!(FileStore::open(&path), Err(StoreError::Serialization { .. })));

		fs::remove_file(&path).expect("Temporary store file should be removable.");
	}
}
