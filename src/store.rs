//! Token cache contract and the two cache locations.
//!
//! [`MemoryStore`] plays the role of browser session storage: it lives as long as the
//! process, and clones share state, so a manager rebuilt after a redirect sees the same
//! cache. [`FileStore`] is the persistent location and survives restarts.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{Account, AccountId, TokenKey, TokenRecord, TokenSecret},
	identity::PendingAuthorization,
};

/// Boxed future returned by [`SessionStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend for accounts, token records, and pending redirect authorizations.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Inserts or replaces an account, keeping first-seen order.
	fn save_account(&self, account: Account) -> StoreFuture<'_, ()>;

	/// Cached accounts in first-seen order.
	fn accounts(&self) -> StoreFuture<'_, Vec<Account>>;

	/// Removes an account together with its token records.
	fn remove_account<'a>(&'a self, id: &'a AccountId) -> StoreFuture<'a, Option<Account>>;

	/// Inserts or replaces the record for its account and scope set.
	fn save(&self, record: TokenRecord) -> StoreFuture<'_, ()>;

	/// Fetches the record for `key`.
	fn fetch<'a>(&'a self, key: &'a TokenKey) -> StoreFuture<'a, Option<TokenRecord>>;

	/// All records of an account, in any order.
	fn account_tokens<'a>(&'a self, id: &'a AccountId) -> StoreFuture<'a, Vec<TokenRecord>>;

	/// Replaces the record for `key` only if its refresh token still equals `expected_refresh`.
	fn compare_and_swap_refresh<'a>(
		&'a self,
		key: &'a TokenKey,
		expected_refresh: Option<&'a str>,
		replacement: TokenRecord,
	) -> StoreFuture<'a, CompareAndSwapOutcome>;

	/// Marks the record for `key` as revoked.
	fn revoke<'a>(
		&'a self,
		key: &'a TokenKey,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, Option<TokenRecord>>;

	/// Drops every token record. Accounts and pending authorizations stay.
	fn clear_tokens(&self) -> StoreFuture<'_, ()>;

	/// Persists a pending authorization under its state value.
	fn save_pending(&self, pending: PendingAuthorization) -> StoreFuture<'_, ()>;

	/// Removes and returns the pending authorization for `state`.
	fn take_pending<'a>(&'a self, state: &'a str) -> StoreFuture<'a, Option<PendingAuthorization>>;
}

/// Result of a refresh-token compare-and-swap attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareAndSwapOutcome {
	/// The refresh token matched and the record was replaced.
	Updated,
	/// Another caller rotated the refresh token first.
	RefreshMismatch,
	/// No record exists for the key.
	Missing,
}

/// Error type produced by [`SessionStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Cache contents could not be encoded or decoded.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Storage medium failed.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Cache contents shared by the built-in stores.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct CacheState {
	accounts: Vec<Account>,
	tokens: BTreeMap<String, TokenRecord>,
	pending: BTreeMap<String, PendingAuthorization>,
}
impl CacheState {
	fn upsert_account(&mut self, account: Account) {
		match self.accounts.iter_mut().find(|known| known.id == account.id) {
			Some(known) => *known = account,
			None => self.accounts.push(account),
		}
	}

	fn remove_account(&mut self, id: &AccountId) -> Option<Account> {
		let position = self.accounts.iter().position(|known| &known.id == id)?;

		self.tokens.retain(|_, record| &record.account != id);

		Some(self.accounts.remove(position))
	}

	fn put_token(&mut self, record: TokenRecord) {
		self.tokens.insert(record.key().storage_key(), record);
	}

	fn token(&self, key: &TokenKey) -> Option<TokenRecord> {
		self.tokens.get(&key.storage_key()).cloned()
	}

	fn account_tokens(&self, id: &AccountId) -> Vec<TokenRecord> {
		self.tokens.values().filter(|record| &record.account == id).cloned().collect()
	}

	fn compare_and_swap_refresh(
		&mut self,
		key: &TokenKey,
		expected_refresh: Option<&str>,
		replacement: TokenRecord,
	) -> CompareAndSwapOutcome {
		let storage_key = key.storage_key();
		let Some(existing) = self.tokens.get(&storage_key) else {
			return CompareAndSwapOutcome::Missing;
		};

		if existing.refresh_token.as_ref().map(TokenSecret::expose) != expected_refresh {
			return CompareAndSwapOutcome::RefreshMismatch;
		}

		self.tokens.insert(storage_key, replacement);

		CompareAndSwapOutcome::Updated
	}

	fn revoke(&mut self, key: &TokenKey, instant: OffsetDateTime) -> Option<TokenRecord> {
		let record = self.tokens.get_mut(&key.storage_key())?;

		record.revoke(instant);

		Some(record.clone())
	}

	fn clear_tokens(&mut self) {
		self.tokens.clear();
	}

	fn put_pending(&mut self, pending: PendingAuthorization, now: OffsetDateTime) {
		self.prune_pending(now);
		self.pending.insert(pending.state.clone(), pending);
	}

	fn take_pending(&mut self, state: &str, now: OffsetDateTime) -> Option<PendingAuthorization> {
		self.prune_pending(now);
		self.pending.remove(state)
	}

	/// Drops handshakes whose callback never arrived.
	fn prune_pending(&mut self, now: OffsetDateTime) {
		self.pending.retain(|_, pending| !pending.is_expired_at(now));
	}
}
