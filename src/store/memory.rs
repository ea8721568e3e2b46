//! Process-lifetime [`SessionStore`], the equivalent of browser session storage.

// self
use crate::{
	_prelude::*,
	auth::{Account, AccountId, TokenKey, TokenRecord},
	identity::PendingAuthorization,
	store::{CacheState, CompareAndSwapOutcome, SessionStore, StoreFuture},
};

/// In-memory cache. Clones share the same contents.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<CacheState>>);
impl MemoryStore {
	fn read<T>(&self, f: impl FnOnce(&CacheState) -> T) -> T {
		f(&self.0.read())
	}

	fn write<T>(&self, f: impl FnOnce(&mut CacheState) -> T) -> T {
		f(&mut self.0.write())
	}
}
impl SessionStore for MemoryStore {
	fn save_account(&self, account: Account) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			self.write(|state| state.upsert_account(account));

			Ok(())
		})
	}

	fn accounts(&self) -> StoreFuture<'_, Vec<Account>> {
		Box::pin(async move { Ok(self.read(|state| state.accounts.clone())) })
	}

	fn remove_account<'a>(&'a self, id: &'a AccountId) -> StoreFuture<'a, Option<Account>> {
		Box::pin(async move { Ok(self.write(|state| state.remove_account(id))) })
	}

	fn save(&self, record: TokenRecord) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			self.write(|state| state.put_token(record));

			Ok(())
		})
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
			Ok(self.write(|state| state.compare_and_swap_refresh(key, expected_refresh, replacement)))
		})
	}

	fn revoke<'a>(
		&'a self,
		key: &'a TokenKey,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, Option<TokenRecord>> {
		Box::pin(async move { Ok(self.write(|state| state.revoke(key, instant))) })
	}

	fn clear_tokens(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			self.write(CacheState::clear_tokens);

			Ok(())
		})
	}

	fn save_pending(&self, pending: PendingAuthorization) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			self.write(|state| state.put_pending(pending, OffsetDateTime::now_utc()));

			Ok(())
		})
	}

	fn take_pending<'a>(&'a self, state: &'a str) -> StoreFuture<'a, Option<PendingAuthorization>> {
		Box::pin(async move {
			Ok(self.write(|cache| cache.take_pending(state, OffsetDateTime::now_utc())))
		})
	}
}
