//! Cached token records keyed by account and scope set.

// self
use crate::{
	_prelude::*,
	auth::{AccountId, ScopeSet, token::secret::TokenSecret},
};

/// Lifecycle status of a cached token record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// `issued_at` lies in the future (clock skew between host and provider).
	Pending,
	/// Token can be handed to callers.
	Active,
	/// Token reached its expiry instant.
	Expired,
	/// Token was revoked locally after the provider rejected its refresh token.
	Revoked,
}

/// Errors produced by [`TokenRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenRecordBuilderError {
	/// No access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Neither an absolute nor a relative expiry was provided.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
}

/// Cache key for a token record.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TokenKey {
	/// Account that owns the token.
	pub account: AccountId,
	/// Normalized scopes the token was granted for.
	pub scope: ScopeSet,
}
impl TokenKey {
	/// Creates a key from its parts.
	pub fn new(account: AccountId, scope: ScopeSet) -> Self {
		Self { account, scope }
	}

	/// String form used by stores that need flat keys.
	pub fn storage_key(&self) -> String {
		format!("{}|{}", self.account, self.scope.fingerprint())
	}
}

/// Tokens issued to one account for one scope set.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenRecord {
	/// Owning account.
	pub account: AccountId,
	/// Normalized scopes granted to this record.
	pub scope: ScopeSet,
	/// Bearer token.
	pub access_token: TokenSecret,
	/// Refresh token, if the provider issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Issued-at instant recorded when the token response arrived.
	pub issued_at: OffsetDateTime,
	/// Expiry instant.
	pub expires_at: OffsetDateTime,
	/// Revocation instant, if the record was revoked.
	pub revoked_at: Option<OffsetDateTime>,
}
impl TokenRecord {
	/// Starts a builder for the given account and scopes.
	pub fn builder(account: AccountId, scope: ScopeSet) -> TokenRecordBuilder {
		TokenRecordBuilder::new(account, scope)
	}

	/// Cache key for this record.
	pub fn key(&self) -> TokenKey {
		TokenKey::new(self.account.clone(), self.scope.clone())
	}

	/// Lifecycle status at `instant`.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		if self.revoked_at.is_some() {
			TokenStatus::Revoked
		} else if instant < self.issued_at {
			TokenStatus::Pending
		} else if instant >= self.expires_at {
			TokenStatus::Expired
		} else {
			TokenStatus::Active
		}
	}

	/// Returns `true` when the record is active at `instant` and stays active for at least
	/// `window` more.
	pub fn is_usable_at(&self, instant: OffsetDateTime, window: Duration) -> bool {
		self.status_at(instant) == TokenStatus::Active && self.expires_at - instant > window
	}

	/// Returns `true` if the record has been revoked.
	pub fn is_revoked(&self) -> bool {
		self.revoked_at.is_some()
	}

	/// Marks the record as revoked.
	pub fn revoke(&mut self, instant: OffsetDateTime) {
		self.revoked_at = Some(instant);
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("account", &self.account)
			.field("scope", &self.scope)
			.field("access_token", &self.access_token)
			.field("refresh_token", &self.refresh_token)
			.field("expires_at", &self.expires_at)
			.field("revoked_at", &self.revoked_at)
			.finish_non_exhaustive()
	}
}

/// Builder for [`TokenRecord`].
#[derive(Clone, Debug)]
pub struct TokenRecordBuilder {
	account: AccountId,
	scope: ScopeSet,
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl TokenRecordBuilder {
	fn new(account: AccountId, scope: ScopeSet) -> Self {
		Self {
			account,
			scope,
			access_token: None,
			refresh_token: None,
			issued_at: None,
			expires_at: None,
			expires_in: None,
		}
	}

	/// Sets the issued-at instant. Defaults to now.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant. Takes precedence over [`expires_in`](Self::expires_in).
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets the lifetime relative to the issued-at instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Sets the bearer token.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Sets the refresh token, when one was issued.
	pub fn refresh_token(mut self, token: Option<impl Into<String>>) -> Self {
		self.refresh_token = token.map(TokenSecret::new);

		self
	}

	/// Consumes the builder and produces a [`TokenRecord`].
	pub fn build(self) -> Result<TokenRecord, TokenRecordBuilderError> {
		let access_token = self.access_token.ok_or(TokenRecordBuilderError::MissingAccessToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = self
			.expires_at
			.or_else(|| self.expires_in.map(|delta| issued_at + delta))
			.ok_or(TokenRecordBuilderError::MissingExpiry)?;

		Ok(TokenRecord {
			account: self.account,
			scope: self.scope,
			access_token,
			refresh_token: self.refresh_token,
			issued_at,
			expires_at,
			revoked_at: None,
		})
	}
}
