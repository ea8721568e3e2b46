//! Access tokens handed to callers and the results of interactive flows.

// self
use crate::{
	_prelude::*,
	auth::{Account, ScopeSet, TokenRecord, token::secret::TokenSecret},
	inspect::{self, TokenClaims},
};

/// Bearer token returned by token acquisition.
///
/// Claims are decoded for display only and never drive authorization decisions.
#[derive(Clone, Debug)]
pub struct AccessToken {
	/// Raw bearer value.
	pub secret: TokenSecret,
	/// Scopes the token was granted for.
	pub scopes: ScopeSet,
	/// Expiry instant.
	pub expires_at: OffsetDateTime,
	/// Decoded claims when the token is a readable JWT.
	pub claims: Option<TokenClaims>,
}
impl AccessToken {
	/// Value for the `Authorization` header.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.secret.expose())
	}
}
impl From<&TokenRecord> for AccessToken {
	fn from(record: &TokenRecord) -> Self {
		Self {
			secret: record.access_token.clone(),
			scopes: record.scope.clone(),
			expires_at: record.expires_at,
			claims: inspect::decode_token(record.access_token.expose())
				.ok()
				.and_then(|decoded| decoded.claims().ok()),
		}
	}
}

/// Outcome of a sign-in or token request.
#[derive(Clone, Debug)]
pub struct AuthenticationResult {
	/// Account the tokens belong to.
	pub account: Account,
	/// Access token for the requested scopes.
	pub access_token: AccessToken,
	/// ID token returned alongside, if any.
	pub id_token: Option<TokenSecret>,
}
