//! Signed-in user accounts.

// self
use crate::{
	_prelude::*,
	auth::{AccountId, TenantId},
	error::ConfigError,
	inspect::TokenClaims,
};

/// A user known to the identity client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
	/// Home-account identifier.
	pub id: AccountId,
	/// Issuing tenant.
	pub tenant: TenantId,
	/// Display name, when the ID token carried one.
	pub name: Option<String>,
	/// Sign-in name (`preferred_username`, falling back to `email`).
	pub username: String,
}
impl Account {
	/// Derives the account from decoded ID token claims.
	///
	/// The object id comes from `oid`, or `sub` for personal accounts without one.
	pub fn from_claims(claims: &TokenClaims) -> Result<Self, ConfigError> {
		let object_id = claims
			.oid
			.as_deref()
			.or(claims.sub.as_deref())
			.ok_or(ConfigError::MissingClaim { claim: "oid" })?;
		let tenant =
			TenantId::new(claims.tid.as_deref().ok_or(ConfigError::MissingClaim { claim: "tid" })?)?;
		let id = AccountId::from_parts(object_id, &tenant)?;
		let username = claims
			.preferred_username
			.clone()
			.or_else(|| claims.email.clone())
			.unwrap_or_default();

		Ok(Self { id, tenant, name: claims.name.clone(), username })
	}
}
