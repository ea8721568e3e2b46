//! Validated identifiers for accounts, tenants, and identity providers.
//!
//! Each identifier is an [`Identifier`] tagged with a kind marker that carries the validation
//! rules for that family. Directory tenants and object ids use the GUID alphabet, while a
//! home-account id joins the two with a single `.`, so a tenant can never contain a dot.

// std
use std::{borrow::Borrow, marker::PhantomData, ops::Deref};
// crates.io
use serde::{Deserializer, Serializer, de::Error as _};
// self
use crate::_prelude::*;

/// Home-account identifier (`<object id>.<tenant id>`) for a signed-in user.
pub type AccountId = Identifier<AccountKind>;
/// Directory (tenant) identifier that issued an account.
pub type TenantId = Identifier<TenantKind>;
/// Identifier for an identity provider descriptor.
pub type ProviderId = Identifier<ProviderKind>;

/// Validation rules for one family of identifiers.
pub trait IdentifierKind {
	/// Label used in errors and `Debug` output.
	const LABEL: &'static str;
	/// Longest accepted value, in bytes.
	const MAX_LEN: usize;

	/// Checks a value that is already known to be non-empty and within [`Self::MAX_LEN`].
	fn check(value: &str) -> Result<(), IdentifierError>;
}

/// Rules for [`AccountId`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccountKind {}
impl IdentifierKind for AccountKind {
	const LABEL: &'static str = "Account";
	const MAX_LEN: usize = 256;

	fn check(value: &str) -> Result<(), IdentifierError> {
		let malformed = || IdentifierError::MalformedHomeAccount { value: value.to_owned() };
		let (object_id, tenant) = value.split_once('.').ok_or_else(malformed)?;

		if object_id.is_empty() || tenant.is_empty() || tenant.contains('.') {
			return Err(malformed());
		}

		// Personal accounts fall back to the base64url `sub` claim, hence `_`.
		check_alphabet(Self::LABEL, object_id, |c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))?;

		TenantKind::check(tenant)
	}
}

/// Rules for [`TenantId`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TenantKind {}
impl IdentifierKind for TenantKind {
	const LABEL: &'static str = "Tenant";
	const MAX_LEN: usize = 128;

	fn check(value: &str) -> Result<(), IdentifierError> {
		check_alphabet(Self::LABEL, value, |c| c.is_ascii_alphanumeric() || c == '-')
	}
}

/// Rules for [`ProviderId`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProviderKind {}
impl IdentifierKind for ProviderKind {
	const LABEL: &'static str = "Provider";
	const MAX_LEN: usize = 64;

	fn check(value: &str) -> Result<(), IdentifierError> {
		check_alphabet(Self::LABEL, value, |c| {
			c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_')
		})
	}
}

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (account, tenant, provider).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed length.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (account, tenant, provider).
		kind: &'static str,
		/// Maximum permitted length.
		max: usize,
	},
	/// The identifier contains a character outside its alphabet.
	#[error("{kind} identifier contains the disallowed character {character:?}.")]
	InvalidCharacter {
		/// Kind of identifier (account, tenant, provider).
		kind: &'static str,
		/// First offending character.
		character: char,
	},
	/// The value is not `<object id>.<tenant id>` with exactly one dot and two non-empty halves.
	#[error("Home-account identifier `{value}` must have the form `<object id>.<tenant id>`.")]
	MalformedHomeAccount {
		/// Rejected value.
		value: String,
	},
}

/// String identifier validated by the rules of `K`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier<K> {
	value: String,
	kind: PhantomData<K>,
}
impl<K> Identifier<K>
where
	K: IdentifierKind,
{
	/// Creates a new identifier after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
		let view = value.as_ref();

		validate::<K>(view)?;

		Ok(Self { value: view.to_owned(), kind: PhantomData })
	}
}
impl Identifier<AccountKind> {
	/// Builds the home-account identifier from the object and tenant ids carried in ID token
	/// claims.
	pub fn from_parts(object_id: &str, tenant: &TenantId) -> Result<Self, IdentifierError> {
		Self::new(format!("{object_id}.{tenant}"))
	}

	/// Object id half.
	pub fn object_id(&self) -> &str {
		self.value.split_once('.').map_or(self.value.as_str(), |(object_id, _)| object_id)
	}

	/// Tenant half.
	pub fn tenant_id(&self) -> &str {
		self.value.split_once('.').map_or("", |(_, tenant)| tenant)
	}
}
impl<K> Deref for Identifier<K> {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.value
	}
}
impl<K> AsRef<str> for Identifier<K> {
	fn as_ref(&self) -> &str {
		&self.value
	}
}
impl<K> Borrow<str> for Identifier<K> {
	fn borrow(&self) -> &str {
		&self.value
	}
}
impl<K> From<Identifier<K>> for String {
	fn from(value: Identifier<K>) -> Self {
		value.value
	}
}
impl<K> TryFrom<String> for Identifier<K>
where
	K: IdentifierKind,
{
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate::<K>(&value)?;

		Ok(Self { value, kind: PhantomData })
	}
}
impl<K> FromStr for Identifier<K>
where
	K: IdentifierKind,
{
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl<K> Debug for Identifier<K>
where
	K: IdentifierKind,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}({})", K::LABEL, self.value)
	}
}
impl<K> Display for Identifier<K> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.value)
	}
}
impl<K> Serialize for Identifier<K> {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.value)
	}
}
impl<'de, K> Deserialize<'de> for Identifier<K>
where
	K: IdentifierKind,
{
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		Self::try_from(String::deserialize(deserializer)?).map_err(D::Error::custom)
	}
}

fn validate<K>(view: &str) -> Result<(), IdentifierError>
where
	K: IdentifierKind,
{
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind: K::LABEL });
	}
	if view.len() > K::MAX_LEN {
		return Err(IdentifierError::TooLong { kind: K::LABEL, max: K::MAX_LEN });
	}

	K::check(view)
}

fn check_alphabet(
	kind: &'static str,
	view: &str,
	allowed: impl Fn(char) -> bool,
) -> Result<(), IdentifierError> {
	match view.chars().find(|c| !allowed(*c)) {
		Some(character) => Err(IdentifierError::InvalidCharacter { kind, character }),
		None => Ok(()),
	}
}
