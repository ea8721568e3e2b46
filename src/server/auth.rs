//! Bearer resolution for the data API.
//!
//! The server does not validate tokens itself. A [`BearerVerifier`] turns the presented bearer
//! value into the caller's claims, or rejects it; production deployments plug in a verifier
//! that checks signatures against the tenant's keys.

// crates.io
use axum::{
	extract::FromRequestParts,
	http::{header::AUTHORIZATION, request::Parts},
};
// self
use crate::{_prelude::*, server::{ApiError, AppState}};

/// Boxed future returned by [`BearerVerifier::verify`].
pub type VerifyFuture<'a> = Pin<Box<dyn Future<Output = Option<CallerClaims>> + 'a + Send>>;

/// Resolves bearer tokens to caller claims.
pub trait BearerVerifier
where
	Self: Send + Sync,
{
	/// Claims for `token`, or `None` when the token is not accepted.
	fn verify<'a>(&'a self, token: &'a str) -> VerifyFuture<'a>;
}

/// Claims of an accepted caller, in token order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallerClaims(Vec<(String, String)>);
impl CallerClaims {
	/// Claims from `(type, value)` pairs.
	pub fn new<I, K, V>(claims: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self(claims.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
	}

	/// First value of claim `kind`.
	pub fn get(&self, kind: &str) -> Option<&str> {
		self.0.iter().find(|(k, _)| k == kind).map(|(_, v)| v.as_str())
	}

	/// All `(type, value)` pairs.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	/// Subject identifier.
	pub fn subject(&self) -> Option<&str> {
		self.get("sub").or_else(|| self.get("oid"))
	}

	/// Email, falling back to the sign-in name.
	pub fn email(&self) -> Option<&str> {
		self.get("email").or_else(|| self.get("preferred_username"))
	}

	/// Display name.
	pub fn name(&self) -> Option<&str> {
		self.get("name")
	}
}

/// Verifier backed by a fixed token table, for development and tests.
#[derive(Clone, Debug, Default)]
pub struct StaticBearerVerifier(HashMap<String, CallerClaims>);
impl StaticBearerVerifier {
	/// Accepts `token` as `claims`.
	pub fn with_token(mut self, token: impl Into<String>, claims: CallerClaims) -> Self {
		self.0.insert(token.into(), claims);

		self
	}
}
impl BearerVerifier for StaticBearerVerifier {
	fn verify<'a>(&'a self, token: &'a str) -> VerifyFuture<'a> {
		Box::pin(async move { self.0.get(token).cloned() })
	}
}

/// The authenticated caller of a request.
///
/// Handlers taking a `Caller` reject requests without an accepted bearer token with `401`.
#[derive(Clone, Debug)]
pub struct Caller(pub CallerClaims);
impl FromRequestParts<AppState> for Caller {
	type Rejection = ApiError;

	async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
		let token = parts
			.headers
			.get(AUTHORIZATION)
			.and_then(|value| value.to_str().ok())
			.and_then(bearer_token)
			.ok_or(ApiError::Unauthorized)?;

		state.verifier.verify(token).await.map(Self).ok_or(ApiError::Unauthorized)
	}
}

fn bearer_token(header: &str) -> Option<&str> {
	let (scheme, token) = header.trim().split_once(' ')?;
	let token = token.trim();

	(scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
