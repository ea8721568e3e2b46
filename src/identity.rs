//! The identity client contract used by the session manager, and its OIDC implementation.
//!
//! [`IdentityClient`] is the seam between session logic and the provider. The manager never
//! builds authorize URLs or talks to token endpoints; it asks the identity client to sign in,
//! to acquire a token silently or interactively, and to produce logout URLs.

pub mod callback;
pub mod metrics;
pub mod oidc;
pub mod pkce;
pub mod popup;

pub use callback::*;
pub use metrics::*;
pub use oidc::*;
pub use pkce::*;
pub use popup::*;

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Account, AuthenticationResult, ScopeSet},
};

/// Boxed future returned by [`IdentityClient`] methods.
pub type IdentityFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Result of an operation that may need to leave the current page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Interaction<T> {
	/// The operation finished in place.
	Completed(T),
	/// The host must navigate to this URL; the flow resumes in the next `initialize`.
	Redirecting(Url),
}
impl<T> Interaction<T> {
	/// The completed value, if the operation finished in place.
	pub fn completed(self) -> Option<T> {
		match self {
			Self::Completed(value) => Some(value),
			Self::Redirecting(_) => None,
		}
	}

	/// The navigation target, if the operation is redirecting.
	pub fn redirect_url(&self) -> Option<&Url> {
		match self {
			Self::Completed(_) => None,
			Self::Redirecting(url) => Some(url),
		}
	}

	/// Maps the completed value.
	pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Interaction<U> {
		match self {
			Self::Completed(value) => Interaction::Completed(f(value)),
			Self::Redirecting(url) => Interaction::Redirecting(url),
		}
	}
}

/// Token request on behalf of a known account.
#[derive(Clone, Debug)]
pub struct TokenRequest {
	/// Account the token is for.
	pub account: Account,
	/// Scopes the token must carry.
	pub scopes: ScopeSet,
	/// Skip cached access tokens and go to the token endpoint.
	pub force_refresh: bool,
}
impl TokenRequest {
	/// Creates a request that may be served from cache.
	pub fn new(account: Account, scopes: ScopeSet) -> Self {
		Self { account, scopes, force_refresh: false }
	}
}

/// Provider client contract.
pub trait IdentityClient
where
	Self: Send + Sync,
{
	/// Completes a redirect flow if `navigation` carries an authorization response.
	///
	/// Resolves to `None` for ordinary navigations. A response carrying `error` fails with
	/// [`crate::error::InteractionError::Provider`].
	fn handle_redirect<'a>(
		&'a self,
		navigation: Option<&'a Url>,
	) -> IdentityFuture<'a, Option<AuthenticationResult>>;

	/// Accounts in the cache, in first-seen order.
	fn accounts(&self) -> IdentityFuture<'_, Vec<Account>>;

	/// Interactive sign-in in a popup window.
	fn login_popup<'a>(&'a self, scopes: &'a ScopeSet) -> IdentityFuture<'a, AuthenticationResult>;

	/// Starts a redirect sign-in and returns the URL to navigate to.
	fn login_redirect<'a>(&'a self, scopes: &'a ScopeSet) -> IdentityFuture<'a, Url>;

	/// Token from cache or by refresh, without user interaction.
	fn acquire_token_silent<'a>(&'a self, request: &'a TokenRequest) -> IdentityFuture<'a, AccessToken>;

	/// Interactive token acquisition in a popup window.
	fn acquire_token_popup<'a>(&'a self, request: &'a TokenRequest) -> IdentityFuture<'a, AccessToken>;

	/// Starts a redirect token acquisition and returns the URL to navigate to.
	fn acquire_token_redirect<'a>(&'a self, request: &'a TokenRequest) -> IdentityFuture<'a, Url>;

	/// Forgets `account` locally and returns the provider's end-session URL.
	fn logout_redirect<'a>(
		&'a self,
		account: Option<&'a Account>,
		post_logout_redirect_uri: &'a Url,
	) -> IdentityFuture<'a, Url>;

	/// Drops all cached token material. Accounts stay known.
	fn clear_cache(&self) -> IdentityFuture<'_, ()>;
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn interaction_helpers_follow_the_variant() {
		let url = Url::parse("https://login.microsoftonline.com/common/oauth2/v2.0/authorize")
			.expect("URL fixture should parse.");
		let redirecting = Interaction::<u8>::Redirecting(url.clone());

		assert_eq!(redirecting.redirect_url(), Some(&url));
		assert_eq!(redirecting.map(|value| value + 1).completed(), None);
		assert_eq!(Interaction::Completed(1).map(|value| value + 1).completed(), Some(2));
	}
}
