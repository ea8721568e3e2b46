#![allow(dead_code)]

// std
use std::{
	collections::VecDeque,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use parking_lot::Mutex;
use serde_json::{Value, json};
use time::{Duration, OffsetDateTime};
// self
use aad_session::{
	auth::{
		AccessToken, Account, AccountId, AuthenticationResult, ScopeSet, TenantId, TokenSecret,
	},
	error::{Error, InteractionError},
	identity::{IdentityClient, IdentityFuture, TokenRequest},
	session::{HostContext, SessionManager, SessionSettings},
	url::Url,
};

/// Unsigned compact token carrying `claims`.
pub fn compact_token(claims: Value) -> String {
	let header = URL_SAFE_NO_PAD.encode(json!({ "alg": "none", "typ": "JWT" }).to_string());
	let payload = URL_SAFE_NO_PAD.encode(claims.to_string());

	format!("{header}.{payload}.signature")
}

/// ID token for the fixture user.
pub fn id_token() -> String {
	compact_token(json!({
		"iss": "https://login.microsoftonline.com/tid-1/v2.0",
		"aud": "client-it",
		"oid": "oid-1",
		"tid": "tid-1",
		"name": "Ada Lovelace",
		"preferred_username": "ada@contoso.com",
	}))
}

pub fn account() -> Account {
	let tenant = TenantId::new("tid-1").expect("Tenant fixture should be valid.");

	Account {
		id: AccountId::from_parts("oid-1", &tenant).expect("Account id fixture should build."),
		tenant,
		name: Some("Ada Lovelace".into()),
		username: "ada@contoso.com".into(),
	}
}

pub fn scopes(raw: &str) -> ScopeSet {
	raw.parse().expect("Scope fixture should parse.")
}

pub fn access_token(secret: &str) -> AccessToken {
	AccessToken {
		secret: TokenSecret::new(secret),
		scopes: scopes("api://client-it/access_as_user"),
		expires_at: OffsetDateTime::now_utc() + Duration::hours(1),
		claims: None,
	}
}

pub fn url(raw: &str) -> Url {
	Url::parse(raw).expect("URL fixture should parse.")
}

pub fn settings() -> SessionSettings {
	SessionSettings {
		login_scopes: scopes("openid profile email User.Read"),
		api_scopes: scopes("api://client-it/access_as_user"),
		post_logout_redirect_uri: url("http://localhost:3000/"),
	}
}

/// What [`FakeIdentity::handle_redirect`] reports.
#[derive(Clone, Debug, Default)]
pub enum RedirectOutcome {
	/// Ordinary navigation.
	#[default]
	Nothing,
	/// A completed redirect sign-in.
	SignedIn(Account),
	/// The provider reported an error on the callback.
	Failed(InteractionError),
}

/// Scripted [`IdentityClient`] that counts every call.
#[derive(Debug, Default)]
pub struct FakeIdentity {
	pub cached_accounts: Mutex<Vec<Account>>,
	pub redirect_outcome: Mutex<RedirectOutcome>,
	/// Tokens handed out by silent acquisition, in order; empty means interaction required.
	pub silent_tokens: Mutex<VecDeque<String>>,
	/// Token handed out by popups; `None` means the popup is blocked.
	pub popup_token: Mutex<Option<String>>,
	pub redirect_fails: Mutex<bool>,
	pub handle_redirect_calls: AtomicUsize,
	pub silent_calls: AtomicUsize,
	pub popup_calls: AtomicUsize,
	pub redirect_calls: AtomicUsize,
	pub logout_calls: AtomicUsize,
	pub clear_cache_calls: AtomicUsize,
}
impl FakeIdentity {
	pub fn with_account(self, account: Account) -> Self {
		self.cached_accounts.lock().push(account);

		self
	}

	pub fn with_silent_tokens<const N: usize>(self, tokens: [&str; N]) -> Self {
		self.silent_tokens.lock().extend(tokens.map(str::to_owned));

		self
	}

	pub fn with_popup_token(self, token: &str) -> Self {
		*self.popup_token.lock() = Some(token.into());

		self
	}

	pub fn with_redirect_outcome(self, outcome: RedirectOutcome) -> Self {
		*self.redirect_outcome.lock() = outcome;

		self
	}

	pub fn with_failing_redirect(self) -> Self {
		*self.redirect_fails.lock() = true;

		self
	}

	pub fn count(counter: &AtomicUsize) -> usize {
		counter.load(Ordering::SeqCst)
	}

	fn popup(&self) -> Result<String, Error> {
		self.popup_calls.fetch_add(1, Ordering::SeqCst);
		self.popup_token.lock().clone().ok_or(Error::Interaction(InteractionError::PopupBlocked))
	}

	fn redirect(&self) -> Result<Url, Error> {
		self.redirect_calls.fetch_add(1, Ordering::SeqCst);

		if *self.redirect_fails.lock() {
			return Err(Error::Interaction(InteractionError::Provider {
				code: "temporarily_unavailable".into(),
				description: "Authorize endpoint is down".into(),
			}));
		}

		Ok(url("https://login.microsoftonline.com/tid-1/oauth2/v2.0/authorize?state=fake"))
	}
}
impl IdentityClient for FakeIdentity {
	fn handle_redirect<'a>(
		&'a self,
		navigation: Option<&'a Url>,
	) -> IdentityFuture<'a, Option<AuthenticationResult>> {
		Box::pin(async move {
			self.handle_redirect_calls.fetch_add(1, Ordering::SeqCst);

			if navigation.is_none() {
				return Ok(None);
			}

			match self.redirect_outcome.lock().clone() {
				RedirectOutcome::Nothing => Ok(None),
				RedirectOutcome::SignedIn(account) => Ok(Some(AuthenticationResult {
					account,
					access_token: access_token("redirect-token"),
					id_token: None,
				})),
				RedirectOutcome::Failed(e) => Err(e.into()),
			}
		})
	}

	fn accounts(&self) -> IdentityFuture<'_, Vec<Account>> {
		Box::pin(async move { Ok(self.cached_accounts.lock().clone()) })
	}

	fn login_popup<'a>(&'a self, _scopes: &'a ScopeSet) -> IdentityFuture<'a, AuthenticationResult> {
		Box::pin(async move {
			let token = self.popup()?;

			Ok(AuthenticationResult { account: account(), access_token: access_token(&token), id_token: None })
		})
	}

	fn login_redirect<'a>(&'a self, _scopes: &'a ScopeSet) -> IdentityFuture<'a, Url> {
		Box::pin(async move { self.redirect() })
	}

	fn acquire_token_silent<'a>(&'a self, _request: &'a TokenRequest) -> IdentityFuture<'a, AccessToken> {
		Box::pin(async move {
			self.silent_calls.fetch_add(1, Ordering::SeqCst);

			let token = self.silent_tokens.lock().pop_front();

			token.map(|secret| access_token(&secret)).ok_or_else(|| Error::InteractionRequired {
				reason: "No refresh token is cached for this account.".into(),
			})
		})
	}

	fn acquire_token_popup<'a>(&'a self, _request: &'a TokenRequest) -> IdentityFuture<'a, AccessToken> {
		Box::pin(async move { self.popup().map(|token| access_token(&token)) })
	}

	fn acquire_token_redirect<'a>(&'a self, _request: &'a TokenRequest) -> IdentityFuture<'a, Url> {
		Box::pin(async move { self.redirect() })
	}

	fn logout_redirect<'a>(
		&'a self,
		account: Option<&'a Account>,
		post_logout_redirect_uri: &'a Url,
	) -> IdentityFuture<'a, Url> {
		Box::pin(async move {
			self.logout_calls.fetch_add(1, Ordering::SeqCst);

			let mut end_session = url("https://login.microsoftonline.com/tid-1/oauth2/v2.0/logout");

			end_session
				.query_pairs_mut()
				.append_pair("post_logout_redirect_uri", post_logout_redirect_uri.as_str());

			if let Some(account) = account {
				end_session.query_pairs_mut().append_pair("logout_hint", &account.username);
			}

			Ok(end_session)
		})
	}

	fn clear_cache(&self) -> IdentityFuture<'_, ()> {
		Box::pin(async move {
			self.clear_cache_calls.fetch_add(1, Ordering::SeqCst);

			Ok(())
		})
	}
}

/// Manager over `identity`, not yet initialized.
pub fn manager(identity: &Arc<FakeIdentity>, context: HostContext) -> SessionManager {
	SessionManager::new(identity.clone(), context, settings()).expect("Manager should build.")
}

/// Manager after `initialize(None)`; it adopts the first cached account, if any.
pub async fn initialized_manager(identity: &Arc<FakeIdentity>, context: HostContext) -> SessionManager {
	let manager = manager(identity, context);

	manager.initialize(None).await.expect("Initialize should succeed.");

	manager
}
