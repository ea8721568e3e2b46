//! Authorization code + PKCE handshakes.
//!
//! A [`PendingAuthorization`] is created before the user is sent to the authorize endpoint.
//! Popup flows keep it on the stack; redirect flows persist it in the session store so the
//! next `initialize` can redeem the code after the page (or process) was torn down.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::ScopeSet, error::InteractionError, provider::ProviderDescriptor};

const STATE_LEN: usize = 32;
const PKCE_VERIFIER_LEN: usize = 64;

/// Age after which an unanswered authorization request is discarded by the stores.
pub const PENDING_AUTHORIZATION_TTL: Duration = Duration::minutes(10);

/// Why an interactive flow was started.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthIntent {
	/// Sign-in with the login scopes.
	SignIn,
	/// Token acquisition for API scopes on behalf of a known account.
	AcquireToken,
}

/// Parameters of one interactive authorization request.
#[derive(Clone, Debug)]
pub struct AuthorizeParams<'a> {
	/// Intent recorded with the handshake.
	pub intent: AuthIntent,
	/// Scopes to request.
	pub scope: ScopeSet,
	/// Redirect URI registered for the client.
	pub redirect_uri: &'a Url,
	/// Pre-fills the sign-in name on the provider page.
	pub login_hint: Option<&'a str>,
	/// OIDC `prompt` value (`select_account`, `login`, `consent`).
	pub prompt: Option<&'a str>,
}

/// State of an authorization request awaiting its callback.
#[derive(Clone, Serialize, Deserialize)]
pub struct PendingAuthorization {
	/// Intent of the flow.
	pub intent: AuthIntent,
	/// Opaque `state` value that must come back on the callback.
	pub state: String,
	/// Scopes the caller asked for; the OIDC scopes are added on the wire only.
	pub scope: ScopeSet,
	/// Redirect URI sent with the request; must be repeated on code redemption.
	pub redirect_uri: Url,
	/// Fully formed authorize URL.
	pub authorize_url: Url,
	/// Creation instant.
	pub created_at: OffsetDateTime,
	pkce_verifier: String,
}
impl PendingAuthorization {
	/// Generates state and a PKCE pair and builds the authorize URL.
	pub fn start(descriptor: &ProviderDescriptor, client_id: &str, params: AuthorizeParams) -> Self {
		let state = random_string(STATE_LEN);
		let pkce_verifier = random_string(PKCE_VERIFIER_LEN);
		let mut authorize_url = descriptor.endpoints.authorization.clone();

		{
			let mut pairs = authorize_url.query_pairs_mut();

			pairs
				.append_pair("client_id", client_id)
				.append_pair("response_type", "code")
				.append_pair("response_mode", "query")
				.append_pair("redirect_uri", params.redirect_uri.as_str())
				.append_pair("scope", &params.scope.with_oidc_scopes().normalized())
				.append_pair("state", &state)
				.append_pair("code_challenge", &pkce_challenge(&pkce_verifier))
				.append_pair("code_challenge_method", "S256");

			if let Some(hint) = params.login_hint {
				pairs.append_pair("login_hint", hint);
			}
			if let Some(prompt) = params.prompt {
				pairs.append_pair("prompt", prompt);
			}
		}

		Self {
			intent: params.intent,
			state,
			scope: params.scope,
			redirect_uri: params.redirect_uri.clone(),
			authorize_url,
			created_at: OffsetDateTime::now_utc(),
			pkce_verifier,
		}
	}

	/// PKCE verifier to send on code redemption.
	pub fn pkce_verifier(&self) -> &str {
		&self.pkce_verifier
	}

	/// Whether the handshake is older than [`PENDING_AUTHORIZATION_TTL`] at `now`.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		now - self.created_at > PENDING_AUTHORIZATION_TTL
	}

	/// Checks the `state` returned on the callback.
	pub fn validate_state(&self, returned: &str) -> Result<(), InteractionError> {
		if returned == self.state { Ok(()) } else { Err(InteractionError::StateMismatch) }
	}
}
impl Debug for PendingAuthorization {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PendingAuthorization")
			.field("intent", &self.intent)
			.field("state", &self.state)
			.field("scope", &self.scope)
			.field("redirect_uri", &self.redirect_uri)
			.field("created_at", &self.created_at)
			.finish_non_exhaustive()
	}
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn pkce_challenge(verifier: &str) -> String {
	URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
