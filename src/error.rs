//! Crate-level error types shared by the session manager, identity client, stores, and data API.

// self
use crate::{_prelude::*, session::AcquisitionStep};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// None of these are fatal to the host; the triggering action can always be retried.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// An interactive popup or redirect flow did not complete.
	#[error(transparent)]
	Interaction(#[from] InteractionError),

	/// The session manager was used before `initialize` completed.
	#[error("Session manager has not been initialized.")]
	Uninitialized,
	/// A token was requested while no account is signed in.
	#[error("No user is signed in.")]
	NotSignedIn,
	/// Every acquisition step in the plan failed.
	#[error("Token acquisition failed after {attempts:?}.")]
	AcquisitionFailed {
		/// Steps attempted, in order.
		attempts: Vec<AcquisitionStep>,
		/// Failure reported by the final step.
		#[source]
		source: Box<Error>,
	},
	/// Cached material cannot satisfy a silent request; the user must interact.
	#[error("User interaction is required: {reason}.")]
	InteractionRequired {
		/// Provider- or cache-supplied reason string.
		reason: String,
	},
	/// Control is leaving the current page to complete an interactive redirect.
	#[error("Interactive authentication continues at {url}.")]
	NavigationRequired {
		/// Authorize URL the host must navigate to.
		url: Url,
	},
	/// A compact token could not be decoded.
	#[error("Token is malformed: {reason}.")]
	MalformedToken {
		/// Which part of the decode failed.
		reason: String,
	},
	/// The API answered with a non-success status after the permitted retry.
	#[error("Request failed with status {status}: {message}.")]
	RequestFailed {
		/// HTTP status code.
		status: u16,
		/// Server-supplied message, or the canonical reason phrase.
		message: String,
	},
	/// Input was rejected before any mutation happened.
	#[error("Validation failed: {reason}.")]
	ValidationFailed {
		/// Human-readable validation message.
		reason: String,
	},
	/// The referenced data item does not exist.
	#[error("Data item {id} was not found.")]
	NotFound {
		/// Identifier that was looked up.
		id: u64,
	},
	/// The collection is empty, so the next identifier cannot be derived from its maximum.
	#[error("Cannot assign an identifier because the collection is empty.")]
	EmptyCollection,
	/// A JSON request or response body did not match its expected shape.
	#[error("JSON body is invalid at `{}`.", .0.path())]
	Json(#[from] serde_path_to_error::Error<serde_json::Error>),

	/// Requested scopes exceed what was granted.
	#[error("Token lacks the required scopes: {reason}.")]
	InsufficientScope {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Provider rejected the grant (e.g., bad code or refresh token).
	#[error("Provider rejected the grant: {reason}.")]
	InvalidGrant {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Client registration was rejected by the provider.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Provider-supplied reason string.
		reason: String,
	},
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Provider descriptor contains an invalid URL.
	#[error("Descriptor contains an invalid URL.")]
	InvalidDescriptor {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Provider descriptor failed validation.
	#[error(transparent)]
	InvalidProvider(#[from] crate::provider::ProviderDescriptorError),
	/// Client configuration failed to load or validate.
	#[error(transparent)]
	InvalidClientConfig(#[from] crate::config::ClientConfigError),
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// An API path cannot be resolved against the configured base URL.
	#[error("API path `{path}` cannot be joined to the base URL.")]
	InvalidApiPath {
		/// Relative path that was joined.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Identifier derived from provider claims is invalid.
	#[error("Account identifier is invalid.")]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
	/// Token record builder validation failed.
	#[error("Unable to build token record.")]
	TokenBuild(#[from] crate::auth::TokenRecordBuilderError),
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Sign-in completed without an ID token, so no account can be derived.
	#[error("Token endpoint response is missing id_token.")]
	MissingIdToken,
	/// The ID token lacks the claims needed to identify the account.
	#[error("ID token is missing the {claim} claim.")]
	MissingClaim {
		/// Claim name.
		claim: &'static str,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Provider returned an unexpected but non-fatal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Provider- or client-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint responded with malformed JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {target}.")]
	Network {
		/// Which endpoint was being called.
		target: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a network error raised while calling the token endpoint.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { target: "the token endpoint", source: Box::new(src) }
	}

	/// Wraps a network error raised while calling the protected API.
	pub fn api(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { target: "the protected API", source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Reasons an interactive (popup or redirect) flow failed to produce a result.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum InteractionError {
	/// The host refused to open a popup window.
	#[error("Popup window was blocked.")]
	PopupBlocked,
	/// The user closed the popup before the flow completed.
	#[error("Popup window was closed before authentication completed.")]
	PopupClosed,
	/// The popup did not report back within the configured timeout.
	#[error("Popup window timed out after {seconds} seconds.")]
	PopupTimeout {
		/// Configured timeout in seconds.
		seconds: i64,
	},
	/// The authorization response carried an OAuth `error` parameter.
	#[error("Identity provider returned {code}: {description}.")]
	Provider {
		/// OAuth `error` value.
		code: String,
		/// OAuth `error_description` value, or a placeholder when absent.
		description: String,
	},
	/// The authorization response could not be matched to a pending request.
	#[error("Authorization state does not match any pending request.")]
	StateMismatch,
	/// The authorization response carried neither a code nor an error.
	#[error("Authorization response is missing the authorization code.")]
	MissingCode,
}
