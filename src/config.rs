//! Client configuration loaded from JSON or the environment.
//!
//! # Environment variables
//!
//! Required: `AAD_CLIENT_ID`, `AAD_AUTHORITY`, `AAD_REDIRECT_URI`, `AAD_API_BASE_URL`,
//! `AAD_API_SCOPES`.
//!
//! Optional: `AAD_POST_LOGOUT_REDIRECT_URI`, `AAD_CACHE` (`session` or `persistent`),
//! `AAD_CACHE_PATH` (required when `AAD_CACHE=persistent`), `AAD_LOGIN_SCOPES`,
//! `AAD_POPUP_TIMEOUT_SECS`. Scope lists are space- or comma-separated.

// std
use std::path::{Path, PathBuf};
// self
use crate::{
	_prelude::*,
	auth::{ProviderId, ScopeSet, ScopeValidationError},
	error::ConfigError,
	identity::{OidcClient, ReqwestOidcClient},
	provider::{ProviderDescriptor, ProviderDescriptorError},
	session::SessionSettings,
	store::{FileStore, MemoryStore, SessionStore, StoreError},
};

/// Scopes requested on sign-in when none are configured.
pub const DEFAULT_LOGIN_SCOPES: [&str; 4] = ["email", "openid", "profile", "User.Read"];
/// Popup timeout when none is configured.
pub const DEFAULT_POPUP_TIMEOUT_SECS: u64 = 60;
/// Identifier of the Azure AD provider descriptor.
pub const PROVIDER_ID: &str = "azure-ad";

/// Errors raised while loading or validating a [`ClientConfig`].
#[derive(Debug, ThisError)]
pub enum ClientConfigError {
	/// The configuration file could not be read.
	#[error("Configuration file {path} cannot be read.")]
	Io {
		/// File path.
		path: PathBuf,
		/// Underlying failure.
		#[source]
		source: std::io::Error,
	},
	/// The configuration document does not match the schema.
	#[error("Configuration is invalid at `{}`.", .0.path())]
	Parse(#[from] serde_path_to_error::Error<serde_json::Error>),
	/// A required environment variable is unset.
	#[error("Environment variable {name} is required.")]
	MissingVariable {
		/// Variable name.
		name: &'static str,
	},
	/// An environment variable holds an unusable value.
	#[error("Environment variable {name} is invalid: {reason}.")]
	InvalidVariable {
		/// Variable name.
		name: &'static str,
		/// What is wrong with it.
		reason: String,
	},
	/// `client_id` is blank.
	#[error("client_id must not be empty.")]
	EmptyClientId,
	/// A URL field uses an unsupported scheme.
	#[error("{field} must be an http or https URL.")]
	UnsupportedScheme {
		/// Field name.
		field: &'static str,
	},
	/// `api_scopes` is empty.
	#[error("api_scopes must name at least one scope.")]
	EmptyApiScopes,
	/// `popup_timeout_secs` is zero.
	#[error("popup_timeout_secs must be positive.")]
	ZeroPopupTimeout,
	/// The authority does not yield a valid provider descriptor.
	#[error(transparent)]
	Provider(#[from] ProviderDescriptorError),
	/// A scope list is invalid.
	#[error(transparent)]
	Scope(#[from] ScopeValidationError),
}

/// Where accounts and tokens are cached.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "location", rename_all = "snake_case")]
pub enum CacheLocation {
	/// In memory for the lifetime of the process.
	#[default]
	Session,
	/// In a JSON file that survives restarts.
	Persistent {
		/// Cache file.
		path: PathBuf,
	},
}

/// Settings of one client application.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
	/// Application (client) id of the registration.
	pub client_id: String,
	/// Authority, e.g. `https://login.microsoftonline.com/<tenant>`.
	pub authority: Url,
	/// Redirect URI registered for the application.
	pub redirect_uri: Url,
	/// Where the provider returns after sign-out; defaults to the redirect URI's origin.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub post_logout_redirect_uri: Option<Url>,
	/// Cache location.
	#[serde(default)]
	pub cache: CacheLocation,
	/// Root of the data API, e.g. `http://localhost:5000/api`.
	pub api_base_url: Url,
	/// Scopes requested on sign-in.
	#[serde(default = "default_login_scopes")]
	pub login_scopes: ScopeSet,
	/// Scopes of the access token sent to the API.
	pub api_scopes: ScopeSet,
	/// Popup timeout in seconds.
	#[serde(default = "default_popup_timeout_secs")]
	pub popup_timeout_secs: u64,
}
impl ClientConfig {
	/// Parses and validates a JSON document.
	pub fn from_json_str(raw: &str) -> Result<Self, ClientConfigError> {
		let mut deserializer = serde_json::Deserializer::from_str(raw);
		let config: Self = serde_path_to_error::deserialize(&mut deserializer)?;

		config.validate()?;

		Ok(config)
	}

	/// Reads, parses, and validates a JSON file.
	pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ClientConfigError> {
		let path = path.as_ref();
		let raw = std::fs::read_to_string(path)
			.map_err(|source| ClientConfigError::Io { path: path.to_owned(), source })?;

		Self::from_json_str(&raw)
	}

	/// Loads the configuration from `AAD_*` environment variables.
	pub fn from_env() -> Result<Self, ClientConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Loads the configuration through `lookup`, which maps variable names to values.
	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientConfigError> {
		let required = |name: &'static str| {
			lookup(name)
				.filter(|value| !value.trim().is_empty())
				.ok_or(ClientConfigError::MissingVariable { name })
		};
		let url = |name: &'static str, raw: String| {
			Url::parse(raw.trim())
				.map_err(|e| ClientConfigError::InvalidVariable { name, reason: e.to_string() })
		};
		let cache = match lookup("AAD_CACHE").as_deref().map(str::trim) {
			None | Some("") | Some("session") => CacheLocation::Session,
			Some("persistent") =>
				CacheLocation::Persistent { path: required("AAD_CACHE_PATH")?.into() },
			Some(other) =>
				return Err(ClientConfigError::InvalidVariable {
					name: "AAD_CACHE",
					reason: format!("expected `session` or `persistent`, found `{other}`"),
				}),
		};
		let post_logout_redirect_uri = match lookup("AAD_POST_LOGOUT_REDIRECT_URI") {
			Some(raw) if !raw.trim().is_empty() => Some(url("AAD_POST_LOGOUT_REDIRECT_URI", raw)?),
			_ => None,
		};
		let login_scopes = match lookup("AAD_LOGIN_SCOPES") {
			Some(raw) if !raw.trim().is_empty() => parse_scope_list(&raw)?,
			_ => default_login_scopes(),
		};
		let popup_timeout_secs = match lookup("AAD_POPUP_TIMEOUT_SECS") {
			Some(raw) => raw.trim().parse().map_err(|e: std::num::ParseIntError| {
				ClientConfigError::InvalidVariable {
					name: "AAD_POPUP_TIMEOUT_SECS",
					reason: e.to_string(),
				}
			})?,
			None => DEFAULT_POPUP_TIMEOUT_SECS,
		};
		let config = Self {
			client_id: required("AAD_CLIENT_ID")?,
			authority: url("AAD_AUTHORITY", required("AAD_AUTHORITY")?)?,
			redirect_uri: url("AAD_REDIRECT_URI", required("AAD_REDIRECT_URI")?)?,
			post_logout_redirect_uri,
			cache,
			api_base_url: url("AAD_API_BASE_URL", required("AAD_API_BASE_URL")?)?,
			login_scopes,
			api_scopes: parse_scope_list(&required("AAD_API_SCOPES")?)?,
			popup_timeout_secs,
		};

		config.validate()?;

		Ok(config)
	}

	/// Checks field-level constraints and that the authority yields valid endpoints.
	pub fn validate(&self) -> Result<(), ClientConfigError> {
		if self.client_id.trim().is_empty() {
			return Err(ClientConfigError::EmptyClientId);
		}

		for (field, url) in [
			("redirect_uri", Some(&self.redirect_uri)),
			("post_logout_redirect_uri", self.post_logout_redirect_uri.as_ref()),
			("api_base_url", Some(&self.api_base_url)),
		] {
			if url.is_some_and(|url| !matches!(url.scheme(), "http" | "https")) {
				return Err(ClientConfigError::UnsupportedScheme { field });
			}
		}

		if self.api_scopes.is_empty() {
			return Err(ClientConfigError::EmptyApiScopes);
		}
		if self.popup_timeout_secs == 0 {
			return Err(ClientConfigError::ZeroPopupTimeout);
		}

		self.descriptor().map(|_| ())
	}

	/// Provider endpoints derived from the authority.
	pub fn descriptor(&self) -> Result<ProviderDescriptor, ClientConfigError> {
		let id = ProviderId::new(PROVIDER_ID).map_err(|e| ClientConfigError::InvalidVariable {
			name: "provider id",
			reason: e.to_string(),
		})?;

		Ok(ProviderDescriptor::from_authority(id, &self.authority)?)
	}

	/// The configured post-logout URI, or the redirect URI's origin.
	pub fn post_logout_redirect_uri(&self) -> Url {
		self.post_logout_redirect_uri
			.clone()
			.unwrap_or_else(|| self.redirect_uri.join("/").unwrap_or_else(|_| self.redirect_uri.clone()))
	}

	/// Popup timeout.
	pub fn popup_timeout(&self) -> Duration {
		Duration::seconds(i64::try_from(self.popup_timeout_secs).unwrap_or(i64::MAX))
	}

	/// Settings for a [`SessionManager`](crate::session::SessionManager).
	pub fn session_settings(&self) -> SessionSettings {
		SessionSettings {
			login_scopes: self.login_scopes.clone(),
			api_scopes: self.api_scopes.clone(),
			post_logout_redirect_uri: self.post_logout_redirect_uri(),
		}
	}

	/// Opens the configured cache.
	pub fn open_store(&self) -> Result<Arc<dyn SessionStore>, StoreError> {
		Ok(match &self.cache {
			CacheLocation::Session => Arc::new(MemoryStore::default()),
			CacheLocation::Persistent { path } => Arc::new(FileStore::open(path)?),
		})
	}

	/// Builds the OIDC identity client over `store`.
	pub fn identity_client(&self, store: Arc<dyn SessionStore>) -> Result<ReqwestOidcClient> {
		let descriptor = self.descriptor().map_err(ConfigError::from)?;

		Ok(OidcClient::new(descriptor, &self.client_id, self.redirect_uri.clone(), store)?
			.with_popup_timeout(self.popup_timeout()))
	}
}

fn default_login_scopes() -> ScopeSet {
	ScopeSet::merged(DEFAULT_LOGIN_SCOPES.into_iter())
}

fn default_popup_timeout_secs() -> u64 {
	DEFAULT_POPUP_TIMEOUT_SECS
}

fn parse_scope_list(raw: &str) -> Result<ScopeSet, ScopeValidationError> {
	ScopeSet::new(raw.split([' ', ',']).map(str::trim).filter(|scope| !scope.is_empty()))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const MINIMAL: &str = r#"{
		"client_id": "70a3cf75-694b-463d-a658-011195fc1f9d",
		"authority": "https://login.microsoftonline.com/contoso.onmicrosoft.com",
		"redirect_uri": "http://localhost:3000/app?tab=1",
		"api_base_url": "http://localhost:5000/api",
		"api_scopes": ["api://70a3cf75-694b-463d-a658-011195fc1f9d/access_as_user"]
	}"#;

	#[test]
	fn json_defaults_are_applied() {
		let config = ClientConfig::from_json_str(MINIMAL).expect("Minimal config should load.");

		assert_eq!(config.cache, CacheLocation::Session);
		assert_eq!(config.popup_timeout(), Duration::seconds(60));
		assert_eq!(config.login_scopes.normalized(), "User.Read email openid profile");
		assert_eq!(config.post_logout_redirect_uri().as_str(), "http://localhost:3000/");
	}

	#[test]
	fn parse_errors_name_the_offending_field() {
		let err = ClientConfig::from_json_str(&MINIMAL.replace("\"http://localhost:5000/api\"", "42"))
			.expect_err("A numeric URL should be rejected.");

		assert!(matches!(err, ClientConfigError::Parse(ref e) if e.path().to_string() == "api_base_url"));
	}

	#[test]
	fn insecure_authority_is_rejected() {
		let err = ClientConfig::from_json_str(
			&MINIMAL.replace("https://login.microsoftonline.com", "http://login.microsoftonline.com"),
		)
		.expect_err("Plain HTTP authority should be rejected.");

		assert!(matches!(err, ClientConfigError::Provider(_)));
	}

	#[test]
	fn environment_lookup_builds_a_persistent_config() {
		let vars = HashMap::from([
			("AAD_CLIENT_ID", "client-1"),
			("AAD_AUTHORITY", "https://login.microsoftonline.com/common"),
			("AAD_REDIRECT_URI", "http://localhost:3000"),
			("AAD_API_BASE_URL", "http://localhost:5000/api"),
			("AAD_API_SCOPES", "api://client-1/access_as_user, User.Read"),
			("AAD_CACHE", "persistent"),
			("AAD_CACHE_PATH", "/tmp/aad-cache.json"),
			("AAD_POPUP_TIMEOUT_SECS", "30"),
		]);
		let config = ClientConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
			.expect("Environment config should load.");

		assert_eq!(config.api_scopes.len(), 2);
		assert_eq!(config.cache, CacheLocation::Persistent { path: "/tmp/aad-cache.json".into() });
		assert_eq!(config.popup_timeout_secs, 30);
	}

	#[test]
	fn missing_environment_variables_are_named() {
		let err = ClientConfig::from_lookup(|_| None).expect_err("Empty environment should fail.");

		assert!(matches!(err, ClientConfigError::MissingVariable { name: "AAD_CLIENT_ID" }));
	}
}
