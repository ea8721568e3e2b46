//! Validated endpoint metadata for an Azure AD (or other OIDC) authority.

// self
use crate::{_prelude::*, auth::ProviderId};

/// Hosts allowed to serve plain-HTTP endpoints (local development and mocks).
const LOOPBACK_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "[::1]"];

/// Token endpoint grants issued by the identity client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
	/// Authorization code redemption after a popup or redirect sign-in.
	AuthorizationCode,
	/// Silent renewal with a cached refresh token.
	RefreshToken,
}
impl GrantType {
	/// RFC 6749 `grant_type` value.
	pub fn as_str(self) -> &'static str {
		match self {
			GrantType::AuthorizationCode => "authorization_code",
			GrantType::RefreshToken => "refresh_token",
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ProviderDescriptorError {
	/// Authorization endpoint was not supplied.
	#[error("Missing authorization endpoint.")]
	MissingAuthorizationEndpoint,
	/// Token endpoint was not supplied.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Endpoint uses plain HTTP on a non-loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Offending URL.
		url: String,
	},
	/// Authority cannot serve as a base for the v2.0 endpoints.
	#[error("Authority {authority} cannot be used as an endpoint base.")]
	InvalidAuthority {
		/// Authority as configured.
		authority: String,
	},
}

/// Endpoints of an authority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Interactive sign-in endpoint.
	pub authorization: Url,
	/// Code redemption and refresh endpoint.
	pub token: Url,
	/// Sign-out endpoint, when the provider has one.
	pub end_session: Option<Url>,
}

/// Immutable provider descriptor consumed by the identity client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Descriptor identifier.
	pub id: ProviderId,
	/// Endpoint set.
	pub endpoints: ProviderEndpoints,
}
impl ProviderDescriptor {
	/// Creates a new builder for the provided identifier.
	pub fn builder(id: ProviderId) -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new(id)
	}

	/// Derives the v2.0 endpoints of an Azure AD authority such as
	/// `https://login.microsoftonline.com/<tenant>`.
	pub fn from_authority(id: ProviderId, authority: &Url) -> Result<Self, ProviderDescriptorError> {
		let invalid = || ProviderDescriptorError::InvalidAuthority { authority: authority.to_string() };

		if authority.cannot_be_a_base() {
			return Err(invalid());
		}

		let mut base = authority.clone();

		base.set_query(None);
		base.set_fragment(None);

		if !base.path().ends_with('/') {
			let path = format!("{}/", base.path());

			base.set_path(&path);
		}

		let endpoint = |leaf: &str| base.join(&format!("oauth2/v2.0/{leaf}")).map_err(|_| invalid());

		Self::builder(id)
			.authorization_endpoint(endpoint("authorize")?)
			.token_endpoint(endpoint("token")?)
			.end_session_endpoint(endpoint("logout")?)
			.build()
	}

	fn validate(&self) -> Result<(), ProviderDescriptorError> {
		validate_endpoint("authorization", &self.endpoints.authorization)?;
		validate_endpoint("token", &self.endpoints.token)?;

		if let Some(end_session) = self.endpoints.end_session.as_ref() {
			validate_endpoint("end_session", end_session)?;
		}

		Ok(())
	}
}

/// Builder for [`ProviderDescriptor`] values.
#[derive(Debug)]
pub struct ProviderDescriptorBuilder {
	id: ProviderId,
	authorization_endpoint: Option<Url>,
	token_endpoint: Option<Url>,
	end_session_endpoint: Option<Url>,
}
impl ProviderDescriptorBuilder {
	fn new(id: ProviderId) -> Self {
		Self { id, authorization_endpoint: None, token_endpoint: None, end_session_endpoint: None }
	}

	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the end-session endpoint.
	pub fn end_session_endpoint(mut self, url: Url) -> Self {
		self.end_session_endpoint = Some(url);

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		let authorization = self
			.authorization_endpoint
			.ok_or(ProviderDescriptorError::MissingAuthorizationEndpoint)?;
		let token = self.token_endpoint.ok_or(ProviderDescriptorError::MissingTokenEndpoint)?;
		let descriptor = ProviderDescriptor {
			id: self.id,
			endpoints: ProviderEndpoints {
				authorization,
				token,
				end_session: self.end_session_endpoint,
			},
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderDescriptorError> {
	let loopback = url.host_str().is_some_and(|host| LOOPBACK_HOSTS.contains(&host));

	match url.scheme() {
		"https" => Ok(()),
		"http" if loopback => Ok(()),
		_ => Err(ProviderDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() }),
	}
}
