//! Token endpoint calls made through the `oauth2` crate.
//!
//! Azure AD is addressed as a public client: no secret, PKCE on the code grant, and an
//! `id_token` next to the access token. [`TransportErrorMapper`] lets custom transports plug
//! their own error type into the crate's error kinds.

pub use oauth2;

// std
use std::borrow::Cow;
// crates.io
use oauth2::{
	AuthUrl, AuthorizationCode, Client, ClientId, EndpointNotSet, EndpointSet, ExtraTokenFields,
	HttpClientError, PkceCodeVerifier, RedirectUrl, RefreshToken, RequestTokenError, Scope,
	StandardRevocableToken, StandardTokenResponse, TokenResponse, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRequestTokenError, BasicRevocationErrorResponse,
		BasicTokenIntrospectionResponse, BasicTokenType,
	},
};
// self
use crate::{
	_prelude::*,
	auth::ScopeSet,
	error::{ConfigError, TransientError, TransportError},
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	provider::{
		GrantType, ProviderDescriptor, ProviderErrorContext, ProviderErrorKind, ProviderStrategy,
	},
};

/// Token response carrying the OIDC `id_token`.
pub type OidcTokenResponse = StandardTokenResponse<IdTokenFields, BasicTokenType>;

type ConfiguredClient = Client<
	BasicErrorResponse,
	OidcTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;
type FacadeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Extra token response fields defined by OpenID Connect.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IdTokenFields {
	/// Compact ID token.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id_token: Option<String>,
}
impl ExtraTokenFields for IdTokenFields {}

/// Maps transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] raised by the transport.
	fn map_transport_error(
		&self,
		grant: GrantType,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Mapper for [`ReqwestHttpClient`].
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		_grant: GrantType,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) if inner.is_builder() => ConfigError::from(*inner).into(),
			HttpClientError::Reqwest(inner) if inner.is_timeout() => transient(
				meta,
				"Request timed out while calling the token endpoint".into(),
				inner.status().map(|code| code.as_u16()),
			),
			HttpClientError::Reqwest(inner) => TransportError::from(*inner).into(),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => transient(meta, format!("HTTP client error: {message}"), None),
			_ => transient(meta, "HTTP client error".into(), None),
		}
	}
}

/// Tokens returned by a successful grant.
#[derive(Clone, Debug)]
pub(crate) struct IssuedTokens {
	pub(crate) access_token: String,
	pub(crate) refresh_token: Option<String>,
	pub(crate) id_token: Option<String>,
	pub(crate) issued_at: OffsetDateTime,
	pub(crate) expires_in: Duration,
}

/// Inputs of an authorization code redemption.
#[derive(Clone, Debug)]
pub(crate) struct CodeRedemption {
	pub(crate) code: String,
	pub(crate) pkce_verifier: String,
	pub(crate) scope: ScopeSet,
	pub(crate) redirect_uri: Url,
}

pub(crate) trait OAuth2Facade: Send + Sync {
	fn exchange_authorization_code<'a>(
		&'a self,
		strategy: &'a dyn ProviderStrategy,
		redemption: CodeRedemption,
	) -> FacadeFuture<'a, IssuedTokens>;

	fn refresh_token<'a>(
		&'a self,
		strategy: &'a dyn ProviderStrategy,
		refresh_token: &'a str,
		scope: &'a ScopeSet,
	) -> FacadeFuture<'a, IssuedTokens>;
}

/// [`OAuth2Facade`] backed by an `oauth2` client and a [`TokenHttpClient`].
pub(crate) struct PublicClientFacade<C = ReqwestHttpClient, M = ReqwestTransportErrorMapper>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredClient,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> PublicClientFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn from_descriptor(
		descriptor: &ProviderDescriptor,
		client_id: &str,
		http_client: Arc<C>,
		error_mapper: Arc<M>,
	) -> Result<Self> {
		let auth_url = AuthUrl::new(descriptor.endpoints.authorization.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let token_url = TokenUrl::new(descriptor.endpoints.token.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let oauth_client =
			Client::new(ClientId::new(client_id.to_owned())).set_auth_uri(auth_url).set_token_uri(token_url);

		Ok(Self { oauth_client, http_client, error_mapper })
	}

	fn map_error(
		&self,
		strategy: &dyn ProviderStrategy,
		grant: GrantType,
		meta: Option<ResponseMetadata>,
		err: BasicRequestTokenError<HttpClientError<C::TransportError>>,
	) -> Error {
		let meta = meta.as_ref();

		match err {
			RequestTokenError::ServerResponse(response) =>
				map_server_response_error(strategy, grant, response, meta),
			RequestTokenError::Request(error) => self.error_mapper.map_transport_error(grant, meta, error),
			RequestTokenError::Parse(source, _body) =>
				TransientError::TokenResponseParse { source, status: meta.and_then(|m| m.status) }.into(),
			RequestTokenError::Other(message) =>
				transient(meta, format!("Unexpected token endpoint response: {message}"), None),
		}
	}
}
impl<C, M> OAuth2Facade for PublicClientFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn exchange_authorization_code<'a>(
		&'a self,
		strategy: &'a dyn ProviderStrategy,
		redemption: CodeRedemption,
	) -> FacadeFuture<'a, IssuedTokens> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let redirect_url = RedirectUrl::new(redemption.redirect_uri.to_string())
				.map_err(|source| ConfigError::InvalidRedirect { source })?;
			let mut request = self
				.oauth_client
				.exchange_code(AuthorizationCode::new(redemption.code))
				.set_pkce_verifier(PkceCodeVerifier::new(redemption.pkce_verifier))
				.set_redirect_uri(Cow::Owned(redirect_url));

			if !redemption.scope.is_empty() {
				request = request.add_extra_param("scope", redemption.scope.normalized());
			}

			let response = request.request_async(&instrumented).await.map_err(|err| {
				self.map_error(strategy, GrantType::AuthorizationCode, meta.take(), err)
			})?;

			issued_tokens(response)
		})
	}

	fn refresh_token<'a>(
		&'a self,
		strategy: &'a dyn ProviderStrategy,
		refresh_token: &'a str,
		scope: &'a ScopeSet,
	) -> FacadeFuture<'a, IssuedTokens> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let secret = RefreshToken::new(refresh_token.to_owned());
			let request = self
				.oauth_client
				.exchange_refresh_token(&secret)
				.add_scopes(scope.iter().map(|value| Scope::new(value.to_owned())));
			let response = request.request_async(&instrumented).await.map_err(|err| {
				self.map_error(strategy, GrantType::RefreshToken, meta.take(), err)
			})?;

			issued_tokens(response)
		})
	}
}

fn issued_tokens(response: OidcTokenResponse) -> Result<IssuedTokens> {
	let expires_in = response.expires_in().ok_or(ConfigError::MissingExpiresIn)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| ConfigError::ExpiresInOutOfRange)?;

	if expires_in <= 0 {
		return Err(ConfigError::NonPositiveExpiresIn.into());
	}

	Ok(IssuedTokens {
		access_token: response.access_token().secret().to_owned(),
		refresh_token: response.refresh_token().map(|token| token.secret().to_owned()),
		id_token: response.extra_fields().id_token.clone(),
		issued_at: OffsetDateTime::now_utc(),
		expires_in: Duration::seconds(expires_in),
	})
}

fn map_server_response_error(
	strategy: &dyn ProviderStrategy,
	grant: GrantType,
	response: BasicErrorResponse,
	meta: Option<&ResponseMetadata>,
) -> Error {
	let code = response.error().as_ref().to_owned();
	let mut ctx = ProviderErrorContext::new(grant).with_oauth_error(code.clone());

	if let Some(description) = response.error_description() {
		ctx = ctx.with_error_description(description.clone());
	}
	if let Some(status) = meta.and_then(|m| m.status) {
		ctx = ctx.with_http_status(status);
	}

	let reason = response.error_description().cloned().unwrap_or(code);

	match strategy.classify_token_error(&ctx) {
		ProviderErrorKind::InvalidGrant => Error::InvalidGrant { reason },
		ProviderErrorKind::InteractionRequired => Error::InteractionRequired { reason },
		ProviderErrorKind::InvalidClient => Error::InvalidClient { reason },
		ProviderErrorKind::InsufficientScope => Error::InsufficientScope { reason },
		ProviderErrorKind::Transient => transient(meta, reason, None),
	}
}

fn transient(meta: Option<&ResponseMetadata>, message: String, status: Option<u16>) -> Error {
	TransientError::TokenEndpoint {
		message,
		status: meta.and_then(|m| m.status).or(status),
		retry_after: meta.and_then(|m| m.retry_after),
	}
	.into()
}
