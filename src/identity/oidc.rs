//! [`IdentityClient`] backed by an OIDC public client and a [`SessionStore`].
//!
//! Interactive flows run the authorization code grant with PKCE; silent acquisition reuses
//! cached access tokens and falls back to the refresh token grant. Refreshes for the same
//! account and scope set are serialized, and the rotated record is written back with a
//! compare-and-swap on the refresh token so a concurrent rotation is never overwritten.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Account, AuthenticationResult, ScopeSet, TokenKey, TokenRecord, TokenSecret},
	error::{ConfigError, InteractionError},
	http::{ReqwestHttpClient, TokenHttpClient},
	identity::{
		AuthIntent, AuthorizationResponse, AuthorizeParams, IdentityClient, IdentityFuture,
		PendingAuthorization, PopupDriver, PopupRequest, PopupUnavailable, RefreshMetrics,
		TokenRequest,
	},
	inspect,
	oauth::{
		CodeRedemption, IssuedTokens, OAuth2Facade, PublicClientFacade, ReqwestTransportErrorMapper,
		TransportErrorMapper,
	},
	obs::{self, FlowKind},
	provider::{AzureAdStrategy, ProviderDescriptor, ProviderStrategy},
	store::{CompareAndSwapOutcome, SessionStore},
};

/// [`OidcClient`] over the default `reqwest` transport.
pub type ReqwestOidcClient = OidcClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// OIDC public client for one Azure AD application registration.
pub struct OidcClient<C = ReqwestHttpClient, M = ReqwestTransportErrorMapper>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	client_id: String,
	descriptor: ProviderDescriptor,
	redirect_uri: Url,
	facade: PublicClientFacade<C, M>,
	store: Arc<dyn SessionStore>,
	strategy: Arc<dyn ProviderStrategy>,
	popup: Arc<dyn PopupDriver>,
	popup_timeout: Duration,
	refresh_window: Duration,
	refresh_metrics: Arc<RefreshMetrics>,
	flow_guards: Arc<Mutex<HashMap<TokenKey, Arc<AsyncMutex<()>>>>>,
}
impl<C, M> OidcClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Default popup timeout.
	pub const DEFAULT_POPUP_TIMEOUT: Duration = Duration::seconds(60);
	/// Cached access tokens expiring within this window are refreshed instead of returned.
	pub const DEFAULT_REFRESH_WINDOW: Duration = Duration::minutes(5);

	/// Creates a client over a caller-provided transport and error mapper.
	pub fn with_http_client(
		descriptor: ProviderDescriptor,
		client_id: impl Into<String>,
		redirect_uri: Url,
		store: Arc<dyn SessionStore>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		let client_id = client_id.into();
		let facade = PublicClientFacade::from_descriptor(
			&descriptor,
			&client_id,
			http_client.into(),
			mapper.into(),
		)?;

		Ok(Self {
			client_id,
			descriptor,
			redirect_uri,
			facade,
			store,
			strategy: Arc::new(AzureAdStrategy),
			popup: Arc::new(PopupUnavailable),
			popup_timeout: Self::DEFAULT_POPUP_TIMEOUT,
			refresh_window: Self::DEFAULT_REFRESH_WINDOW,
			refresh_metrics: Default::default(),
			flow_guards: Default::default(),
		})
	}

	/// Replaces the token error classifier.
	pub fn with_strategy(mut self, strategy: Arc<dyn ProviderStrategy>) -> Self {
		self.strategy = strategy;

		self
	}

	/// Installs the host's popup driver.
	pub fn with_popup_driver(mut self, popup: Arc<dyn PopupDriver>) -> Self {
		self.popup = popup;

		self
	}

	/// Overrides how long a popup may stay open.
	pub fn with_popup_timeout(mut self, timeout: Duration) -> Self {
		self.popup_timeout = timeout;

		self
	}

	/// Overrides the early-refresh window. Negative values are clamped to zero.
	pub fn with_refresh_window(mut self, window: Duration) -> Self {
		self.refresh_window = if window.is_negative() { Duration::ZERO } else { window };

		self
	}

	/// Application (client) id.
	pub fn client_id(&self) -> &str {
		&self.client_id
	}

	/// Provider endpoints.
	pub fn descriptor(&self) -> &ProviderDescriptor {
		&self.descriptor
	}

	/// Backing cache.
	pub fn store(&self) -> &Arc<dyn SessionStore> {
		&self.store
	}

	/// Silent acquisition counters.
	pub fn refresh_metrics(&self) -> Arc<RefreshMetrics> {
		self.refresh_metrics.clone()
	}

	fn start(
		&self,
		intent: AuthIntent,
		scope: &ScopeSet,
		login_hint: Option<&str>,
		prompt: Option<&str>,
	) -> PendingAuthorization {
		PendingAuthorization::start(
			&self.descriptor,
			&self.client_id,
			AuthorizeParams {
				intent,
				scope: scope.clone(),
				redirect_uri: &self.redirect_uri,
				login_hint: login_hint.filter(|hint| !hint.is_empty()),
				prompt,
			},
		)
	}

	async fn run_popup(&self, pending: PendingAuthorization) -> Result<AuthenticationResult> {
		let landed = self
			.popup
			.open(PopupRequest {
				authorize_url: pending.authorize_url.clone(),
				redirect_uri: self.redirect_uri.clone(),
				timeout: self.popup_timeout,
			})
			.await?;
		let (code, state) =
			AuthorizationResponse::from_url(&landed).ok_or(InteractionError::MissingCode)?.into_code()?;

		pending.validate_state(&state)?;

		self.redeem(pending, code).await
	}

	async fn redeem(&self, pending: PendingAuthorization, code: String) -> Result<AuthenticationResult> {
		obs::observe(FlowKind::CodeExchange, "redeem", async {
			let redemption = CodeRedemption {
				code,
				pkce_verifier: pending.pkce_verifier().to_owned(),
				scope: pending.scope.with_oidc_scopes(),
				redirect_uri: pending.redirect_uri.clone(),
			};
			let issued =
				self.facade.exchange_authorization_code(self.strategy.as_ref(), redemption).await?;
			let id_token = issued.id_token.clone().ok_or(ConfigError::MissingIdToken)?;
			let account = Account::from_claims(&inspect::decode_token(&id_token)?.claims()?)?;
			let record = build_record(&TokenKey::new(account.id.clone(), pending.scope.clone()), issued, None)?;
			let access_token = AccessToken::from(&record);

			self.store.save_account(account.clone()).await?;
			self.store.save(record).await?;

			Ok(AuthenticationResult { account, access_token, id_token: Some(TokenSecret::new(id_token)) })
		})
		.await
	}

	async fn complete_redirect(&self, navigation: Option<&Url>) -> Result<Option<AuthenticationResult>> {
		let Some(response) = navigation.and_then(AuthorizationResponse::from_url) else {
			return Ok(None);
		};
		let state = match &response {
			AuthorizationResponse::Code { state, .. } => Some(state.as_str()),
			AuthorizationResponse::Error { state, .. } => state.as_deref(),
		};
		let pending = match state {
			Some(state) => self.store.take_pending(state).await?,
			None => None,
		};
		let (code, state) = response.into_code()?;
		let pending = pending.ok_or(InteractionError::StateMismatch)?;

		pending.validate_state(&state)?;

		self.redeem(pending, code).await.map(Some)
	}

	async fn silent(&self, request: &TokenRequest) -> Result<AccessToken> {
		let key = TokenKey::new(request.account.id.clone(), request.scopes.clone());
		let guard = self.flow_guard(&key);
		let _singleflight = guard.lock().await;
		let now = OffsetDateTime::now_utc();
		let current = self.store.fetch(&key).await?;

		if !request.force_refresh
			&& let Some(record) = current.as_ref().filter(|r| r.is_usable_at(now, self.refresh_window))
		{
			self.refresh_metrics.record_cache_hit();

			return Ok(AccessToken::from(record));
		}

		let (source, refresh_token) = self.refresh_source(&key, current.as_ref()).await?;
		let wire_scope = request.scopes.with_oidc_scopes();
		let issued = match self
			.facade
			.refresh_token(self.strategy.as_ref(), refresh_token.expose(), &wire_scope)
			.await
		{
			Ok(issued) => issued,
			Err(Error::InvalidGrant { reason } | Error::InteractionRequired { reason }) => {
				self.store.revoke(&source, now).await?;
				self.refresh_metrics.record_revocation();

				return Err(Error::InteractionRequired { reason });
			},
			Err(e) => return Err(e),
		};
		let expected = current.as_ref().and_then(|r| r.refresh_token.as_ref()).map(TokenSecret::expose);
		let updated = build_record(&key, issued, Some(&refresh_token))?;
		let record = match self.store.compare_and_swap_refresh(&key, expected, updated.clone()).await? {
			CompareAndSwapOutcome::Updated => updated,
			CompareAndSwapOutcome::Missing => {
				self.store.save(updated.clone()).await?;

				updated
			},
			CompareAndSwapOutcome::RefreshMismatch => match self.store.fetch(&key).await? {
				Some(existing) => existing,
				None => {
					self.store.save(updated.clone()).await?;

					updated
				},
			},
		};

		self.refresh_metrics.record_refreshed();

		Ok(AccessToken::from(&record))
	}

	/// Picks the refresh token for `key`: its own record first, then any live record of the
	/// same account.
	async fn refresh_source(
		&self,
		key: &TokenKey,
		current: Option<&TokenRecord>,
	) -> Result<(TokenKey, TokenSecret)> {
		if let Some(secret) = current.filter(|r| !r.is_revoked()).and_then(|r| r.refresh_token.clone()) {
			return Ok((key.clone(), secret));
		}

		self.store
			.account_tokens(&key.account)
			.await?
			.into_iter()
			.filter(|r| !r.is_revoked())
			.find_map(|r| r.refresh_token.clone().map(|secret| (r.key(), secret)))
			.ok_or_else(|| Error::InteractionRequired {
				reason: "No refresh token is cached for this account.".into(),
			})
	}

	async fn end_session_url(
		&self,
		account: Option<&Account>,
		post_logout_redirect_uri: &Url,
	) -> Result<Url> {
		if let Some(account) = account {
			self.store.remove_account(&account.id).await?;
		}

		let Some(mut url) = self.descriptor.endpoints.end_session.clone() else {
			return Ok(post_logout_redirect_uri.clone());
		};

		{
			let mut pairs = url.query_pairs_mut();

			pairs
				.append_pair("client_id", &self.client_id)
				.append_pair("post_logout_redirect_uri", post_logout_redirect_uri.as_str());

			if let Some(account) = account.filter(|a| !a.username.is_empty()) {
				pairs.append_pair("logout_hint", &account.username);
			}
		}

		Ok(url)
	}

	fn flow_guard(&self, key: &TokenKey) -> Arc<AsyncMutex<()>> {
		let mut guards = self.flow_guards.lock();

		guards.entry(key.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}
}
impl OidcClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a client with its own `reqwest` transport.
	pub fn new(
		descriptor: ProviderDescriptor,
		client_id: impl Into<String>,
		redirect_uri: Url,
		store: Arc<dyn SessionStore>,
	) -> Result<Self> {
		Self::with_http_client(
			descriptor,
			client_id,
			redirect_uri,
			store,
			ReqwestHttpClient::new()?,
			ReqwestTransportErrorMapper,
		)
	}
}
impl<C, M> IdentityClient for OidcClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn handle_redirect<'a>(
		&'a self,
		navigation: Option<&'a Url>,
	) -> IdentityFuture<'a, Option<AuthenticationResult>> {
		Box::pin(self.complete_redirect(navigation))
	}

	fn accounts(&self) -> IdentityFuture<'_, Vec<Account>> {
		Box::pin(async move { Ok(self.store.accounts().await?) })
	}

	fn login_popup<'a>(&'a self, scopes: &'a ScopeSet) -> IdentityFuture<'a, AuthenticationResult> {
		Box::pin(async move {
			let pending = self.start(AuthIntent::SignIn, scopes, None, Some("select_account"));

			self.run_popup(pending).await
		})
	}

	fn login_redirect<'a>(&'a self, scopes: &'a ScopeSet) -> IdentityFuture<'a, Url> {
		Box::pin(async move {
			let pending = self.start(AuthIntent::SignIn, scopes, None, Some("select_account"));
			let url = pending.authorize_url.clone();

			self.store.save_pending(pending).await?;

			Ok(url)
		})
	}

	fn acquire_token_silent<'a>(&'a self, request: &'a TokenRequest) -> IdentityFuture<'a, AccessToken> {
		Box::pin(obs::observe(FlowKind::Refresh, "acquire_token_silent", async move {
			self.refresh_metrics.record_attempt();

			let result = self.silent(request).await;

			if result.is_err() {
				self.refresh_metrics.record_failure();
			}

			result
		}))
	}

	fn acquire_token_popup<'a>(&'a self, request: &'a TokenRequest) -> IdentityFuture<'a, AccessToken> {
		Box::pin(async move {
			let pending = self.start(
				AuthIntent::AcquireToken,
				&request.scopes,
				Some(&request.account.username),
				None,
			);

			Ok(self.run_popup(pending).await?.access_token)
		})
	}

	fn acquire_token_redirect<'a>(&'a self, request: &'a TokenRequest) -> IdentityFuture<'a, Url> {
		Box::pin(async move {
			let pending = self.start(
				AuthIntent::AcquireToken,
				&request.scopes,
				Some(&request.account.username),
				None,
			);
			let url = pending.authorize_url.clone();

			self.store.save_pending(pending).await?;

			Ok(url)
		})
	}

	fn logout_redirect<'a>(
		&'a self,
		account: Option<&'a Account>,
		post_logout_redirect_uri: &'a Url,
	) -> IdentityFuture<'a, Url> {
		Box::pin(self.end_session_url(account, post_logout_redirect_uri))
	}

	fn clear_cache(&self) -> IdentityFuture<'_, ()> {
		Box::pin(async move {
			self.store.clear_tokens().await?;

			Ok(())
		})
	}
}
impl<C, M> Debug for OidcClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OidcClient")
			.field("client_id", &self.client_id)
			.field("descriptor", &self.descriptor.id)
			.field("redirect_uri", &self.redirect_uri.as_str())
			.field("popup_timeout", &self.popup_timeout)
			.field("refresh_window", &self.refresh_window)
			.finish_non_exhaustive()
	}
}

/// Builds the record for `key`, keeping `previous_refresh` when the provider did not rotate.
fn build_record(
	key: &TokenKey,
	issued: IssuedTokens,
	previous_refresh: Option<&TokenSecret>,
) -> Result<TokenRecord> {
	let refresh = issued
		.refresh_token
		.or_else(|| previous_refresh.map(|secret| secret.expose().to_owned()));

	Ok(TokenRecord::builder(key.account.clone(), key.scope.clone())
		.access_token(issued.access_token)
		.refresh_token(refresh)
		.issued_at(issued.issued_at)
		.expires_in(issued.expires_in)
		.build()
		.map_err(ConfigError::from)?)
}
