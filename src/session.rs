//! The token session manager.
//!
//! A [`SessionManager`] owns at most one signed-in [`Account`] and hands out bearer tokens
//! for outbound calls. Token requests walk an ordered plan (silent, then popup when the host
//! allows it, then redirect) and return on the first step that succeeds. Redirect steps leave
//! the page; the flow is finished by [`SessionManager::initialize`] on the next start.
//!
//! [`SessionManager::make_authenticated_request`] attaches the bearer token and retries
//! exactly once when the API answers `401 Unauthorized`, after dropping every cached token.

pub mod context;
pub mod metrics;
pub mod plan;
pub mod request;

pub use context::*;
pub use metrics::*;
pub use plan::*;
pub use request::*;

// crates.io
use reqwest::{
	Response, StatusCode,
	header::{AUTHORIZATION, CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Account, ScopeSet},
	error::{ConfigError, TransportError},
	identity::{IdentityClient, Interaction, TokenRequest},
	obs::{self, FlowKind},
};

/// Scopes and URLs the manager needs from configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSettings {
	/// Scopes requested on sign-in.
	pub login_scopes: ScopeSet,
	/// Scopes of the access token attached to API calls.
	pub api_scopes: ScopeSet,
	/// Where the provider sends the user after sign-out.
	pub post_logout_redirect_uri: Url,
}

/// Session state for one client process.
pub struct SessionManager {
	identity: Arc<dyn IdentityClient>,
	context: HostContext,
	settings: SessionSettings,
	http: ReqwestClient,
	current: RwLock<Option<Account>>,
	init: AsyncOnceCell<()>,
	init_error: Mutex<Option<Error>>,
	metrics: Arc<AcquisitionMetrics>,
}
impl SessionManager {
	/// Creates a manager with its own HTTP client.
	pub fn new(
		identity: Arc<dyn IdentityClient>,
		context: HostContext,
		settings: SessionSettings,
	) -> Result<Self> {
		let http = ReqwestClient::builder().build().map_err(ConfigError::from)?;

		Ok(Self::with_http_client(identity, context, settings, http))
	}

	/// Creates a manager that sends API requests through `http`.
	pub fn with_http_client(
		identity: Arc<dyn IdentityClient>,
		context: HostContext,
		settings: SessionSettings,
		http: ReqwestClient,
	) -> Self {
		Self {
			identity,
			context,
			settings,
			http,
			current: RwLock::new(None),
			init: AsyncOnceCell::new(),
			init_error: Mutex::new(None),
			metrics: Default::default(),
		}
	}

	/// Completes a pending redirect flow, or adopts the first cached account.
	///
	/// Runs once per manager; later and concurrent calls wait for that run and return the
	/// current account. When `navigation` carried a provider error, the first caller receives
	/// it while the manager still finishes initializing with whatever account was cached.
	pub async fn initialize(&self, navigation: Option<&Url>) -> Result<Option<Account>> {
		self.init
			.get_or_init(|| async {
				let outcome =
					obs::observe(FlowKind::Initialize, "initialize", self.rehydrate(navigation)).await;

				if let Err(e) = outcome {
					*self.init_error.lock() = Some(e);
				}
			})
			.await;

		let init_error = self.init_error.lock().take();

		match init_error {
			Some(e) => Err(e),
			None => Ok(self.current.read().clone()),
		}
	}

	/// Whether [`initialize`](Self::initialize) has completed.
	pub fn is_initialized(&self) -> bool {
		self.init.get().is_some()
	}

	/// The signed-in account.
	pub fn current_account(&self) -> Result<Option<Account>> {
		self.ensure_initialized()?;

		Ok(self.current.read().clone())
	}

	/// Context the manager was created for.
	pub fn host_context(&self) -> HostContext {
		self.context
	}

	/// Acquisition counters.
	pub fn metrics(&self) -> Arc<AcquisitionMetrics> {
		self.metrics.clone()
	}

	/// Interactive sign-in: a popup in top-level contexts, falling back to a redirect.
	pub async fn sign_in(&self) -> Result<Interaction<Account>> {
		self.ensure_initialized()?;

		obs::observe(
			FlowKind::SignIn,
			"sign_in",
			self.run_sign_in(AcquisitionStep::sign_in_plan(self.context)),
		)
		.await
	}

	/// Interactive sign-in that always leaves the page.
	pub async fn sign_in_with_redirect(&self) -> Result<Interaction<Account>> {
		self.ensure_initialized()?;

		obs::observe(
			FlowKind::SignIn,
			"sign_in_with_redirect",
			self.run_sign_in(&[AcquisitionStep::Redirect]),
		)
		.await
	}

	/// Forgets the current account and returns the provider's end-session URL.
	pub async fn sign_out(&self) -> Result<Url> {
		self.ensure_initialized()?;

		let account = self.current.write().take();

		obs::observe(
			FlowKind::SignOut,
			"sign_out",
			self.identity.logout_redirect(account.as_ref(), &self.settings.post_logout_redirect_uri),
		)
		.await
	}

	/// Bearer token for the API scopes.
	///
	/// Fails with [`Error::NotSignedIn`] without a current account. When every step of the
	/// plan fails, the error is [`Error::AcquisitionFailed`] carrying the steps and the cause
	/// reported by the last one.
	pub async fn get_access_token(&self) -> Result<Interaction<AccessToken>> {
		self.ensure_initialized()?;

		obs::observe(FlowKind::AcquireToken, "get_access_token", self.acquire()).await
	}

	/// Sends `request` with a bearer token, retrying once after a `401`.
	///
	/// The retry drops all cached token material and acquires a new token first. Whatever
	/// the second response is, it is returned unchanged.
	pub async fn make_authenticated_request(
		&self,
		request: &ApiRequest,
	) -> Result<Interaction<Response>> {
		self.ensure_initialized()?;

		obs::observe(FlowKind::AuthenticatedRequest, "make_authenticated_request", async {
			let token = match self.acquire().await? {
				Interaction::Completed(token) => token,
				Interaction::Redirecting(url) => return Ok(Interaction::Redirecting(url)),
			};
			let response = self.dispatch(request, &token).await?;

			if response.status() != StatusCode::UNAUTHORIZED {
				return Ok(Interaction::Completed(response));
			}

			#[cfg(feature = "tracing")]
			tracing::debug!(url = %request.url, "API answered 401; retrying with a fresh token");

			self.metrics.record_retry();
			self.identity.clear_cache().await?;

			let token = match self.acquire().await? {
				Interaction::Completed(token) => token,
				Interaction::Redirecting(url) => return Ok(Interaction::Redirecting(url)),
			};

			Ok(Interaction::Completed(self.dispatch(request, &token).await?))
		})
		.await
	}

	fn ensure_initialized(&self) -> Result<()> {
		if self.is_initialized() { Ok(()) } else { Err(Error::Uninitialized) }
	}

	async fn rehydrate(&self, navigation: Option<&Url>) -> Result<()> {
		let redirected = self.identity.handle_redirect(navigation).await;
		let account = match &redirected {
			Ok(Some(result)) => Some(result.account.clone()),
			_ => self.identity.accounts().await?.into_iter().next(),
		};

		*self.current.write() = account;

		redirected.map(|_| ())
	}

	async fn run_sign_in(&self, plan: &[AcquisitionStep]) -> Result<Interaction<Account>> {
		let scopes = &self.settings.login_scopes;
		let outcome = self
			.run_plan(FlowKind::SignIn, plan, move |step| async move {
				match step {
					AcquisitionStep::Popup =>
						Ok(Interaction::Completed(self.identity.login_popup(scopes).await?.account)),
					AcquisitionStep::Redirect =>
						Ok(Interaction::Redirecting(self.identity.login_redirect(scopes).await?)),
					AcquisitionStep::Silent => Err(Error::InteractionRequired {
						reason: "Sign-in requires an interactive step.".into(),
					}),
				}
			})
			.await?;

		if let Interaction::Completed(account) = &outcome {
			*self.current.write() = Some(account.clone());
		}

		Ok(outcome)
	}

	async fn acquire(&self) -> Result<Interaction<AccessToken>> {
		let account = self.current.read().clone().ok_or(Error::NotSignedIn)?;
		let request = TokenRequest::new(account, self.settings.api_scopes.clone());
		let request = &request;

		self.run_plan(
			FlowKind::AcquireToken,
			AcquisitionStep::token_plan(self.context),
			move |step| async move {
				match step {
					AcquisitionStep::Silent =>
						self.identity.acquire_token_silent(request).await.map(Interaction::Completed),
					AcquisitionStep::Popup =>
						self.identity.acquire_token_popup(request).await.map(Interaction::Completed),
					AcquisitionStep::Redirect =>
						self.identity.acquire_token_redirect(request).await.map(Interaction::Redirecting),
				}
			},
		)
		.await
	}

	/// Runs `plan` in order and returns the first success.
	async fn run_plan<T, F, Fut>(
		&self,
		kind: FlowKind,
		plan: &[AcquisitionStep],
		mut run: F,
	) -> Result<Interaction<T>>
	where
		F: FnMut(AcquisitionStep) -> Fut,
		Fut: Future<Output = Result<Interaction<T>>>,
	{
		let mut attempts = Vec::with_capacity(plan.len());
		let mut steps = plan.iter().copied().peekable();

		while let Some(step) = steps.next() {
			attempts.push(step);

			let e = match run(step).await {
				Ok(outcome) => {
					self.metrics.record_step(step);

					return Ok(outcome);
				},
				Err(e) => e,
			};

			if let Some(next) = steps.peek() {
				obs::record_fallback(kind, step.as_str(), next.as_str(), &e);

				continue;
			}

			self.metrics.record_failure();

			return Err(Error::AcquisitionFailed { attempts, source: Box::new(e) });
		}

		self.metrics.record_failure();

		Err(Error::InteractionRequired { reason: "No acquisition step is available.".into() })
	}

	async fn dispatch(&self, request: &ApiRequest, token: &AccessToken) -> Result<Response> {
		self.metrics.record_dispatch();

		let mut builder = self
			.http
			.request(request.method.clone(), request.url.clone())
			.header(AUTHORIZATION, token.bearer())
			.header(CONTENT_TYPE, "application/json");

		if let Some(body) = &request.body {
			builder = builder.json(body);
		}

		Ok(builder.send().await.map_err(TransportError::api)?)
	}
}
impl Debug for SessionManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionManager")
			.field("context", &self.context)
			.field("settings", &self.settings)
			.field("initialized", &self.is_initialized())
			.field("signed_in", &self.current.read().is_some())
			.finish_non_exhaustive()
	}
}
