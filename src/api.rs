//! Typed client for the data API, built on the session manager.
//!
//! Every call goes through [`SessionManager::make_authenticated_request`], so it inherits the
//! acquisition plan and the single 401 retry. Status codes are mapped onto crate errors:
//! `400` to [`Error::ValidationFailed`], `404` to [`Error::NotFound`], anything else outside
//! `2xx` to [`Error::RequestFailed`]. A plan that ends in a redirect surfaces as
//! [`Error::NavigationRequired`].

// crates.io
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	catalog::{DataItem, NewDataItem},
	error::{ConfigError, TransportError},
	identity::Interaction,
	session::{ApiRequest, SessionManager},
};

/// Snapshot of the caller's identity as the API sees it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
	/// Subject identifier.
	pub id: Option<String>,
	/// Email, falling back to the sign-in name.
	pub email: Option<String>,
	/// Display name.
	pub name: Option<String>,
	/// Always `true` for an accepted bearer token.
	pub authenticated: bool,
	/// Every claim of the token, in token order.
	pub claims: Vec<ProfileClaim>,
}

/// One claim in a [`UserProfile`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileClaim {
	/// Claim type.
	#[serde(rename = "type")]
	pub kind: String,
	/// Claim value rendered as a string.
	pub value: String,
}

/// Answer of the token validation endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenValidation {
	/// Always `true` for an accepted bearer token.
	pub authenticated: bool,
	/// Server time of the check.
	#[serde(with = "time::serde::rfc3339")]
	pub timestamp: OffsetDateTime,
}

/// Error body returned by the API.
#[derive(Debug, Deserialize)]
struct ErrorBody {
	message: String,
}

/// Data API client.
#[derive(Clone, Debug)]
pub struct ApiClient {
	session: Arc<SessionManager>,
	base_url: Url,
}
impl ApiClient {
	/// Client for the API rooted at `base_url` (for example `http://localhost:5000/api`).
	pub fn new(session: Arc<SessionManager>, mut base_url: Url) -> Self {
		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());

			base_url.set_path(&path);
		}

		Self { session, base_url }
	}

	/// Session the client sends requests through.
	pub fn session(&self) -> &Arc<SessionManager> {
		&self.session
	}

	/// Lists items, filtered by `search` when given.
	pub async fn list(&self, search: Option<&str>) -> Result<Vec<DataItem>> {
		let mut url = self.endpoint("data")?;

		if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
			url.query_pairs_mut().append_pair("search", search);
		}

		decode(self.send(ApiRequest::get(url), None).await?).await
	}

	/// Fetches one item.
	pub async fn get(&self, id: u64) -> Result<DataItem> {
		let url = self.endpoint(&format!("data/{id}"))?;

		decode(self.send(ApiRequest::get(url), Some(id)).await?).await
	}

	/// Creates an item and returns it as stored.
	pub async fn create(&self, item: &NewDataItem) -> Result<DataItem> {
		let request = ApiRequest::post(self.endpoint("data")?, item)?;

		decode(self.send(request, None).await?).await
	}

	/// Deletes an item.
	pub async fn delete(&self, id: u64) -> Result<()> {
		let url = self.endpoint(&format!("data/{id}"))?;

		self.send(ApiRequest::delete(url), Some(id)).await?;

		Ok(())
	}

	/// Identity claims as seen by the API.
	pub async fn profile(&self) -> Result<UserProfile> {
		decode(self.send(ApiRequest::get(self.endpoint("user/profile")?), None).await?).await
	}

	/// Confirms the API accepts the current bearer token.
	pub async fn validate(&self) -> Result<TokenValidation> {
		decode(self.send(ApiRequest::get(self.endpoint("user/validate")?), None).await?).await
	}

	fn endpoint(&self, path: &str) -> Result<Url> {
		join_endpoint(&self.base_url, path)
	}

	async fn send(&self, request: ApiRequest, id: Option<u64>) -> Result<Response> {
		let response = match self.session.make_authenticated_request(&request).await? {
			Interaction::Completed(response) => response,
			Interaction::Redirecting(url) => return Err(Error::NavigationRequired { url }),
		};
		let status = response.status();

		if status.is_success() {
			return Ok(response);
		}

		if let (StatusCode::NOT_FOUND, Some(id)) = (status, id) {
			return Err(Error::NotFound { id });
		}

		let message = error_message(response).await;

		Err(match status {
			StatusCode::BAD_REQUEST => Error::ValidationFailed { reason: message },
			_ => Error::RequestFailed { status: status.as_u16(), message },
		})
	}
}

async fn decode<T>(response: Response) -> Result<T>
where
	T: DeserializeOwned,
{
	let bytes = response.bytes().await.map_err(TransportError::api)?;
	let mut deserializer = serde_json::Deserializer::from_slice(&bytes);

	Ok(serde_path_to_error::deserialize(&mut deserializer)?)
}

/// The server's `message`, or the canonical reason phrase.
async fn error_message(response: Response) -> String {
	let status = response.status();
	let fallback = || status.canonical_reason().unwrap_or("Unexpected status").to_owned();

	match response.bytes().await {
		Ok(bytes) => serde_json::from_slice::<ErrorBody>(&bytes)
			.map(|body| body.message)
			.unwrap_or_else(|_| fallback()),
		Err(_) => fallback(),
	}
}

fn join_endpoint(base: &Url, path: &str) -> Result<Url> {
	base.join(path)
		.map_err(|source| ConfigError::InvalidApiPath { path: path.to_owned(), source }.into())
}
