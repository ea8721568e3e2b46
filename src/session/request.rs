//! Outbound API requests sent through the session manager.

// crates.io
use reqwest::Method;
use serde_json::Value;
// self
use crate::_prelude::*;

/// An API call before the bearer header is attached.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute target URL.
	pub url: Url,
	/// JSON body, if any.
	pub body: Option<Value>,
}
impl ApiRequest {
	/// Creates a request without a body.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, body: None }
	}

	/// `GET url`.
	pub fn get(url: Url) -> Self {
		Self::new(Method::GET, url)
	}

	/// `DELETE url`.
	pub fn delete(url: Url) -> Self {
		Self::new(Method::DELETE, url)
	}

	/// `POST url` with `body` serialized as JSON.
	pub fn post(url: Url, body: &impl Serialize) -> Result<Self> {
		Self::new(Method::POST, url).with_json(body)
	}

	/// Replaces the body with `body` serialized as JSON.
	pub fn with_json(mut self, body: &impl Serialize) -> Result<Self> {
		self.body = Some(serde_path_to_error::serialize(body, serde_json::value::Serializer)?);

		Ok(self)
	}
}
