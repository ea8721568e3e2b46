//! Parsing of authorization responses delivered to the redirect URI.

// self
use crate::{_prelude::*, error::InteractionError};

/// Parameters the provider appended to the redirect URI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthorizationResponse {
	/// Successful authorization.
	Code {
		/// Authorization code.
		code: String,
		/// Echoed `state`.
		state: String,
	},
	/// Provider-reported failure.
	Error {
		/// OAuth `error` value.
		error: String,
		/// OAuth `error_description`, if any.
		description: Option<String>,
		/// Echoed `state`, if any.
		state: Option<String>,
	},
}
impl AuthorizationResponse {
	/// Reads an authorization response from the query string or, failing that, the fragment.
	///
	/// Returns `None` for ordinary navigations that carry neither `code` nor `error`.
	pub fn from_url(url: &Url) -> Option<Self> {
		Self::from_pairs(url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())))
			.or_else(|| {
				let fragment = url.fragment()?;

				Self::from_pairs(
					url::form_urlencoded::parse(fragment.as_bytes())
						.map(|(k, v)| (k.into_owned(), v.into_owned())),
				)
			})
	}

	/// Splits the response into the code and state, or the provider error.
	pub fn into_code(self) -> Result<(String, String), InteractionError> {
		match self {
			Self::Code { code, state } => Ok((code, state)),
			Self::Error { error, description, .. } => Err(InteractionError::Provider {
				code: error,
				description: description.unwrap_or_else(|| "no description".into()),
			}),
		}
	}

	fn from_pairs(pairs: impl Iterator<Item = (String, String)>) -> Option<Self> {
		let params = pairs.collect::<HashMap<_, _>>();
		let state = params.get("state").cloned();

		if let Some(error) = params.get("error") {
			return Some(Self::Error {
				error: error.clone(),
				description: params.get("error_description").cloned(),
				state,
			});
		}

		match (params.get("code"), state) {
			(Some(code), Some(state)) => Some(Self::Code { code: code.clone(), state }),
			_ => None,
		}
	}
}
