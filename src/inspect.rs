//! Display-only decoding of compact (JWT) tokens.
//!
//! Nothing here verifies signatures or claims. Decoded values are for showing expiry and
//! identity details to a user; trust decisions belong to the identity provider and the API's
//! bearer middleware.

// crates.io
use base64::{
	Engine as _, alphabet,
	engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use serde::{Deserializer, de::Error as DeError};
use serde_json::{Map, Value};
// self
use crate::_prelude::*;

const SEGMENT_DECODER: GeneralPurpose = GeneralPurpose::new(
	&alphabet::URL_SAFE,
	GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Header and payload of a compact token, with `exp`/`iat` converted to instants.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedToken {
	/// JOSE header.
	pub header: Map<String, Value>,
	/// Claims payload.
	pub payload: Map<String, Value>,
	/// `exp` as a UTC instant.
	pub expires: Option<OffsetDateTime>,
	/// `iat` as a UTC instant.
	pub issued: Option<OffsetDateTime>,
}
impl DecodedToken {
	/// Typed view over the well-known claims in the payload.
	pub fn claims(&self) -> Result<TokenClaims> {
		serde_json::from_value(Value::Object(self.payload.clone()))
			.map_err(|e| Error::MalformedToken { reason: format!("claims do not match: {e}") })
	}
}

/// Well-known Azure AD claims carried by ID and access tokens.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
	/// Issuer.
	pub iss: Option<String>,
	/// Audiences; a single string audience is normalized into a one-element list.
	#[serde(default, deserialize_with = "one_or_many")]
	pub aud: Vec<String>,
	/// Subject.
	pub sub: Option<String>,
	/// Object id of the user in the directory.
	pub oid: Option<String>,
	/// Tenant id.
	pub tid: Option<String>,
	/// Display name.
	pub name: Option<String>,
	/// Sign-in name.
	pub preferred_username: Option<String>,
	/// Email address.
	pub email: Option<String>,
	/// Space-delimited delegated scopes.
	pub scp: Option<String>,
	/// Expiry, seconds since the Unix epoch.
	pub exp: Option<i64>,
	/// Issued-at, seconds since the Unix epoch.
	pub iat: Option<i64>,
}

/// Decodes the header and payload of a compact token.
///
/// The token must have exactly three dot-separated segments. The first two are base64
/// decoded (either alphabet, padding optional) and must be JSON objects. The third segment
/// is ignored.
pub fn decode_token(token: &str) -> Result<DecodedToken> {
	let segments = token.split('.').collect::<Vec<_>>();

	if segments.len() != 3 {
		return Err(malformed(format!("expected 3 segments, found {}", segments.len())));
	}

	let header = decode_segment("header", segments[0])?;
	let payload = decode_segment("payload", segments[1])?;
	let expires = timestamp_claim(&payload, "exp")?;
	let issued = timestamp_claim(&payload, "iat")?;

	Ok(DecodedToken { header, payload, expires, issued })
}

/// Returns `true` when the token's `exp` lies before `now`.
///
/// Tokens that cannot be decoded count as expired. A decodable token without `exp` does not.
pub fn is_token_expired(token: &str, now: OffsetDateTime) -> bool {
	match decode_token(token) {
		Ok(decoded) => decoded.expires.is_some_and(|expires| expires < now),
		Err(_) => true,
	}
}

fn decode_segment(name: &str, segment: &str) -> Result<Map<String, Value>> {
	let normalized = segment.replace('+', "-").replace('/', "_");
	let bytes = SEGMENT_DECODER
		.decode(normalized)
		.map_err(|e| malformed(format!("{name} is not base64: {e}")))?;

	match serde_json::from_slice::<Value>(&bytes) {
		Ok(Value::Object(map)) => Ok(map),
		Ok(_) => Err(malformed(format!("{name} is not a JSON object"))),
		Err(e) => Err(malformed(format!("{name} is not JSON: {e}"))),
	}
}

fn timestamp_claim(payload: &Map<String, Value>, claim: &str) -> Result<Option<OffsetDateTime>> {
	let Some(seconds) = payload.get(claim).and_then(|value| {
		value.as_i64().or_else(|| value.as_f64().map(|float| float.trunc() as i64))
	}) else {
		return Ok(None);
	};

	OffsetDateTime::from_unix_timestamp(seconds)
		.map(Some)
		.map_err(|_| malformed(format!("{claim} is out of range")))
}

fn malformed(reason: String) -> Error {
	Error::MalformedToken { reason }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
	D: Deserializer<'de>,
{
	match Option::<Value>::deserialize(deserializer)? {
		None | Some(Value::Null) => Ok(Vec::new()),
		Some(Value::String(single)) => Ok(vec![single]),
		Some(Value::Array(values)) => values
			.into_iter()
			.map(|value| match value {
				Value::String(audience) => Ok(audience),
				other => Err(DeError::custom(format!("audience must be a string, got {other}"))),
			})
			.collect(),
		Some(other) => Err(DeError::custom(format!("unexpected audience value {other}"))),
	}
}
