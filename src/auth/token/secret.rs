//! Bearer and refresh token material that never prints itself.

// crates.io
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Token string whose formatters redact the value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a token string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Raw token value, for `Authorization` headers and token endpoint bodies only.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Short hex digest that identifies the secret in logs without revealing it.
	pub fn fingerprint(&self) -> String {
		Sha256::digest(self.0.as_bytes()).iter().take(4).map(|byte| format!("{byte:02x}")).collect()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "TokenSecret(<redacted:{}>)", self.fingerprint())
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
