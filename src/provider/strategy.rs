//! Classification of token endpoint failures.
//!
//! Strategies only see primitive data (status code, OAuth error fields, body preview), so
//! they stay independent of the HTTP client that produced the failure.

// self
use crate::{_prelude::*, provider::descriptor::GrantType};

/// Maps token endpoint failures into [`ProviderErrorKind`]s.
pub trait ProviderStrategy: Send + Sync {
	/// Classifies a failed token request.
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind;
}

/// Canonical provider error categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
	/// The grant (code or refresh token) is no longer valid.
	InvalidGrant,
	/// The user must sign in again or consent before a token can be issued.
	InteractionRequired,
	/// Client registration was rejected.
	InvalidClient,
	/// Requested scopes were not granted.
	InsufficientScope,
	/// Temporary failure.
	Transient,
}

/// Facts about a failed token request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderErrorContext {
	/// Grant that failed.
	pub grant_type: GrantType,
	/// HTTP status, when a response arrived.
	pub http_status: Option<u16>,
	/// OAuth `error` field.
	pub oauth_error: Option<String>,
	/// OAuth `error_description` field.
	pub error_description: Option<String>,
	/// Truncated body for non-JSON responses.
	pub body_preview: Option<String>,
	/// Whether the failure happened below HTTP.
	pub network_error: bool,
}
impl ProviderErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates an empty context for `grant_type`.
	pub fn new(grant_type: GrantType) -> Self {
		Self {
			grant_type,
			http_status: None,
			oauth_error: None,
			error_description: None,
			body_preview: None,
			network_error: false,
		}
	}

	/// Context for a DNS, TCP, or TLS failure.
	pub fn network_failure(grant_type: GrantType) -> Self {
		Self { network_error: true, ..Self::new(grant_type) }
	}

	/// Adds the HTTP status.
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the OAuth `error` code.
	pub fn with_oauth_error(mut self, error: impl Into<String>) -> Self {
		self.oauth_error = Some(error.into());

		self
	}

	/// Adds the OAuth `error_description`.
	pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
		self.error_description = Some(description.into());

		self
	}

	/// Adds a body preview, truncated to a fixed number of characters.
	pub fn with_body_preview(mut self, body: impl AsRef<str>) -> Self {
		let body = body.as_ref();
		let mut preview = body.chars().take(Self::BODY_PREVIEW_LIMIT).collect::<String>();

		if preview.len() < body.len() {
			preview.push('…');
		}

		self.body_preview = Some(preview);

		self
	}
}

/// Strategy tuned for Azure AD v2.0 responses.
///
/// Checks the OAuth `error` field first, then `AADSTS` codes and keywords in the description
/// or body, then the HTTP status. Network failures are transient.
#[derive(Debug, Default)]
pub struct AzureAdStrategy;
impl ProviderStrategy for AzureAdStrategy {
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		if ctx.network_error {
			return ProviderErrorKind::Transient;
		}

		ctx.oauth_error
			.as_deref()
			.and_then(classify_code)
			.or_else(|| ctx.error_description.as_deref().and_then(classify_text))
			.or_else(|| ctx.body_preview.as_deref().and_then(classify_text))
			.unwrap_or_else(|| classify_status(ctx.http_status))
	}
}

fn classify_code(code: &str) -> Option<ProviderErrorKind> {
	let kind = match code.to_ascii_lowercase().as_str() {
		"interaction_required" | "login_required" | "consent_required" =>
			ProviderErrorKind::InteractionRequired,
		"invalid_grant" | "access_denied" => ProviderErrorKind::InvalidGrant,
		"invalid_client" | "unauthorized_client" => ProviderErrorKind::InvalidClient,
		"invalid_scope" | "insufficient_scope" => ProviderErrorKind::InsufficientScope,
		"temporarily_unavailable" | "server_error" => ProviderErrorKind::Transient,
		_ => return None,
	};

	Some(kind)
}

fn classify_text(text: &str) -> Option<ProviderErrorKind> {
	// AADSTS50076/50079: MFA, AADSTS65001: consent, AADSTS50058: no session.
	const INTERACTION_CODES: [&str; 4] = ["aadsts50076", "aadsts50079", "aadsts65001", "aadsts50058"];

	let lowered = text.to_ascii_lowercase();

	if INTERACTION_CODES.iter().any(|code| lowered.contains(code))
		|| lowered.contains("interaction_required")
		|| lowered.contains("consent_required")
	{
		Some(ProviderErrorKind::InteractionRequired)
	} else if lowered.contains("invalid_grant") || lowered.contains("aadsts700082") {
		Some(ProviderErrorKind::InvalidGrant)
	} else if lowered.contains("invalid_client") {
		Some(ProviderErrorKind::InvalidClient)
	} else if lowered.contains("insufficient_scope") || lowered.contains("invalid_scope") {
		Some(ProviderErrorKind::InsufficientScope)
	} else if lowered.contains("temporarily_unavailable") {
		Some(ProviderErrorKind::Transient)
	} else {
		None
	}
}

fn classify_status(status: Option<u16>) -> ProviderErrorKind {
	match status {
		Some(400 | 404 | 410) => ProviderErrorKind::InvalidGrant,
		Some(401) => ProviderErrorKind::InvalidClient,
		Some(403) => ProviderErrorKind::InsufficientScope,
		_ => ProviderErrorKind::Transient,
	}
}
