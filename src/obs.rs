//! Optional observability for session and identity flows.
//!
//! # Feature Flags
//!
//! - `tracing`: every flow runs inside an `aad_session.flow` span with `flow` and `stage`
//!   fields, and fallbacks between acquisition steps emit debug events.
//! - `metrics`: the `aad_session_flow_total` counter is incremented for every attempt,
//!   success, and failure, labeled by `flow` and `outcome`.

mod metrics;
mod tracing;

pub use self::metrics::*;
pub use self::tracing::*;

// self
use crate::_prelude::*;

/// Flows observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Session rehydration and redirect completion.
	Initialize,
	/// Interactive sign-in.
	SignIn,
	/// Sign-out.
	SignOut,
	/// Token acquisition plan.
	AcquireToken,
	/// Bearer request with the 401 retry.
	AuthenticatedRequest,
	/// Authorization code redemption.
	CodeExchange,
	/// Refresh token grant.
	Refresh,
}
impl FlowKind {
	/// Stable label for span and metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Initialize => "initialize",
			FlowKind::SignIn => "sign_in",
			FlowKind::SignOut => "sign_out",
			FlowKind::AcquireToken => "acquire_token",
			FlowKind::AuthenticatedRequest => "authenticated_request",
			FlowKind::CodeExchange => "code_exchange",
			FlowKind::Refresh => "refresh",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each flow run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Flow entered.
	Attempt,
	/// Flow completed.
	Success,
	/// Flow returned an error.
	Failure,
}
impl FlowOutcome {
	/// Stable label for span and metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside a [`FlowSpan`] and records attempt and outcome counters.
pub async fn observe<T, Fut>(kind: FlowKind, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = FlowSpan::new(kind, stage);

	record_flow_outcome(kind, FlowOutcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => record_flow_outcome(kind, FlowOutcome::Success),
		Err(e) => {
			record_flow_failure(kind, e);
			record_flow_outcome(kind, FlowOutcome::Failure);
		},
	}

	result
}
