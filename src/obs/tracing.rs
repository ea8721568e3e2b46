// self
use crate::{_prelude::*, obs::FlowKind};

/// Instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// Span wrapping one flow run.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a span tagged with the flow kind and call site.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			Self { span: tracing::info_span!("aad_session.flow", flow = kind.as_str(), stage) }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a debug event when an acquisition step fails and the next one takes over.
pub fn record_fallback(kind: FlowKind, from: &'static str, to: &'static str, cause: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(flow = kind.as_str(), from, to, %cause, "falling back to next step");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, from, to, cause);
	}
}

/// Emits a warning event for a failed flow.
pub fn record_flow_failure(kind: FlowKind, cause: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(flow = kind.as_str(), %cause, "flow failed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, cause);
	}
}
