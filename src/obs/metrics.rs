// self
use crate::obs::{FlowKind, FlowOutcome};

/// Increments `aad_session_flow_total` (when the `metrics` feature is enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"aad_session_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recording_without_a_recorder_is_harmless() {
		record_flow_outcome(FlowKind::Refresh, FlowOutcome::Failure);
		record_flow_outcome(FlowKind::AuthenticatedRequest, FlowOutcome::Attempt);
	}
}
