// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::session::AcquisitionStep;

/// Counters for the session manager's acquisition plans and API dispatches.
#[derive(Debug, Default)]
pub struct AcquisitionMetrics {
	silent_hits: AtomicU64,
	popup_hits: AtomicU64,
	redirects: AtomicU64,
	failures: AtomicU64,
	retries: AtomicU64,
	dispatches: AtomicU64,
}
impl AcquisitionMetrics {
	/// Plans satisfied by the silent step.
	pub fn silent_hits(&self) -> u64 {
		self.silent_hits.load(Ordering::Relaxed)
	}

	/// Plans satisfied by a popup.
	pub fn popup_hits(&self) -> u64 {
		self.popup_hits.load(Ordering::Relaxed)
	}

	/// Plans that ended by starting a redirect.
	pub fn redirects(&self) -> u64 {
		self.redirects.load(Ordering::Relaxed)
	}

	/// Plans where every step failed.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	/// Requests retried after a 401.
	pub fn retries(&self) -> u64 {
		self.retries.load(Ordering::Relaxed)
	}

	/// Authenticated HTTP requests sent.
	pub fn dispatches(&self) -> u64 {
		self.dispatches.load(Ordering::Relaxed)
	}

	pub(crate) fn record_step(&self, step: AcquisitionStep) {
		let counter = match step {
			AcquisitionStep::Silent => &self.silent_hits,
			AcquisitionStep::Popup => &self.popup_hits,
			AcquisitionStep::Redirect => &self.redirects,
		};

		counter.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_retry(&self) {
		self.retries.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_dispatch(&self) {
		self.dispatches.fetch_add(1, Ordering::Relaxed);
	}
}
