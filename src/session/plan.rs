//! Ordered acquisition plans.

// self
use crate::{_prelude::*, session::HostContext};

/// One acquisition strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AcquisitionStep {
	/// Cache or refresh token, no user interaction.
	Silent,
	/// Interactive flow in a popup window.
	Popup,
	/// Interactive flow that navigates the current page away.
	Redirect,
}
impl AcquisitionStep {
	/// Steps for a token request, cheapest first.
	pub const fn token_plan(context: HostContext) -> &'static [Self] {
		match context {
			HostContext::TopLevel => &[Self::Silent, Self::Popup, Self::Redirect],
			HostContext::Popup | HostContext::Frame => &[Self::Silent, Self::Redirect],
		}
	}

	/// Steps for an interactive sign-in.
	pub const fn sign_in_plan(context: HostContext) -> &'static [Self] {
		match context {
			HostContext::TopLevel => &[Self::Popup, Self::Redirect],
			HostContext::Popup | HostContext::Frame => &[Self::Redirect],
		}
	}

	/// Stable label for logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Silent => "silent",
			Self::Popup => "popup",
			Self::Redirect => "redirect",
		}
	}
}
impl Display for AcquisitionStep {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
