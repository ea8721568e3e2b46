//! Where the session manager runs, and which acquisition steps that allows.

/// Window relationships as seen by the host.
///
/// `None` means the host could not inspect the relationship (for instance a cross-origin
/// parent); such windows are treated as embedded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WindowAncestry {
	/// The window was opened by another window.
	pub has_opener: bool,
	/// The window is its own parent.
	pub parent_is_self: Option<bool>,
	/// The window is the top-level window.
	pub top_is_self: Option<bool>,
}
impl WindowAncestry {
	/// Ancestry of a standalone top-level window, or of a host without windows.
	pub const fn top_level() -> Self {
		Self { has_opener: false, parent_is_self: Some(true), top_is_self: Some(true) }
	}
}

/// Execution context of the session manager.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HostContext {
	/// A regular top-level window; popups are allowed.
	#[default]
	TopLevel,
	/// A window opened by another window.
	Popup,
	/// A window embedded in a frame.
	Frame,
}
impl HostContext {
	/// Classifies `ancestry`. An opener wins over framing; unknown relationships count as a frame.
	pub fn detect(ancestry: &WindowAncestry) -> Self {
		if ancestry.has_opener {
			return Self::Popup;
		}

		match (ancestry.parent_is_self, ancestry.top_is_self) {
			(Some(true), Some(true)) => Self::TopLevel,
			_ => Self::Frame,
		}
	}

	/// Popup and frame contexts cannot host another popup.
	pub fn is_embedded(self) -> bool {
		!matches!(self, Self::TopLevel)
	}
}
