//! Host hook for popup-window sign-in.
//!
//! The identity client cannot open windows itself. A [`PopupDriver`] shows the authorize URL
//! to the user and reports back the URL the popup was redirected to, or why it could not.

// self
use crate::{_prelude::*, error::InteractionError};

/// Boxed future returned by [`PopupDriver::open`].
pub type PopupFuture<'a> = Pin<Box<dyn Future<Output = Result<Url, InteractionError>> + 'a + Send>>;

/// One popup navigation.
#[derive(Clone, Debug)]
pub struct PopupRequest {
	/// Page to show.
	pub authorize_url: Url,
	/// The popup is done once it navigates to a URL with this prefix.
	pub redirect_uri: Url,
	/// Give up with [`InteractionError::PopupTimeout`] after this long.
	pub timeout: Duration,
}

/// Opens popups on behalf of the identity client.
pub trait PopupDriver
where
	Self: Send + Sync,
{
	/// Shows `request.authorize_url` and resolves with the redirect URL the popup reached.
	///
	/// Implementations report [`InteractionError::PopupBlocked`] when no window can be opened,
	/// [`InteractionError::PopupClosed`] when the user dismissed it, and
	/// [`InteractionError::PopupTimeout`] when `request.timeout` elapsed.
	fn open(&self, request: PopupRequest) -> PopupFuture<'_>;
}

/// Driver for hosts without a window system; every popup counts as blocked, so the session
/// falls through to the redirect flow.
#[derive(Clone, Copy, Debug, Default)]
pub struct PopupUnavailable;
impl PopupDriver for PopupUnavailable {
	fn open(&self, _request: PopupRequest) -> PopupFuture<'_> {
		Box::pin(async { Err(InteractionError::PopupBlocked) })
	}
}
