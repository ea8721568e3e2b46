//! The bearer-protected data API.
//!
//! | Route | Methods |
//! |-------|---------|
//! | `/api/data` | `GET ?search=`, `POST` |
//! | `/api/data/{id}` | `GET`, `DELETE` |
//! | `/api/user/profile` | `GET` |
//! | `/api/user/validate` | `GET` |
//!
//! Every route requires `Authorization: Bearer <token>`; tokens are resolved by the
//! [`BearerVerifier`] in [`AppState`].

pub mod auth;
pub mod error;

mod routes;

pub use auth::*;
pub use error::*;

// crates.io
use axum::{Router, routing::get};
use tokio::net::TcpListener;
// self
use crate::{_prelude::*, catalog::DataStore};

/// Shared state of the data API.
#[derive(Clone)]
pub struct AppState {
	/// The collection.
	pub store: Arc<DataStore>,
	/// Bearer resolution.
	pub verifier: Arc<dyn BearerVerifier>,
}
impl AppState {
	/// State over `store` and `verifier`.
	pub fn new(store: Arc<DataStore>, verifier: Arc<dyn BearerVerifier>) -> Self {
		Self { store, verifier }
	}
}
impl Debug for AppState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AppState").field("items", &self.store.len()).finish_non_exhaustive()
	}
}

/// Router exposing the data API.
pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/api/data", get(routes::list_items).post(routes::create_item))
		.route("/api/data/{id}", get(routes::get_item).delete(routes::delete_item))
		.route("/api/user/profile", get(routes::profile))
		.route("/api/user/validate", get(routes::validate))
		.with_state(state)
}

/// Serves `router` on `listener` until the process stops.
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
	if let Ok(addr) = listener.local_addr() {
		tracing::info!(%addr, "data API listening");
	}

	axum::serve(listener, router).await
}
