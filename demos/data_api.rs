//! Serves the data API on `127.0.0.1:5000` with a single development bearer token.
//!
//! Set `DATA_API_TOKEN` to choose the token (defaults to `dev-token`), then try:
//!
//! ```sh
//! curl -H "Authorization: Bearer dev-token" "http://127.0.0.1:5000/api/data?search=azure"
//! ```

// std
use std::{env, sync::Arc};
// crates.io
use color_eyre::Result;
use tokio::net::TcpListener;
// self
use aad_session::{
	catalog::DataStore,
	server::{self, AppState, CallerClaims, StaticBearerVerifier},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let token = env::var("DATA_API_TOKEN").unwrap_or_else(|_| "dev-token".into());
	let caller = CallerClaims::new([
		("oid", "00000000-0000-0000-0000-000000000001"),
		("name", "Local Developer"),
		("preferred_username", "developer@localhost"),
	]);
	let state = AppState::new(
		Arc::new(DataStore::with_samples()),
		Arc::new(StaticBearerVerifier::default().with_token(token, caller)),
	);
	let listener = TcpListener::bind("127.0.0.1:5000").await?;

	println!("Data API listening on http://{}/api.", listener.local_addr()?);

	server::serve(listener, server::router(state)).await?;

	Ok(())
}
