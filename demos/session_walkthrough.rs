//! Walks a session manager through start-up, a redirect sign-in, and sign-out without touching
//! the network: the host has no popup support, so sign-in falls through to the redirect flow
//! and the demo prints the URL a browser would be sent to.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
// self
use aad_session::{
	api::ApiClient,
	config::ClientConfig,
	identity::{IdentityClient, Interaction},
	session::{HostContext, SessionManager, WindowAncestry},
};

const CONFIG: &str = r#"{
	"client_id": "70a3cf75-694b-463d-a658-011195fc1f9d",
	"authority": "https://login.microsoftonline.com/contoso.onmicrosoft.com",
	"redirect_uri": "http://localhost:3000",
	"api_base_url": "http://localhost:5000/api",
	"api_scopes": ["api://70a3cf75-694b-463d-a658-011195fc1f9d/access_as_user"]
}"#;

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = ClientConfig::from_json_str(CONFIG)?;
	let identity: Arc<dyn IdentityClient> = Arc::new(config.identity_client(config.open_store()?)?);
	let context = HostContext::detect(&WindowAncestry::top_level());
	let session = Arc::new(SessionManager::new(identity, context, config.session_settings())?);
	let api = ApiClient::new(session.clone(), config.api_base_url.clone());

	println!("Host context: {context:?}.");
	println!("Signed in after start-up: {:?}.", session.initialize(None).await?);

	match session.sign_in().await? {
		Interaction::Completed(account) => println!("Signed in as {}.", account.username),
		Interaction::Redirecting(url) => println!("Send the browser to {url}."),
	}

	// No account yet, so data calls fail before any request is sent.
	if let Err(e) = api.list(Some("Azure")).await {
		println!("Listing data without an account: {e}");
	}

	println!("Sign-out lands on {}.", session.sign_out().await?);

	Ok(())
}
