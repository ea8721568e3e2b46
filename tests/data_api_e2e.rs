#![cfg(feature = "server")]

mod common;

// std
use std::sync::Arc;
// crates.io
use tokio::net::TcpListener;
// self
use aad_session::{
	api::ApiClient,
	catalog::{DataStore, NewDataItem},
	error::Error,
	reqwest::{self, StatusCode},
	server::{self, AppState, CallerClaims, StaticBearerVerifier},
	session::HostContext,
	url::Url,
};
use common::FakeIdentity;

const TOKEN: &str = "token-ada";

/// Serves the data API on an ephemeral loopback port and returns its `/api` base URL.
async fn spawn_api() -> Url {
	let claims = CallerClaims::new([
		("oid", "oid-1"),
		("name", "Ada Lovelace"),
		("preferred_username", "ada@contoso.com"),
	]);
	let state = AppState::new(
		Arc::new(DataStore::with_samples()),
		Arc::new(StaticBearerVerifier::default().with_token(TOKEN, claims)),
	);
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Loopback listener should bind.");
	let addr = listener.local_addr().expect("Listener should report its address.");

	tokio::spawn(server::serve(listener, server::router(state)));

	common::url(&format!("http://{addr}/api"))
}

async fn client(base: Url) -> ApiClient {
	let identity = Arc::new(
		FakeIdentity::default().with_account(common::account()).with_silent_tokens([TOKEN; 16]),
	);
	let manager = common::initialized_manager(&identity, HostContext::TopLevel).await;

	ApiClient::new(Arc::new(manager), base)
}

#[tokio::test]
async fn search_filters_the_sample_collection() {
	let api = client(spawn_api().await).await;
	let all = api.list(None).await.expect("Listing should succeed.");
	let matched = api.list(Some("Architecture")).await.expect("Search should succeed.");

	assert_eq!(all.len(), 5);
	assert_eq!(matched.iter().map(|item| item.id).collect::<Vec<_>>(), vec![3, 4]);
	assert_eq!(api.list(Some("   ")).await.expect("Blank search should succeed.").len(), 5);
}

#[tokio::test]
async fn create_read_and_delete_an_item() {
	let base = spawn_api().await;
	let api = client(base.clone()).await;
	let created = api
		.create(&NewDataItem {
			title: Some("Rust Notes".into()),
			description: Some("Ownership and borrowing".into()),
			category: None,
		})
		.await
		.expect("Create should succeed.");

	assert_eq!(created.id, 6);
	assert_eq!(created.category, "General");
	assert_eq!(created.created_by.as_deref(), Some("ada@contoso.com"));
	assert_eq!(api.get(6).await.expect("New item should be readable.").title, "Rust Notes");

	api.delete(6).await.expect("Delete should succeed.");

	assert!(matches!(api.get(6).await, Err(Error::NotFound { id: 6 })));
	assert!(matches!(api.delete(6).await, Err(Error::NotFound { id: 6 })));
}

#[tokio::test]
async fn create_answers_with_a_location_header() {
	let base = spawn_api().await;
	let response = reqwest::Client::new()
		.post(base.join("api/data").expect("Endpoint should join."))
		.bearer_auth(TOKEN)
		.json(&serde_json::json!({ "title": "Located" }))
		.send()
		.await
		.expect("Request should be sent.");

	assert_eq!(response.status(), StatusCode::CREATED);
	assert_eq!(
		response.headers().get("location").and_then(|value| value.to_str().ok()),
		Some("/api/data/6")
	);
}

#[tokio::test]
async fn blank_title_is_rejected() {
	let api = client(spawn_api().await).await;

	match api.create(&NewDataItem::titled("  ")).await {
		Err(Error::ValidationFailed { reason }) => assert_eq!(reason, "Title is required"),
		other => panic!("Expected a validation failure, got {other:?}."),
	}
	assert_eq!(api.list(None).await.expect("Listing should succeed.").len(), 5);
}

#[tokio::test]
async fn profile_and_validate_reflect_the_caller() {
	let api = client(spawn_api().await).await;
	let profile = api.profile().await.expect("Profile should load.");

	assert!(profile.authenticated);
	assert_eq!(profile.id.as_deref(), Some("oid-1"));
	assert_eq!(profile.email.as_deref(), Some("ada@contoso.com"));
	assert_eq!(profile.name.as_deref(), Some("Ada Lovelace"));
	assert_eq!(profile.claims.len(), 3);
	assert!(api.validate().await.expect("Validation should succeed.").authenticated);
}

#[tokio::test]
async fn requests_without_an_accepted_bearer_are_unauthorized() {
	let base = spawn_api().await;
	let http = reqwest::Client::new();
	let endpoint = base.join("api/data").expect("Endpoint should join.");
	let anonymous = http.get(endpoint.clone()).send().await.expect("Request should be sent.");
	let forged =
		http.get(endpoint).bearer_auth("forged").send().await.expect("Request should be sent.");

	assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
	assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn null_title_is_a_json_bad_request() {
	let base = spawn_api().await;
	let response = reqwest::Client::new()
		.post(base.join("api/data").expect("Endpoint should join."))
		.bearer_auth(TOKEN)
		.json(&serde_json::json!({ "title": null }))
		.send()
		.await
		.expect("Request should be sent.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	let body = response.json::<serde_json::Value>().await.expect("Body should be JSON.");

	assert_eq!(body["message"], "Title is required");
}

#[tokio::test]
async fn malformed_ids_and_bodies_are_json_bad_requests() {
	let base = spawn_api().await;
	let http = reqwest::Client::new();
	let requests = [
		http.get(base.join("api/data/abc").expect("Endpoint should join.")),
		http.delete(base.join("api/data/-1").expect("Endpoint should join.")),
		http.post(base.join("api/data").expect("Endpoint should join."))
			.header("content-type", "application/json")
			.body("{\"title\":"),
	];

	for request in requests {
		let response = request.bearer_auth(TOKEN).send().await.expect("Request should be sent.");

		assert_eq!(response.status(), StatusCode::BAD_REQUEST);

		let body = response.json::<serde_json::Value>().await.expect("Body should be JSON.");

		assert!(body["message"].as_str().is_some_and(|message| !message.is_empty()), "{body}");
	}
}
