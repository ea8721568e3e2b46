mod common;

// std
use std::{
	io::{BufRead, BufReader, Write},
	net::TcpListener,
	sync::Arc,
	thread,
};
// crates.io
use httpmock::prelude::*;
// self
use aad_session::{
	error::{Error, InteractionError},
	identity::Interaction,
	reqwest::StatusCode,
	session::{AcquisitionStep, ApiRequest, HostContext},
};
use common::{FakeIdentity, RedirectOutcome};

#[tokio::test]
async fn every_operation_requires_initialize() {
	let identity = Arc::new(FakeIdentity::default().with_account(common::account()));
	let manager = common::manager(&identity, HostContext::TopLevel);
	let request = ApiRequest::get(common::url("http://127.0.0.1:1/api/data"));

	assert!(!manager.is_initialized());
	assert!(matches!(manager.current_account(), Err(Error::Uninitialized)));
	assert!(matches!(manager.sign_in().await, Err(Error::Uninitialized)));
	assert!(matches!(manager.sign_out().await, Err(Error::Uninitialized)));
	assert!(matches!(manager.get_access_token().await, Err(Error::Uninitialized)));
	assert!(matches!(manager.make_authenticated_request(&request).await, Err(Error::Uninitialized)));
	assert_eq!(FakeIdentity::count(&identity.silent_calls), 0);
}

#[tokio::test]
async fn initialize_runs_once_and_adopts_the_cached_account() {
	let identity = Arc::new(FakeIdentity::default().with_account(common::account()));
	let manager = common::manager(&identity, HostContext::TopLevel);
	let (first, second) = tokio::join!(manager.initialize(None), manager.initialize(None));

	assert_eq!(first.expect("First initialize should succeed."), Some(common::account()));
	assert_eq!(second.expect("Second initialize should succeed."), Some(common::account()));
	assert_eq!(FakeIdentity::count(&identity.handle_redirect_calls), 1);
	assert_eq!(
		manager.current_account().expect("Manager should be initialized."),
		Some(common::account())
	);
}

#[tokio::test]
async fn completed_redirect_becomes_the_current_account() {
	let identity = Arc::new(
		FakeIdentity::default().with_redirect_outcome(RedirectOutcome::SignedIn(common::account())),
	);
	let manager = common::manager(&identity, HostContext::TopLevel);
	let landing = common::url("http://localhost:3000/?code=abc&state=xyz");

	assert_eq!(
		manager.initialize(Some(&landing)).await.expect("Initialize should succeed."),
		Some(common::account())
	);
}

#[tokio::test]
async fn redirect_error_is_reported_but_the_manager_still_initializes() {
	let identity = Arc::new(
		FakeIdentity::default()
			.with_account(common::account())
			.with_redirect_outcome(RedirectOutcome::Failed(InteractionError::Provider {
				code: "access_denied".into(),
				description: "User cancelled".into(),
			})),
	);
	let manager = common::manager(&identity, HostContext::TopLevel);
	let landing = common::url("http://localhost:3000/?error=access_denied&state=xyz");

	assert!(matches!(
		manager.initialize(Some(&landing)).await,
		Err(Error::Interaction(InteractionError::Provider { .. }))
	));
	assert!(manager.is_initialized());
	assert_eq!(
		manager.current_account().expect("Manager should be initialized."),
		Some(common::account())
	);
	// The error is reported once; later calls see the settled state.
	assert_eq!(
		manager.initialize(Some(&landing)).await.expect("Second initialize should succeed."),
		Some(common::account())
	);
	assert_eq!(FakeIdentity::count(&identity.handle_redirect_calls), 1);
}

#[tokio::test]
async fn token_without_account_is_not_signed_in() {
	let identity = Arc::new(FakeIdentity::default().with_silent_tokens(["t1"]));
	let manager = common::initialized_manager(&identity, HostContext::TopLevel).await;

	assert!(matches!(manager.get_access_token().await, Err(Error::NotSignedIn)));
	assert_eq!(FakeIdentity::count(&identity.silent_calls), 0);
}

#[tokio::test]
async fn silent_success_skips_interactive_steps() {
	let identity = Arc::new(
		FakeIdentity::default()
			.with_account(common::account())
			.with_silent_tokens(["t1"])
			.with_popup_token("popup"),
	);
	let manager = common::initialized_manager(&identity, HostContext::TopLevel).await;
	let token = manager
		.get_access_token()
		.await
		.expect("Silent acquisition should succeed.")
		.completed()
		.expect("Silent acquisition should complete in place.");

	assert_eq!(token.secret.expose(), "t1");
	assert_eq!(FakeIdentity::count(&identity.popup_calls), 0);
	assert_eq!(FakeIdentity::count(&identity.redirect_calls), 0);
	assert_eq!(manager.metrics().silent_hits(), 1);
}

#[tokio::test]
async fn top_level_falls_back_to_popup() {
	let identity = Arc::new(
		FakeIdentity::default().with_account(common::account()).with_popup_token("popup"),
	);
	let manager = common::initialized_manager(&identity, HostContext::TopLevel).await;
	let token = manager
		.get_access_token()
		.await
		.expect("Popup fallback should succeed.")
		.completed()
		.expect("Popup should complete in place.");

	assert_eq!(token.secret.expose(), "popup");
	assert_eq!(FakeIdentity::count(&identity.silent_calls), 1);
	assert_eq!(manager.metrics().popup_hits(), 1);
}

#[tokio::test]
async fn embedded_context_never_opens_a_popup() {
	for context in [HostContext::Popup, HostContext::Frame] {
		let identity = Arc::new(
			FakeIdentity::default().with_account(common::account()).with_popup_token("popup"),
		);
		let manager = common::initialized_manager(&identity, context).await;
		let outcome = manager.get_access_token().await.expect("Redirect fallback should succeed.");

		assert!(outcome.redirect_url().is_some());
		assert_eq!(FakeIdentity::count(&identity.popup_calls), 0);
		assert_eq!(FakeIdentity::count(&identity.redirect_calls), 1);
	}
}

#[tokio::test]
async fn exhausted_plan_reports_every_attempt_and_the_last_cause() {
	let identity =
		Arc::new(FakeIdentity::default().with_account(common::account()).with_failing_redirect());
	let manager = common::initialized_manager(&identity, HostContext::TopLevel).await;

	match manager.get_access_token().await {
		Err(Error::AcquisitionFailed { attempts, source }) => {
			assert_eq!(
				attempts,
				vec![AcquisitionStep::Silent, AcquisitionStep::Popup, AcquisitionStep::Redirect]
			);
			assert!(matches!(*source, Error::Interaction(InteractionError::Provider { .. })));
		},
		other => panic!("Expected an acquisition failure, got {other:?}."),
	}

	assert_eq!(manager.metrics().failures(), 1);
}

#[tokio::test]
async fn sign_in_prefers_popup_then_redirect() {
	let identity = Arc::new(FakeIdentity::default().with_popup_token("popup"));
	let manager = common::initialized_manager(&identity, HostContext::TopLevel).await;

	assert_eq!(
		manager.sign_in().await.expect("Popup sign-in should succeed."),
		Interaction::Completed(common::account())
	);
	assert_eq!(
		manager.current_account().expect("Manager should be initialized."),
		Some(common::account())
	);

	let blocked = Arc::new(FakeIdentity::default());
	let manager = common::initialized_manager(&blocked, HostContext::TopLevel).await;
	let outcome = manager.sign_in().await.expect("Redirect fallback should succeed.");

	assert!(outcome.redirect_url().is_some());
	assert_eq!(FakeIdentity::count(&blocked.popup_calls), 1);
	assert_eq!(manager.current_account().expect("Manager should be initialized."), None);
}

#[tokio::test]
async fn framed_sign_in_goes_straight_to_redirect() {
	let identity = Arc::new(FakeIdentity::default().with_popup_token("popup"));
	let manager = common::initialized_manager(&identity, HostContext::Frame).await;

	assert!(manager.sign_in().await.expect("Redirect should start.").redirect_url().is_some());
	assert!(
		manager
			.sign_in_with_redirect()
			.await
			.expect("Redirect should start.")
			.redirect_url()
			.is_some()
	);
	assert_eq!(FakeIdentity::count(&identity.popup_calls), 0);
	assert_eq!(FakeIdentity::count(&identity.redirect_calls), 2);
}

#[tokio::test]
async fn sign_out_clears_the_account_and_targets_end_session() {
	let identity = Arc::new(FakeIdentity::default().with_account(common::account()));
	let manager = common::initialized_manager(&identity, HostContext::TopLevel).await;
	let url = manager.sign_out().await.expect("Sign-out should succeed.");
	let query = url.query_pairs().into_owned().collect::<std::collections::HashMap<_, _>>();

	assert_eq!(query.get("logout_hint").map(String::as_str), Some("ada@contoso.com"));
	assert_eq!(query.get("post_logout_redirect_uri").map(String::as_str), Some("http://localhost:3000/"));
	assert_eq!(manager.current_account().expect("Manager should be initialized."), None);
	assert!(matches!(manager.get_access_token().await, Err(Error::NotSignedIn)));
}

#[tokio::test]
async fn unauthorized_response_is_retried_once_with_a_new_token() {
	let server = MockServer::start_async().await;
	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/data").header("authorization", "Bearer t1");
			then.status(401);
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/data")
				.header("authorization", "Bearer t2")
				.header("content-type", "application/json");
			then.status(200).header("content-type", "application/json").body("[]");
		})
		.await;
	let identity = Arc::new(
		FakeIdentity::default().with_account(common::account()).with_silent_tokens(["t1", "t2"]),
	);
	let manager = common::initialized_manager(&identity, HostContext::TopLevel).await;
	let response = manager
		.make_authenticated_request(&ApiRequest::get(common::url(&server.url("/api/data"))))
		.await
		.expect("Request should be sent.")
		.completed()
		.expect("Request should complete in place.");

	assert_eq!(response.status(), StatusCode::OK);

	stale.assert_calls_async(1).await;
	fresh.assert_calls_async(1).await;

	assert_eq!(FakeIdentity::count(&identity.clear_cache_calls), 1);
	assert_eq!(FakeIdentity::count(&identity.silent_calls), 2);
	assert_eq!(manager.metrics().retries(), 1);
	assert_eq!(manager.metrics().dispatches(), 2);
}

#[tokio::test]
async fn second_unauthorized_response_is_returned_unchanged() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/data");
			then.status(401).body("still unauthorized");
		})
		.await;
	let identity = Arc::new(
		FakeIdentity::default().with_account(common::account()).with_silent_tokens(["t1", "t2"]),
	);
	let manager = common::initialized_manager(&identity, HostContext::TopLevel).await;
	let request = ApiRequest::post(
		common::url(&server.url("/api/data")),
		&serde_json::json!({ "title": "Retry" }),
	)
	.expect("Body should serialize.");
	let response = manager
		.make_authenticated_request(&request)
		.await
		.expect("Request should be sent.")
		.completed()
		.expect("Request should complete in place.");

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

	mock.assert_calls_async(2).await;

	assert_eq!(FakeIdentity::count(&identity.clear_cache_calls), 1);
}

#[tokio::test]
async fn request_needing_interaction_returns_the_redirect() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/data");
			then.status(200);
		})
		.await;
	let identity = Arc::new(FakeIdentity::default().with_account(common::account()));
	let manager = common::initialized_manager(&identity, HostContext::Frame).await;
	let outcome = manager
		.make_authenticated_request(&ApiRequest::get(common::url(&server.url("/api/data"))))
		.await
		.expect("Redirect should start.");

	assert!(outcome.redirect_url().is_some());

	mock.assert_calls_async(0).await;
}

/// Answers the first connection with a bare 401 and then stops listening, so a retry is refused.
fn spawn_single_unauthorized_server() -> (String, thread::JoinHandle<()>) {
	let listener = TcpListener::bind("127.0.0.1:0").expect("Loopback listener should bind.");
	let addr = listener.local_addr().expect("Listener should report its address.");
	let handle = thread::spawn(move || {
		let (mut stream, _) = listener.accept().expect("First request should connect.");

		drop(listener);

		// A GET carries no body, so the head ends at the first blank line.
		for line in BufReader::new(&stream).lines() {
			if line.expect("Request head should be readable.").is_empty() {
				break;
			}
		}

		stream
			.write_all(
				b"HTTP/1.1 401 Unauthorized\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
			)
			.expect("Response should be written.");
	});

	(format!("http://{addr}/api/data"), handle)
}

#[tokio::test]
async fn transport_error_on_first_attempt_propagates() {
	let identity = Arc::new(
		FakeIdentity::default().with_account(common::account()).with_silent_tokens(["t1", "t2"]),
	);
	let manager = common::initialized_manager(&identity, HostContext::TopLevel).await;
	let outcome = manager
		.make_authenticated_request(&ApiRequest::get(common::url("http://127.0.0.1:1/api/data")))
		.await;

	assert!(matches!(outcome, Err(Error::Transport(_))), "Unexpected outcome: {outcome:?}.");
	assert_eq!(FakeIdentity::count(&identity.clear_cache_calls), 0);
	assert_eq!(manager.metrics().retries(), 0);
	assert_eq!(manager.metrics().dispatches(), 1);
}

#[tokio::test]
async fn transport_error_on_retry_propagates() {
	let (endpoint, server) = spawn_single_unauthorized_server();
	let identity = Arc::new(
		FakeIdentity::default().with_account(common::account()).with_silent_tokens(["t1", "t2"]),
	);
	let manager = common::initialized_manager(&identity, HostContext::TopLevel).await;
	let outcome = manager.make_authenticated_request(&ApiRequest::get(common::url(&endpoint))).await;

	server.join().expect("Server thread should finish.");

	assert!(matches!(outcome, Err(Error::Transport(_))), "Unexpected outcome: {outcome:?}.");
	assert_eq!(FakeIdentity::count(&identity.clear_cache_calls), 1);
	assert_eq!(FakeIdentity::count(&identity.silent_calls), 2);
	assert_eq!(manager.metrics().retries(), 1);
	assert_eq!(manager.metrics().dispatches(), 2);
}

#[tokio::test]
async fn reacquire_needing_redirect_skips_the_second_call() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/data");
			then.status(401);
		})
		.await;
	let identity = Arc::new(
		FakeIdentity::default().with_account(common::account()).with_silent_tokens(["t1"]),
	);
	let manager = common::initialized_manager(&identity, HostContext::TopLevel).await;
	let outcome = manager
		.make_authenticated_request(&ApiRequest::get(common::url(&server.url("/api/data"))))
		.await
		.expect("Redirect should start.");

	assert!(outcome.redirect_url().is_some());

	mock.assert_calls_async(1).await;

	assert_eq!(FakeIdentity::count(&identity.popup_calls), 1);
	assert_eq!(FakeIdentity::count(&identity.redirect_calls), 1);
	assert_eq!(manager.metrics().dispatches(), 1);
}
