#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use oidc_agent_core::{
	_preludet::*,
	account::{ScopeSet, SecretString},
	flows::TokenRequest,
};

async fn mock_discovery(server: &MockServer) -> httpmock::Mock<'_> {
	let document = format!(
		r#"{{"issuer":"{base}","authorization_endpoint":"{base}/authorize","token_endpoint":"{base}/token"}}"#,
		base = server.base_url(),
	);

	server
		.mock_async(move |when, then| {
			when.method(GET).path("/.well-known/openid-configuration");
			then.status(200).header("content-type", "application/json").body(document);
		})
		.await
}

#[tokio::test]
async fn password_grant_issues_a_token() {
	let server = MockServer::start_async().await;
	let _discovery = mock_discovery(&server).await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.body_contains("grant_type=password")
				.body_contains("username=mustermann")
				.body_contains("password=hunter2")
				.body_contains("scope=openid+profile");
			then.status(200).header("content-type", "application/json").body(
				r#"{"access_token":"AT-PW","token_type":"Bearer","expires_in":1200,"scope":"openid profile"}"#,
			);
		})
		.await;
	let agent = build_test_agent();
	let scope = ScopeSet::new(["openid", "profile"]).expect("Configured scope should be valid.");
	let mut account = test_account("password", &server.base_url())
		.scope(scope)
		.username("mustermann")
		.password("hunter2")
		.build();
	let token = agent
		.acquire_access_token(&mut account, &TokenRequest::new())
		.await
		.expect("Password flow should succeed.");

	assert_eq!(token.expose(), "AT-PW");
	assert_eq!(account.access_token().map(SecretString::expose), Some("AT-PW"));
	assert_eq!(account.granted_scope().map(ScopeSet::normalized).as_deref(), Some("openid profile"));

	token_mock.assert_async().await;
}

#[tokio::test]
async fn missing_credentials_fail_before_any_network_io() {
	let server = MockServer::start_async().await;
	let discovery = mock_discovery(&server).await;
	let agent = build_test_agent();
	let mut account =
		test_account("credless", &server.base_url()).username("mustermann").build();
	let err = agent
		.exchange_password(&mut account, None)
		.await
		.expect_err("No password means no grant.");

	assert!(matches!(err, Error::MissingCredentials));

	discovery.assert_hits_async(0).await;
}

#[tokio::test]
async fn expired_password_lifetime_counts_as_absent() {
	let server = MockServer::start_async().await;
	let discovery = mock_discovery(&server).await;
	let agent = build_test_agent();
	let mut account = test_account("timed-out", &server.base_url())
		.username("mustermann")
		.password("hunter2")
		.password_deadline(OffsetDateTime::now_utc() - Duration::seconds(1))
		.build();
	let err = agent
		.acquire_access_token(&mut account, &TokenRequest::new())
		.await
		.expect_err("An expired password must not be used.");

	assert!(matches!(err, Error::MissingCredentials));

	discovery.assert_hits_async(0).await;
}
