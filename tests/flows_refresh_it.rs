#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use oidc_agent_core::{
	_preludet::*,
	account::{ScopeSet, SecretString},
	flows::TokenRequest,
};

const BASIC_AUTH: &str = "Basic dGVzdC1jbGllbnQ6dGVzdC1zZWNyZXQ=";

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
async fn refresh_rotates_tokens_and_expiry() {
	let server = MockServer::start_async().await;
	let _discovery = mock_discovery(&server).await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.header("authorization", BASIC_AUTH)
				.body_contains("grant_type=refresh_token")
				.body_contains("refresh_token=RT1");
			then.status(200).header("content-type", "application/json").body(
				r#"{"access_token":"AT2","token_type":"Bearer","expires_in":3600,"refresh_token":"RT2"}"#,
			);
		})
		.await;
	let agent = build_test_agent();
	let mut account = test_account("refresh", &server.base_url())
		.access_token("AT1")
		.refresh_token("RT1")
		.build();
	let before = OffsetDateTime::now_utc();
	let token = agent
		.acquire_access_token(&mut account, &TokenRequest::new().min_valid(Duration::seconds(60)))
		.await
		.expect("Refresh flow should succeed.");

	token_mock.assert_async().await;

	assert_eq!(token.expose(), "AT2");
	assert_eq!(account.access_token().map(SecretString::expose), Some("AT2"));
	assert_eq!(account.refresh_token().map(SecretString::expose), Some("RT2"));

	let expires_at = account.token_expires_at().expect("Expiry should be known.");

	assert!(expires_at > before + Duration::seconds(3590));
	assert!(expires_at < before + Duration::seconds(3620));
}

#[tokio::test]
async fn refresh_without_rotation_retains_the_old_secret() {
	let server = MockServer::start_async().await;
	let _discovery = mock_discovery(&server).await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token").body_contains("grant_type=refresh_token");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"AT2","token_type":"Bearer","expires_in":600}"#);
		})
		.await;

	let agent = build_test_agent();
	let mut account = test_account("keeps-rt", &server.base_url()).refresh_token("RT1").build();

	agent
		.acquire_access_token(&mut account, &TokenRequest::new())
		.await
		.expect("Refresh flow should succeed.");

	assert_eq!(
		account.refresh_token().map(SecretString::expose),
		Some("RT1"),
		"An omitted refresh_token keeps the previous secret usable.",
	);
}

#[tokio::test]
async fn revoked_refresh_token_stops_the_fallback_chain() {
	let server = MockServer::start_async().await;
	let _discovery = mock_discovery(&server).await;
	let refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token").body_contains("grant_type=refresh_token");
			then.status(400).header("content-type", "application/json").body(
				r#"{"error":"invalid_grant","error_description":"Session not active"}"#,
			);
		})
		.await;
	let password_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token").body_contains("grant_type=password");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"AT-PW","token_type":"Bearer","expires_in":600}"#);
		})
		.await;
	let agent = build_test_agent();
	let mut account = test_account("revoked", &server.base_url())
		.refresh_token("RT1")
		.username("mustermann")
		.password("hunter2")
		.build();
	let err = agent
		.acquire_access_token(&mut account, &TokenRequest::new())
		.await
		.expect_err("A revoked refresh token is a hard failure.");

	assert!(matches!(
		&err,
		Error::RefreshTokenRevoked { reason } if reason == "Session not active",
	));
	assert!(account.refresh_token().is_none(), "The dead secret must be wiped.");

	refresh_mock.assert_async().await;
	password_mock.assert_hits_async(0).await;
}

#[tokio::test]
async fn force_new_bypasses_a_perfectly_valid_cache() {
	let server = MockServer::start_async().await;
	let _discovery = mock_discovery(&server).await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token").body_contains("grant_type=refresh_token");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"AT2","token_type":"Bearer","expires_in":600}"#);
		})
		.await;
	let agent = build_test_agent();
	let mut account = test_account("forced", &server.base_url())
		.access_token("AT1")
		.token_expires_at(OffsetDateTime::now_utc() + Duration::hours(1))
		.refresh_token("RT1")
		.build();
	let token = agent
		.acquire_access_token(&mut account, &TokenRequest::new().force_new())
		.await
		.expect("Forced renewal should run the refresh flow.");

	assert_eq!(token.expose(), "AT2");

	token_mock.assert_async().await;
}

#[tokio::test]
async fn scope_override_bypasses_the_cache_and_rides_the_request() {
	let server = MockServer::start_async().await;
	let _discovery = mock_discovery(&server).await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.body_contains("grant_type=refresh_token")
				.body_contains("scope=email");
			then.status(200).header("content-type", "application/json").body(
				r#"{"access_token":"AT-SCOPED","token_type":"Bearer","expires_in":600,"scope":"email"}"#,
			);
		})
		.await;
	let agent = build_test_agent();
	let mut account = test_account("scoped", &server.base_url())
		.access_token("AT1")
		.token_expires_at(OffsetDateTime::now_utc() + Duration::hours(1))
		.refresh_token("RT1")
		.build();
	let scope = ScopeSet::new(["email"]).expect("Scope override should be valid.");
	let token = agent
		.acquire_access_token(&mut account, &TokenRequest::new().with_scope(scope))
		.await
		.expect("Scoped refresh should succeed.");

	assert_eq!(token.expose(), "AT-SCOPED");
	assert_eq!(
		account.granted_scope().map(ScopeSet::normalized).as_deref(),
		Some("email"),
		"The issuer-reported scope replaces the granted set.",
	);

	token_mock.assert_async().await;
}
