#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use oidc_agent_core::{
	_preludet::*,
	account::{ScopeSet, SecretString},
	error::OidcErrorCode,
	flows::TokenRequest,
};

const ENCODED_DEVICE_GRANT: &str = "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Adevice_code";

async fn mock_discovery(server: &MockServer, with_device_endpoint: bool) -> httpmock::Mock<'_> {
	let base = server.base_url();
	let document = if with_device_endpoint {
		format!(
			r#"{{"issuer":"{base}","authorization_endpoint":"{base}/authorize","token_endpoint":"{base}/token","device_authorization_endpoint":"{base}/device"}}"#,
		)
	} else {
		format!(
			r#"{{"issuer":"{base}","authorization_endpoint":"{base}/authorize","token_endpoint":"{base}/token"}}"#,
		)
	};

	server
		.mock_async(move |when, then| {
			when.method(GET).path("/.well-known/openid-configuration");
			then.status(200).header("content-type", "application/json").body(document);
		})
		.await
}

#[tokio::test]
async fn order_skips_unrunnable_flows_and_lands_on_device() {
	let server = MockServer::start_async().await;
	let _discovery = mock_discovery(&server, true).await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.body_contains(ENCODED_DEVICE_GRANT)
				.body_contains("device_code=DC1");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"AT-DEV","token_type":"Bearer","expires_in":900}"#);
		})
		.await;
	let agent = build_test_agent();
	// No refresh token, no credentials, no authorization code: only device can run.
	let mut account = test_account("device-only", &server.base_url()).build();
	let token = agent
		.acquire_access_token(&mut account, &TokenRequest::new().with_device_code("DC1"))
		.await
		.expect("Device flow should succeed.");

	assert_eq!(token.expose(), "AT-DEV");
	assert_eq!(account.access_token().map(SecretString::expose), Some("AT-DEV"));

	token_mock.assert_async().await;
}

#[tokio::test]
async fn polling_codes_surface_verbatim() {
	let cases = [
		("authorization_pending", OidcErrorCode::AuthorizationPending),
		("slow_down", OidcErrorCode::SlowDown),
		("access_denied", OidcErrorCode::AccessDenied),
		("expired_token", OidcErrorCode::ExpiredToken),
	];

	for (wire_code, expected) in cases {
		let server = MockServer::start_async().await;
		let _discovery = mock_discovery(&server, true).await;

		server
			.mock_async(|when, then| {
				when.method(POST).path("/token").body_contains(ENCODED_DEVICE_GRANT);
				then.status(400)
					.header("content-type", "application/json")
					.body(format!(r#"{{"error":"{wire_code}"}}"#));
			})
			.await;

		let agent = build_test_agent();
		let mut account = test_account("poller", &server.base_url()).build();
		let err = agent
			.exchange_device_code(&mut account, &"DC1".into())
			.await
			.expect_err("Polling answers are errors until the user approves.");

		assert!(
			matches!(&err, Error::Oidc(oidc) if oidc.code == expected),
			"Expected `{wire_code}` to surface as {expected:?}, got: {err:?}",
		);
		assert!(account.access_token().is_none(), "Polling failures must not mutate state.");
	}
}

#[tokio::test]
async fn device_authorization_request_returns_the_codes() {
	let server = MockServer::start_async().await;
	let _discovery = mock_discovery(&server, true).await;
	let device_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/device").body_contains("scope=openid");
			then.status(200).header("content-type", "application/json").body(
				r#"{
					"device_code": "DC1",
					"user_code": "WDJB-MJHT",
					"verification_uri": "https://iss.example/device",
					"expires_in": 1800,
					"interval": 5
				}"#,
			);
		})
		.await;
	let agent = build_test_agent();
	let scope = ScopeSet::new(["openid"]).expect("Scope fixture should be valid.");
	let mut account = test_account("device-start", &server.base_url()).scope(scope).build();
	let authorization = agent
		.request_device_authorization(&mut account, None)
		.await
		.expect("Device authorization should start.");

	assert_eq!(authorization.device_code, "DC1");
	assert_eq!(authorization.user_code, "WDJB-MJHT");
	assert_eq!(authorization.interval, 5);

	device_mock.assert_async().await;
}

#[tokio::test]
async fn missing_device_endpoint_is_reported_before_any_exchange() {
	let server = MockServer::start_async().await;
	let _discovery = mock_discovery(&server, false).await;
	let agent = build_test_agent();
	let mut account = test_account("no-device", &server.base_url()).build();
	let err = agent
		.request_device_authorization(&mut account, None)
		.await
		.expect_err("Issuers without the endpoint cannot start the flow.");

	assert!(matches!(err, Error::EndpointNotAdvertised { .. }));
}
