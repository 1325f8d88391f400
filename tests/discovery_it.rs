#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use oidc_agent_core::_preludet::*;

fn discovery_document(server: &MockServer) -> String {
	format!(
		r#"{{
			"issuer": "{base}",
			"authorization_endpoint": "{base}/authorize",
			"token_endpoint": "{base}/token",
			"device_authorization_endpoint": "{base}/device",
			"revocation_endpoint": "{base}/revoke",
			"scopes_supported": ["openid", "profile", "offline_access"],
			"grant_types_supported": ["authorization_code", "refresh_token"]
		}}"#,
		base = server.base_url(),
	)
}

#[tokio::test]
async fn discovery_populates_metadata_and_is_idempotent() {
	let server = MockServer::start_async().await;
	let document = discovery_document(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/.well-known/openid-configuration");
			then.status(200).header("content-type", "application/json").body(&document);
		})
		.await;
	let agent = build_test_agent();
	let mut account = test_account("discovered", &server.base_url()).build();

	agent.discover(&mut account).await.expect("Discovery should succeed.");

	let first = account.metadata().expect("Metadata should be populated.").clone();

	agent.discover(&mut account).await.expect("Second discovery run should be a no-op.");

	let second = account.metadata().expect("Metadata should stay populated.").clone();

	assert_eq!(first, second);
	assert_eq!(first.token_endpoint.as_str(), format!("{}/token", server.base_url()));
	assert_eq!(
		first.device_authorization_endpoint.as_ref().map(Url::as_str),
		Some(format!("{}/device", server.base_url()).as_str()),
	);
	assert_eq!(first.grant_types_supported, vec!["authorization_code", "refresh_token"]);

	// Exactly one request proves the cached metadata was reused.
	mock.assert_async().await;
}

#[tokio::test]
async fn issuer_mismatch_leaves_the_metadata_empty() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/.well-known/openid-configuration");
			then.status(200).header("content-type", "application/json").body(
				r#"{
					"issuer": "https://other.example/",
					"authorization_endpoint": "https://other.example/authorize",
					"token_endpoint": "https://other.example/token"
				}"#,
			);
		})
		.await;
	let agent = build_test_agent();
	let mut account = test_account("mismatched", &server.base_url()).build();
	let err = agent.discover(&mut account).await.expect_err("Issuer mismatch must fail.");

	assert!(matches!(err, Error::IssuerMismatch { .. }));
	assert!(account.metadata().is_none(), "Failed discovery must not partially populate.");

	mock.assert_async().await;
}

#[tokio::test]
async fn missing_token_endpoint_is_a_format_error() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/.well-known/openid-configuration");
			then.status(200).header("content-type", "application/json").body(format!(
				r#"{{"issuer":"{base}","authorization_endpoint":"{base}/authorize"}}"#,
				base = server.base_url(),
			));
		})
		.await;

	let agent = build_test_agent();
	let mut account = test_account("incomplete", &server.base_url()).build();
	let err = agent.discover(&mut account).await.expect_err("Missing endpoint must fail.");

	assert!(matches!(err, Error::Format(_)));
	assert!(account.metadata().is_none());
}

#[tokio::test]
async fn scopes_supported_for_returns_the_space_joined_list() {
	let server = MockServer::start_async().await;
	let document = discovery_document(&server);

	server
		.mock_async(|when, then| {
			when.method(GET).path("/.well-known/openid-configuration");
			then.status(200).header("content-type", "application/json").body(&document);
		})
		.await;

	let agent = build_test_agent();
	let issuer = Url::parse(&server.base_url()).expect("Mock issuer URL should parse.");
	let scopes = agent
		.scopes_supported_for(&issuer)
		.await
		.expect("Supported-scope lookup should succeed.");

	assert_eq!(scopes, "openid profile offline_access");
}
