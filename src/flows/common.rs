//! Shared helpers for grant drivers (form encoding, client authentication, observation).

// self
use crate::{
	_prelude::*,
	account::{Account, ScopeSet},
	error::TransportError,
	flows::{Agent, FlowKind},
	http::{BasicAuth, TokenHttpClient},
	obs::{self, FlowOutcome, FlowSpan},
	token,
};

/// Encodes form pairs as an `application/x-www-form-urlencoded` body.
pub(crate) fn encode_form(pairs: &[(&str, String)]) -> String {
	let mut serializer = url::form_urlencoded::Serializer::new(String::new());

	for (key, value) in pairs {
		serializer.append_pair(key, value);
	}

	serializer.finish()
}

/// Resolves the `scope` request parameter: the caller's override when present,
/// otherwise the account's configured scopes when non-empty.
pub(crate) fn scope_parameter(account: &Account, scope_override: Option<&ScopeSet>) -> Option<String> {
	match scope_override.filter(|scope| !scope.is_empty()) {
		Some(scope) => Some(scope.normalized()),
		None if account.scope().is_empty() => None,
		None => Some(account.scope().normalized()),
	}
}

/// Posts a form to an issuer endpoint with the account's client authentication.
///
/// Confidential clients authenticate via `client_secret_basic`; public clients carry
/// `client_id` in the body. A configured audience rides along on every request.
/// Non-2xx responses are classified into the most specific error available.
pub(crate) async fn post_form<C>(
	agent: &Agent<C>,
	account: &Account,
	endpoint: &Url,
	mut form: Vec<(&'static str, String)>,
) -> Result<Vec<u8>>
where
	C: ?Sized + TokenHttpClient,
{
	if let Some(audience) = account.audience() {
		form.push(("audience", audience.to_owned()));
	}

	let basic_auth = account.client_secret().map(|secret| BasicAuth {
		client_id: account.client_id(),
		client_secret: secret.expose(),
	});

	if basic_auth.is_none() {
		form.push(("client_id", account.client_id().to_owned()));
	}

	let body = encode_form(&form);

	match agent.http_client.post_form(endpoint, body, account.trust_anchor(), basic_auth).await {
		Ok(body) => Ok(body),
		Err(TransportError::Status { status, body }) =>
			Err(token::classify_error_status(status, body)),
		Err(err) => Err(err.into()),
	}
}

/// Wraps a driver future with span, counter, and metric bookkeeping.
pub(crate) async fn observe_flow<C, F, T>(
	agent: &Agent<C>,
	kind: FlowKind,
	stage: &'static str,
	flow: F,
) -> Result<T>
where
	C: ?Sized + TokenHttpClient,
	F: Future<Output = Result<T>>,
{
	let span = FlowSpan::new(kind, stage);

	obs::record_flow_outcome(kind, FlowOutcome::Attempt);
	agent.flow_metrics.record_attempt(kind);

	let result = span.instrument(flow).await;

	match &result {
		Ok(_) => {
			obs::record_flow_outcome(kind, FlowOutcome::Success);
			agent.flow_metrics.record_success(kind);
		},
		Err(_) => {
			obs::record_flow_outcome(kind, FlowOutcome::Failure);
			agent.flow_metrics.record_failure(kind);
		},
	}

	result
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::account::AccountId;

	fn account(scope: ScopeSet) -> Account {
		let name = AccountId::new("scopes").expect("Account fixture name should be valid.");
		let issuer =
			Url::parse("https://iss.example/").expect("Account fixture issuer should parse.");

		Account::builder(name, issuer, "agent").scope(scope).build()
	}

	#[test]
	fn form_encoding_escapes_reserved_characters() {
		let body = encode_form(&[
			("grant_type", "refresh_token".into()),
			("refresh_token", "a/b+c=".into()),
		]);

		assert_eq!(body, "grant_type=refresh_token&refresh_token=a%2Fb%2Bc%3D");
	}

	#[test]
	fn scope_parameter_prefers_the_override() {
		let configured =
			ScopeSet::new(["openid", "profile"]).expect("Configured scope should be valid.");
		let account = account(configured);
		let requested = ScopeSet::new(["offline_access"]).expect("Override should be valid.");

		assert_eq!(scope_parameter(&account, Some(&requested)).as_deref(), Some("offline_access"));
		assert_eq!(scope_parameter(&account, None).as_deref(), Some("openid profile"));

		let empty_account = account_without_scopes();

		assert_eq!(scope_parameter(&empty_account, None), None);
	}

	fn account_without_scopes() -> Account {
		account(ScopeSet::default())
	}
}
