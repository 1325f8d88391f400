//! Authorization-code grant driver and authorization-request helpers.
//!
//! The agent never opens a browser or hosts a redirect server; external collaborators
//! send the user to [`AuthorizationAttempt::authorize_url`] and deliver the resulting
//! `code` back over IPC. The attempt keeps the state value and the S256 PKCE verifier
//! so the exchange can prove possession.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	account::{Account, ScopeSet, SecretString},
	flows::{Agent, AuthorizationCodeGrant, FlowKind, common},
	http::TokenHttpClient,
	token,
};

const STATE_LEN: usize = 32;
const PKCE_VERIFIER_LEN: usize = 64;
const PKCE_METHOD: &str = "S256";

/// State and PKCE material minted for one authorization request.
///
/// The verifier never appears in the authorize URL; only its S256 challenge does.
#[derive(Clone)]
pub struct AuthorizationAttempt {
	/// Fully-formed authorize URL the end-user should be sent to.
	pub authorize_url: Url,
	/// Opaque state value that must round-trip through the redirect.
	pub state: String,
	/// Redirect URI baked into the authorize URL.
	pub redirect_uri: Url,
	code_verifier: SecretString,
	code_challenge: String,
}
impl AuthorizationAttempt {
	/// PKCE code verifier belonging to this attempt.
	pub fn code_verifier(&self) -> &SecretString {
		&self.code_verifier
	}

	/// S256 challenge derived from the verifier.
	pub fn code_challenge(&self) -> &str {
		&self.code_challenge
	}

	/// Validates the `state` parameter returned by the authorization redirect.
	pub fn validate_state(&self, returned_state: &str) -> Result<()> {
		if returned_state == self.state { Ok(()) } else { Err(Error::StateMismatch) }
	}

	/// Consumes the attempt into an exchangeable grant once the code has arrived.
	pub fn into_grant(self, code: impl Into<SecretString>) -> AuthorizationCodeGrant {
		AuthorizationCodeGrant {
			code: code.into(),
			redirect_uri: self.redirect_uri,
			code_verifier: Some(self.code_verifier),
		}
	}
}
impl Debug for AuthorizationAttempt {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizationAttempt")
			.field("authorize_url", &self.authorize_url)
			.field("state", &self.state)
			.field("redirect_uri", &self.redirect_uri)
			.field("code_challenge", &self.code_challenge)
			.finish()
	}
}

impl<C> Agent<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Builds the authorization-request URL for the account, minting state + PKCE.
	///
	/// Discovery must have populated the account's metadata beforehand; this helper is
	/// synchronous and performs no network I/O of its own.
	pub fn begin_authorization(
		&self,
		account: &Account,
		redirect_uri: Url,
		scope_override: Option<&ScopeSet>,
	) -> Result<AuthorizationAttempt> {
		let mut authorize_url = account.authorization_endpoint()?;
		let state = random_string(STATE_LEN);
		let code_verifier = random_string(PKCE_VERIFIER_LEN);
		let code_challenge = compute_code_challenge(&code_verifier);

		{
			let mut pairs = authorize_url.query_pairs_mut();

			pairs.append_pair("response_type", "code");
			pairs.append_pair("client_id", account.client_id());
			pairs.append_pair("redirect_uri", redirect_uri.as_str());

			if let Some(scope) = common::scope_parameter(account, scope_override) {
				pairs.append_pair("scope", &scope);
			}

			pairs.append_pair("state", &state);
			pairs.append_pair("code_challenge", &code_challenge);
			pairs.append_pair("code_challenge_method", PKCE_METHOD);

			if let Some(audience) = account.audience() {
				pairs.append_pair("audience", audience);
			}
		}

		Ok(AuthorizationAttempt {
			authorize_url,
			state,
			redirect_uri,
			code_verifier: SecretString::new(code_verifier),
			code_challenge,
		})
	}

	/// Exchanges an externally-delivered authorization code for tokens.
	pub async fn exchange_authorization_code(
		&self,
		account: &mut Account,
		grant: &AuthorizationCodeGrant,
	) -> Result<SecretString> {
		common::observe_flow(self, FlowKind::Code, "exchange_authorization_code", async {
			self.discover(account).await?;

			let token_endpoint = account.token_endpoint()?;
			let mut form = vec![
				("grant_type", "authorization_code".to_owned()),
				("code", grant.code.expose().to_owned()),
				("redirect_uri", grant.redirect_uri.to_string()),
			];

			if let Some(code_verifier) = &grant.code_verifier {
				form.push(("code_verifier", code_verifier.expose().to_owned()));
			}

			let now = OffsetDateTime::now_utc();
			let body = common::post_form(self, account, &token_endpoint, form).await?;

			token::apply_token_response(account, &body, now)
		})
		.await
	}
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn compute_code_challenge(verifier: &str) -> String {
	let mut hasher = Sha256::new();

	hasher.update(verifier.as_bytes());

	URL_SAFE_NO_PAD.encode(hasher.finalize())
}
