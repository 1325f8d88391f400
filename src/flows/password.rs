//! Resource-owner password grant driver.

// self
use crate::{
	_prelude::*,
	account::{Account, ScopeSet, SecretString},
	flows::{Agent, FlowKind, common},
	http::TokenHttpClient,
	token,
};

impl<C> Agent<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Runs the `password` grant and returns the freshly issued access token.
	///
	/// Username and password must both be present and non-empty; anything less fails
	/// locally before a single byte goes over the network. An expired password
	/// lifetime counts as absent.
	pub async fn exchange_password(
		&self,
		account: &mut Account,
		scope_override: Option<&ScopeSet>,
	) -> Result<SecretString> {
		common::observe_flow(self, FlowKind::Password, "exchange_password", async {
			let now = OffsetDateTime::now_utc();
			let username = account
				.username()
				.filter(|username| !username.is_empty())
				.map(ToOwned::to_owned)
				.ok_or(Error::MissingCredentials)?;
			let password = account
				.password_at(now)
				.filter(|password| !password.is_empty())
				.cloned()
				.ok_or(Error::MissingCredentials)?;

			self.discover(account).await?;

			let token_endpoint = account.token_endpoint()?;
			let mut form = vec![
				("grant_type", "password".to_owned()),
				("username", username),
				("password", password.expose().to_owned()),
			];

			if let Some(scope) = common::scope_parameter(account, scope_override) {
				form.push(("scope", scope));
			}

			let now = OffsetDateTime::now_utc();
			let body = common::post_form(self, account, &token_endpoint, form).await?;

			token::apply_token_response(account, &body, now)
		})
		.await
	}
}
