//! `refresh_token` grant driver.
//!
//! The refresh flow is the quiet workhorse of the agent: it runs first in the default
//! order and never needs user interaction. A rejected refresh token
//! (`invalid_grant`) is treated as revoked, which both surfaces a dedicated error and
//! wipes the stored secret so later attempts skip this flow instead of hammering the
//! issuer with a dead credential.

// self
use crate::{
	_prelude::*,
	account::{Account, ScopeSet, SecretString},
	error::OidcErrorCode,
	flows::{Agent, FlowKind, common},
	http::TokenHttpClient,
	token,
};

impl<C> Agent<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Runs the `refresh_token` grant and returns the freshly issued access token.
	///
	/// Requires a non-empty stored refresh token. The issuer's reply may rotate the
	/// refresh token; when it stays silent the previous secret is retained, matching
	/// servers that keep long-lived refresh tokens valid.
	pub async fn refresh_access_token(
		&self,
		account: &mut Account,
		scope_override: Option<&ScopeSet>,
	) -> Result<SecretString> {
		common::observe_flow(self, FlowKind::Refresh, "refresh_access_token", async {
			let Some(refresh_token) = account.refresh_token().cloned() else {
				return Err(Error::NoRefreshToken);
			};

			if refresh_token.is_empty() {
				return Err(Error::NoRefreshToken);
			}

			self.discover(account).await?;

			let token_endpoint = account.token_endpoint()?;
			let mut form = vec![
				("grant_type", "refresh_token".to_owned()),
				("refresh_token", refresh_token.expose().to_owned()),
			];

			if let Some(scope) = common::scope_parameter(account, scope_override) {
				form.push(("scope", scope));
			}

			let now = OffsetDateTime::now_utc();
			let body = match common::post_form(self, account, &token_endpoint, form).await {
				Ok(body) => body,
				Err(err) => {
					if let Error::Oidc(oidc) = &err
						&& oidc.code == OidcErrorCode::InvalidGrant
					{
						let reason = oidc
							.description
							.clone()
							.unwrap_or_else(|| oidc.code.as_str().to_owned());

						account.clear_refresh_token();

						return Err(Error::RefreshTokenRevoked { reason });
					}

					return Err(err);
				},
			};

			token::apply_token_response(account, &body, now)
		})
		.await
	}
}
