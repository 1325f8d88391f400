//! Token endpoint response handling.
//!
//! One parser serves all four grant drivers: it decodes the issuer's JSON token
//! response, applies the result to the account's cached token fields, and hands back
//! the freshly issued access token. OAuth error objects never mutate cached state.

// self
use crate::{
	_prelude::*,
	account::{Account, ScopeSet, SecretString},
	error::{FormatError, OidcError, OidcErrorCode, TransportError},
};

#[derive(Debug, Deserialize)]
struct RawTokenResponse {
	access_token: Option<String>,
	#[allow(dead_code)]
	token_type: Option<String>,
	expires_in: Option<i64>,
	refresh_token: Option<String>,
	scope: Option<String>,
	id_token: Option<String>,
	error: Option<String>,
	error_description: Option<String>,
	error_uri: Option<String>,
}

/// Parses a JSON body with path-aware diagnostics.
pub(crate) fn parse_json<'de, T>(body: &'de [u8]) -> Result<T>
where
	T: Deserialize<'de>,
{
	let deserializer = &mut serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(deserializer)
		.map_err(|source| FormatError::Json { source }.into())
}

/// Applies a 2xx token response to the account and returns the new access token.
///
/// - `access_token` is required and stored on the account.
/// - A positive `expires_in` yields an absolute expiry of `now + expires_in`; anything
///   else leaves the expiry unknown, which freshness checks treat as already expired.
/// - `refresh_token` replaces the stored one only when present; token rotation is
///   opt-in by the issuer and the previous secret stays valid otherwise.
/// - `scope` replaces the account's granted scope set when present.
/// - An OAuth error object inside a 2xx body is surfaced as a typed error without
///   touching cached state.
pub(crate) fn apply_token_response(
	account: &mut Account,
	body: &[u8],
	now: OffsetDateTime,
) -> Result<SecretString> {
	let raw: RawTokenResponse = parse_json(body)?;

	if let Some(error) = raw.error {
		return Err(oauth_error(&error, raw.error_description, raw.error_uri, None));
	}

	let access_token = raw
		.access_token
		.filter(|token| !token.is_empty())
		.ok_or(FormatError::MissingField { field: "access_token" })?;
	let expires_at = raw.expires_in.filter(|secs| *secs > 0).map(|secs| now + Duration::seconds(secs));
	let issued = SecretString::new(access_token);

	account.store_access_token(issued.clone(), expires_at);

	if let Some(refresh_token) = raw.refresh_token.filter(|token| !token.is_empty()) {
		account.store_refresh_token(SecretString::new(refresh_token));
	}
	if let Some(scope) = raw.scope {
		let granted = ScopeSet::from_str(&scope).map_err(FormatError::InvalidScope)?;

		account.set_granted_scope(granted);
	}
	if let Some(id_token) = raw.id_token.filter(|token| !token.is_empty()) {
		account.store_id_token(SecretString::new(id_token));
	}

	Ok(issued)
}

/// Converts a non-2xx token endpoint response into the most specific error available.
///
/// Bodies carrying an OAuth error object become [`OidcError`]s (status attached);
/// anything else stays a transport-status failure with the body verbatim.
pub(crate) fn classify_error_status(status: u16, body: Vec<u8>) -> Error {
	if let Ok(raw) = serde_json::from_slice::<RawTokenResponse>(&body)
		&& let Some(error) = raw.error
	{
		return oauth_error(&error, raw.error_description, raw.error_uri, Some(status));
	}

	TransportError::Status { status, body }.into()
}

fn oauth_error(
	code: &str,
	description: Option<String>,
	uri: Option<String>,
	status: Option<u16>,
) -> Error {
	OidcError { code: OidcErrorCode::from(code), description, uri, status }.into()
}
