//! OIDC discovery: fetching and validating `.well-known/openid-configuration` documents.

// self
use crate::{
	_prelude::*,
	account::Account,
	error::FormatError,
	flows::Agent,
	http::TokenHttpClient,
	token,
};

/// Path of the OIDC discovery document below the issuer URL.
pub const WELL_KNOWN_PATH: &str = ".well-known/openid-configuration";

/// Issuer metadata cached on an account after a successful discovery run.
///
/// The block is all-or-nothing: it only ever appears on an account once every required
/// field validated, so a present value implies a usable token endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerMetadata {
	/// Issuer identifier, matching the configured issuer URL.
	pub issuer: Url,
	/// Authorization endpoint used by the authorization-code flow.
	pub authorization_endpoint: Url,
	/// Token endpoint used by every grant exchange.
	pub token_endpoint: Url,
	/// Device-authorization endpoint, when the issuer supports RFC 8628.
	pub device_authorization_endpoint: Option<Url>,
	/// Dynamic client registration endpoint, when advertised.
	pub registration_endpoint: Option<Url>,
	/// Token revocation endpoint, when advertised.
	pub revocation_endpoint: Option<Url>,
	/// Scope values the issuer claims to support.
	pub scopes_supported: Vec<String>,
	/// Grant types the issuer claims to support.
	pub grant_types_supported: Vec<String>,
	/// Response types the issuer claims to support.
	pub response_types_supported: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawDiscoveryDocument {
	issuer: Option<String>,
	authorization_endpoint: Option<String>,
	token_endpoint: Option<String>,
	device_authorization_endpoint: Option<String>,
	registration_endpoint: Option<String>,
	revocation_endpoint: Option<String>,
	#[serde(default)]
	scopes_supported: Vec<String>,
	#[serde(default)]
	grant_types_supported: Vec<String>,
	#[serde(default)]
	response_types_supported: Vec<String>,
}

impl<C> Agent<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Populates the account's issuer metadata from its discovery document.
	///
	/// Safe to call repeatedly: once metadata is present it is reused for the account's
	/// lifetime and no request is made. On any failure the metadata block stays empty.
	pub async fn discover(&self, account: &mut Account) -> Result<()> {
		if account.metadata().is_some() {
			return Ok(());
		}

		let metadata =
			self.fetch_issuer_metadata(account.issuer_url(), account.trust_anchor()).await?;

		account.set_metadata(metadata);

		Ok(())
	}

	/// Read-only helper for account creation: returns the issuer's space-joined
	/// `scopes_supported` without touching any account state.
	pub async fn scopes_supported_for(&self, issuer_url: &Url) -> Result<String> {
		let metadata = self.fetch_issuer_metadata(issuer_url, None).await?;

		Ok(metadata.scopes_supported.join(" "))
	}

	pub(crate) async fn fetch_issuer_metadata(
		&self,
		issuer_url: &Url,
		trust_anchor: Option<&Path>,
	) -> Result<IssuerMetadata> {
		let document_url = discovery_url(issuer_url)?;
		let body = self.http_client.get(&document_url, trust_anchor).await?;
		let metadata = parse_discovery_document(&body)?;

		if !issuers_match(issuer_url, &metadata.issuer) {
			return Err(Error::IssuerMismatch {
				configured: issuer_url.to_string(),
				discovered: metadata.issuer.to_string(),
			});
		}

		Ok(metadata)
	}
}

/// Builds the discovery document URL for an issuer, tolerating a missing trailing slash.
pub fn discovery_url(issuer_url: &Url) -> Result<Url> {
	let mut base = issuer_url.clone();

	if !base.path().ends_with('/') {
		base.set_path(&format!("{}/", base.path()));
	}

	base.join(WELL_KNOWN_PATH)
		.map_err(|source| FormatError::InvalidUrl { field: "issuer", source }.into())
}

fn parse_discovery_document(body: &[u8]) -> Result<IssuerMetadata> {
	let raw: RawDiscoveryDocument = token::parse_json(body)?;
	let issuer = require_url("issuer", raw.issuer)?;
	let authorization_endpoint =
		require_url("authorization_endpoint", raw.authorization_endpoint)?;
	let token_endpoint = require_url("token_endpoint", raw.token_endpoint)?;

	Ok(IssuerMetadata {
		issuer,
		authorization_endpoint,
		token_endpoint,
		device_authorization_endpoint: optional_url(
			"device_authorization_endpoint",
			raw.device_authorization_endpoint,
		)?,
		registration_endpoint: optional_url("registration_endpoint", raw.registration_endpoint)?,
		revocation_endpoint: optional_url("revocation_endpoint", raw.revocation_endpoint)?,
		scopes_supported: raw.scopes_supported,
		grant_types_supported: raw.grant_types_supported,
		response_types_supported: raw.response_types_supported,
	})
}

fn require_url(field: &'static str, value: Option<String>) -> Result<Url> {
	let value = value.filter(|value| !value.is_empty());
	let value = value.ok_or(FormatError::MissingField { field })?;

	Url::parse(&value).map_err(|source| FormatError::InvalidUrl { field, source }.into())
}

fn optional_url(field: &'static str, value: Option<String>) -> Result<Option<Url>> {
	match value.filter(|value| !value.is_empty()) {
		Some(value) => Url::parse(&value)
			.map(Some)
			.map_err(|source| FormatError::InvalidUrl { field, source }.into()),
		None => Ok(None),
	}
}

/// Compares issuer identifiers, normalizing exactly one trailing slash.
fn issuers_match(configured: &Url, discovered: &Url) -> bool {
	configured.as_str().trim_end_matches('/') == discovered.as_str().trim_end_matches('/')
}
