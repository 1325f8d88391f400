//! Device-code grant driver (RFC 8628).
//!
//! The agent performs exactly one token-endpoint exchange per invocation; polling
//! cadence belongs to the caller, which sees `authorization_pending`, `slow_down`,
//! `access_denied`, and `expired_token` verbatim as typed errors and decides whether
//! to call again.

// self
use crate::{
	_prelude::*,
	account::{Account, ScopeSet, SecretString},
	flows::{Agent, FlowKind, common},
	http::TokenHttpClient,
	token,
};

/// `grant_type` value of the device-code exchange.
pub const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Device authorization response returned by the issuer (RFC 8628 §3.2).
#[derive(Clone, Debug, Deserialize)]
pub struct DeviceAuthorization {
	/// Device verification code to poll the token endpoint with.
	pub device_code: String,
	/// End-user code to display.
	pub user_code: String,
	/// URI the end-user should visit to enter the user code.
	#[serde(alias = "verification_url")]
	pub verification_uri: String,
	/// Verification URI with the user code already embedded, when provided.
	#[serde(default)]
	pub verification_uri_complete: Option<String>,
	/// Lifetime of the device code in seconds.
	#[serde(default)]
	pub expires_in: Option<i64>,
	/// Minimum polling interval in seconds.
	#[serde(default = "default_poll_interval")]
	pub interval: i64,
}

fn default_poll_interval() -> i64 {
	5
}

impl<C> Agent<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Starts a device authorization and returns the codes for the caller to display.
	pub async fn request_device_authorization(
		&self,
		account: &mut Account,
		scope_override: Option<&ScopeSet>,
	) -> Result<DeviceAuthorization> {
		self.discover(account).await?;

		let endpoint = account.device_authorization_endpoint()?;
		let mut form = Vec::new();

		if let Some(scope) = common::scope_parameter(account, scope_override) {
			form.push(("scope", scope));
		}

		let body = common::post_form(self, account, &endpoint, form).await?;

		token::parse_json(&body)
	}

	/// Performs one device-code exchange against the token endpoint.
	pub async fn exchange_device_code(
		&self,
		account: &mut Account,
		device_code: &SecretString,
	) -> Result<SecretString> {
		common::observe_flow(self, FlowKind::Device, "exchange_device_code", async {
			self.discover(account).await?;

			let token_endpoint = account.token_endpoint()?;
			let form = vec![
				("grant_type", DEVICE_GRANT_TYPE.to_owned()),
				("device_code", device_code.expose().to_owned()),
			];
			let now = OffsetDateTime::now_utc();
			let body = common::post_form(self, account, &token_endpoint, form).await?;

			token::apply_token_response(account, &body, now)
		})
		.await
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn device_authorization_defaults_the_interval() {
		let body = br#"{
			"device_code": "DC1",
			"user_code": "WDJB-MJHT",
			"verification_uri": "https://iss.example/device"
		}"#;
		let authorization: DeviceAuthorization =
			serde_json::from_slice(body).expect("Device authorization fixture should parse.");

		assert_eq!(authorization.device_code, "DC1");
		assert_eq!(authorization.interval, 5);
		assert!(authorization.expires_in.is_none());
	}

	#[test]
	fn device_authorization_accepts_verification_url_alias() {
		let body = br#"{
			"device_code": "DC1",
			"user_code": "WDJB-MJHT",
			"verification_url": "https://iss.example/device",
			"interval": 7,
			"expires_in": 1800
		}"#;
		let authorization: DeviceAuthorization =
			serde_json::from_slice(body).expect("Aliased fixture should parse.");

		assert_eq!(authorization.verification_uri, "https://iss.example/device");
		assert_eq!(authorization.interval, 7);
		assert_eq!(authorization.expires_in, Some(1800));
	}
}
