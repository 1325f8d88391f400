//! Grant drivers and the token-acquisition engine built on top of them.

pub mod code;
pub mod device;
pub mod password;
pub mod refresh;

mod common;

pub use code::*;
pub use device::*;

// self
use crate::{
	_prelude::*,
	account::{Account, ScopeSet, SecretString},
	error::FormatError,
	http::TokenHttpClient,
	obs::FlowMetrics,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Agent specialized for the crate's default reqwest transport.
pub type ReqwestAgent = Agent<ReqwestHttpClient>;

/// Token-acquisition engine coordinating the four grant drivers for loaded accounts.
///
/// The agent owns the HTTP client and the fallback flow order; account state always
/// belongs to the caller and is borrowed mutably for the duration of one invocation,
/// which is what serializes mutations (the surrounding IPC layer admits one request at
/// a time). Flow drivers are exposed individually and through
/// [`acquire_access_token`](Self::acquire_access_token), which adds cache
/// short-circuiting and ordered fallback on top.
pub struct Agent<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// HTTP client used for every issuer request.
	pub http_client: Arc<C>,
	/// Flow order applied when neither the request nor the account configures one.
	pub default_flow_order: FlowOrder,
	/// Shared per-flow counters.
	pub flow_metrics: Arc<FlowMetrics>,
}
impl<C> Agent<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Creates an agent that uses the caller-provided transport.
	pub fn with_http_client(http_client: impl Into<Arc<C>>) -> Self {
		Self {
			http_client: http_client.into(),
			default_flow_order: FlowOrder::default(),
			flow_metrics: Default::default(),
		}
	}

	/// Replaces the fallback flow order.
	pub fn with_flow_order(mut self, order: FlowOrder) -> Self {
		self.default_flow_order = order;

		self
	}

	/// Returns a valid access token for the account, running flows as needed.
	///
	/// The cached token is served directly when the request carries no scope override,
	/// does not force renewal, and the cached expiry leaves more than the requested
	/// validity period. Otherwise flows run in order (request override, then the
	/// account's configured order, then the agent default) until one succeeds.
	///
	/// A flow whose precondition is missing is skipped: `refresh` without a refresh
	/// token, `password` without stored credentials, `code`/`device` without their
	/// externally-supplied grant payloads. The first hard failure stops the chain so a
	/// broken refresh never silently escalates into an interactive flow. When every
	/// entry was skipped, the most specific skip reason wins (missing credentials over
	/// missing refresh token over the generic no-usable-flow error), earliest first
	/// among equals.
	pub async fn acquire_access_token(
		&self,
		account: &mut Account,
		request: &TokenRequest,
	) -> Result<SecretString> {
		let now = OffsetDateTime::now_utc();

		if let Freshness::MinValid(min_valid) = request.freshness
			&& request.scope_override.is_none()
			&& account.access_token_valid_for(min_valid, now)
			&& let Some(token) = account.access_token()
		{
			return Ok(token.clone());
		}

		let order = request
			.flow_order
			.clone()
			.or_else(|| account.flow_order().cloned())
			.unwrap_or_else(|| self.default_flow_order.clone());
		let scope_override = request.scope_override.as_ref();
		// Highest-ranked skip reason seen so far; earlier flows win ties.
		let mut skip: Option<(u8, Error)> = None;

		for kind in order.iter() {
			match kind {
				FlowKind::Refresh => {
					if account.refresh_token().is_none_or(SecretString::is_empty) {
						note_skip(&mut skip, 1, Error::NoRefreshToken);

						continue;
					}

					return self.refresh_access_token(account, scope_override).await;
				},
				FlowKind::Password => {
					if !account.has_credentials_at(now) {
						note_skip(&mut skip, 2, Error::MissingCredentials);

						continue;
					}

					return self.exchange_password(account, scope_override).await;
				},
				FlowKind::Code => {
					let Some(grant) = &request.authorization_code else {
						continue;
					};

					return self.exchange_authorization_code(account, grant).await;
				},
				FlowKind::Device => {
					let Some(device_code) = &request.device_code else {
						continue;
					};

					return self.exchange_device_code(account, device_code).await;
				},
			}
		}

		Err(skip.map(|(_, err)| err).unwrap_or(Error::NoUsableFlow))
	}
}
#[cfg(feature = "reqwest")]
impl Agent<ReqwestHttpClient> {
	/// Creates an agent with its own reqwest-backed transport.
	pub fn new() -> Self {
		Self::with_http_client(ReqwestHttpClient::default())
	}
}
#[cfg(feature = "reqwest")]
impl Default for Agent<ReqwestHttpClient> {
	fn default() -> Self {
		Self::new()
	}
}
impl<C> Clone for Agent<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			default_flow_order: self.default_flow_order.clone(),
			flow_metrics: self.flow_metrics.clone(),
		}
	}
}
impl<C> Debug for Agent<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Agent").field("default_flow_order", &self.default_flow_order).finish()
	}
}

fn note_skip(slot: &mut Option<(u8, Error)>, rank: u8, err: Error) {
	match slot {
		Some((held, _)) if *held >= rank => {},
		_ => *slot = Some((rank, err)),
	}
}

/// One OAuth grant the agent can drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// `refresh_token` grant.
	Refresh,
	/// Resource-owner password grant.
	Password,
	/// Authorization-code grant (code delivered externally).
	Code,
	/// Device-code grant (device code delivered externally).
	Device,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Refresh => "refresh",
			FlowKind::Password => "password",
			FlowKind::Code => "code",
			FlowKind::Device => "device",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for FlowKind {
	type Err = FormatError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"refresh" => Ok(Self::Refresh),
			"password" => Ok(Self::Password),
			"code" => Ok(Self::Code),
			"device" => Ok(Self::Device),
			_ => Err(FormatError::UnknownFlow { name: s.to_owned() }),
		}
	}
}

/// Ordered, duplicate-free sequence of flows to try.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowOrder(Vec<FlowKind>);
impl FlowOrder {
	/// Builds an order from the given kinds, keeping the first occurrence of each.
	pub fn new(kinds: impl IntoIterator<Item = FlowKind>) -> Self {
		let mut deduplicated = Vec::new();

		for kind in kinds {
			if !deduplicated.contains(&kind) {
				deduplicated.push(kind);
			}
		}

		Self(deduplicated)
	}

	/// Iterator over the flows in configured order.
	pub fn iter(&self) -> impl Iterator<Item = FlowKind> + '_ {
		self.0.iter().copied()
	}

	/// Number of flows in the order.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true when the order contains no flows at all.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Returns the flows as a slice.
	pub fn as_slice(&self) -> &[FlowKind] {
		&self.0
	}
}
impl Default for FlowOrder {
	fn default() -> Self {
		Self(vec![FlowKind::Refresh, FlowKind::Password, FlowKind::Code, FlowKind::Device])
	}
}
impl Display for FlowOrder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let mut first = true;

		for kind in self.iter() {
			if !first {
				f.write_str(" ")?;
			}

			first = false;

			f.write_str(kind.as_str())?;
		}

		Ok(())
	}
}
impl FromStr for FlowOrder {
	type Err = Error;

	/// Accepts either a bracketed JSON array of flow names or a single bare name.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let trimmed = s.trim();
		let kinds = if trimmed.starts_with('[') {
			let names: Vec<String> = serde_json::from_str(trimmed)
				.map_err(|source| FormatError::FlowOrderList { source })?;

			names
				.iter()
				.map(|name| name.parse::<FlowKind>())
				.collect::<Result<Vec<_>, FormatError>>()?
		} else {
			vec![trimmed.parse::<FlowKind>()?]
		};

		Ok(Self::new(kinds))
	}
}

/// Caller freshness constraint for cached access tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Freshness {
	/// Serve the cached token when it stays valid for longer than this period.
	MinValid(Duration),
	/// Always run a flow, bypassing the cached token.
	ForceNew,
}
impl Default for Freshness {
	fn default() -> Self {
		Self::MinValid(Duration::ZERO)
	}
}

/// Externally-obtained authorization-code grant payload.
#[derive(Clone, Debug)]
pub struct AuthorizationCodeGrant {
	/// The authorization code delivered by the redirect handler.
	pub code: SecretString,
	/// The exact redirect URI used during the authorization request.
	pub redirect_uri: Url,
	/// PKCE code verifier minted when the authorization request was built.
	pub code_verifier: Option<SecretString>,
}

/// One client request for an access token.
#[derive(Clone, Debug, Default)]
pub struct TokenRequest {
	/// Freshness constraint for the cached token.
	pub freshness: Freshness,
	/// Scope override; when present the cache is bypassed and flows request it.
	pub scope_override: Option<ScopeSet>,
	/// Flow order override for this request only.
	pub flow_order: Option<FlowOrder>,
	/// Authorization-code payload, when the client already completed a redirect.
	pub authorization_code: Option<AuthorizationCodeGrant>,
	/// Device code, when the client is polling a device authorization.
	pub device_code: Option<SecretString>,
}
impl TokenRequest {
	/// Creates a request with no constraints beyond "currently valid".
	pub fn new() -> Self {
		Self::default()
	}

	/// Requires the token to stay valid for at least `period`.
	pub fn min_valid(mut self, period: Duration) -> Self {
		self.freshness = Freshness::MinValid(period);

		self
	}

	/// Bypasses the cached token entirely.
	pub fn force_new(mut self) -> Self {
		self.freshness = Freshness::ForceNew;

		self
	}

	/// Requests a different scope set than the account's configured one.
	pub fn with_scope(mut self, scope: ScopeSet) -> Self {
		self.scope_override = Some(scope);

		self
	}

	/// Overrides the flow order for this request.
	pub fn with_flow_order(mut self, order: FlowOrder) -> Self {
		self.flow_order = Some(order);

		self
	}

	/// Supplies an externally-obtained authorization-code grant.
	pub fn with_authorization_code(mut self, grant: AuthorizationCodeGrant) -> Self {
		self.authorization_code = Some(grant);

		self
	}

	/// Supplies an externally-obtained device code.
	pub fn with_device_code(mut self, device_code: impl Into<SecretString>) -> Self {
		self.device_code = Some(device_code.into());

		self
	}
}
