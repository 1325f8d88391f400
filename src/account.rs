//! Account records: identity, issuer metadata, cached tokens, and credentials.

pub mod id;
pub mod scope;
pub mod secret;

pub use id::*;
pub use scope::*;
pub use secret::*;

// self
use crate::{_prelude::*, discovery::IssuerMetadata, flows::FlowOrder};

/// One configured identity at one issuer, plus its cached tokens and credentials.
///
/// Accounts are created by the external loader (after decrypting its store), mutated by
/// the flow drivers and the lifetime controller, and dropped on unload. All secret
/// fields are [`SecretString`]s, so their bytes are wiped when replaced or dropped.
pub struct Account {
	name: AccountId,
	issuer_url: Url,
	client_id: String,
	client_secret: Option<SecretString>,
	redirect_uris: Vec<Url>,
	scope: ScopeSet,
	audience: Option<String>,
	trust_anchor: Option<PathBuf>,
	flow_order: Option<FlowOrder>,
	metadata: Option<IssuerMetadata>,
	access_token: Option<SecretString>,
	token_expires_at: Option<OffsetDateTime>,
	refresh_token: Option<SecretString>,
	id_token: Option<SecretString>,
	granted_scope: Option<ScopeSet>,
	username: Option<String>,
	password: Option<SecretString>,
	unload_at: Option<OffsetDateTime>,
	password_expires_at: Option<OffsetDateTime>,
}
impl Account {
	/// Returns a builder for the mandatory identity triple.
	pub fn builder(name: AccountId, issuer_url: Url, client_id: impl Into<String>) -> AccountBuilder {
		AccountBuilder::new(name, issuer_url, client_id)
	}

	/// Short name, unique within the agent.
	pub fn name(&self) -> &AccountId {
		&self.name
	}

	/// Configured issuer URL.
	pub fn issuer_url(&self) -> &Url {
		&self.issuer_url
	}

	/// OAuth client identifier.
	pub fn client_id(&self) -> &str {
		&self.client_id
	}

	/// Client secret, absent for public clients.
	pub fn client_secret(&self) -> Option<&SecretString> {
		self.client_secret.as_ref()
	}

	/// Redirect URIs registered for the client.
	pub fn redirect_uris(&self) -> &[Url] {
		&self.redirect_uris
	}

	/// Scopes configured at load time.
	pub fn scope(&self) -> &ScopeSet {
		&self.scope
	}

	/// Optional audience forwarded to the token endpoint on every grant.
	pub fn audience(&self) -> Option<&str> {
		self.audience.as_deref()
	}

	/// Path to the CA bundle verifying this issuer, if one overrides the system default.
	pub fn trust_anchor(&self) -> Option<&Path> {
		self.trust_anchor.as_deref()
	}

	/// Per-account flow order, when one was configured at load time.
	pub fn flow_order(&self) -> Option<&FlowOrder> {
		self.flow_order.as_ref()
	}

	/// Issuer metadata populated by discovery; either fully present or absent.
	pub fn metadata(&self) -> Option<&IssuerMetadata> {
		self.metadata.as_ref()
	}

	pub(crate) fn set_metadata(&mut self, metadata: IssuerMetadata) {
		self.metadata = Some(metadata);
	}

	/// Token endpoint from the discovered metadata.
	pub fn token_endpoint(&self) -> Result<Url> {
		self.metadata
			.as_ref()
			.map(|metadata| metadata.token_endpoint.clone())
			.ok_or(Error::DiscoveryRequired)
	}

	/// Authorization endpoint from the discovered metadata.
	pub fn authorization_endpoint(&self) -> Result<Url> {
		self.metadata
			.as_ref()
			.map(|metadata| metadata.authorization_endpoint.clone())
			.ok_or(Error::DiscoveryRequired)
	}

	/// Device-authorization endpoint from the discovered metadata, when advertised.
	pub fn device_authorization_endpoint(&self) -> Result<Url> {
		let metadata = self.metadata.as_ref().ok_or(Error::DiscoveryRequired)?;

		metadata
			.device_authorization_endpoint
			.clone()
			.ok_or(Error::EndpointNotAdvertised { endpoint: "device authorization" })
	}

	/// Cached access token, if any has been issued.
	pub fn access_token(&self) -> Option<&SecretString> {
		self.access_token.as_ref()
	}

	/// Absolute expiry of the cached access token; `None` means unknown and the token is
	/// treated as already expired for freshness checks.
	pub fn token_expires_at(&self) -> Option<OffsetDateTime> {
		self.token_expires_at
	}

	/// Checks whether the cached access token stays valid for at least `min_valid` past `now`.
	pub fn access_token_valid_for(&self, min_valid: Duration, now: OffsetDateTime) -> bool {
		let Some(token) = &self.access_token else {
			return false;
		};
		let Some(expires_at) = self.token_expires_at else {
			return false;
		};

		!token.is_empty() && expires_at > now && expires_at - now > min_valid
	}

	/// Stored refresh token, usable until the issuer rejects it.
	pub fn refresh_token(&self) -> Option<&SecretString> {
		self.refresh_token.as_ref()
	}

	/// Latest id token returned by the issuer.
	pub fn id_token(&self) -> Option<&SecretString> {
		self.id_token.as_ref()
	}

	/// Scopes the issuer most recently granted, when it reported them.
	pub fn granted_scope(&self) -> Option<&ScopeSet> {
		self.granted_scope.as_ref()
	}

	pub(crate) fn store_access_token(
		&mut self,
		token: SecretString,
		expires_at: Option<OffsetDateTime>,
	) {
		self.access_token = Some(token);
		self.token_expires_at = expires_at;
	}

	pub(crate) fn store_refresh_token(&mut self, token: SecretString) {
		self.refresh_token = Some(token);
	}

	/// Wipes the stored refresh token, e.g. after the issuer reported it revoked.
	pub fn clear_refresh_token(&mut self) {
		self.refresh_token = None;
	}

	pub(crate) fn store_id_token(&mut self, token: SecretString) {
		self.id_token = Some(token);
	}

	pub(crate) fn set_granted_scope(&mut self, scope: ScopeSet) {
		self.granted_scope = Some(scope);
	}

	/// Serializable snapshot of the cached token fields.
	pub fn cached_tokens(&self) -> CachedTokens {
		CachedTokens {
			access_token: self.access_token.as_ref().map(|token| token.expose().to_owned()),
			refresh_token: self.refresh_token.as_ref().map(|token| token.expose().to_owned()),
			scope: self.granted_scope.as_ref().map(ScopeSet::normalized),
			expires_at: self.token_expires_at,
		}
	}

	/// Configured username for the password grant.
	pub fn username(&self) -> Option<&str> {
		self.username.as_deref()
	}

	/// Replaces the configured username.
	pub fn set_username(&mut self, username: impl Into<String>) {
		self.username = Some(username.into());
	}

	/// Stored password as of `now`; reads absent once the password deadline has passed.
	pub fn password_at(&self, now: OffsetDateTime) -> Option<&SecretString> {
		if self.password_deadline_passed(now) {
			return None;
		}

		self.password.as_ref()
	}

	/// Stored password as of the current clock.
	pub fn password(&self) -> Option<&SecretString> {
		self.password_at(OffsetDateTime::now_utc())
	}

	/// Replaces the stored password. Call [`touch_password`](Self::touch_password) to bound
	/// how long it is retained.
	pub fn set_password(&mut self, password: SecretString) {
		self.password = Some(password);
	}

	/// Resets the password deadline to `now + ttl`, or to forever when `ttl` is `None`.
	pub fn touch_password(&mut self, ttl: Option<Duration>, now: OffsetDateTime) {
		self.password_expires_at = ttl.map(|ttl| now + ttl);
	}

	/// Wipes the stored password immediately (explicit logout).
	pub fn clear_password(&mut self) {
		self.password = None;
		self.password_expires_at = None;
	}

	/// Deadline after which the password reads absent; `None` means it is kept forever.
	pub fn password_deadline(&self) -> Option<OffsetDateTime> {
		self.password_expires_at
	}

	/// Wipes the password if its deadline has passed. Returns whether a wipe happened.
	pub fn expire_password(&mut self, now: OffsetDateTime) -> bool {
		if self.password.is_some() && self.password_deadline_passed(now) {
			self.clear_password();

			return true;
		}

		false
	}

	fn password_deadline_passed(&self, now: OffsetDateTime) -> bool {
		matches!(self.password_expires_at, Some(deadline) if deadline <= now)
	}

	pub(crate) fn has_credentials_at(&self, now: OffsetDateTime) -> bool {
		let username_present = self.username.as_deref().is_some_and(|name| !name.is_empty());
		let password_present = self.password_at(now).is_some_and(|password| !password.is_empty());

		username_present && password_present
	}

	/// Deadline after which the whole account auto-unloads; `None` means it stays loaded.
	pub fn unload_deadline(&self) -> Option<OffsetDateTime> {
		self.unload_at
	}

	/// Replaces the auto-unload deadline.
	pub fn set_unload_deadline(&mut self, deadline: Option<OffsetDateTime>) {
		self.unload_at = deadline;
	}

	/// Checks whether the account is due for unloading at `now`.
	pub fn due_for_unload(&self, now: OffsetDateTime) -> bool {
		matches!(self.unload_at, Some(deadline) if deadline <= now)
	}

	/// Wipes every secret field in place (tokens, password, client secret).
	pub fn wipe_secrets(&mut self) {
		self.access_token = None;
		self.token_expires_at = None;
		self.refresh_token = None;
		self.id_token = None;
		self.password = None;
		self.password_expires_at = None;
		self.client_secret = None;
	}
}
impl Debug for Account {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Account")
			.field("name", &self.name)
			.field("issuer_url", &self.issuer_url)
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.field("scope", &self.scope)
			.field("metadata_discovered", &self.metadata.is_some())
			.field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
			.field("token_expires_at", &self.token_expires_at)
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("username", &self.username)
			.field("unload_at", &self.unload_at)
			.field("password_expires_at", &self.password_expires_at)
			.finish()
	}
}

/// Serializable snapshot of an account's cached token fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedTokens {
	/// Cached access token value.
	pub access_token: Option<String>,
	/// Stored refresh token value.
	pub refresh_token: Option<String>,
	/// Space-joined granted scopes, when the issuer reported them.
	pub scope: Option<String>,
	/// Absolute access-token expiry as a unix timestamp.
	#[serde(with = "time::serde::timestamp::option")]
	pub expires_at: Option<OffsetDateTime>,
}

/// Builder for [`Account`].
#[derive(Debug)]
pub struct AccountBuilder {
	name: AccountId,
	issuer_url: Url,
	client_id: String,
	client_secret: Option<SecretString>,
	redirect_uris: Vec<Url>,
	scope: ScopeSet,
	audience: Option<String>,
	trust_anchor: Option<PathBuf>,
	flow_order: Option<FlowOrder>,
	access_token: Option<SecretString>,
	token_expires_at: Option<OffsetDateTime>,
	refresh_token: Option<SecretString>,
	id_token: Option<SecretString>,
	username: Option<String>,
	password: Option<SecretString>,
	unload_at: Option<OffsetDateTime>,
	password_expires_at: Option<OffsetDateTime>,
}
impl AccountBuilder {
	fn new(name: AccountId, issuer_url: Url, client_id: impl Into<String>) -> Self {
		Self {
			name,
			issuer_url,
			client_id: client_id.into(),
			client_secret: None,
			redirect_uris: Vec::new(),
			scope: ScopeSet::default(),
			audience: None,
			trust_anchor: None,
			flow_order: None,
			access_token: None,
			token_expires_at: None,
			refresh_token: None,
			id_token: None,
			username: None,
			password: None,
			unload_at: None,
			password_expires_at: None,
		}
	}

	/// Sets the client secret for confidential clients.
	pub fn client_secret(mut self, secret: impl Into<SecretString>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// Registers a redirect URI.
	pub fn redirect_uri(mut self, uri: Url) -> Self {
		self.redirect_uris.push(uri);

		self
	}

	/// Sets the configured scope set.
	pub fn scope(mut self, scope: ScopeSet) -> Self {
		self.scope = scope;

		self
	}

	/// Sets the audience forwarded with every grant.
	pub fn audience(mut self, audience: impl Into<String>) -> Self {
		self.audience = Some(audience.into());

		self
	}

	/// Sets the CA bundle path verifying this issuer.
	pub fn trust_anchor(mut self, path: impl Into<PathBuf>) -> Self {
		self.trust_anchor = Some(path.into());

		self
	}

	/// Sets a per-account flow order.
	pub fn flow_order(mut self, order: FlowOrder) -> Self {
		self.flow_order = Some(order);

		self
	}

	/// Seeds a cached access token (restored from the external store).
	pub fn access_token(mut self, token: impl Into<SecretString>) -> Self {
		self.access_token = Some(token.into());

		self
	}

	/// Seeds the cached access token's absolute expiry.
	pub fn token_expires_at(mut self, expires_at: OffsetDateTime) -> Self {
		self.token_expires_at = Some(expires_at);

		self
	}

	/// Seeds a stored refresh token.
	pub fn refresh_token(mut self, token: impl Into<SecretString>) -> Self {
		self.refresh_token = Some(token.into());

		self
	}

	/// Seeds a stored id token.
	pub fn id_token(mut self, token: impl Into<SecretString>) -> Self {
		self.id_token = Some(token.into());

		self
	}

	/// Sets the username for the password grant.
	pub fn username(mut self, username: impl Into<String>) -> Self {
		self.username = Some(username.into());

		self
	}

	/// Sets the stored password.
	pub fn password(mut self, password: impl Into<SecretString>) -> Self {
		self.password = Some(password.into());

		self
	}

	/// Sets the deadline after which the password reads absent.
	pub fn password_deadline(mut self, deadline: OffsetDateTime) -> Self {
		self.password_expires_at = Some(deadline);

		self
	}

	/// Sets the deadline after which the account auto-unloads.
	pub fn unload_deadline(mut self, deadline: OffsetDateTime) -> Self {
		self.unload_at = Some(deadline);

		self
	}

	/// Consumes the builder and produces an [`Account`].
	pub fn build(self) -> Account {
		Account {
			name: self.name,
			issuer_url: self.issuer_url,
			client_id: self.client_id,
			client_secret: self.client_secret,
			redirect_uris: self.redirect_uris,
			scope: self.scope,
			audience: self.audience,
			trust_anchor: self.trust_anchor,
			flow_order: self.flow_order,
			metadata: None,
			access_token: self.access_token,
			token_expires_at: self.token_expires_at,
			refresh_token: self.refresh_token,
			id_token: self.id_token,
			granted_scope: None,
			username: self.username,
			password: self.password,
			unload_at: self.unload_at,
			password_expires_at: self.password_expires_at,
		}
	}
}
