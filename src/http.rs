//! Transport primitives for issuer requests.
//!
//! The module exposes [`TokenHttpClient`], the agent's only dependency on an HTTP
//! stack. Implementations speak HTTPS to issuer endpoints, enforce bounded timeouts,
//! and report non-2xx statuses as [`TransportError::Status`] with the body kept
//! verbatim so flow drivers can extract the issuer's OAuth error object.

// self
use crate::{_prelude::*, error::TransportError};
#[cfg(feature = "reqwest")] use crate::http::connector::ConnectorCache;

/// Future type returned by [`TokenHttpClient`] operations.
pub type HttpFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, TransportError>> + 'a + Send>>;

/// Client credentials placed in an `Authorization: Basic` header (`client_secret_basic`).
#[derive(Clone, Copy, Debug)]
pub struct BasicAuth<'a> {
	/// OAuth client identifier.
	pub client_id: &'a str,
	/// OAuth client secret.
	pub client_secret: &'a str,
}

/// Abstraction over HTTP transports capable of talking to issuer endpoints.
///
/// Two operations cover everything the agent needs: a `GET` for discovery documents
/// (following at most one redirect) and a form `POST` for token and
/// device-authorization endpoints (following none, matching OAuth 2.0 guidance that
/// token endpoints answer directly). `trust_anchor` points at a PEM CA bundle that
/// replaces the system roots for this request; `None` keeps the system default.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Fetches `url`, returning the body bytes on HTTP 2xx.
	fn get<'a>(&'a self, url: &'a Url, trust_anchor: Option<&'a Path>) -> HttpFuture<'a, Vec<u8>>;

	/// Posts an already-encoded `application/x-www-form-urlencoded` body to `url`.
	fn post_form<'a>(
		&'a self,
		url: &'a Url,
		body: String,
		trust_anchor: Option<&'a Path>,
		basic_auth: Option<BasicAuth<'a>>,
	) -> HttpFuture<'a, Vec<u8>>;
}

/// Checks the agent's URL policy: `https` everywhere, plain `http` for loopback only.
pub(crate) fn ensure_secure_url(url: &Url) -> Result<(), TransportError> {
	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback_host(url) => Ok(()),
		_ => Err(TransportError::InsecureUrl { url: url.to_string() }),
	}
}

fn is_loopback_host(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
		Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
		None => false,
	}
}

#[cfg(feature = "reqwest")]
mod connector {
	// crates.io
	use reqwest::{Certificate, redirect::Policy};
	// self
	use super::*;

	/// Redirect behavior a cached connector was built with.
	#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
	pub(super) enum RedirectMode {
		/// Never follow redirects (token endpoint POSTs).
		None,
		/// Follow at most one redirect (discovery GETs).
		FollowOne,
	}

	#[derive(Clone, Debug, PartialEq, Eq, Hash)]
	struct ConnectorKey {
		trust_anchor: Option<PathBuf>,
		redirects: RedirectMode,
	}

	/// Lazily built [`ReqwestClient`]s, one per (trust anchor, redirect mode) pair.
	#[derive(Debug, Default)]
	pub(super) struct ConnectorCache {
		connectors: RwLock<HashMap<ConnectorKey, ReqwestClient>>,
	}
	impl ConnectorCache {
		pub(super) fn obtain(
			&self,
			trust_anchor: Option<&Path>,
			redirects: RedirectMode,
			request_timeout: std::time::Duration,
			connect_timeout: std::time::Duration,
		) -> Result<ReqwestClient, TransportError> {
			let key = ConnectorKey { trust_anchor: trust_anchor.map(Path::to_path_buf), redirects };

			if let Some(client) = self.connectors.read().get(&key) {
				return Ok(client.clone());
			}

			let client = build_connector(trust_anchor, redirects, request_timeout, connect_timeout)?;

			self.connectors.write().insert(key, client.clone());

			Ok(client)
		}
	}

	fn build_connector(
		trust_anchor: Option<&Path>,
		redirects: RedirectMode,
		request_timeout: std::time::Duration,
		connect_timeout: std::time::Duration,
	) -> Result<ReqwestClient, TransportError> {
		let mut builder = ReqwestClient::builder()
			.timeout(request_timeout)
			.connect_timeout(connect_timeout)
			.redirect(match redirects {
				RedirectMode::None => Policy::none(),
				RedirectMode::FollowOne => Policy::limited(1),
			});

		if let Some(path) = trust_anchor {
			let pem = std::fs::read(path)
				.map_err(|source| TransportError::TrustAnchor { path: path.to_owned(), source })?;
			let certificates = Certificate::from_pem_bundle(&pem).map_err(TransportError::tls)?;

			// A configured bundle replaces the system roots, it does not extend them.
			builder = builder.tls_built_in_root_certs(false);

			for certificate in certificates {
				builder = builder.add_root_certificate(certificate);
			}
		}

		builder.build().map_err(TransportError::tls)
	}
}

/// Reqwest-backed [`TokenHttpClient`] with per-trust-anchor connector caching.
#[cfg(feature = "reqwest")]
#[derive(Debug)]
pub struct ReqwestHttpClient {
	connectors: ConnectorCache,
	request_timeout: std::time::Duration,
	connect_timeout: std::time::Duration,
}
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Total per-request deadline (connect + transfer).
	pub const DEFAULT_REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);
	/// Connection-establishment deadline.
	pub const DEFAULT_CONNECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

	/// Creates a client with the default timeouts.
	pub fn new() -> Self {
		Self::with_timeouts(Self::DEFAULT_REQUEST_TIMEOUT, Self::DEFAULT_CONNECT_TIMEOUT)
	}

	/// Creates a client with custom request and connect timeouts.
	pub fn with_timeouts(
		request_timeout: std::time::Duration,
		connect_timeout: std::time::Duration,
	) -> Self {
		Self { connectors: ConnectorCache::default(), request_timeout, connect_timeout }
	}

	fn connector(
		&self,
		trust_anchor: Option<&Path>,
		redirects: connector::RedirectMode,
	) -> Result<ReqwestClient, TransportError> {
		self.connectors.obtain(trust_anchor, redirects, self.request_timeout, self.connect_timeout)
	}

	async fn dispatch(request: reqwest::RequestBuilder) -> Result<Vec<u8>, TransportError> {
		let response = request.send().await.map_err(TransportError::from)?;
		let status = response.status();
		let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

		if status.is_success() {
			Ok(body)
		} else {
			Err(TransportError::Status { status: status.as_u16(), body })
		}
	}
}
#[cfg(feature = "reqwest")]
impl Default for ReqwestHttpClient {
	fn default() -> Self {
		Self::new()
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	fn get<'a>(&'a self, url: &'a Url, trust_anchor: Option<&'a Path>) -> HttpFuture<'a, Vec<u8>> {
		Box::pin(async move {
			ensure_secure_url(url)?;

			let client = self.connector(trust_anchor, connector::RedirectMode::FollowOne)?;

			Self::dispatch(client.get(url.clone())).await
		})
	}

	fn post_form<'a>(
		&'a self,
		url: &'a Url,
		body: String,
		trust_anchor: Option<&'a Path>,
		basic_auth: Option<BasicAuth<'a>>,
	) -> HttpFuture<'a, Vec<u8>> {
		Box::pin(async move {
			ensure_secure_url(url)?;

			let client = self.connector(trust_anchor, connector::RedirectMode::None)?;
			let mut request = client
				.post(url.clone())
				.header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
				.body(body);

			if let Some(BasicAuth { client_id, client_secret }) = basic_auth {
				request = request.basic_auth(client_id, Some(client_secret));
			}

			Self::dispatch(request).await
		})
	}
}
