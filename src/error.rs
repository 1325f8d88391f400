//! Agent-level error types shared across discovery, flows, and the lifetime controller.

// self
use crate::_prelude::*;

/// Agent-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical agent error exposed by public APIs.
///
/// Every variant carries a stable numeric code (see [`Error::code`]) so the surrounding
/// transport can relay failures to clients as `(code, message)` pairs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Transport failure (DNS, TCP, TLS, timeout, non-2xx status).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Malformed JSON or a document missing a required field.
	#[error(transparent)]
	Format(#[from] FormatError),
	/// Issuer returned a structured OAuth error object.
	#[error(transparent)]
	Oidc(#[from] OidcError),

	/// Discovery document advertises a different issuer than the account configures.
	#[error("Discovery document issuer `{discovered}` does not match the configured issuer `{configured}`.")]
	IssuerMismatch {
		/// Issuer URL configured on the account.
		configured: String,
		/// `issuer` value found in the discovery document.
		discovered: String,
	},
	/// The account holds no refresh token.
	#[error("Account has no refresh token.")]
	NoRefreshToken,
	/// Username or password is missing (or the password lifetime has expired).
	#[error("Username or password is not available for the password grant.")]
	MissingCredentials,
	/// Issuer rejected the stored refresh token; it has been cleared from the account.
	#[error("Issuer rejected the refresh token: {reason}.")]
	RefreshTokenRevoked {
		/// Issuer-supplied reason, `error_description` verbatim when one was provided.
		reason: String,
	},
	/// No flow in the configured order could run.
	#[error("No flow in the configured order could produce an access token.")]
	NoUsableFlow,
	/// Issuer metadata has not been discovered for the account yet.
	#[error("Issuer metadata has not been discovered for this account.")]
	DiscoveryRequired,
	/// Discovery document does not advertise the endpoint a flow needs.
	#[error("Issuer does not advertise a {endpoint} endpoint.")]
	EndpointNotAdvertised {
		/// Human-readable endpoint label (e.g. `device authorization`).
		endpoint: &'static str,
	},
	/// Authorization response carried a `state` that does not match the pending attempt.
	#[error("Authorization response state does not match the pending attempt.")]
	StateMismatch,
	/// The user refused an authorization prompt.
	#[error("Authorization prompt was refused: {reason}.")]
	PromptRefused {
		/// Transport-supplied refusal reason.
		reason: String,
	},
}
impl Error {
	/// Returns the stable numeric code relayed to IPC clients.
	pub fn code(&self) -> ErrorCode {
		match self {
			Self::Transport(transport) => transport.code(),
			Self::Format(_) => ErrorCode::MalformedResponse,
			Self::Oidc(_) => ErrorCode::OidcError,
			Self::IssuerMismatch { .. } => ErrorCode::IssuerMismatch,
			Self::NoRefreshToken => ErrorCode::NoRefreshToken,
			Self::MissingCredentials => ErrorCode::MissingCredentials,
			Self::RefreshTokenRevoked { .. } => ErrorCode::RefreshTokenRevoked,
			Self::NoUsableFlow => ErrorCode::NoUsableFlow,
			Self::DiscoveryRequired => ErrorCode::DiscoveryRequired,
			Self::EndpointNotAdvertised { .. } => ErrorCode::EndpointNotAdvertised,
			Self::StateMismatch => ErrorCode::StateMismatch,
			Self::PromptRefused { .. } => ErrorCode::PromptRefused,
		}
	}
}

/// Stable numeric error codes for the IPC payload.
///
/// `0` is reserved for success; the remaining values never change meaning across releases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum ErrorCode {
	/// Operation succeeded.
	Success = 0,
	/// No refresh token on the account.
	NoRefreshToken = 2,
	/// Missing username or password.
	MissingCredentials = 3,
	/// Refresh token rejected by the issuer.
	RefreshTokenRevoked = 4,
	/// Structured OAuth error returned by the issuer.
	OidcError = 5,
	/// Malformed JSON or missing required field.
	MalformedResponse = 6,
	/// Discovery issuer mismatch.
	IssuerMismatch = 7,
	/// TLS setup or verification failure.
	Tls = 8,
	/// Network-level transport failure.
	Network = 9,
	/// Every flow in the configured order was skipped.
	NoUsableFlow = 10,
	/// Issuer metadata was required but not yet discovered.
	DiscoveryRequired = 11,
	/// Issuer does not advertise a needed endpoint.
	EndpointNotAdvertised = 12,
	/// Authorization state mismatch.
	StateMismatch = 13,
	/// Authorization prompt refused by the user.
	PromptRefused = 14,
}
impl ErrorCode {
	/// Returns the numeric wire value.
	pub const fn as_u16(self) -> u16 {
		self as u16
	}
}

/// Structured OAuth error object returned by an issuer endpoint (RFC 6749 §5.2).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OidcError {
	/// The `error` code string, parsed into a known variant where possible.
	pub code: OidcErrorCode,
	/// The `error_description` field, verbatim.
	pub description: Option<String>,
	/// The `error_uri` field, verbatim.
	pub uri: Option<String>,
	/// HTTP status the error arrived with, when known.
	pub status: Option<u16>,
}
impl Display for OidcError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match &self.description {
			Some(description) =>
				write!(f, "Issuer returned `{}`: {description}", self.code.as_str()),
			None => write!(f, "Issuer returned `{}`", self.code.as_str()),
		}
	}
}
impl StdError for OidcError {}

/// Known `error` code values of the OAuth error object, including the RFC 8628 polling codes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OidcErrorCode {
	/// `invalid_request`.
	InvalidRequest,
	/// `invalid_client`.
	InvalidClient,
	/// `invalid_grant`.
	InvalidGrant,
	/// `unauthorized_client`.
	UnauthorizedClient,
	/// `unsupported_grant_type`.
	UnsupportedGrantType,
	/// `invalid_scope`.
	InvalidScope,
	/// `access_denied`.
	AccessDenied,
	/// `authorization_pending` (device flow; caller should keep polling).
	AuthorizationPending,
	/// `slow_down` (device flow; caller should widen its polling interval).
	SlowDown,
	/// `expired_token` (device flow; the device code is no longer usable).
	ExpiredToken,
	/// `server_error`.
	ServerError,
	/// `temporarily_unavailable`.
	TemporarilyUnavailable,
	/// Any other issuer-specific code, verbatim.
	Other(String),
}
impl OidcErrorCode {
	/// Returns the wire representation of the code.
	pub fn as_str(&self) -> &str {
		match self {
			Self::InvalidRequest => "invalid_request",
			Self::InvalidClient => "invalid_client",
			Self::InvalidGrant => "invalid_grant",
			Self::UnauthorizedClient => "unauthorized_client",
			Self::UnsupportedGrantType => "unsupported_grant_type",
			Self::InvalidScope => "invalid_scope",
			Self::AccessDenied => "access_denied",
			Self::AuthorizationPending => "authorization_pending",
			Self::SlowDown => "slow_down",
			Self::ExpiredToken => "expired_token",
			Self::ServerError => "server_error",
			Self::TemporarilyUnavailable => "temporarily_unavailable",
			Self::Other(code) => code,
		}
	}
}
impl Display for OidcErrorCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl From<&str> for OidcErrorCode {
	fn from(value: &str) -> Self {
		match value {
			"invalid_request" => Self::InvalidRequest,
			"invalid_client" => Self::InvalidClient,
			"invalid_grant" => Self::InvalidGrant,
			"unauthorized_client" => Self::UnauthorizedClient,
			"unsupported_grant_type" => Self::UnsupportedGrantType,
			"invalid_scope" => Self::InvalidScope,
			"access_denied" => Self::AccessDenied,
			"authorization_pending" => Self::AuthorizationPending,
			"slow_down" => Self::SlowDown,
			"expired_token" => Self::ExpiredToken,
			"server_error" => Self::ServerError,
			"temporarily_unavailable" => Self::TemporarilyUnavailable,
			_ => Self::Other(value.to_owned()),
		}
	}
}

/// Parsing and validation failures for issuer documents and local configuration strings.
#[derive(Debug, ThisError)]
pub enum FormatError {
	/// Response body is not valid JSON of the expected shape.
	#[error("Response is not valid JSON: {source}.")]
	Json {
		/// Structured parsing failure with the offending path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// A required field is absent from the document.
	#[error("Response is missing the required `{field}` field.")]
	MissingField {
		/// Name of the absent field.
		field: &'static str,
	},
	/// A document field could not be parsed as a URL.
	#[error("Response field `{field}` is not a valid URL.")]
	InvalidUrl {
		/// Name of the offending field.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A granted scope string could not be normalized.
	#[error("Granted scope string is invalid.")]
	InvalidScope(#[from] crate::account::ScopeValidationError),
	/// A flow name is not one of `refresh`, `password`, `code`, `device`.
	#[error("Flow name `{name}` is not recognized.")]
	UnknownFlow {
		/// The unrecognized name.
		name: String,
	},
	/// A bracketed flow-order list could not be parsed as a JSON array of strings.
	#[error("Flow order list is not a valid JSON array of names.")]
	FlowOrderList {
		/// Underlying parsing failure.
		#[source]
		source: serde_json::Error,
	},
}

/// Transport-level failures (network, TLS, IO, non-2xx statuses).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// URL uses a scheme the agent refuses to speak.
	#[error("URL `{url}` must use https (plain http is allowed for loopback hosts only).")]
	InsecureUrl {
		/// The rejected URL.
		url: String,
	},
	/// TLS client setup failed (bad trust anchor, connector build failure).
	#[error("TLS setup failed for the request.")]
	Tls {
		/// Transport-specific TLS error.
		#[source]
		source: BoxError,
	},
	/// Trust-anchor bundle could not be read from disk.
	#[error("Trust anchor `{path}` could not be read.")]
	TrustAnchor {
		/// Path of the unreadable bundle.
		path: PathBuf,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the issuer.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request exceeded the bounded connect or total timeout.
	#[error("Request to the issuer timed out.")]
	Timeout,
	/// Issuer answered with a non-2xx status; the body is kept verbatim.
	#[error("Issuer responded with HTTP {status}.")]
	Status {
		/// Numeric HTTP status.
		status: u16,
		/// Response body, untouched, so callers may extract an OAuth error object.
		body: Vec<u8>,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the issuer.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific TLS error.
	pub fn tls(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Tls { source: Box::new(src) }
	}

	/// Returns the stable numeric code for this transport failure.
	pub fn code(&self) -> ErrorCode {
		match self {
			Self::Tls { .. } | Self::TrustAnchor { .. } => ErrorCode::Tls,
			_ => ErrorCode::Network,
		}
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}
