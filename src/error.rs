//! Crate-level error types shared across signing, token, transport, and pagination layers.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Token store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (timeout, DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Explicit refresh attempt failed.
	#[error(transparent)]
	Refresh(#[from] crate::token::RefreshError),

	/// The platform answered with a business error disguised as an HTTP success.
	#[error("{platform} API returned error `{code}`: {message}.")]
	Api {
		/// Platform that produced the error.
		platform: String,
		/// Platform-specific error code.
		code: String,
		/// Platform-supplied message.
		message: String,
	},
	/// The response body could not be interpreted.
	#[error("{platform} returned a malformed response at cursor {cursor}: {reason}.")]
	MalformedResponse {
		/// Platform that produced the body.
		platform: String,
		/// Cursor position that was being fetched.
		cursor: String,
		/// Parser or shape failure description.
		reason: String,
	},
	/// The platform answered with a non-success HTTP status and no recognizable error payload.
	#[error("{platform} responded with unexpected HTTP status {status}.")]
	HttpStatus {
		/// Platform that produced the response.
		platform: String,
		/// HTTP status code.
		status: u16,
	},
}

impl From<crate::platform::PlatformConfigError> for Error {
	fn from(e: crate::platform::PlatformConfigError) -> Self {
		Self::Config(e.into())
	}
}
impl From<crate::auth::IdentifierError> for Error {
	fn from(e: crate::auth::IdentifierError) -> Self {
		Self::Config(e.into())
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A request URL could not be assembled.
	#[error("Request URL `{url}` is invalid.")]
	InvalidUrl {
		/// Offending URL text.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Platform configuration failed validation.
	#[error(transparent)]
	Platform(#[from] crate::platform::PlatformConfigError),
	/// Credentials belong to a different signing family than the platform.
	#[error("Platform `{platform}` expects {expected} credentials.")]
	CredentialsMismatch {
		/// Platform name.
		platform: String,
		/// Credential family the platform signs with.
		expected: &'static str,
	},
	/// No access token is known for the platform.
	#[error("No access token is available for platform `{platform}`.")]
	MissingAccessToken {
		/// Platform name.
		platform: String,
	},
	/// No refresh token is known for the platform.
	#[error("No refresh token is available for platform `{platform}`.")]
	MissingRefreshToken {
		/// Platform name.
		platform: String,
	},
	/// The endpoint has no detail fan-out configured.
	#[error("Platform `{platform}` does not declare a detail endpoint.")]
	MissingDetailEndpoint {
		/// Platform name.
		platform: String,
	},
	/// Token record builder validation failed.
	#[error("Unable to build token record.")]
	TokenBuild(#[from] crate::auth::TokenRecordBuilderError),
	/// Identifier validation failed.
	#[error(transparent)]
	Identifier(#[from] crate::auth::IdentifierError),
	/// Run settings could not be decoded.
	#[error("Run settings are invalid at `{path}`.")]
	InvalidSettings {
		/// JSON path of the failing field.
		path: String,
		/// Underlying decoding failure.
		#[source]
		source: serde_json::Error,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	pub(crate) fn invalid_url(url: impl Into<String>, source: url::ParseError) -> Self {
		Self::InvalidUrl { url: url.into(), source }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO, timeouts).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// The request did not complete within the configured timeout.
	#[error("Request timed out.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the platform API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the platform API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}

	/// Returns `true` when the failure was a timeout.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Timeout { .. })
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}
