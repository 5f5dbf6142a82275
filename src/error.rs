//! Client-level error types shared across the pipeline, refresh coordinator, and stores.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Notification shown when no response reached the client.
pub const NETWORK_FAILURE_MESSAGE: &str = "Network request failed.";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Body obfuscation failure.
	#[error(transparent)]
	Cipher(#[from] crate::cipher::CipherError),
	/// No response reached the client (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Response body could not be decoded.
	#[error("Response body could not be decoded.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},

	/// Server answered with a non-success transport status.
	#[error("Request failed with HTTP status {status}: {message}.")]
	Http {
		/// Transport-level status code.
		status: u16,
		/// Server-supplied message, if any.
		message: String,
	},
	/// Business envelope reported a failure status.
	#[error(transparent)]
	Business(#[from] BusinessError),
	/// No refresh token is stored, so the session cannot be renewed.
	#[error("No refresh token is stored.")]
	NoRefreshToken,
	/// The refresh endpoint rejected the renewal or could not be reached.
	#[error("Token refresh failed: {reason}.")]
	RefreshFailed {
		/// Human-readable failure summary shared by every waiter.
		reason: String,
	},
}
impl Error {
	/// Returns the message suitable for a transient user notification, if any.
	pub fn user_message(&self) -> Option<&str> {
		match self {
			Self::Http { message, .. } if !message.is_empty() => Some(message),
			Self::Business(err) => err.message.as_deref(),
			Self::Transport(_) => Some(NETWORK_FAILURE_MESSAGE),
			_ => None,
		}
	}
}

/// Business failure carried by the response envelope.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("{}", self.message.as_deref().unwrap_or("Unknown business error."))]
pub struct BusinessError {
	/// Envelope status code.
	pub code: i64,
	/// Server-supplied error message.
	pub message: Option<String>,
	/// Server timestamp of the failure.
	pub timestamp: Option<OffsetDateTime>,
	/// Request path echoed by the server.
	pub path: Option<String>,
	/// Raw `data` member of the envelope.
	pub data: serde_json::Value,
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL cannot be parsed or uses an unsupported scheme.
	#[error("Base URL `{url}` is invalid.")]
	InvalidBaseUrl {
		/// Offending base URL.
		url: String,
	},
	/// Request URL cannot be parsed after resolution.
	#[error("Request URL `{url}` is invalid.")]
	InvalidRequestUrl {
		/// Offending request URL.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Timeout must be strictly positive.
	#[error("Request timeout must be positive.")]
	NonPositiveTimeout,
	/// System configuration JSON is malformed.
	#[error("System configuration is malformed.")]
	SystemConfigParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Encryption scheme requires a public key that was not supplied.
	#[error("The {scheme} encryption scheme requires `{field}`.")]
	MissingPublicKey {
		/// Scheme label.
		scheme: &'static str,
		/// Missing configuration field.
		field: &'static str,
	},
	/// Bypass pattern failed to compile.
	#[error("URL pattern `{pattern}` is invalid.")]
	InvalidPattern {
		/// Offending pattern.
		pattern: String,
		/// Underlying regex failure.
		#[source]
		source: regex::Error,
	},
	/// Request body must be a JSON object to be form-encoded.
	#[error("Form bodies must be JSON objects.")]
	FormBodyNotObject,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {url}.")]
	Network {
		/// Target URL.
		url: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request did not complete before the configured timeout.
	#[error("Request to {url} timed out.")]
	Timeout {
		/// Target URL.
		url: String,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(url: impl Into<String>, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { url: url.into(), source: Box::new(src) }
	}
}
