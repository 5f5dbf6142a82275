//! Business-envelope interpretation for a single response.
//!
//! Checks run in a fixed order: auth expiry, missing authentication, transport status, sealed-body
//! opening, and finally the business status. Nothing here touches the store or the hooks; the
//! pipeline acts on the returned [`Interpretation`].

// self
use crate::{
	_prelude::*,
	cipher::{ENCRYPT_TYPE_HEADER, ENCRYPTED_FIELD, ENCRYPTED_HEADER, EncryptionType},
	config::SystemConfig,
	error::BusinessError,
	http::{Headers, TransportResponse},
	obs::{self, FlowKind},
};

/// Envelope status reporting success.
pub const SUCCESS_CODE: i64 = 200;
/// Envelope status reporting that the caller is not authenticated.
pub const NOT_AUTHENTICATED_CODE: i64 = 401;
/// Envelope status reporting an expired access token.
pub const TOKEN_EXPIRED_CODE: i64 = 403;
/// Transport status treated as success.
pub const HTTP_OK: u16 = 200;

/// Wire shape returned by every backend call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
	/// Business status code.
	pub status: i64,
	/// Payload returned to the caller on success.
	#[serde(default)]
	pub data: serde_json::Value,
	/// Server-supplied error message.
	#[serde(default)]
	pub error: Option<String>,
	/// Server timestamp in milliseconds since the Unix epoch.
	#[serde(default)]
	pub timestamp: Option<i64>,
	/// Request path echoed by the server.
	#[serde(default)]
	pub path: Option<String>,
}
impl Envelope {
	/// Decodes an envelope, keeping the path of any mismatch.
	pub fn decode(
		body: &serde_json::Value,
	) -> Result<Self, serde_path_to_error::Error<serde_json::Error>> {
		serde_path_to_error::deserialize(body)
	}

	/// Converts a failed envelope into a [`BusinessError`].
	pub fn into_business_error(self) -> BusinessError {
		BusinessError {
			code: self.status,
			message: self.error.filter(|message| !message.is_empty()),
			timestamp: self.timestamp.and_then(|ms| {
				OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000).ok()
			}),
			path: self.path,
			data: self.data,
		}
	}
}

/// Next step for the pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Interpretation {
	/// Business success; hand the payload to the caller.
	Payload(serde_json::Value),
	/// Access token expired; refresh and retry.
	RefreshRequired(BusinessError),
	/// Caller is not authenticated; end the session and reject.
	LoggedOut(BusinessError),
}

/// Interprets one response against the active system configuration.
pub fn interpret(
	response: TransportResponse,
	system: &SystemConfig,
	auto_refresh: bool,
) -> Result<Interpretation> {
	let TransportResponse { status, headers, body } = response;
	let early = Envelope::decode(&body).ok();

	let early = match early {
		Some(envelope) if envelope.status == TOKEN_EXPIRED_CODE && auto_refresh =>
			return Ok(Interpretation::RefreshRequired(envelope.into_business_error())),
		Some(envelope) if envelope.status == NOT_AUTHENTICATED_CODE =>
			return Ok(Interpretation::LoggedOut(envelope.into_business_error())),
		early => early,
	};

	if status != HTTP_OK {
		let message = early
			.and_then(|envelope| envelope.error)
			.or_else(|| body.get("error").and_then(serde_json::Value::as_str).map(str::to_owned))
			.unwrap_or_default();

		return Err(Error::Http { status, message });
	}

	let body = open_sealed(body, &headers, system);
	let envelope = Envelope::decode(&body).map_err(|source| Error::Decode { source })?;

	if envelope.status == SUCCESS_CODE {
		Ok(Interpretation::Payload(envelope.data))
	} else {
		Err(envelope.into_business_error().into())
	}
}

/// Opens a body flagged with `X-Encrypted: true`. Any failure keeps the raw body.
pub fn open_sealed(
	body: serde_json::Value,
	headers: &Headers,
	system: &SystemConfig,
) -> serde_json::Value {
	let flagged = headers.get(ENCRYPTED_HEADER).is_some_and(|value| value.eq_ignore_ascii_case("true"));

	if !flagged {
		return body;
	}

	let Some(sealed) = body.get(ENCRYPTED_FIELD).and_then(serde_json::Value::as_str) else {
		return body;
	};
	let kind = headers
		.get(ENCRYPT_TYPE_HEADER)
		.and_then(|label| label.parse::<EncryptionType>().ok())
		.unwrap_or(system.encryption_type);
	let opened = match system.cipher_for(kind).and_then(|cipher| cipher.open(sealed)) {
		Ok(text) => text,
		Err(e) => {
			obs::warn_degraded(FlowKind::Request, "Failed to open sealed response body.", &e);

			return body;
		},
	};

	match serde_json::from_str(&opened) {
		Ok(value) => value,
		Err(e) => {
			obs::warn_degraded(FlowKind::Request, "Opened response body is not JSON.", &e);

			body
		},
	}
}
