//! Transport primitives for the request pipeline.
//!
//! The module exposes [`RequestTransport`], the pipeline's only dependency on an HTTP stack,
//! alongside the transport-neutral [`TransportRequest`] and [`TransportResponse`] shapes.
//! Implementations send exactly one request per call and never retry; a failure to obtain any
//! response is reported as a [`TransportError`], while every response (whatever its status) is
//! returned for interpretation.

// std
use std::time::Duration as StdDuration;
// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`RequestTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + 'a + Send>>;

/// Single-request send/receive primitive supplied by the host environment.
pub trait RequestTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends one request and resolves with whatever response the server produced.
	fn send(&self, request: TransportRequest) -> TransportFuture<'_>;
}

/// HTTP methods supported by the pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	#[default]
	/// `GET`; data travels in the query string.
	Get,
	/// `POST`.
	Post,
	/// `PUT`.
	Put,
	/// `DELETE`.
	Delete,
}
impl Method {
	/// Returns the canonical method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Case-insensitive header map; names are stored lowercase.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers(BTreeMap<String, String>);
impl Headers {
	/// Inserts or replaces a header.
	pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
		self.0.insert(name.into().to_ascii_lowercase(), value.into());
	}

	/// Builder-style [`insert`](Self::insert).
	pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.insert(name, value);

		self
	}

	/// Returns the header value, matching the name case-insensitively.
	pub fn get(&self, name: &str) -> Option<&str> {
		self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
	}

	/// Removes a header, returning its previous value.
	pub fn remove(&mut self, name: &str) -> Option<String> {
		self.0.remove(&name.to_ascii_lowercase())
	}

	/// Overlays `other` on top of `self`.
	pub fn merge(&mut self, other: &Headers) {
		for (name, value) in other.iter() {
			self.0.insert(name.to_owned(), value.to_owned());
		}
	}

	/// Iterates over `(name, value)` pairs in name order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	/// Returns `true` when no headers are set.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl<K, V> FromIterator<(K, V)> for Headers
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		let mut headers = Headers::default();

		for (name, value) in iter {
			headers.insert(name, value);
		}

		headers
	}
}

/// Encoded request body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestBody {
	/// JSON document, sent with the request's content type.
	Json(serde_json::Value),
	/// Pre-encoded `application/x-www-form-urlencoded` text.
	Form(String),
}

/// Fully prepared request handed to the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute URL including any query string.
	pub url: String,
	/// Outgoing headers.
	pub headers: Headers,
	/// Optional body.
	pub body: Option<RequestBody>,
	/// Per-request timeout.
	pub timeout: StdDuration,
}

/// Response returned by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
	/// Transport-level status code.
	pub status: u16,
	/// Response headers.
	pub headers: Headers,
	/// Decoded JSON body; non-JSON bodies are carried as a JSON string.
	pub body: serde_json::Value,
}
impl TransportResponse {
	/// Builds a response with no headers.
	pub fn new(status: u16, body: serde_json::Value) -> Self {
		Self { status, headers: Headers::default(), body }
	}

	/// Adds a header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Decodes raw body bytes, keeping non-JSON payloads as strings.
	pub fn decode_body(bytes: &[u8]) -> serde_json::Value {
		if bytes.is_empty() {
			return serde_json::Value::Null;
		}

		serde_json::from_slice(bytes)
			.unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned()))
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl RequestTransport for ReqwestTransport {
	fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let TransportRequest { method, url, headers, body, timeout } = request;
			let method = match method {
				Method::Get => reqwest::Method::GET,
				Method::Post => reqwest::Method::POST,
				Method::Put => reqwest::Method::PUT,
				Method::Delete => reqwest::Method::DELETE,
			};
			let mut builder = client.request(method, &url).timeout(timeout);

			for (name, value) in headers.iter() {
				builder = builder.header(name, value);
			}

			builder = match body {
				Some(RequestBody::Json(value)) => builder.body(value.to_string()),
				Some(RequestBody::Form(text)) => builder.body(text),
				None => builder,
			};

			let map_err = |e: ReqwestError| {
				if e.is_timeout() {
					TransportError::Timeout { url: url.clone() }
				} else {
					TransportError::network(url.clone(), e)
				}
			};
			let response = builder.send().await.map_err(map_err)?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v.to_owned())))
				.collect::<Headers>();
			let bytes = response.bytes().await.map_err(map_err)?;

			Ok(TransportResponse { status, headers, body: TransportResponse::decode_body(&bytes) })
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn headers_are_case_insensitive() {
		let mut headers = Headers::default().with("Content-Type", "application/json");

		assert_eq!(headers.get("content-type"), Some("application/json"));
		assert_eq!(headers.remove("CONTENT-TYPE").as_deref(), Some("application/json"));
		assert!(headers.is_empty());
	}

	#[test]
	fn merge_overlays_values() {
		let mut base = Headers::default().with("a", "1").with("b", "2");

		base.merge(&Headers::default().with("B", "3"));

		assert_eq!(base.get("a"), Some("1"));
		assert_eq!(base.get("b"), Some("3"));
	}

	#[test]
	fn decode_body_keeps_non_json_as_text() {
		assert_eq!(TransportResponse::decode_body(b""), serde_json::Value::Null);
		assert_eq!(TransportResponse::decode_body(b"{\"a\":1}"), serde_json::json!({ "a": 1 }));
		assert_eq!(
			TransportResponse::decode_body(b"<html>"),
			serde_json::Value::String("<html>".into())
		);
	}

	#[test]
	fn method_serializes_uppercase() {
		assert_eq!(serde_json::to_string(&Method::Delete).expect("Method should serialize."), "\"DELETE\"");
		assert_eq!(Method::default(), Method::Get);
	}
}
