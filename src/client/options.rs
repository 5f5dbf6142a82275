//! Per-call request description.

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	http::{Headers, Method},
};

/// Everything a caller specifies for one request; merged over the client defaults at send time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestOptions {
	/// HTTP method.
	pub method: Method,
	/// Relative or absolute URL.
	pub url: String,
	/// Query parameters for `GET`, body for other methods.
	pub data: Option<serde_json::Value>,
	/// Headers overlaid on the client defaults.
	pub headers: Headers,
	/// Show the loading indicator while the request runs.
	pub show_loading: bool,
	/// Loading indicator text; falls back to the client default.
	pub loading_text: Option<String>,
	/// `Some(false)` opts this call out of body sealing.
	pub encrypt: Option<bool>,
	/// Content type override.
	pub content_type: Option<String>,
	/// Timeout override.
	pub timeout: Option<StdDuration>,
}
impl RequestOptions {
	/// Creates options for `method` and `url`.
	pub fn new(method: Method, url: impl Into<String>) -> Self {
		Self { method, url: url.into(), ..Default::default() }
	}

	/// `GET` shortcut.
	pub fn get(url: impl Into<String>) -> Self {
		Self::new(Method::Get, url)
	}

	/// `POST` shortcut.
	pub fn post(url: impl Into<String>) -> Self {
		Self::new(Method::Post, url)
	}

	/// `PUT` shortcut.
	pub fn put(url: impl Into<String>) -> Self {
		Self::new(Method::Put, url)
	}

	/// `DELETE` shortcut.
	pub fn delete(url: impl Into<String>) -> Self {
		Self::new(Method::Delete, url)
	}

	/// Sets the request data.
	pub fn with_data(mut self, data: serde_json::Value) -> Self {
		self.data = Some(data);

		self
	}

	/// Adds a header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Shows the loading indicator, optionally with custom text.
	pub fn with_loading(mut self, text: Option<String>) -> Self {
		self.show_loading = true;
		self.loading_text = text;

		self
	}

	/// Opts in or out of body sealing for this call.
	pub fn with_encryption(mut self, enabled: bool) -> Self {
		self.encrypt = Some(enabled);

		self
	}

	/// Overrides the content type.
	pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
		self.content_type = Some(content_type.into());

		self
	}

	/// Overrides the timeout.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Returns the data unless it is absent or JSON `null`.
	pub(crate) fn payload(&self) -> Option<&serde_json::Value> {
		self.data.as_ref().filter(|data| !data.is_null())
	}
}
