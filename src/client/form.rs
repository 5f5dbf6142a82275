//! `application/x-www-form-urlencoded` bodies and `GET` query strings.

// crates.io
use url::form_urlencoded;
// self
use crate::{_prelude::*, error::ConfigError};

/// Encodes a JSON object as a form body.
///
/// `null` members are skipped, arrays become comma-joined lists of encoded items, and nested
/// objects are sent as encoded JSON text.
pub fn encode(data: &serde_json::Value) -> Result<String, ConfigError> {
	let serde_json::Value::Object(map) = data else {
		return Err(ConfigError::FormBodyNotObject);
	};
	let pairs = map.iter().filter(|(_, value)| !value.is_null()).map(|(key, value)| {
		let encoded = match value {
			serde_json::Value::Array(items) =>
				items.iter().map(|item| escape(&scalar_text(item))).collect::<Vec<_>>().join(","),
			other => escape(&scalar_text(other)),
		};

		format!("{}={encoded}", escape(key))
	});

	Ok(pairs.collect::<Vec<_>>().join("&"))
}

/// Appends the members of a JSON object to the URL's query string.
///
/// Relative URLs are accepted as given; their existing query and fragment are kept.
pub fn append_query(url: &str, data: &serde_json::Value) -> Result<String, ConfigError> {
	let serde_json::Value::Object(map) = data else {
		return Ok(url.to_owned());
	};

	if map.values().all(serde_json::Value::is_null) {
		return Ok(url.to_owned());
	}

	let pairs = map
		.iter()
		.filter(|(_, value)| !value.is_null())
		.map(|(key, value)| (key.as_str(), query_text(value)));

	match Url::parse(url) {
		Ok(mut parsed) => {
			parsed.query_pairs_mut().extend_pairs(pairs);

			Ok(parsed.into())
		},
		Err(url::ParseError::RelativeUrlWithoutBase) => Ok(append_relative(url, pairs)),
		Err(source) => Err(ConfigError::InvalidRequestUrl { url: url.to_owned(), source }),
	}
}

fn append_relative<'a>(url: &str, pairs: impl Iterator<Item = (&'a str, String)>) -> String {
	let (head, fragment) = match url.split_once('#') {
		Some((head, fragment)) => (head, Some(fragment)),
		None => (url, None),
	};
	let (path, query) = head.split_once('?').unwrap_or((head, ""));
	let query = form_urlencoded::Serializer::new(query.to_owned()).extend_pairs(pairs).finish();
	let mut joined = format!("{path}?{query}");

	if let Some(fragment) = fragment {
		joined.push('#');
		joined.push_str(fragment);
	}

	joined
}

fn query_text(value: &serde_json::Value) -> String {
	match value {
		serde_json::Value::Array(items) => items.iter().map(scalar_text).collect::<Vec<_>>().join(","),
		other => scalar_text(other),
	}
}

fn scalar_text(value: &serde_json::Value) -> String {
	match value {
		serde_json::Value::String(text) => text.clone(),
		serde_json::Value::Null => String::new(),
		other => other.to_string(),
	}
}

fn escape(text: &str) -> String {
	form_urlencoded::byte_serialize(text.as_bytes()).collect()
}
