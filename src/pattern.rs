//! Glob-style URL path patterns used to bypass auth-header injection and body encryption.
//!
//! `**` matches any number of path segments, `*` matches within a single segment, and every
//! other character is literal. Matching is anchored at both ends.

// crates.io
use regex::Regex;
// self
use crate::{_prelude::*, error::ConfigError};

/// Compiled bypass pattern.
#[derive(Clone, Debug)]
pub struct UrlPattern {
	source: String,
	regex: Regex,
}
impl UrlPattern {
	/// Compiles a glob pattern.
	pub fn new(pattern: impl Into<String>) -> Result<Self, ConfigError> {
		let source = pattern.into();
		let mut translated = String::with_capacity(source.len() + 8);
		let mut rest = source.as_str();

		translated.push('^');

		while !rest.is_empty() {
			if let Some(tail) = rest.strip_prefix("**") {
				translated.push_str(".*");
				rest = tail;
			} else if let Some(tail) = rest.strip_prefix('*') {
				translated.push_str("[^/]*");
				rest = tail;
			} else {
				let end = rest.find('*').unwrap_or(rest.len());

				translated.push_str(&regex::escape(&rest[..end]));
				rest = &rest[end..];
			}
		}

		translated.push('$');

		let regex = Regex::new(&translated)
			.map_err(|source_err| ConfigError::InvalidPattern { pattern: source.clone(), source: source_err })?;

		Ok(Self { source, regex })
	}

	/// Returns the original glob text.
	pub fn as_str(&self) -> &str {
		&self.source
	}

	/// Checks a request path (already stripped of scheme, host, and base URL).
	pub fn matches(&self, path: &str) -> bool {
		self.regex.is_match(path)
	}
}
impl PartialEq for UrlPattern {
	fn eq(&self, other: &Self) -> bool {
		self.source == other.source
	}
}
impl Eq for UrlPattern {}
impl<'de> Deserialize<'de> for UrlPattern {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let raw = String::deserialize(deserializer)?;

		UrlPattern::new(raw).map_err(serde::de::Error::custom)
	}
}
impl Serialize for UrlPattern {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		serializer.serialize_str(&self.source)
	}
}

/// Ordered set of bypass patterns.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternSet(Vec<UrlPattern>);
impl PatternSet {
	/// Compiles every pattern, failing on the first invalid one.
	pub fn new<I, S>(patterns: I) -> Result<Self, ConfigError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		patterns.into_iter().map(UrlPattern::new).collect::<Result<Vec<_>, _>>().map(Self)
	}

	/// Returns `true` when no patterns are configured.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Checks whether the request URL's path matches any pattern.
	pub fn matches_url(&self, url: &str, base_url: &str) -> bool {
		if self.0.is_empty() {
			return false;
		}

		let path = request_path(url, base_url);

		self.0.iter().any(|pattern| pattern.matches(&path))
	}
}

/// Extracts the path a bypass pattern is matched against.
///
/// The base URL prefix is removed first; absolute URLs then lose their scheme, host, port, query,
/// and fragment. Relative paths gain a leading `/`.
pub fn request_path(url: &str, base_url: &str) -> String {
	let stripped = match url.strip_prefix(base_url) {
		Some(rest) if !base_url.is_empty() => rest,
		_ => url,
	};

	if is_absolute(stripped) {
		return match Url::parse(stripped) {
			Ok(parsed) => parsed.path().to_owned(),
			Err(_) => stripped.to_owned(),
		};
	}

	let path = stripped.split(['?', '#']).next().unwrap_or_default();

	if path.starts_with('/') { path.to_owned() } else { format!("/{path}") }
}

/// Returns `true` for `http://` and `https://` URLs.
pub fn is_absolute(url: &str) -> bool {
	let lower = url.get(..8).map(str::to_ascii_lowercase).unwrap_or_else(|| url.to_ascii_lowercase());

	lower.starts_with("http://") || lower.starts_with("https://")
}
