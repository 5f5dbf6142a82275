//! Process-wide client defaults and the server-driven system configuration.
//!
//! [`ClientConfig`] is assembled once through [`ClientConfigBuilder`] and never changes for the
//! lifetime of a client. [`SystemConfig`] is fetched from the backend at runtime, validated on
//! load, and may be swapped while requests are in flight.

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	cipher::{BodyCipher, CipherError, EncryptionType},
	error::ConfigError,
	http::Headers,
	pattern::{PatternSet, is_absolute},
};

/// Content type used when none is configured.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
/// JSON content type.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Static client defaults merged beneath every request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// Prefix prepended to relative request URLs. Empty means "use URLs as given".
	pub base_url: String,
	/// Per-request timeout.
	pub timeout: StdDuration,
	/// Headers merged beneath per-call headers.
	pub headers: Headers,
	/// Refresh the session transparently when the server reports an expired token.
	pub auto_refresh: bool,
	/// Refresh endpoint, relative to the base URL unless absolute.
	pub refresh_path: String,
	/// Login entry point handed to the logout hook.
	pub login_page: String,
	/// Default loading indicator text.
	pub loading_text: String,
	/// Delay after which the logout hook should force navigation if the user does not acknowledge.
	pub logout_redirect_delay: StdDuration,
}
impl ClientConfig {
	/// Creates a builder seeded with the defaults.
	pub fn builder() -> ClientConfigBuilder {
		ClientConfigBuilder::default()
	}

	/// Resolves a request URL against the base URL; absolute URLs are returned unchanged.
	pub fn resolve_url(&self, url: &str) -> String {
		if is_absolute(url) || self.base_url.is_empty() {
			return url.to_owned();
		}
		if url.starts_with('/') {
			format!("{}{url}", self.base_url)
		} else {
			format!("{}/{url}", self.base_url)
		}
	}

	/// Returns the absolute refresh endpoint.
	pub fn refresh_url(&self) -> String {
		self.resolve_url(&self.refresh_path)
	}
}
impl Default for ClientConfig {
	fn default() -> Self {
		ClientConfigBuilder::default().assemble()
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	base_url: String,
	timeout: StdDuration,
	headers: Headers,
	auto_refresh: bool,
	refresh_path: String,
	login_page: String,
	loading_text: String,
	logout_redirect_delay: StdDuration,
}
impl ClientConfigBuilder {
	const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(30);
	const DEFAULT_LOGOUT_DELAY: StdDuration = StdDuration::from_secs(5);

	/// Sets the base URL. A trailing `/` is dropped.
	pub fn base_url(mut self, url: impl Into<String>) -> Self {
		let url = url.into();

		self.base_url = url.trim_end_matches('/').to_owned();

		self
	}

	/// Overrides the request timeout (defaults to 30 seconds).
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Adds or replaces a default header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Overrides the default content type.
	pub fn content_type(self, value: impl Into<String>) -> Self {
		self.header("content-type", value)
	}

	/// Toggles transparent refresh on token expiry (enabled by default).
	pub fn auto_refresh(mut self, enabled: bool) -> Self {
		self.auto_refresh = enabled;

		self
	}

	/// Overrides the refresh endpoint.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the login entry point.
	pub fn login_page(mut self, page: impl Into<String>) -> Self {
		self.login_page = page.into();

		self
	}

	/// Overrides the default loading indicator text.
	pub fn loading_text(mut self, text: impl Into<String>) -> Self {
		self.loading_text = text.into();

		self
	}

	/// Overrides the forced-navigation delay handed to the logout hook.
	pub fn logout_redirect_delay(mut self, delay: StdDuration) -> Self {
		self.logout_redirect_delay = delay;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		if !self.base_url.is_empty() {
			let valid = Url::parse(&self.base_url)
				.map(|url| matches!(url.scheme(), "http" | "https"))
				.unwrap_or(false);

			if !valid {
				return Err(ConfigError::InvalidBaseUrl { url: self.base_url });
			}
		}
		if self.timeout.is_zero() {
			return Err(ConfigError::NonPositiveTimeout);
		}

		Ok(self.assemble())
	}

	fn assemble(self) -> ClientConfig {
		ClientConfig {
			base_url: self.base_url,
			timeout: self.timeout,
			headers: self.headers,
			auto_refresh: self.auto_refresh,
			refresh_path: self.refresh_path,
			login_page: self.login_page,
			loading_text: self.loading_text,
			logout_redirect_delay: self.logout_redirect_delay,
		}
	}
}
impl Default for ClientConfigBuilder {
	fn default() -> Self {
		let mut headers = Headers::default();

		headers.insert("content-type", FORM_CONTENT_TYPE);

		Self {
			base_url: String::new(),
			timeout: Self::DEFAULT_TIMEOUT,
			headers,
			auto_refresh: true,
			refresh_path: "/api/base/refreshToken".into(),
			login_page: "/pages/index/index?openDrawer=true".into(),
			loading_text: "Loading...".into(),
			logout_redirect_delay: Self::DEFAULT_LOGOUT_DELAY,
		}
	}
}

/// Authorization header layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtInfo {
	/// Header name carrying the token.
	pub header: String,
	/// Scheme prefix placed before the token.
	pub prefix: String,
}
impl Default for JwtInfo {
	fn default() -> Self {
		Self { header: "Authorization".into(), prefix: "Bearer".into() }
	}
}

/// Validated server-driven configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemConfig {
	/// Authorization header layout.
	pub jwt: JwtInfo,
	/// Whether request bodies are sealed.
	pub encryption_enabled: bool,
	/// Scheme used for sealing request bodies.
	pub encryption_type: EncryptionType,
	/// Public key for the `rsa` placeholder.
	pub rsa_public_key: Option<String>,
	/// Public key for the `sm2` placeholder.
	pub sm2_public_key: Option<String>,
	/// Shared key for the `simple` and `aes` placeholders.
	pub encrypt_key: String,
	/// Paths that never receive the authorization header.
	pub security_ignore_urls: PatternSet,
	/// Paths whose bodies are never sealed.
	pub encryption_ignore_urls: PatternSet,
}
impl SystemConfig {
	/// Key used when the server configures none.
	pub const DEFAULT_ENCRYPT_KEY: &'static str = "default_key";

	/// Parses and validates a JSON document.
	pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_str(raw);
		let parsed: RawSystemConfig = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| ConfigError::SystemConfigParse { source })?;

		parsed.validate()
	}

	/// Parses and validates an already-decoded JSON value.
	pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
		let parsed: RawSystemConfig = serde_path_to_error::deserialize(value)
			.map_err(|source| ConfigError::SystemConfigParse { source })?;

		parsed.validate()
	}

	/// Returns the cipher used to seal request bodies, or `None` when encryption is disabled.
	pub fn request_cipher(&self) -> Result<Option<BodyCipher>, CipherError> {
		if !self.encryption_enabled {
			return Ok(None);
		}

		self.cipher_for(self.encryption_type).map(Some)
	}

	/// Builds the cipher for an explicit scheme using the configured key material.
	pub fn cipher_for(&self, kind: EncryptionType) -> Result<BodyCipher, CipherError> {
		let missing = |scheme: EncryptionType| CipherError::MissingKey { scheme };

		match kind {
			EncryptionType::Simple => Ok(BodyCipher::Simple { key: self.encrypt_key.clone() }),
			EncryptionType::Aes => Ok(BodyCipher::Aes { key: self.encrypt_key.clone() }),
			EncryptionType::Rsa => self
				.rsa_public_key
				.clone()
				.map(|public_key| BodyCipher::Rsa { public_key })
				.ok_or_else(|| missing(kind)),
			EncryptionType::Sm2 => self
				.sm2_public_key
				.clone()
				.map(|public_key| BodyCipher::Sm2 { public_key })
				.ok_or_else(|| missing(kind)),
		}
	}
}
impl Default for SystemConfig {
	fn default() -> Self {
		Self {
			jwt: JwtInfo::default(),
			encryption_enabled: false,
			encryption_type: EncryptionType::Simple,
			rsa_public_key: None,
			sm2_public_key: None,
			encrypt_key: Self::DEFAULT_ENCRYPT_KEY.into(),
			security_ignore_urls: PatternSet::default(),
			encryption_ignore_urls: PatternSet::default(),
		}
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawJwtInfo {
	header: Option<String>,
	prefix: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSystemConfig {
	jwt_info: Option<RawJwtInfo>,
	enable_encryption: Option<bool>,
	encryption_type: Option<EncryptionType>,
	rsa_public_key: Option<String>,
	sm2_public_key: Option<String>,
	encrypt_key: Option<String>,
	security_ignore_urls: Option<PatternSet>,
	encryption_ignore_urls: Option<PatternSet>,
}
impl RawSystemConfig {
	fn validate(self) -> Result<SystemConfig, ConfigError> {
		let non_empty = |value: Option<String>| value.filter(|s| !s.trim().is_empty());
		let jwt_raw = self.jwt_info.unwrap_or_default();
		let jwt_default = JwtInfo::default();
		let jwt = JwtInfo {
			header: non_empty(jwt_raw.header).unwrap_or(jwt_default.header),
			prefix: non_empty(jwt_raw.prefix).unwrap_or(jwt_default.prefix),
		};
		// An explicit flag wins; otherwise naming a scheme turns encryption on.
		let encryption_enabled =
			self.enable_encryption.unwrap_or(self.encryption_type.is_some());
		let encryption_type = self.encryption_type.unwrap_or(EncryptionType::Simple);
		let rsa_public_key = non_empty(self.rsa_public_key);
		let sm2_public_key = non_empty(self.sm2_public_key);

		if encryption_enabled {
			match encryption_type {
				EncryptionType::Rsa if rsa_public_key.is_none() =>
					return Err(ConfigError::MissingPublicKey { scheme: "rsa", field: "rsaPublicKey" }),
				EncryptionType::Sm2 if sm2_public_key.is_none() =>
					return Err(ConfigError::MissingPublicKey { scheme: "sm2", field: "sm2PublicKey" }),
				_ => {},
			}
		}

		Ok(SystemConfig {
			jwt,
			encryption_enabled,
			encryption_type,
			rsa_public_key,
			sm2_public_key,
			encrypt_key: non_empty(self.encrypt_key)
				.unwrap_or_else(|| SystemConfig::DEFAULT_ENCRYPT_KEY.into()),
			security_ignore_urls: self.security_ignore_urls.unwrap_or_default(),
			encryption_ignore_urls: self.encryption_ignore_urls.unwrap_or_default(),
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn builder_defaults_match_the_mini_program_client() {
		let config = ClientConfig::builder().build().expect("Default config should validate.");

		assert_eq!(config.timeout, StdDuration::from_secs(30));
		assert_eq!(config.headers.get("Content-Type"), Some(FORM_CONTENT_TYPE));
		assert!(config.auto_refresh);
		assert_eq!(config.refresh_path, "/api/base/refreshToken");
		assert_eq!(config.logout_redirect_delay, StdDuration::from_secs(5));
	}

	#[test]
	fn builder_rejects_invalid_base_urls_and_zero_timeouts() {
		let err = ClientConfig::builder()
			.base_url("ftp://files.example.com")
			.build()
			.expect_err("Non-HTTP base URLs should be rejected.");

		assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));

		let err = ClientConfig::builder()
			.timeout(StdDuration::ZERO)
			.build()
			.expect_err("Zero timeouts should be rejected.");

		assert!(matches!(err, ConfigError::NonPositiveTimeout));
	}

	#[test]
	fn resolve_url_is_idempotent_for_absolute_urls() {
		let config = ClientConfig::builder()
			.base_url("http://127.0.0.1:8110/")
			.build()
			.expect("Base URL should validate.");
		let once = config.resolve_url("/api/user/getUserInfo");
		let twice = config.resolve_url(&once);

		assert_eq!(once, "http://127.0.0.1:8110/api/user/getUserInfo");
		assert_eq!(twice, once);
		assert_eq!(config.resolve_url("api/game/gameList"), "http://127.0.0.1:8110/api/game/gameList");
		assert_eq!(config.refresh_url(), "http://127.0.0.1:8110/api/base/refreshToken");
	}

	#[test]
	fn system_config_applies_explicit_defaults() {
		let config = SystemConfig::from_json("{}").expect("Empty config should validate.");

		assert_eq!(config, SystemConfig::default());
		assert!(config.request_cipher().expect("Disabled encryption should not fail.").is_none());
	}

	#[test]
	fn encryption_type_alone_enables_encryption() {
		let config = SystemConfig::from_json(r#"{"encryptionType":"AES","encryptKey":"k"}"#)
			.expect("AES config should validate.");

		assert!(config.encryption_enabled);
		assert_eq!(config.encryption_type, EncryptionType::Aes);
		assert_eq!(
			config.request_cipher().expect("AES cipher should build."),
			Some(BodyCipher::Aes { key: "k".into() })
		);
	}

	#[test]
	fn explicit_flag_overrides_scheme_presence() {
		let config = SystemConfig::from_json(r#"{"enableEncryption":false,"encryptionType":"simple"}"#)
			.expect("Config should validate.");

		assert!(!config.encryption_enabled);
	}

	#[test]
	fn rsa_without_public_key_is_rejected() {
		let err = SystemConfig::from_json(r#"{"encryptionType":"rsa"}"#)
			.expect_err("RSA without a public key should be rejected.");

		assert!(matches!(err, ConfigError::MissingPublicKey { scheme: "rsa", .. }));
	}

	#[test]
	fn parse_errors_report_the_offending_path() {
		let err = SystemConfig::from_json(r#"{"securityIgnoreUrls":[1]}"#)
			.expect_err("Non-string patterns should be rejected.");

		match err {
			ConfigError::SystemConfigParse { source } =>
				assert_eq!(source.path().to_string(), "securityIgnoreUrls[0]"),
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn jwt_info_falls_back_per_field() {
		let config = SystemConfig::from_json(r#"{"jwtInfo":{"header":"X-Token","prefix":""}}"#)
			.expect("Config should validate.");

		assert_eq!(config.jwt.header, "X-Token");
		assert_eq!(config.jwt.prefix, "Bearer");
	}
}
