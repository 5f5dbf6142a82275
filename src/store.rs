//! Storage contracts and built-in token store implementations.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Boxed future returned by [`TokenStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persisted key-value store holding the session credential.
///
/// The request pipeline reads the access token before every request and writes through this
/// interface after sign-in or refresh; it never keeps a private copy between calls.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Reads the value stored under `key`, if any.
	fn get(&self, key: StoreKey) -> StoreFuture<'_, Option<serde_json::Value>>;

	/// Stores or replaces the value under `key`.
	fn set(&self, key: StoreKey, value: serde_json::Value) -> StoreFuture<'_, ()>;

	/// Removes the value under `key`; missing keys are not an error.
	fn remove(&self, key: StoreKey) -> StoreFuture<'_, ()>;

	/// Drops every stored value.
	fn clear(&self) -> StoreFuture<'_, ()>;
}
impl<'a> dyn TokenStore + 'a {
	/// Reads a non-empty string value as a [`TokenSecret`].
	pub async fn secret(&self, key: StoreKey) -> Result<Option<TokenSecret>, StoreError> {
		let value = self.get(key).await?;

		Ok(value.as_ref().and_then(serde_json::Value::as_str).filter(|s| !s.is_empty()).map(TokenSecret::new))
	}
}

/// Keys recognized by the token store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StoreKey {
	/// Current access token.
	#[serde(rename = "accessToken")]
	AccessToken,
	/// Current refresh token.
	#[serde(rename = "refreshToken")]
	RefreshToken,
	/// User profile blob.
	#[serde(rename = "userInfo")]
	UserInfo,
}
impl StoreKey {
	/// Returns the persisted key string.
	pub const fn as_str(self) -> &'static str {
		match self {
			StoreKey::AccessToken => "accessToken",
			StoreKey::RefreshToken => "refreshToken",
			StoreKey::UserInfo => "userInfo",
		}
	}
}
impl Display for StoreKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
