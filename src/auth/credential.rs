//! Session credential model and its mapping onto the token store keys.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	store::{StoreError, StoreKey, TokenStore},
};

/// Access/refresh token pair plus the opaque user profile issued with them.
///
/// The token store owns the persisted copy; a [`Credential`] is a snapshot read from (or about to
/// be written to) the store and must not be cached across requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credential {
	/// Bearer token attached to authenticated requests.
	pub access_token: TokenSecret,
	/// Token exchanged at the refresh endpoint when the access token expires.
	pub refresh_token: Option<TokenSecret>,
	/// Opaque user profile blob.
	pub user: serde_json::Value,
}
impl Credential {
	/// Creates a credential without a user profile.
	pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			refresh_token: refresh_token.map(TokenSecret::new),
			user: serde_json::Value::Null,
		}
	}

	/// Attaches the user profile.
	pub fn with_user(mut self, user: serde_json::Value) -> Self {
		self.user = user;

		self
	}

	/// Reads the stored credential, returning `None` when no access token is stored.
	pub async fn load(store: &dyn TokenStore) -> Result<Option<Self>, StoreError> {
		let Some(access_token) = store.secret(StoreKey::AccessToken).await? else {
			return Ok(None);
		};
		let refresh_token = store.secret(StoreKey::RefreshToken).await?;
		let user = store.get(StoreKey::UserInfo).await?.unwrap_or_default();

		Ok(Some(Self { access_token, refresh_token, user }))
	}

	/// Writes every present member into the store.
	pub async fn persist(&self, store: &dyn TokenStore) -> Result<(), StoreError> {
		store.set(StoreKey::AccessToken, self.access_token.expose().into()).await?;

		if let Some(refresh) = &self.refresh_token {
			store.set(StoreKey::RefreshToken, refresh.expose().into()).await?;
		}
		if !self.user.is_null() {
			store.set(StoreKey::UserInfo, self.user.clone()).await?;
		}

		Ok(())
	}
}

/// Token payload returned by sign-in and refresh endpoints inside the envelope `data` member.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGrant {
	/// Newly issued access token.
	pub access_token: String,
	/// Rotated refresh token, when the server issues one.
	#[serde(default)]
	pub refresh_token: Option<String>,
	/// User profile returned alongside the tokens.
	#[serde(default)]
	pub user: serde_json::Value,
}
impl From<SessionGrant> for Credential {
	fn from(grant: SessionGrant) -> Self {
		Credential::new(grant.access_token, grant.refresh_token.filter(|token| !token.is_empty()))
			.with_user(grant.user)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::MemoryStore;

	fn block_on<F: Future>(fut: F) -> F::Output {
		futures::executor::block_on(fut)
	}

	#[test]
	fn load_returns_none_without_access_token() {
		let store = MemoryStore::default();
		let loaded = block_on(Credential::load(&store)).expect("Memory store reads should succeed.");

		assert!(loaded.is_none());
	}

	#[test]
	fn persist_then_load_restores_every_member() {
		let store = MemoryStore::default();
		let credential = Credential::new("access-1", Some("refresh-1".into()))
			.with_user(serde_json::json!({ "id": 7, "nickname": "kit" }));

		block_on(credential.persist(&store)).expect("Persisting a credential should succeed.");

		let loaded = block_on(Credential::load(&store))
			.expect("Memory store reads should succeed.")
			.expect("A persisted credential should load back.");

		assert_eq!(loaded, credential);
	}

	#[test]
	fn session_grant_accepts_missing_optional_members() {
		let grant: SessionGrant = serde_json::from_value(serde_json::json!({ "accessToken": "a" }))
			.expect("Grant without refresh token or user should deserialize.");
		let credential = Credential::from(grant);

		assert_eq!(credential.access_token.expose(), "a");
		assert!(credential.refresh_token.is_none());
		assert!(credential.user.is_null());
	}
}
