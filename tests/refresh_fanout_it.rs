// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use serde_json::json;
// self
use session_request::{
	auth::Credential,
	client::RequestClient,
	config::ClientConfig,
	error::Error,
	http::{RequestTransport, TransportFuture, TransportRequest, TransportResponse},
	session::{LogoutReason, RecordingHooks},
	store::{MemoryStore, StoreFuture, StoreKey, TokenStore},
};

/// Answers every business call with an expiry and delays the refresh call so that every caller
/// registers before it settles.
struct ExpiringBackend {
	refresh_status: i64,
	refresh_calls: AtomicUsize,
	business_calls: AtomicUsize,
}
impl ExpiringBackend {
	fn new(refresh_status: i64) -> Self {
		Self { refresh_status, refresh_calls: AtomicUsize::new(0), business_calls: AtomicUsize::new(0) }
	}
}
impl RequestTransport for ExpiringBackend {
	fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			if request.url.ends_with("/refreshToken") {
				self.refresh_calls.fetch_add(1, Ordering::SeqCst);
				tokio::time::sleep(Duration::from_millis(50)).await;

				let body = if self.refresh_status == 200 {
					json!({ "status": 200, "data": { "accessToken": "fresh", "refreshToken": "r1" } })
				} else {
					json!({ "status": self.refresh_status, "error": "Refresh token revoked." })
				};

				return Ok(TransportResponse::new(200, body));
			}

			self.business_calls.fetch_add(1, Ordering::SeqCst);

			let authorization = request.headers.get("authorization").unwrap_or_default();
			let body = if authorization == "Bearer fresh" {
				json!({ "status": 200, "data": { "ok": true } })
			} else {
				json!({ "status": 403, "error": "Token expired." })
			};

			Ok(TransportResponse::new(200, body))
		})
	}
}

/// Memory store that counts `clear` calls.
#[derive(Default)]
struct CountingStore {
	inner: MemoryStore,
	clears: AtomicUsize,
}
impl TokenStore for CountingStore {
	fn get(&self, key: StoreKey) -> StoreFuture<'_, Option<serde_json::Value>> {
		self.inner.get(key)
	}

	fn set(&self, key: StoreKey, value: serde_json::Value) -> StoreFuture<'_, ()> {
		self.inner.set(key, value)
	}

	fn remove(&self, key: StoreKey) -> StoreFuture<'_, ()> {
		self.inner.remove(key)
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		self.clears.fetch_add(1, Ordering::SeqCst);

		self.inner.clear()
	}
}

async fn setup(
	refresh_status: i64,
) -> (RequestClient<ExpiringBackend>, Arc<ExpiringBackend>, Arc<CountingStore>, RecordingHooks) {
	let backend = Arc::new(ExpiringBackend::new(refresh_status));
	let store = Arc::new(CountingStore::default());
	let hooks = RecordingHooks::default();
	let config = ClientConfig::builder()
		.base_url("http://backend.test")
		.build()
		.expect("Test config should validate.");

	Credential::new("stale", Some("r0".into()))
		.persist(store.as_ref())
		.await
		.expect("Seeding the token store should succeed.");

	let client = RequestClient::with_transport(config, store.clone(), backend.clone())
		.with_hooks(Arc::new(hooks.clone()));

	(client, backend, store, hooks)
}

#[tokio::test]
async fn successful_refresh_resolves_every_waiter() {
	let (client, backend, store, hooks) = setup(200).await;
	let calls = (0..5).map(|_| client.get("/api/user/getUserInfo", serde_json::Value::Null));
	let results = futures::future::join_all(calls).await;

	for result in results {
		assert_eq!(result.expect("Every call should succeed after the refresh."), json!({ "ok": true }));
	}

	assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
	assert_eq!(backend.business_calls.load(Ordering::SeqCst), 10);
	assert_eq!(client.refresh_metrics().waiters(), 4);
	assert_eq!(store.clears.load(Ordering::SeqCst), 0);
	assert!(hooks.logouts().is_empty());
	assert!(!client.refresh_coordinator().is_in_flight());
}

#[tokio::test]
async fn failed_refresh_rejects_every_waiter_and_clears_once() {
	let (client, backend, store, hooks) = setup(500).await;
	let calls = (0..5).map(|_| client.get("/api/user/getUserInfo", serde_json::Value::Null));
	let results = futures::future::join_all(calls).await;

	for result in results {
		let err = result.expect_err("Every call should reject when the refresh fails.");

		assert!(
			matches!(err, Error::RefreshFailed { ref reason } if reason.contains("revoked")),
			"Unexpected error: {err:?}."
		);
	}

	assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
	assert_eq!(backend.business_calls.load(Ordering::SeqCst), 5);
	assert_eq!(store.clears.load(Ordering::SeqCst), 1);
	assert_eq!(client.refresh_metrics().failures(), 1);

	let logouts = hooks.logouts();

	assert_eq!(logouts.len(), 1);
	assert_eq!(logouts[0].reason, LogoutReason::RefreshFailed);
	assert!(store.inner.is_empty());
}
