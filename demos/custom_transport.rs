//! Demonstrates plugging a host-supplied transport into [`RequestClient`].
//!
//! 1. Implement [`RequestTransport`] for whatever HTTP stack the host already owns.
//! 2. Pass it to [`RequestClient::with_transport`] with a token store and session hooks.
//! 3. Expired tokens are renewed through the same transport and the call is retried once.
//! 4. Transport failures surface as [`Error::Transport`] and raise a network notice.

// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
};
// crates.io
use color_eyre::Result;
use serde_json::json;
// self
use session_request::{
	client::RequestClient,
	config::ClientConfig,
	error::{Error, TransportError},
	http::{RequestTransport, TransportFuture, TransportRequest, TransportResponse},
	session::RecordingHooks,
	store::MemoryStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let transport = Arc::new(InProcessBackend::default());
	let hooks = RecordingHooks::default();
	let config = ClientConfig::builder().base_url("http://game.internal").build()?;
	let client = RequestClient::<InProcessBackend>::with_transport(
		config,
		Arc::new(MemoryStore::default()),
		Arc::clone(&transport),
	)
	.with_hooks(Arc::new(hooks.clone()));
	let credential = client.sign_in("/api/base/login", json!({ "code": "demo" })).await?;

	println!("Signed in with access token {}.", credential.access_token.expose());

	// The next call is answered with an expiry; the client renews and retries it.
	transport.expire_next.store(true, Ordering::SeqCst);

	let profile = client.get("/api/user/getUserInfo", serde_json::Value::Null).await?;

	println!(
		"Profile {profile} fetched after {} refresh call(s).",
		transport.refresh_calls.load(Ordering::SeqCst)
	);

	transport.offline.store(true, Ordering::SeqCst);

	match client.get("/api/game/gameList", json!({ "page": 1 })).await {
		Ok(_) => println!("Offline transport unexpectedly answered."),
		Err(Error::Transport(e)) => println!("Transport failure surfaced to the caller: {e}"),
		Err(e) => println!("Unexpected failure: {e}"),
	}

	for notice in hooks.notices() {
		println!("Notice shown to the user: {}", notice.message);
	}

	Ok(())
}

#[derive(Debug)]
struct LinkDown;
impl Display for LinkDown {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("link is down")
	}
}
impl StdError for LinkDown {}

/// Answers requests in process, standing in for a host HTTP stack.
#[derive(Default)]
struct InProcessBackend {
	expire_next: AtomicBool,
	offline: AtomicBool,
	refresh_calls: AtomicUsize,
}
impl RequestTransport for InProcessBackend {
	fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			if self.offline.load(Ordering::SeqCst) {
				return Err(TransportError::network(request.url, LinkDown));
			}

			let body = if request.url.ends_with("/api/base/login") {
				json!({ "status": 200, "data": { "accessToken": "a1", "refreshToken": "r1" } })
			} else if request.url.ends_with("/api/base/refreshToken") {
				self.refresh_calls.fetch_add(1, Ordering::SeqCst);

				json!({ "status": 200, "data": { "accessToken": "a2" } })
			} else if self.expire_next.swap(false, Ordering::SeqCst) {
				json!({ "status": 403, "error": "Token expired." })
			} else {
				json!({ "status": 200, "data": { "nickname": "kit" } })
			};

			Ok(TransportResponse::new(200, body))
		})
	}
}
