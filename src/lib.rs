//! Authenticated request pipeline for envelope-style backends: single-flight token refresh,
//! bypass patterns, body obfuscation hooks, and pluggable token stores.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cipher;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod pattern;
pub mod refresh;
pub mod session;
pub mod store;
#[cfg(feature = "reqwest")]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests.

	pub use crate::_prelude::*;

	// self
	use crate::{
		client::ReqwestRequestClient,
		config::ClientConfig,
		http::ReqwestTransport,
		session::RecordingHooks,
		store::{MemoryStore, TokenStore},
	};

	/// Builds a reqwest transport that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_transport() -> ReqwestTransport {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestTransport::with_client(client)
	}

	/// Constructs a [`ReqwestRequestClient`] against `base_url`, backed by an in-memory store and
	/// recording hooks.
	pub fn build_reqwest_test_client(
		base_url: &str,
	) -> (ReqwestRequestClient, Arc<MemoryStore>, RecordingHooks) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn TokenStore> = store_backend.clone();
		let hooks = RecordingHooks::default();
		let config = ClientConfig::builder()
			.base_url(base_url)
			.build()
			.expect("Mock server base URL should validate.");
		let client = ReqwestRequestClient::with_transport(config, store, test_reqwest_transport())
			.with_hooks(Arc::new(hooks.clone()));

		(client, store_backend, hooks)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tempfile as _, tokio as _};
