//! Request client facade and its pipeline stages.
//!
//! [`RequestClient`] owns the transport, the token store, the host hooks, the static
//! [`ClientConfig`], the hot-swappable [`SystemConfig`], and one [`RefreshCoordinator`]. Clones
//! share all of them, so every clone collapses expired-token refreshes into the same single flight.

pub mod form;
pub mod interpret;
pub mod options;

mod pipeline;

pub use interpret::{Envelope, Interpretation};
pub use options::RequestOptions;

// self
use crate::{
	_prelude::*,
	config::{ClientConfig, SystemConfig},
	http::RequestTransport,
	refresh::{RefreshCoordinator, RefreshMetrics},
	session::{NoopHooks, SessionHooks},
	store::TokenStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestRequestClient = RequestClient<ReqwestTransport>;

/// Authenticated request pipeline bound to one backend.
#[derive(Clone)]
pub struct RequestClient<T>
where
	T: ?Sized + RequestTransport,
{
	/// Transport used for every outbound request, including refresh calls.
	pub transport: Arc<T>,
	/// Token store holding the session credential.
	pub store: Arc<dyn TokenStore>,
	/// Host callbacks for notifications, logout routing, and the loading indicator.
	pub hooks: Arc<dyn SessionHooks>,
	/// Static client defaults.
	pub config: ClientConfig,
	system: Arc<RwLock<Arc<SystemConfig>>>,
	refresh: Arc<RefreshCoordinator>,
}
impl<T> RequestClient<T>
where
	T: ?Sized + RequestTransport,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_transport(
		config: ClientConfig,
		store: Arc<dyn TokenStore>,
		transport: impl Into<Arc<T>>,
	) -> Self {
		Self {
			transport: transport.into(),
			store,
			hooks: Arc::new(NoopHooks),
			config,
			system: Default::default(),
			refresh: Default::default(),
		}
	}

	/// Replaces the host hooks.
	pub fn with_hooks(mut self, hooks: Arc<dyn SessionHooks>) -> Self {
		self.hooks = hooks;

		self
	}

	/// Installs an initial system configuration.
	pub fn with_system_config(self, system: SystemConfig) -> Self {
		self.set_system_config(system);

		self
	}

	/// Swaps the active system configuration.
	///
	/// Requests already past preparation keep the snapshot they started with.
	pub fn set_system_config(&self, system: SystemConfig) {
		*self.system.write() = Arc::new(system);
	}

	/// Returns a snapshot of the active system configuration.
	pub fn system_config(&self) -> Arc<SystemConfig> {
		self.system.read().clone()
	}

	/// Single-flight coordinator shared by every clone of this client.
	pub fn refresh_coordinator(&self) -> &RefreshCoordinator {
		&self.refresh
	}

	/// Refresh counters.
	pub fn refresh_metrics(&self) -> &RefreshMetrics {
		self.refresh.metrics()
	}
}
#[cfg(feature = "reqwest")]
impl RequestClient<ReqwestTransport> {
	/// Creates a client backed by a reqwest transport honoring the configured timeout.
	pub fn new(config: ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
		let client = ReqwestClient::builder()
			.timeout(config.timeout)
			.build()
			.map_err(crate::error::ConfigError::from)?;

		Ok(Self::with_transport(config, store, ReqwestTransport::with_client(client)))
	}
}
impl<T> Debug for RequestClient<T>
where
	T: ?Sized + RequestTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestClient")
			.field("config", &self.config)
			.field("system", &self.system_config())
			.field("refresh_in_flight", &self.refresh.is_in_flight())
			.finish()
	}
}
