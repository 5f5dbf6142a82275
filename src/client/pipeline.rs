//! Request dispatch, single-flight refresh, and session lifecycle.
//!
//! [`RequestClient::send`] prepares a request from the caller's options, hands it to the
//! transport, and interprets the response. An expired access token suspends the call on
//! [`RequestClient::ensure_fresh_token`], which either joins the in-flight refresh or leads a new
//! one, and the call is then rebuilt with the fresh token and retried exactly once.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{Credential, SessionGrant, TokenSecret},
	cipher::{ENCRYPT_TYPE_HEADER, ENCRYPTED_FIELD, ENCRYPTED_HEADER},
	client::{
		RequestClient, form,
		interpret::{self, Envelope, HTTP_OK, Interpretation, NOT_AUTHENTICATED_CODE, SUCCESS_CODE},
		options::RequestOptions,
	},
	config::{FORM_CONTENT_TYPE, JSON_CONTENT_TYPE, SystemConfig},
	error::BusinessError,
	http::{Headers, Method, RequestBody, RequestTransport, TransportRequest},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	refresh::{RefreshFailure, RefreshOutcome, RefreshTicket},
	session::{LogoutNotice, LogoutReason, Notice, NoticeLevel},
	store::StoreKey,
};

const CONTENT_TYPE: &str = "content-type";

impl<T> RequestClient<T>
where
	T: ?Sized + RequestTransport,
{
	/// Sends one request through the full pipeline and returns the envelope's `data` member.
	pub async fn send(&self, options: RequestOptions) -> Result<serde_json::Value> {
		const KIND: FlowKind = FlowKind::Request;

		let span = FlowSpan::new(KIND, "send");
		let loading = options
			.show_loading
			.then(|| options.loading_text.clone().unwrap_or_else(|| self.config.loading_text.clone()));

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		if let Some(text) = &loading {
			self.hooks.loading(Some(text));
		}

		let result = span.instrument(self.dispatch(&options)).await;

		if loading.is_some() {
			self.hooks.loading(None);
		}

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(e) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);

				let logged_out =
					matches!(e, Error::Business(BusinessError { code: NOT_AUTHENTICATED_CODE, .. }));

				if let Some(message) = e.user_message().filter(|_| !logged_out) {
					self.hooks.notify(Notice { level: NoticeLevel::Error, message: message.to_owned() });
				}
			},
		}

		result
	}

	/// Like [`send`](Self::send) but decodes the payload into `R`.
	pub async fn send_as<R>(&self, options: RequestOptions) -> Result<R>
	where
		R: DeserializeOwned,
	{
		let data = self.send(options).await?;

		serde_path_to_error::deserialize(data).map_err(|source| Error::Decode { source })
	}

	/// `GET` with `params` appended to the query string.
	pub async fn get(&self, url: &str, params: serde_json::Value) -> Result<serde_json::Value> {
		self.send(RequestOptions::get(url).with_data(params)).await
	}

	/// `POST` with `data` as the body.
	pub async fn post(&self, url: &str, data: serde_json::Value) -> Result<serde_json::Value> {
		self.send(RequestOptions::post(url).with_data(data)).await
	}

	/// `PUT` with `data` as the body.
	pub async fn put(&self, url: &str, data: serde_json::Value) -> Result<serde_json::Value> {
		self.send(RequestOptions::put(url).with_data(data)).await
	}

	/// `DELETE` with `data` as the body.
	pub async fn delete(&self, url: &str, data: serde_json::Value) -> Result<serde_json::Value> {
		self.send(RequestOptions::delete(url).with_data(data)).await
	}

	/// Posts credentials to a sign-in endpoint and persists the issued session.
	pub async fn sign_in(&self, url: &str, payload: serde_json::Value) -> Result<Credential> {
		const KIND: FlowKind = FlowKind::SignIn;

		let span = FlowSpan::new(KIND, "sign_in");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let grant: SessionGrant = self.send_as(RequestOptions::post(url).with_data(payload)).await?;
				let credential = Credential::from(grant);

				credential.persist(self.store.as_ref()).await?;

				Ok(credential)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Clears every stored credential.
	pub async fn logout(&self) -> Result<()> {
		self.store.clear().await?;

		obs::debug_transition(FlowKind::SignIn, "Session cleared on request.");

		Ok(())
	}

	/// Reads the stored credential, if any.
	pub async fn credential(&self) -> Result<Option<Credential>> {
		Ok(Credential::load(self.store.as_ref()).await?)
	}

	/// Fetches the system configuration from `url`, validates it, and makes it active.
	pub async fn fetch_system_config(&self, url: &str) -> Result<Arc<SystemConfig>> {
		let data = self.send(RequestOptions::get(url)).await?;
		let system = SystemConfig::from_value(data)?;

		self.set_system_config(system);

		Ok(self.system_config())
	}

	/// Renews the access token, joining any refresh already in flight.
	pub async fn refresh_access_token(&self) -> Result<TokenSecret> {
		let current = self.store.secret(StoreKey::AccessToken).await?;

		self.ensure_fresh_token(current.as_ref()).await
	}

	/// Returns an access token newer than `stale`.
	///
	/// Callers arriving while a refresh is in flight wait for its outcome. Otherwise the caller
	/// leads: when the stored token already differs from `stale` it is returned without a network
	/// call; else exactly one refresh call runs and its outcome is fanned out to every waiter. A
	/// failed refresh clears the store and fires the logout hook once, before the waiters wake.
	pub async fn ensure_fresh_token(&self, stale: Option<&TokenSecret>) -> Result<TokenSecret> {
		const KIND: FlowKind = FlowKind::Refresh;

		let leader = match self.refresh.enter() {
			RefreshTicket::Waiter(waiter) => {
				obs::debug_transition(KIND, "Joining the in-flight refresh.");
				obs::record_flow_outcome(KIND, FlowOutcome::Joined);

				return waiter.wait().await.map_err(Error::from);
			},
			RefreshTicket::Leader(leader) => leader,
		};
		let span = FlowSpan::new(KIND, "ensure_fresh_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let outcome = span.instrument(self.run_refresh(stale)).await;

		match &outcome {
			Ok((_, recorded)) => obs::record_flow_outcome(KIND, *recorded),
			Err(failure) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				obs::warn_degraded(KIND, "Token refresh failed; ending the session.", failure);

				self.end_session(LogoutReason::RefreshFailed).await;
			},
		}

		leader.settle(outcome.map(|(token, _)| token)).map_err(Error::from)
	}

	async fn dispatch(&self, options: &RequestOptions) -> Result<serde_json::Value> {
		let mut refreshed = None;

		loop {
			let system = self.system_config();
			let (request, sent_with) = self.prepare(options, &system, refreshed.as_ref()).await?;
			let response = self.transport.send(request).await?;

			match interpret::interpret(response, &system, self.config.auto_refresh)? {
				Interpretation::Payload(data) => return Ok(data),
				Interpretation::LoggedOut(err) => {
					self.end_session(LogoutReason::NotAuthenticated).await;

					return Err(err.into());
				},
				// The retried call expired again; surface it instead of looping.
				Interpretation::RefreshRequired(err) if refreshed.is_some() => return Err(err.into()),
				Interpretation::RefreshRequired(_) => {
					obs::debug_transition(FlowKind::Request, "Access token expired; refreshing.");

					refreshed = Some(self.ensure_fresh_token(sent_with.as_ref()).await?);
				},
			}
		}
	}

	/// Builds the transport request and reports the access token it was prepared with.
	async fn prepare(
		&self,
		options: &RequestOptions,
		system: &SystemConfig,
		refreshed: Option<&TokenSecret>,
	) -> Result<(TransportRequest, Option<TokenSecret>)> {
		let mut url = self.config.resolve_url(&options.url);
		let mut headers = self.config.headers.clone();

		headers.merge(&options.headers);

		if let Some(content_type) = &options.content_type {
			headers.insert(CONTENT_TYPE, content_type.as_str());
		}

		let token = match refreshed {
			Some(token) => {
				headers.remove(&system.jwt.header);

				Some(token.clone())
			},
			None => self.store.secret(StoreKey::AccessToken).await?,
		};

		let bypass = system.security_ignore_urls.matches_url(&url, &self.config.base_url);

		if let Some(token) = token.as_ref().filter(|_| !bypass) {
			headers.insert(system.jwt.header.as_str(), token.authorization(&system.jwt.prefix));
		}

		let body = match (options.method, options.payload()) {
			(_, None) => None,
			(Method::Get, Some(params)) => {
				url = form::append_query(&url, params)?;

				None
			},
			(_, Some(data)) => Some(self.encode_body(data, &url, options, system, &mut headers)?),
		};
		let request = TransportRequest {
			method: options.method,
			url,
			headers,
			body,
			timeout: options.timeout.unwrap_or(self.config.timeout),
		};

		Ok((request, token))
	}

	fn encode_body(
		&self,
		data: &serde_json::Value,
		url: &str,
		options: &RequestOptions,
		system: &SystemConfig,
		headers: &mut Headers,
	) -> Result<RequestBody> {
		let seal = options.encrypt != Some(false)
			&& !system.encryption_ignore_urls.matches_url(url, &self.config.base_url);
		let cipher = if seal { system.request_cipher()? } else { None };
		let payload = match cipher {
			Some(cipher) => {
				let mut sealed = serde_json::Map::new();

				sealed.insert(ENCRYPTED_FIELD.into(), cipher.seal(&data.to_string())?.into());
				headers.insert(ENCRYPTED_HEADER, "true");
				headers.insert(ENCRYPT_TYPE_HEADER, cipher.kind().as_str());

				serde_json::Value::Object(sealed)
			},
			None => data.clone(),
		};
		let form_encoded = headers
			.get(CONTENT_TYPE)
			.is_some_and(|value| value.to_ascii_lowercase().contains(FORM_CONTENT_TYPE));

		if !form_encoded {
			return Ok(RequestBody::Json(payload));
		}

		match payload {
			serde_json::Value::String(text) => Ok(RequestBody::Form(text)),
			other => Ok(RequestBody::Form(form::encode(&other)?)),
		}
	}

	async fn run_refresh(
		&self,
		stale: Option<&TokenSecret>,
	) -> Result<(TokenSecret, FlowOutcome), RefreshFailure> {
		let metrics = self.refresh.metrics();
		let current = self.store.secret(StoreKey::AccessToken).await.map_err(rejected)?;

		if let Some(current) = current.filter(|current| stale != Some(current)) {
			obs::debug_transition(FlowKind::Refresh, "Session already renewed; reusing the stored token.");
			metrics.record_reuse();

			return Ok((current, FlowOutcome::Reused));
		}

		let Some(refresh_token) = self.store.secret(StoreKey::RefreshToken).await.map_err(rejected)?
		else {
			metrics.record_failure();

			return Err(RefreshFailure::NoRefreshToken);
		};

		metrics.record_attempt();

		match self.call_refresh_endpoint(&refresh_token).await {
			Ok(token) => {
				metrics.record_success();

				Ok((token, FlowOutcome::Success))
			},
			Err(failure) => {
				metrics.record_failure();

				Err(failure)
			},
		}
	}

	/// Posts `{}` to the refresh endpoint outside the pipeline and persists the renewed session.
	async fn call_refresh_endpoint(&self, refresh_token: &TokenSecret) -> RefreshOutcome {
		let system = self.system_config();
		let headers = Headers::default()
			.with(CONTENT_TYPE, JSON_CONTENT_TYPE)
			.with(system.jwt.header.as_str(), refresh_token.authorization(&system.jwt.prefix));
		let request = TransportRequest {
			method: Method::Post,
			url: self.config.refresh_url(),
			headers,
			body: Some(RequestBody::Json(serde_json::json!({}))),
			timeout: self.config.timeout,
		};
		let response = self.transport.send(request).await.map_err(rejected)?;

		if response.status != HTTP_OK {
			return Err(RefreshFailure::Rejected {
				reason: format!("Refresh endpoint answered with HTTP status {}.", response.status),
			});
		}

		let body = interpret::open_sealed(response.body, &response.headers, &system);
		let envelope = Envelope::decode(&body).map_err(rejected)?;

		if envelope.status != SUCCESS_CODE {
			return Err(rejected(envelope.into_business_error()));
		}

		let grant: SessionGrant = serde_path_to_error::deserialize(envelope.data).map_err(rejected)?;

		if grant.access_token.is_empty() {
			return Err(RefreshFailure::Rejected {
				reason: "Refresh endpoint returned an empty access token.".into(),
			});
		}

		let credential = Credential::from(grant);

		credential.persist(self.store.as_ref()).await.map_err(rejected)?;

		Ok(credential.access_token)
	}

	async fn end_session(&self, reason: LogoutReason) {
		const KIND: FlowKind = FlowKind::SignIn;

		if let Err(e) = self.store.clear().await {
			obs::warn_degraded(KIND, "Failed to clear the token store.", &e);
		}

		let content = match reason {
			LogoutReason::NotAuthenticated => "You are not signed in. Please sign in again.",
			LogoutReason::RefreshFailed => "Your session has expired. Please sign in again.",
		};

		obs::debug_transition(KIND, "Session ended; routing to the login page.");

		self.hooks.logged_out(LogoutNotice {
			title: "Signed out".into(),
			content: content.into(),
			redirect: self.config.login_page.clone(),
			fallback_delay: self.config.logout_redirect_delay,
			reason,
		});
	}
}

fn rejected(e: impl Display) -> RefreshFailure {
	RefreshFailure::Rejected { reason: e.to_string() }
}
