#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use session_request::{
	_preludet::*,
	auth::Credential,
	client::RequestOptions,
	config::{JSON_CONTENT_TYPE, SystemConfig},
	session::LogoutReason,
	store::{MemoryStore, TokenStore},
};

async fn seed(store: &MemoryStore, access: &str, refresh: &str) {
	let store: &dyn TokenStore = store;

	Credential::new(access, Some(refresh.to_owned()))
		.persist(store)
		.await
		.expect("Seeding the token store should succeed.");
}

#[tokio::test]
async fn concurrent_expiries_share_one_refresh() {
	let server = MockServer::start_async().await;
	let (client, store, _) = build_reqwest_test_client(&server.base_url());

	seed(&store, "stale", "refresh-0").await;

	let expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/user/getUserInfo").header("authorization", "Bearer stale");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "status": 403, "error": "Token expired." }));
		})
		.await;
	let renewed = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/user/getUserInfo").header("authorization", "Bearer fresh");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "status": 200, "data": { "id": 1 } }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/base/refreshToken")
				.header("authorization", "Bearer refresh-0");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "status": 200, "data": { "accessToken": "fresh" } }));
		})
		.await;
	let calls = (0..5).map(|_| client.get("/api/user/getUserInfo", serde_json::Value::Null));
	let results = futures::future::join_all(calls).await;

	for result in results {
		assert_eq!(result.expect("Every retried call should succeed."), json!({ "id": 1 }));
	}

	refresh.assert_calls_async(1).await;
	expired.assert_calls_async(5).await;
	renewed.assert_calls_async(5).await;

	let stored = client
		.credential()
		.await
		.expect("Store reads should succeed.")
		.expect("Renewed credential should remain stored.");

	assert_eq!(stored.access_token.expose(), "fresh");
	assert_eq!(stored.refresh_token.as_ref().map(|secret| secret.expose()), Some("refresh-0"));
	assert_eq!(client.refresh_metrics().attempts(), 1);
}

#[tokio::test]
async fn bypass_patterns_skip_authorization() {
	let server = MockServer::start_async().await;
	let (client, store, _) = build_reqwest_test_client(&server.base_url());
	let client = client.with_system_config(
		SystemConfig::from_json(r#"{"securityIgnoreUrls":["/api/base/**"]}"#)
			.expect("Bypass config should validate."),
	);

	seed(&store, "t0", "r0").await;

	let config = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/base/getSystemConfig").header_missing("authorization");
			then.status(200).header("content-type", "application/json").json_body(json!({
				"status": 200,
				"data": {
					"jwtInfo": { "header": "Authorization", "prefix": "Bearer" },
					"securityIgnoreUrls": ["/api/base/**"],
					"encryptionIgnoreUrls": ["/api/base/**"]
				}
			}));
		})
		.await;
	let user = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/user/getUserInfo").header("authorization", "Bearer t0");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "status": 200, "data": { "nickname": "kit" } }));
		})
		.await;
	let system = client
		.fetch_system_config("/api/base/getSystemConfig")
		.await
		.expect("System config fetch should succeed.");

	assert!(!system.encryption_ignore_urls.is_empty());

	let data = client
		.get("/api/user/getUserInfo", serde_json::Value::Null)
		.await
		.expect("Authenticated call should succeed.");

	assert_eq!(data, json!({ "nickname": "kit" }));

	config.assert_calls_async(1).await;
	user.assert_calls_async(1).await;
}

#[tokio::test]
async fn encryption_ignore_patterns_send_plain_bodies() {
	let server = MockServer::start_async().await;
	let (client, _, _) = build_reqwest_test_client(&server.base_url());
	let client = client.with_system_config(
		SystemConfig::from_json(
			r#"{"encryptionType":"simple","encryptionIgnoreUrls":["/api/base/**"]}"#,
		)
		.expect("Encryption config should validate."),
	);
	let login = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/base/login")
				.header_missing("x-encrypted")
				.header_missing("x-encrypt-type")
				.json_body(json!({ "code": "wx" }));
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "status": 200, "data": { "accessToken": "a1" } }));
		})
		.await;
	let profile = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/user/updateProfile")
				.header("x-encrypted", "true")
				.header("x-encrypt-type", "simple")
				.json_body(json!({ "encrypted": "H0cICBYHGj4GAFteRw0IAU4J" }));
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "status": 200, "data": null }));
		})
		.await;

	client
		.send(
			RequestOptions::post("/api/base/login")
				.with_data(json!({ "code": "wx" }))
				.with_content_type(JSON_CONTENT_TYPE),
		)
		.await
		.expect("Ignored URLs should be sent in plain text.");
	client
		.send(
			RequestOptions::post("/api/user/updateProfile")
				.with_data(json!({ "nickname": "kit" }))
				.with_content_type(JSON_CONTENT_TYPE),
		)
		.await
		.expect("Other URLs should be sealed.");

	login.assert_calls_async(1).await;
	profile.assert_calls_async(1).await;
}

#[tokio::test]
async fn absolute_urls_are_not_prefixed_again() {
	let server = MockServer::start_async().await;
	let (client, _, _) = build_reqwest_test_client("http://unreachable.invalid");
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/game/gameList").query_param("page", "1");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "status": 200, "data": [] }));
		})
		.await;
	let data = client
		.get(&server.url("/api/game/gameList"), json!({ "page": 1 }))
		.await
		.expect("Absolute URL should be used as is.");

	assert_eq!(data, json!([]));

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn not_authenticated_response_ends_the_session() {
	let server = MockServer::start_async().await;
	let (client, store, hooks) = build_reqwest_test_client(&server.base_url());

	seed(&store, "t0", "r0").await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/game/saveGameRecord");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "status": 401, "error": "Please sign in." }));
		})
		.await;

	let err = client
		.post("/api/game/saveGameRecord", json!({ "score": 10 }))
		.await
		.expect_err("Unauthenticated calls should reject.");

	assert!(matches!(err, Error::Business(ref business) if business.code == 401));
	assert!(store.is_empty());

	let logouts = hooks.logouts();

	assert_eq!(logouts.len(), 1);
	assert_eq!(logouts[0].reason, LogoutReason::NotAuthenticated);
}

#[tokio::test]
async fn http_failures_surface_the_server_message() {
	let server = MockServer::start_async().await;
	let (client, _, hooks) = build_reqwest_test_client(&server.base_url());

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/game/gameList");
			then.status(502)
				.header("content-type", "application/json")
				.json_body(json!({ "error": "Upstream unavailable." }));
		})
		.await;

	let err = client
		.get("/api/game/gameList", serde_json::Value::Null)
		.await
		.expect_err("HTTP 502 should reject.");

	assert!(matches!(err, Error::Http { status: 502, .. }));
	assert_eq!(hooks.notices().len(), 1);
	assert_eq!(hooks.notices()[0].message, "Upstream unavailable.");
}
