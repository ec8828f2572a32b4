#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use httpmock::MockServer;
use marketplace_catalog::{
	auth::Credentials,
	http::ReqwestHttpClient,
	platform::PlatformConfig,
	reqwest::Client,
	token::{ReqwestTokenManager, TokenManagerBuilder},
	url::Url,
};
use serde_json::{Value, json};

pub const APP_KEY: &str = "K";
pub const APP_SECRET: &str = "S";
pub const PARTNER_ID: u64 = 1000;
pub const PARTNER_KEY: &str = "pk";
pub const SHOP_ID: u64 = 2000;

/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
/// `httpmock` during tests.
pub fn test_http_client() -> ReqwestHttpClient {
	let client = Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

pub fn url(raw: impl AsRef<str>) -> Url {
	Url::parse(raw.as_ref()).expect("Mock URL should parse.")
}

pub fn lazada_config(server: &MockServer) -> PlatformConfig {
	PlatformConfig::lazada_with_hosts(url(server.url("/rest")), url(server.url("/rest")))
		.expect("Lazada config should build against the mock server.")
}

pub fn redmart_config(server: &MockServer) -> PlatformConfig {
	PlatformConfig::redmart_with_hosts("store-1", url(server.url("/rest")), url(server.url("/rest")))
		.expect("Redmart config should build against the mock server.")
}

pub fn shopee_config(server: &MockServer) -> PlatformConfig {
	PlatformConfig::shopee_with_hosts(url(server.url("/")), url(server.url("/")))
		.expect("Shopee config should build against the mock server.")
}

pub fn app_key_manager(config: PlatformConfig) -> TokenManagerBuilder<ReqwestHttpClient> {
	ReqwestTokenManager::builder(
		config,
		Credentials::app_key(APP_KEY, APP_SECRET),
		test_http_client(),
	)
}

pub fn partner_manager(config: PlatformConfig) -> TokenManagerBuilder<ReqwestHttpClient> {
	ReqwestTokenManager::builder(
		config,
		Credentials::partner(PARTNER_ID, PARTNER_KEY, SHOP_ID),
		test_http_client(),
	)
}

pub fn ready(builder: TokenManagerBuilder<ReqwestHttpClient>) -> Arc<ReqwestTokenManager> {
	Arc::new(builder.access_token("access-1").build().expect("Token manager should build."))
}

pub fn items(ids: impl IntoIterator<Item = u64>) -> Vec<Value> {
	ids.into_iter().map(|id| json!({ "item_id": id })).collect()
}
