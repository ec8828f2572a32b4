//! Demonstrates a Lazada catalog run against a local mock.
//!
//! The seeded token is inside the safety buffer, so the first listing call refreshes it and
//! writes the new record to the configured token file before paging through the products.

// std
use std::{env, fs, sync::Arc};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
// self
use marketplace_catalog::{
	catalog::CatalogStream, http::ReqwestHttpClient, settings::SyncSettings,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/rest/auth/token/refresh");
			then.status(200).json_body(json!({
				"code": "0",
				"access_token": "demo-access-2",
				"refresh_token": "demo-refresh-2",
				"expires_in": 604800
			}));
		})
		.await;
	let listing = server
		.mock_async(|when, then| {
			when.method(GET).path("/rest/products/get").query_param("offset", "0");
			then.status(200).json_body(json!({
				"code": "0",
				"data": {
					"total_products": 2,
					"products": [
						{ "item_id": 1, "attributes": { "name": "Kettle" } },
						{ "item_id": 2, "attributes": { "name": "Toaster" } }
					]
				}
			}));
		})
		.await;
	let token_file = env::temp_dir().join("marketplace-catalog-demo").join("tokens.json");

	fs::remove_file(&token_file).ok();

	let settings = json!({
		"platform": { "kind": "lazada", "region": "sg" },
		"credentials": { "kind": "app_key", "app_key": "demo-key", "app_secret": "demo-secret" },
		"hosts": { "api_base": server.url("/rest"), "auth_base": server.url("/rest") },
		"access_token": "demo-access-1",
		"refresh_token": "demo-refresh-1",
		"token_lifetime_secs": 60,
		"token_file": token_file
	});
	let settings = SyncSettings::from_json(settings.to_string().as_bytes())?;
	let manager =
		Arc::new(settings.build_manager::<ReqwestHttpClient>(ReqwestHttpClient::new()?)?);
	let (records, completion) = CatalogStream::new(manager.clone()).collect().await;

	for record in &records {
		println!("{} {}", record["item_id"], record["attributes"]["name"]);
	}

	println!("Completion: {completion:?}.");
	println!("Token state: {}; token file: {}.", manager.state(), token_file.display());

	refresh.assert_async().await;
	listing.assert_async().await;

	Ok(())
}
