#![cfg(feature = "reqwest")]

mod common;

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use httpmock::prelude::*;
use marketplace_catalog::{
	auth::Credentials,
	catalog::{CatalogStream, Completion},
	error::{Error, TransportError},
	http::{ApiHttpClient, ApiRequest, HttpFuture},
	paginate::{Cursor, PaginationStatus, Paginator},
	platform::{LazadaRegion, PlatformConfig},
	token::TokenManager,
};
use serde_json::{Value, json};
// self
use common::*;

fn products(range: impl IntoIterator<Item = u64>) -> Vec<Value> {
	range.into_iter().map(|id| json!({ "item_id": id, "name": format!("product-{id}") })).collect()
}

#[derive(Default)]
struct TimingOut {
	calls: AtomicUsize,
}
impl ApiHttpClient for TimingOut {
	fn execute(&self, _: ApiRequest) -> HttpFuture<'_> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async { Err(TransportError::timeout(std::io::Error::other("deadline elapsed"))) })
	}
}

fn id_list(range: impl IntoIterator<Item = u64>) -> String {
	range.into_iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",")
}

#[tokio::test]
async fn offset_listing_stops_once_the_total_is_reached() {
	let server = MockServer::start_async().await;
	let mut pages = Vec::new();

	for (offset, range) in [(0, 1..=100), (100, 101..=200), (200, 201..=250)] {
		let mock = server
			.mock_async(|when, then| {
				when.method(GET)
					.path("/rest/products/get")
					.query_param("offset", offset.to_string())
					.query_param("limit", "100")
					.query_param("access_token", "access-1")
					.query_param_exists("sign");
				then.status(200).json_body(json!({
					"code": "0",
					"data": { "total_products": 250, "products": products(range) }
				}));
			})
			.await;

		pages.push(mock);
	}

	let beyond = server
		.mock_async(|when, then| {
			when.method(GET).path("/rest/products/get").query_param("offset", "300");
			then.status(200).json_body(json!({ "code": "0", "data": { "products": [] } }));
		})
		.await;
	let manager = ready(app_key_manager(lazada_config(&server)));
	let mut paginator = Paginator::listing(manager);
	let mut sizes = Vec::new();

	while let Some(page) = paginator.next_page().await.expect("Listing pages should load.") {
		sizes.push(page.records.len());
	}

	for mock in &pages {
		mock.assert_async().await;
	}

	beyond.assert_hits_async(0).await;

	assert_eq!(sizes, vec![100, 100, 50]);
	assert_eq!(paginator.status(), PaginationStatus::Exhausted);
	assert_eq!(paginator.records(), 250);
}

#[tokio::test]
async fn empty_page_ends_a_page_number_listing() {
	let server = MockServer::start_async().await;
	let first = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/rest/rss/products/get")
				.query_param("page", "1")
				.query_param("pageSize", "100")
				.query_param("storeId", "store-1");
			then.status(200)
				.json_body(json!({ "code": "0", "result": { "data": products(1..=100) } }));
		})
		.await;
	let second = server
		.mock_async(|when, then| {
			when.method(GET).path("/rest/rss/products/get").query_param("page", "2");
			then.status(200).json_body(json!({ "code": "0", "result": { "data": [] } }));
		})
		.await;
	let third = server
		.mock_async(|when, then| {
			when.method(GET).path("/rest/rss/products/get").query_param("page", "3");
			then.status(200)
				.json_body(json!({ "code": "0", "result": { "data": products(201..=300) } }));
		})
		.await;
	let manager = ready(app_key_manager(redmart_config(&server)));
	let mut paginator = Paginator::listing(manager);
	let records = paginator.collect_records().await.expect("Listing should drain.");

	first.assert_async().await;
	second.assert_async().await;
	third.assert_hits_async(0).await;

	assert_eq!(records.len(), 100);
	assert_eq!(paginator.pages(), 1);
	assert_eq!(paginator.status(), PaginationStatus::Exhausted);
}

#[tokio::test]
async fn server_cursor_follows_next_offset_until_has_next_page_is_false() {
	let server = MockServer::start_async().await;
	let first = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/v2/product/get_item_list")
				.query_param("offset", "0")
				.query_param("page_size", "50")
				.query_param("item_status", "NORMAL")
				.query_param("partner_id", PARTNER_ID.to_string())
				.query_param("shop_id", SHOP_ID.to_string());
			then.status(200).json_body(json!({
				"error": "",
				"message": "",
				"response": {
					"item": items(1..=50),
					"total_count": 70,
					"has_next_page": true,
					"next_offset": 50
				}
			}));
		})
		.await;
	let second = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v2/product/get_item_list").query_param("offset", "50");
			then.status(200).json_body(json!({
				"error": "",
				"response": {
					"item": items(51..=70),
					"total_count": 70,
					"has_next_page": false,
					"next_offset": 70
				}
			}));
		})
		.await;
	let manager = ready(partner_manager(shopee_config(&server)));
	let mut paginator = Paginator::listing(manager);
	let first_page = paginator
		.next_page()
		.await
		.expect("First page should load.")
		.expect("First page should carry records.");

	assert_eq!(first_page.cursor, Cursor::ServerCursor { value: 0, step: 50 });
	assert_eq!(first_page.state.next_cursor, Some(50));

	let second_page = paginator
		.next_page()
		.await
		.expect("Second page should load.")
		.expect("Second page should carry records.");

	assert_eq!(second_page.records.len(), 20);
	assert!(paginator.next_page().await.expect("Exhaustion is not an error.").is_none());

	first.assert_async().await;
	second.assert_async().await;

	assert_eq!(paginator.status(), PaginationStatus::Exhausted);
}

#[tokio::test]
async fn api_error_page_fails_the_run_and_aborts_the_catalog() {
	let server = MockServer::start_async().await;
	let first = server
		.mock_async(|when, then| {
			when.method(GET).path("/rest/products/get").query_param("offset", "0");
			then.status(200).json_body(json!({
				"code": "0",
				"data": { "total_products": 250, "products": products(1..=100) }
			}));
		})
		.await;
	let failing = server
		.mock_async(|when, then| {
			when.method(GET).path("/rest/products/get").query_param("offset", "100");
			then.status(200).json_body(json!({ "code": "5", "message": "rate limited" }));
		})
		.await;
	let manager = ready(app_key_manager(lazada_config(&server)));
	let mut paginator = Paginator::listing(manager.clone());

	paginator.next_page().await.expect("First page should load.");

	let err = paginator.next_page().await.expect_err("Business error must surface.");

	assert!(matches!(
		err,
		Error::Api { ref code, ref message, .. } if code == "5" && message == "rate limited"
	));
	assert_eq!(paginator.status(), PaginationStatus::Failed);
	assert!(paginator.next_page().await.expect("Failed runs stay quiet.").is_none());

	first.assert_hits_async(1).await;
	failing.assert_hits_async(1).await;

	let mut stream = CatalogStream::new(manager);
	let mut yielded = 0;

	while stream.next_record().await.is_some() {
		yielded += 1;
	}

	assert_eq!(yielded, 100);
	assert!(matches!(stream.completion(), Completion::Aborted { reason } if reason.contains("rate limited")));
	assert!(matches!(stream.take_error(), Some(Error::Api { .. })));
}

#[tokio::test]
async fn failed_detail_batch_is_skipped_and_reported() {
	let server = MockServer::start_async().await;
	let listing_first = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v2/product/get_item_list").query_param("offset", "0");
			then.status(200).json_body(json!({
				"error": "",
				"response": { "item": items(1..=50), "has_next_page": true, "next_offset": 50 }
			}));
		})
		.await;
	let listing_second = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v2/product/get_item_list").query_param("offset", "50");
			then.status(200).json_body(json!({
				"error": "",
				"response": { "item": items(51..=60), "has_next_page": false }
			}));
		})
		.await;
	let failed_batch = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/v2/product/get_item_base_info")
				.query_param("item_id_list", id_list(1..=50));
			then.status(200).json_body(json!({
				"error": "error_server",
				"message": "Something wrong. Please try later."
			}));
		})
		.await;
	let good_batch = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/v2/product/get_item_base_info")
				.query_param("item_id_list", id_list(51..=60))
				.query_param("need_tax_info", "false");
			then.status(200).json_body(json!({
				"error": "",
				"response": { "item_list": products(51..=60) }
			}));
		})
		.await;
	let manager = ready(partner_manager(shopee_config(&server)));
	let (records, completion) = CatalogStream::new(manager).collect().await;

	listing_first.assert_async().await;
	listing_second.assert_async().await;
	failed_batch.assert_async().await;
	good_batch.assert_async().await;

	assert_eq!(records.len(), 10);
	assert_eq!(records[0]["name"], "product-51");
	assert_eq!(completion, Completion::Partial { failed_batches: vec![0] });
}

#[tokio::test]
async fn page_number_listing_stops_at_the_reported_total() {
	let server = MockServer::start_async().await;
	let first = server
		.mock_async(|when, then| {
			when.method(GET).path("/rest/rss/products/get").query_param("page", "1");
			then.status(200).json_body(json!({
				"code": "0",
				"result": { "total": 150, "data": products(1..=100) }
			}));
		})
		.await;
	let second = server
		.mock_async(|when, then| {
			when.method(GET).path("/rest/rss/products/get").query_param("page", "2");
			then.status(200).json_body(json!({
				"code": "0",
				"result": { "total": 150, "data": products(101..=150) }
			}));
		})
		.await;
	let third = server
		.mock_async(|when, then| {
			when.method(GET).path("/rest/rss/products/get").query_param("page", "3");
			then.status(200).json_body(json!({ "code": "0", "result": { "total": 150, "data": [] } }));
		})
		.await;
	let manager = ready(app_key_manager(redmart_config(&server)));
	let mut paginator = Paginator::listing(manager);
	let records = paginator.collect_records().await.expect("Listing should drain.");

	first.assert_async().await;
	second.assert_async().await;
	third.assert_hits_async(0).await;

	assert_eq!(records.len(), 150);
	assert_eq!(paginator.status(), PaginationStatus::Exhausted);
}

#[tokio::test]
async fn non_json_body_fails_the_run_without_further_requests() {
	let server = MockServer::start_async().await;
	let broken = server
		.mock_async(|when, then| {
			when.method(GET).path("/rest/products/get").query_param("offset", "0");
			then.status(200).header("content-type", "text/html").body("<html>oops");
		})
		.await;
	let next = server
		.mock_async(|when, then| {
			when.method(GET).path("/rest/products/get").query_param("offset", "100");
			then.status(200).json_body(json!({ "code": "0", "data": { "products": [] } }));
		})
		.await;
	let manager = ready(app_key_manager(lazada_config(&server)));
	let mut paginator = Paginator::listing(manager.clone());
	let err = paginator.next_page().await.expect_err("A non-JSON body must fail the page.");

	assert!(matches!(
		err,
		Error::MalformedResponse { ref cursor, .. } if cursor == "offset=0"
	));
	assert_eq!(paginator.status(), PaginationStatus::Failed);
	assert!(paginator.next_page().await.expect("Failed runs stay quiet.").is_none());

	broken.assert_hits_async(1).await;

	let (records, completion) = CatalogStream::new(manager).collect().await;

	assert!(records.is_empty());
	assert!(matches!(completion, Completion::Aborted { ref reason } if reason.contains("malformed")));

	broken.assert_hits_async(2).await;
	next.assert_hits_async(0).await;
}

#[tokio::test]
async fn transport_timeout_fails_the_run() {
	let http_client = Arc::new(TimingOut::default());
	let manager = Arc::new(
		TokenManager::<TimingOut>::builder(
			PlatformConfig::lazada(LazadaRegion::Sg).expect("Preset should build."),
			Credentials::app_key(APP_KEY, APP_SECRET),
			http_client.clone(),
		)
		.access_token("access-1")
		.build()
		.expect("Token manager should build."),
	);
	let mut paginator = Paginator::listing(manager);
	let err = paginator.next_page().await.expect_err("A timed-out page must fail.");

	assert!(matches!(err, Error::Transport(ref e) if e.is_timeout()));
	assert_eq!(paginator.status(), PaginationStatus::Failed);
	assert!(paginator.next_page().await.expect("Failed runs stay quiet.").is_none());
	assert_eq!(http_client.calls.load(Ordering::SeqCst), 1);
}
