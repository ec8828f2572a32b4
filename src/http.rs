//! Transport primitives for signed marketplace API calls.
//!
//! [`ApiHttpClient`] is the crate's only dependency on an HTTP stack. Requests are
//! plain data ([`ApiRequest`]) so signing and pagination stay transport-agnostic, and
//! every transport must enforce [`REQUEST_TIMEOUT`] per call.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
#[cfg(feature = "reqwest")] use reqwest::header::{CONTENT_TYPE, HeaderMap, RETRY_AFTER};
#[cfg(feature = "reqwest")] use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, error::TransportError};

/// Timeout applied to every outbound call.
pub const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Boxed future returned by [`ApiHttpClient::execute`].
pub type HttpFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports able to execute [`ApiRequest`]s.
///
/// Implementations must be `Send + Sync + 'static` so one client can be shared by the
/// token manager and every paginator built on it.
pub trait ApiHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Executes `request`, failing only on transport problems. HTTP error statuses are
	/// returned as regular responses so callers can inspect platform error payloads.
	fn execute(&self, request: ApiRequest) -> HttpFuture<'_>;
}

/// HTTP verbs used by marketplace APIs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
	/// Parameters travel in the query string.
	#[default]
	Get,
	/// Parameters travel in the request body.
	Post,
}
impl HttpMethod {
	/// Returns the method name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
		}
	}
}
impl Display for HttpMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Request payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RequestBody {
	/// No body.
	#[default]
	Empty,
	/// `application/x-www-form-urlencoded` pairs.
	Form(BTreeMap<String, String>),
	/// `application/json` document.
	Json(Value),
}

/// Transport-agnostic outbound request.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
	/// HTTP verb.
	pub method: HttpMethod,
	/// Absolute URL including any query string.
	pub url: Url,
	/// Request payload.
	pub body: RequestBody,
}
impl ApiRequest {
	/// Creates a GET request for `url`.
	pub fn get(url: Url) -> Self {
		Self { method: HttpMethod::Get, url, body: RequestBody::Empty }
	}

	/// Creates a POST request for `url` with an empty body.
	pub fn post(url: Url) -> Self {
		Self { method: HttpMethod::Post, url, body: RequestBody::Empty }
	}

	/// Replaces the body with form pairs.
	pub fn with_form(mut self, form: BTreeMap<String, String>) -> Self {
		self.body = RequestBody::Form(form);

		self
	}

	/// Replaces the body with a JSON document.
	pub fn with_json(mut self, json: Value) -> Self {
		self.body = RequestBody::Json(json);

		self
	}

	/// Replaces the query string with `params`.
	pub fn with_query(mut self, params: &BTreeMap<String, String>) -> Self {
		set_query(&mut self.url, params);

		self
	}

	/// Query parameters currently on the URL; later duplicates win.
	pub fn query_params(&self) -> BTreeMap<String, String> {
		self.url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect()
	}
}

/// Metadata captured from an HTTP response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseMetadata {
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
	/// Content type reported by the server.
	pub content_type: Option<String>,
}

/// Raw HTTP response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Raw body bytes.
	pub body: Vec<u8>,
	/// Header-derived metadata.
	pub metadata: ResponseMetadata,
}
impl ApiResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Lossy UTF-8 preview of the body for logs.
	pub fn body_preview(&self) -> String {
		const LIMIT: usize = 256;

		let text = String::from_utf8_lossy(&self.body);
		let mut preview: String = text.chars().take(LIMIT).collect();

		if text.chars().count() > LIMIT {
			preview.push('…');
		}

		preview
	}
}

/// Replaces the query string of `url` with `params` (sorted by key).
pub fn set_query(url: &mut Url, params: &BTreeMap<String, String>) {
	url.set_query(None);

	if !params.is_empty() {
		url.query_pairs_mut().extend_pairs(params.iter());
	}
}

/// Appends `path` to `base` without discarding the base path (`/rest` + `/products/get`).
pub fn endpoint_url(base: &Url, path: &str) -> Result<Url> {
	let raw = format!("{}/{}", base.as_str().trim_end_matches('/'), path.trim_start_matches('/'));

	Url::parse(&raw).map_err(|e| crate::error::ConfigError::invalid_url(raw, e).into())
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds a client with [`REQUEST_TIMEOUT`] applied at the client level as well.
	pub fn new() -> Result<Self, crate::error::ConfigError> {
		Ok(Self(ReqwestClient::builder().timeout(REQUEST_TIMEOUT).build()?))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ApiHttpClient for ReqwestHttpClient {
	fn execute(&self, request: ApiRequest) -> HttpFuture<'_> {
		Box::pin(async move {
			let ApiRequest { method, url, body } = request;
			let builder = match method {
				HttpMethod::Get => self.0.get(url),
				HttpMethod::Post => self.0.post(url),
			}
			.timeout(REQUEST_TIMEOUT);
			let builder = match body {
				RequestBody::Empty => builder,
				RequestBody::Form(form) => builder.form(&form),
				RequestBody::Json(json) => builder
					.header(CONTENT_TYPE, "application/json")
					.body(serde_json::to_vec(&json).map_err(std::io::Error::other)?),
			};
			let response = builder.send().await?;
			let status = response.status().as_u16();
			let metadata = metadata_from_headers(response.headers());
			let body = response.bytes().await?.to_vec();

			Ok(ApiResponse { status, body, metadata })
		})
	}
}

#[cfg(feature = "reqwest")]
fn metadata_from_headers(headers: &HeaderMap) -> ResponseMetadata {
	ResponseMetadata {
		retry_after: parse_retry_after(headers),
		content_type: headers
			.get(CONTENT_TYPE)
			.and_then(|value| value.to_str().ok())
			.map(str::to_owned),
	}
}

#[cfg(feature = "reqwest")]
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn endpoint_url_keeps_base_path() {
		let base = Url::parse("https://api.lazada.sg/rest").expect("Base URL should parse.");
		let url = endpoint_url(&base, "/products/get").expect("Endpoint URL should build.");

		assert_eq!(url.as_str(), "https://api.lazada.sg/rest/products/get");

		let base = Url::parse("https://partner.shopeemobile.com/").expect("Base URL should parse.");
		let url = endpoint_url(&base, "/api/v2/product/get_item_list")
			.expect("Endpoint URL should build.");

		assert_eq!(url.path(), "/api/v2/product/get_item_list");
	}

	#[test]
	fn set_query_replaces_existing_pairs() {
		let mut url = Url::parse("https://example.com/p?stale=1").expect("URL should parse.");
		let params = BTreeMap::from([("b".to_owned(), "2".to_owned()), ("a".to_owned(), "1".to_owned())]);

		set_query(&mut url, &params);

		assert_eq!(url.query(), Some("a=1&b=2"));

		set_query(&mut url, &BTreeMap::new());

		assert_eq!(url.query(), None);
	}

	#[test]
	fn body_preview_truncates_long_payloads() {
		let response = ApiResponse {
			status: 500,
			body: "x".repeat(300).into_bytes(),
			metadata: ResponseMetadata::default(),
		};

		assert!(!response.is_success());
		assert_eq!(response.body_preview().chars().count(), 257);
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn retry_after_accepts_delta_seconds() {
		let mut headers = HeaderMap::new();

		headers.insert(RETRY_AFTER, "120".parse().expect("Header value should parse."));

		assert_eq!(parse_retry_after(&headers), Some(Duration::seconds(120)));
	}
}
