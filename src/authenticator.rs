//! Applies signed system parameters to outgoing requests.
//!
//! GET requests carry every parameter in the query string. Plain POST requests carry them
//! as a form body and lose their query string. POST requests with a JSON body keep the
//! body and carry the signed parameters in the query string.

// self
use crate::{
	_prelude::*,
	http::{ApiHttpClient, ApiRequest, HttpMethod, RequestBody},
	token::TokenManager,
};

/// Boxed future returned by [`RequestAuthenticator::authenticate`].
pub type AuthFuture<'a> = Pin<Box<dyn Future<Output = Result<ApiRequest>> + 'a + Send>>;

/// Stateless transform from an unsigned request to a signed one.
pub trait RequestAuthenticator
where
	Self: Send + Sync,
{
	/// Signs `request`, merging existing parameters with system parameters (system wins).
	fn authenticate(&self, request: ApiRequest) -> AuthFuture<'_>;
}

impl<C> RequestAuthenticator for TokenManager<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn authenticate(&self, request: ApiRequest) -> AuthFuture<'_> {
		Box::pin(async move {
			let mut existing = request.query_params();
			let ApiRequest { method, mut url, body } = request;

			match (method, body) {
				(HttpMethod::Get, body) => {
					let signed = self.sign_request(method, &url, &existing).await?;

					crate::http::set_query(&mut url, &signed);

					Ok(ApiRequest { method, url, body })
				},
				(HttpMethod::Post, RequestBody::Json(json)) => {
					let signed = self.sign_request(method, &url, &existing).await?;

					crate::http::set_query(&mut url, &signed);

					Ok(ApiRequest { method, url, body: RequestBody::Json(json) })
				},
				(HttpMethod::Post, body) => {
					if let RequestBody::Form(form) = body {
						existing.extend(form);
					}

					url.set_query(None);

					let signed = self.sign_request(method, &url, &existing).await?;

					Ok(ApiRequest { method, url, body: RequestBody::Form(signed) })
				},
			}
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		auth::Credentials,
		http::HttpFuture,
		platform::{LazadaRegion, PlatformConfig},
	};

	struct Unreachable;
	impl ApiHttpClient for Unreachable {
		fn execute(&self, _: ApiRequest) -> HttpFuture<'_> {
			Box::pin(async { Err(std::io::Error::other("unreachable").into()) })
		}
	}

	fn manager() -> TokenManager<Unreachable> {
		TokenManager::<Unreachable>::builder(
			PlatformConfig::lazada(LazadaRegion::Sg).expect("Preset should build."),
			Credentials::app_key("K", "S"),
			Unreachable,
		)
		.access_token("a")
		.build()
		.expect("Manager should build.")
	}

	#[tokio::test]
	async fn get_keeps_caller_query_and_system_params_win() {
		let url = Url::parse("https://api.lazada.sg/rest/products/get?offset=100&timestamp=1")
			.expect("Fixture URL should parse.");
		let signed =
			manager().authenticate(ApiRequest::get(url)).await.expect("Signing should succeed.");
		let query = signed.query_params();

		assert_eq!(query.get("offset").map(String::as_str), Some("100"));
		assert_ne!(query.get("timestamp").map(String::as_str), Some("1"));
		assert!(query.contains_key("sign"));
		assert_eq!(signed.body, RequestBody::Empty);
	}

	#[tokio::test]
	async fn post_moves_params_into_form_body() {
		let url = Url::parse("https://api.lazada.sg/rest/product/update?x=1")
			.expect("Fixture URL should parse.");
		let form = BTreeMap::from([("payload".to_owned(), "{}".to_owned())]);
		let signed = manager()
			.authenticate(ApiRequest::post(url).with_form(form))
			.await
			.expect("Signing should succeed.");
		let RequestBody::Form(body) = &signed.body else {
			panic!("POST must carry a form body: {:?}", signed.body);
		};

		assert_eq!(signed.url.query(), None);
		assert_eq!(body.get("x").map(String::as_str), Some("1"));
		assert_eq!(body.get("payload").map(String::as_str), Some("{}"));
		assert_eq!(body.get("app_key").map(String::as_str), Some("K"));
		assert!(body.contains_key("sign"));
	}
}
