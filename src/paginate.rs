//! Sequential, pull-based pagination over authenticated endpoints.
//!
//! A [`Paginator`] issues one request per [`Paginator::next_page`] call and never
//! prefetches. Each body goes through the endpoint's
//! [`ResponseSchema`](crate::platform::ResponseSchema) before the cursor moves, so
//! business errors, malformed bodies and exhaustion are told apart:
//!
//! - `Ok(Some(page))` carries at least one record.
//! - `Ok(None)` means the cursor reached a normal stop.
//! - `Err(_)` is terminal; the paginator reports [`PaginationStatus::Failed`] afterwards.

pub mod cursor;

pub use cursor::*;

// self
use crate::{
	_prelude::*,
	authenticator::RequestAuthenticator,
	http::{ApiHttpClient, ApiRequest, ApiResponse, HttpMethod, endpoint_url},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	platform::{EndpointSpec, PageOutcome, PaginationState},
	token::TokenManager,
};

/// One page of raw records.
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
	/// Zero-based page index within the run.
	pub index: u64,
	/// Cursor the page was fetched with.
	pub cursor: Cursor,
	/// Raw records in response order.
	pub records: Vec<Value>,
	/// Paging hints reported with the page.
	pub state: PaginationState,
}

/// Lifecycle of a pagination run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaginationStatus {
	/// More pages may follow.
	Running,
	/// The cursor stopped normally.
	Exhausted,
	/// A page failed; no further requests are issued.
	Failed,
}

/// Drives one endpoint's cursor through authenticated requests.
pub struct Paginator<C>
where
	C: ?Sized + ApiHttpClient,
{
	manager: Arc<TokenManager<C>>,
	endpoint: EndpointSpec,
	params: BTreeMap<String, String>,
	cursor: Cursor,
	status: PaginationStatus,
	stop_after_current: bool,
	pages: u64,
	records: u64,
}
impl<C> Paginator<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Paginates the platform's listing endpoint.
	pub fn listing(manager: Arc<TokenManager<C>>) -> Self {
		let endpoint = manager.config().listing.clone();

		Self::new(manager, endpoint)
	}

	/// Paginates `endpoint`.
	pub fn new(manager: Arc<TokenManager<C>>, endpoint: EndpointSpec) -> Self {
		let cursor = Cursor::start(&endpoint.cursor);

		Self {
			manager,
			endpoint,
			params: BTreeMap::new(),
			cursor,
			status: PaginationStatus::Running,
			stop_after_current: false,
			pages: 0,
			records: 0,
		}
	}

	/// Adds run-specific parameters on top of the endpoint's static ones. Cursor
	/// parameters still take precedence.
	pub fn with_params(mut self, params: BTreeMap<String, String>) -> Self {
		self.params.extend(params);

		self
	}

	/// Current status.
	pub fn status(&self) -> PaginationStatus {
		self.status
	}

	/// Current cursor position.
	pub fn cursor(&self) -> &Cursor {
		&self.cursor
	}

	/// Pages yielded so far.
	pub fn pages(&self) -> u64 {
		self.pages
	}

	/// Records yielded so far.
	pub fn records(&self) -> u64 {
		self.records
	}

	/// Fetches the next page. See the module docs for the meaning of each outcome.
	pub async fn next_page(&mut self) -> Result<Option<Page>> {
		const KIND: FlowKind = FlowKind::PageFetch;

		if self.status != PaginationStatus::Running {
			return Ok(None);
		}
		if self.stop_after_current {
			self.finish(PaginationStatus::Exhausted);

			return Ok(None);
		}

		let span = FlowSpan::new(KIND, "next_page", self.manager.platform().as_str());

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.fetch_current()).await;

		obs::record_flow_result(KIND, &result);

		match result {
			Ok(Some(page)) => {
				self.pages += 1;
				self.records += page.records.len() as u64;

				Ok(Some(page))
			},
			Ok(None) => {
				self.finish(PaginationStatus::Exhausted);

				Ok(None)
			},
			Err(e) => {
				tracing::error!(
					platform = %self.manager.platform(),
					path = %self.endpoint.path,
					cursor = %self.cursor,
					error = %e,
					"Pagination stopped on error."
				);
				self.finish(PaginationStatus::Failed);

				Err(e)
			},
		}
	}

	/// Drains the remaining pages into one record list.
	pub async fn collect_records(&mut self) -> Result<Vec<Value>> {
		let mut records = Vec::new();

		while let Some(page) = self.next_page().await? {
			records.extend(page.records);
		}

		Ok(records)
	}

	async fn fetch_current(&mut self) -> Result<Option<Page>> {
		let response = self.send().await?;
		let body = self.decode(&response)?;
		let outcome = self.endpoint.schema.interpret(&body).map_err(|e| self.malformed(e))?;

		match outcome {
			PageOutcome::ApiError(payload) => Err(Error::Api {
				platform: self.manager.platform().to_string(),
				code: payload.code,
				message: payload.message,
			}),
			_ if !response.is_success() => Err(self.http_status(&response)),
			PageOutcome::Empty { .. } => {
				tracing::debug!(
					platform = %self.manager.platform(),
					cursor = %self.cursor,
					reason = StopReason::EmptyPage.as_str(),
					"Pagination finished."
				);

				Ok(None)
			},
			PageOutcome::Records { records, state } => {
				let cursor = self.cursor.clone();
				let step = self.cursor.advance(&self.endpoint.cursor, records.len(), &state);

				tracing::debug!(
					platform = %self.manager.platform(),
					cursor = %cursor,
					records = records.len(),
					total = ?state.total,
					"Fetched page."
				);

				if let Step::Stop(reason) = step {
					tracing::debug!(
						platform = %self.manager.platform(),
						reason = reason.as_str(),
						"Pagination finished."
					);

					self.stop_after_current = true;
				}

				Ok(Some(Page { index: self.pages, cursor, records, state }))
			},
		}
	}

	async fn send(&self) -> Result<ApiResponse> {
		let url = endpoint_url(&self.manager.config().api_base, &self.endpoint.path)?;
		let mut params = self.endpoint.params.clone();

		params.extend(self.params.clone());
		params.extend(self.cursor.params(&self.endpoint.cursor));

		let request = match self.endpoint.method {
			HttpMethod::Get => ApiRequest::get(url).with_query(&params),
			HttpMethod::Post => ApiRequest::post(url).with_form(params),
		};
		let request = self.manager.authenticate(request).await?;

		Ok(self.manager.http_client().execute(request).await?)
	}

	fn decode(&self, response: &ApiResponse) -> Result<Value> {
		serde_json::from_slice(&response.body).map_err(|e| {
			if response.is_success() {
				self.malformed(e)
			} else {
				self.http_status(response)
			}
		})
	}

	fn malformed(&self, reason: impl Display) -> Error {
		Error::MalformedResponse {
			platform: self.manager.platform().to_string(),
			cursor: self.cursor.to_string(),
			reason: reason.to_string(),
		}
	}

	fn http_status(&self, response: &ApiResponse) -> Error {
		tracing::warn!(
			platform = %self.manager.platform(),
			status = response.status,
			body = %response.body_preview(),
			"Unexpected HTTP status."
		);

		Error::HttpStatus { platform: self.manager.platform().to_string(), status: response.status }
	}

	fn finish(&mut self, status: PaginationStatus) {
		self.status = status;

		tracing::debug!(
			platform = %self.manager.platform(),
			pages = self.pages,
			records = self.records,
			status = ?status,
			"Pagination run ended."
		);
	}
}
impl<C> Debug for Paginator<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Paginator")
			.field("platform", self.manager.platform())
			.field("path", &self.endpoint.path)
			.field("cursor", &self.cursor)
			.field("status", &self.status)
			.finish()
	}
}
