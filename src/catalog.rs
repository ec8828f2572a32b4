//! Catalog-level record sequences on top of the paginator.
//!
//! Single-phase platforms stream the listing endpoint's records directly. Two-phase
//! platforms first page through a lightweight id listing, then fetch details in fixed-size
//! batches of single-shot calls; a failed batch is logged and skipped. [`CatalogStream`]
//! hides the difference and reports how the run ended through [`Completion`].

// std
use std::mem;
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::ApiHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	paginate::{PaginationStatus, Paginator},
	platform::DetailSpec,
	token::TokenManager,
};

/// Record-at-a-time view over a [`Paginator`]. Buffers at most one page.
#[derive(Debug)]
pub struct RecordStream<C>
where
	C: ?Sized + ApiHttpClient,
{
	paginator: Paginator<C>,
	buffer: VecDeque<Value>,
}
impl<C> RecordStream<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Wraps `paginator`.
	pub fn new(paginator: Paginator<C>) -> Self {
		Self { paginator, buffer: VecDeque::new() }
	}

	/// Next raw record; `Ok(None)` on exhaustion, `Err` on a terminal page failure.
	pub async fn next_record(&mut self) -> Result<Option<Value>> {
		loop {
			if let Some(record) = self.buffer.pop_front() {
				return Ok(Some(record));
			}

			match self.paginator.next_page().await? {
				Some(page) => self.buffer.extend(page.records),
				None => return Ok(None),
			}
		}
	}

	/// Status of the underlying paginator.
	pub fn status(&self) -> PaginationStatus {
		self.paginator.status()
	}
}

/// Pages `paginator` to completion and extracts `id_field` from every record.
///
/// Ids may be strings or numbers; records without the field are skipped with a warning.
pub async fn collect_ids<C>(paginator: &mut Paginator<C>, id_field: &str) -> Result<Vec<String>>
where
	C: ?Sized + ApiHttpClient,
{
	let mut ids = Vec::new();

	while let Some(page) = paginator.next_page().await? {
		for record in page.records {
			match record.get(id_field) {
				Some(Value::String(id)) if !id.is_empty() => ids.push(id.clone()),
				Some(Value::Number(id)) => ids.push(id.to_string()),
				_ => tracing::warn!(field = id_field, page = page.index, "Listing record has no id."),
			}
		}
	}

	Ok(ids)
}

/// Result of one detail batch.
#[derive(Debug)]
pub enum BatchOutcome {
	/// The batch returned records.
	Records {
		/// Zero-based batch index.
		index: usize,
		/// Raw detail records.
		records: Vec<Value>,
	},
	/// The batch failed and was skipped.
	Failed {
		/// Zero-based batch index.
		index: usize,
		/// Ids in the batch.
		ids: usize,
		/// Failure cause.
		error: Error,
	},
}

/// Sequential batched fan-out over a fixed id set.
#[derive(Debug)]
pub struct DetailFanout<C>
where
	C: ?Sized + ApiHttpClient,
{
	manager: Arc<TokenManager<C>>,
	detail: DetailSpec,
	batches: VecDeque<Vec<String>>,
	next_index: usize,
	failed: Vec<usize>,
}
impl<C> DetailFanout<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Plans batches for `ids` using the platform's detail endpoint.
	pub fn new(manager: Arc<TokenManager<C>>, ids: Vec<String>) -> Result<Self> {
		let detail = manager.config().detail.clone().ok_or_else(|| {
			ConfigError::MissingDetailEndpoint { platform: manager.platform().to_string() }
		})?;

		Ok(Self::with_spec(manager, detail, ids))
	}

	/// Plans batches for `ids` using `detail`.
	pub fn with_spec(manager: Arc<TokenManager<C>>, detail: DetailSpec, ids: Vec<String>) -> Self {
		let batches = ids.chunks(detail.batch_size.max(1)).map(<[String]>::to_vec).collect();

		Self { manager, detail, batches, next_index: 0, failed: Vec::new() }
	}

	/// Batches not yet issued.
	pub fn remaining(&self) -> usize {
		self.batches.len()
	}

	/// Indices of batches that failed so far.
	pub fn failed_batches(&self) -> &[usize] {
		&self.failed
	}

	/// Issues the next batch; `None` once every batch has been issued.
	pub async fn next_batch(&mut self) -> Option<BatchOutcome> {
		const KIND: FlowKind = FlowKind::DetailBatch;

		let ids = self.batches.pop_front()?;
		let index = self.next_index;

		self.next_index += 1;

		let span = FlowSpan::new(KIND, "next_batch", self.manager.platform().as_str());

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let params = BTreeMap::from([(self.detail.id_param.clone(), ids.join(","))]);
		let mut paginator = Paginator::new(self.manager.clone(), self.detail.endpoint.clone())
			.with_params(params);
		let result = span.instrument(paginator.collect_records()).await;

		obs::record_flow_result(KIND, &result);

		match result {
			Ok(records) => {
				tracing::debug!(
					platform = %self.manager.platform(),
					batch = index,
					ids = ids.len(),
					records = records.len(),
					"Fetched detail batch."
				);

				Some(BatchOutcome::Records { index, records })
			},
			Err(error) => {
				tracing::warn!(
					platform = %self.manager.platform(),
					batch = index,
					ids = ids.len(),
					error = %error,
					"Detail batch failed; skipping."
				);
				self.failed.push(index);

				Some(BatchOutcome::Failed { index, ids: ids.len(), error })
			},
		}
	}
}

/// How a [`CatalogStream`] ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Completion {
	/// Still producing records.
	Running,
	/// Every page and batch succeeded.
	Complete,
	/// The listing succeeded but some detail batches were skipped.
	Partial {
		/// Indices of the skipped batches.
		failed_batches: Vec<usize>,
	},
	/// A listing page failed; the sequence ended early.
	Aborted {
		/// Failure description.
		reason: String,
	},
}
impl Completion {
	/// Returns `true` for [`Completion::Complete`].
	pub fn is_complete(&self) -> bool {
		matches!(self, Self::Complete)
	}
}

enum Phase<C>
where
	C: ?Sized + ApiHttpClient,
{
	Listing(RecordStream<C>),
	Ids { paginator: Paginator<C>, detail: DetailSpec },
	Details { fanout: DetailFanout<C>, buffer: VecDeque<Value> },
	Done,
}

/// Lazy sequence of raw catalog records for one platform, with an explicit completion
/// status.
pub struct CatalogStream<C>
where
	C: ?Sized + ApiHttpClient,
{
	manager: Arc<TokenManager<C>>,
	phase: Phase<C>,
	completion: Completion,
	error: Option<Error>,
}
impl<C> CatalogStream<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Streams the platform's catalog: listing records, or detail records when the platform
	/// declares a detail endpoint.
	pub fn new(manager: Arc<TokenManager<C>>) -> Self {
		let paginator = Paginator::listing(manager.clone());
		let phase = match manager.config().detail.clone() {
			Some(detail) => Phase::Ids { paginator, detail },
			None => Phase::Listing(RecordStream::new(paginator)),
		};

		Self { manager, phase, completion: Completion::Running, error: None }
	}

	/// Next raw record; `None` once the sequence ends. Check [`Self::completion`] to tell
	/// normal exhaustion from early termination.
	pub async fn next_record(&mut self) -> Option<Value> {
		loop {
			match mem::replace(&mut self.phase, Phase::Done) {
				Phase::Listing(mut stream) => match stream.next_record().await {
					Ok(Some(record)) => {
						self.phase = Phase::Listing(stream);

						return Some(record);
					},
					Ok(None) => {
						self.finish(Vec::new());

						return None;
					},
					Err(e) => {
						self.abort(e);

						return None;
					},
				},
				Phase::Ids { mut paginator, detail } =>
					match collect_ids(&mut paginator, &detail.id_field).await {
						Ok(ids) => {
							tracing::info!(
								platform = %self.manager.platform(),
								ids = ids.len(),
								"Collected listing ids."
							);

							self.phase = Phase::Details {
								fanout: DetailFanout::with_spec(self.manager.clone(), detail, ids),
								buffer: VecDeque::new(),
							};
						},
						Err(e) => {
							self.abort(e);

							return None;
						},
					},
				Phase::Details { mut fanout, mut buffer } => {
					if let Some(record) = buffer.pop_front() {
						self.phase = Phase::Details { fanout, buffer };

						return Some(record);
					}

					match fanout.next_batch().await {
						Some(BatchOutcome::Records { records, .. }) => {
							buffer.extend(records);

							self.phase = Phase::Details { fanout, buffer };
						},
						Some(BatchOutcome::Failed { .. }) => {
							self.phase = Phase::Details { fanout, buffer };
						},
						None => {
							self.finish(fanout.failed_batches().to_vec());

							return None;
						},
					}
				},
				Phase::Done => return None,
			}
		}
	}

	/// Drains the sequence.
	pub async fn collect(mut self) -> (Vec<Value>, Completion) {
		let mut records = Vec::new();

		while let Some(record) = self.next_record().await {
			records.push(record);
		}

		(records, self.completion)
	}

	/// How the sequence ended so far.
	pub fn completion(&self) -> &Completion {
		&self.completion
	}

	/// Takes the error that aborted the sequence, if any.
	pub fn take_error(&mut self) -> Option<Error> {
		self.error.take()
	}

	fn finish(&mut self, failed_batches: Vec<usize>) {
		self.completion = if failed_batches.is_empty() {
			Completion::Complete
		} else {
			Completion::Partial { failed_batches }
		};

		tracing::info!(
			platform = %self.manager.platform(),
			completion = ?self.completion,
			"Catalog sequence finished."
		);
	}

	fn abort(&mut self, error: Error) {
		tracing::error!(
			platform = %self.manager.platform(),
			error = %error,
			"Catalog sequence aborted."
		);

		self.completion = Completion::Aborted { reason: error.to_string() };
		self.error = Some(error);
	}
}
impl<C> Debug for CatalogStream<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CatalogStream")
			.field("platform", self.manager.platform())
			.field("completion", &self.completion)
			.finish()
	}
}
