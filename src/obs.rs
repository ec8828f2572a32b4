//! Observability helpers shared by the refresh, pagination, and fan-out loops.
//!
//! Every flow runs inside a `marketplace_catalog.flow` span carrying `flow`, `stage`, and
//! `platform` fields. Enable the `metrics` feature to increment the
//! `marketplace_catalog_flow_total` counter for every attempt/success/failure, labeled by
//! `flow` + `outcome`.

mod metrics;
mod span;

pub use metrics::*;
pub use span::*;

// self
use crate::_prelude::*;

/// Flow kinds observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Access token refresh against the platform auth endpoint.
	TokenRefresh,
	/// One page of a paginated listing.
	PageFetch,
	/// One batch of the detail fan-out.
	DetailBatch,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::TokenRefresh => "token_refresh",
			FlowKind::PageFetch => "page_fetch",
			FlowKind::DetailBatch => "detail_batch",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure surfaced to the caller or logged and skipped.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
