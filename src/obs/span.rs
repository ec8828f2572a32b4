// crates.io
use tracing::{Instrument, Span, instrument::Instrumented};
// self
use crate::{_prelude::*, obs::FlowKind};

/// A span builder used by crate flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	span: Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the flow kind, stage, and platform name.
	pub fn new(kind: FlowKind, stage: &'static str, platform: &str) -> Self {
		let span = tracing::info_span!(
			"marketplace_catalog.flow",
			flow = kind.as_str(),
			stage,
			platform
		);

		Self { span }
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		fut.instrument(self.span.clone())
	}

	/// Returns the underlying span.
	pub fn span(&self) -> &Span {
		&self.span
	}
}
