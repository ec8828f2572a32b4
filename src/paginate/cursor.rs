//! Cursor strategies and their advance/termination rules.

// self
use crate::{_prelude::*, platform::PaginationState};

/// How an endpoint pages, as declared by its platform configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CursorKind {
	/// One request, no cursor parameter.
	Single,
	/// Record offset advanced by the page size.
	Offset {
		/// Offset parameter name (`offset`).
		param: String,
		/// Page-size parameter name sent alongside the offset (`limit`).
		limit_param: Option<String>,
		/// Records requested per page.
		page_size: u64,
	},
	/// Page counter starting at `base`.
	PageNumber {
		/// Page parameter name (`page`).
		param: String,
		/// First page number.
		base: u64,
		/// Last page number to request, inclusive.
		max_page: Option<u64>,
	},
	/// Offset echoed by the server in the response body.
	ServerCursor {
		/// Cursor parameter name (`offset`).
		param: String,
		/// Fallback step when the server omits the next value.
		page_size: u64,
	},
}
impl CursorKind {
	/// Offset cursor sending `limit_param=page_size` on every page.
	pub fn offset(param: &str, limit_param: &str, page_size: u64) -> Self {
		Self::Offset {
			param: param.to_owned(),
			limit_param: Some(limit_param.to_owned()),
			page_size,
		}
	}

	/// Page-number cursor without an upper bound.
	pub fn page_number(param: &str, base: u64) -> Self {
		Self::PageNumber { param: param.to_owned(), base, max_page: None }
	}

	/// Server-echoed cursor.
	pub fn server_cursor(param: &str, page_size: u64) -> Self {
		Self::ServerCursor { param: param.to_owned(), page_size }
	}

	/// Stable label for logs.
	pub const fn as_str(&self) -> &'static str {
		match self {
			Self::Single => "single",
			Self::Offset { .. } => "offset",
			Self::PageNumber { .. } => "page_number",
			Self::ServerCursor { .. } => "server_cursor",
		}
	}
}

/// Engine-internal pagination position. Created per run and never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cursor {
	/// Single-shot request.
	Single,
	/// Record offset plus the increment applied per page.
	Offset {
		/// Current offset.
		value: u64,
		/// Increment per page.
		increment: u64,
	},
	/// Page number plus the first page number.
	PageNumber {
		/// Current page.
		value: u64,
		/// First page number.
		base: u64,
		/// Records received so far.
		seen: u64,
	},
	/// Server-echoed offset plus the fallback step.
	ServerCursor {
		/// Current offset.
		value: u64,
		/// Fallback step.
		step: u64,
	},
}
impl Cursor {
	/// Initial position for `kind`.
	pub fn start(kind: &CursorKind) -> Self {
		match kind {
			CursorKind::Single => Self::Single,
			CursorKind::Offset { page_size, .. } => Self::Offset { value: 0, increment: *page_size },
			CursorKind::PageNumber { base, .. } =>
				Self::PageNumber { value: *base, base: *base, seen: 0 },
			CursorKind::ServerCursor { page_size, .. } =>
				Self::ServerCursor { value: 0, step: *page_size },
		}
	}

	/// Request parameters carrying this position.
	pub fn params(&self, kind: &CursorKind) -> BTreeMap<String, String> {
		let mut params = BTreeMap::new();

		match (self, kind) {
			(Self::Offset { value, increment }, CursorKind::Offset { param, limit_param, .. }) => {
				params.insert(param.clone(), value.to_string());

				if let Some(limit_param) = limit_param {
					params.insert(limit_param.clone(), increment.to_string());
				}
			},
			(Self::PageNumber { value, .. }, CursorKind::PageNumber { param, .. })
			| (Self::ServerCursor { value, .. }, CursorKind::ServerCursor { param, .. }) => {
				params.insert(param.clone(), value.to_string());
			},
			_ => {},
		}

		params
	}

	/// Applies the advance rule after a page with `records` records.
	pub fn advance(&mut self, kind: &CursorKind, records: usize, state: &PaginationState) -> Step {
		let records = u64::try_from(records).unwrap_or(u64::MAX);

		if records == 0 {
			return Step::Stop(StopReason::EmptyPage);
		}

		match self {
			Self::Single => Step::Stop(StopReason::SingleShot),
			Self::Offset { value, increment } => {
				let next = value.saturating_add(*increment);
				let reason = match state.total {
					Some(total) if next >= total => Some(StopReason::TotalReached),
					None if records < *increment => Some(StopReason::ShortPage),
					_ => None,
				};

				*value = next;

				reason.map_or(Step::Continue, Step::Stop)
			},
			Self::PageNumber { value, seen, .. } => {
				let next = value.saturating_add(1);

				*value = next;
				*seen = seen.saturating_add(records);

				match (kind, state.total) {
					(_, Some(total)) if *seen >= total => Step::Stop(StopReason::TotalReached),
					(CursorKind::PageNumber { max_page: Some(max), .. }, _) if next > *max =>
						Step::Stop(StopReason::MaxPage),
					_ => Step::Continue,
				}
			},
			Self::ServerCursor { value, step } => {
				if state.has_next != Some(true) {
					return Step::Stop(StopReason::NoNextPage);
				}

				let next = state.next_cursor.unwrap_or_else(|| value.saturating_add(*step));

				if next <= *value {
					return Step::Stop(StopReason::CursorStalled);
				}

				*value = next;

				Step::Continue
			},
		}
	}
}
impl Display for Cursor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Single => f.write_str("single"),
			Self::Offset { value, .. } => write!(f, "offset={value}"),
			Self::PageNumber { value, .. } => write!(f, "page={value}"),
			Self::ServerCursor { value, .. } => write!(f, "cursor={value}"),
		}
	}
}

/// Result of advancing a cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
	/// Fetch the next page.
	Continue,
	/// No further requests.
	Stop(StopReason),
}

/// Why a cursor stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
	/// The page carried no records.
	EmptyPage,
	/// The records consumed so far reach the reported total.
	TotalReached,
	/// No total was reported and the page was short.
	ShortPage,
	/// The next page number exceeds the configured maximum.
	MaxPage,
	/// The server reported no further pages.
	NoNextPage,
	/// The server echoed a cursor that does not move forward.
	CursorStalled,
	/// Single-shot endpoint.
	SingleShot,
}
impl StopReason {
	/// Stable label for logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::EmptyPage => "empty_page",
			Self::TotalReached => "total_reached",
			Self::ShortPage => "short_page",
			Self::MaxPage => "max_page",
			Self::NoNextPage => "no_next_page",
			Self::CursorStalled => "cursor_stalled",
			Self::SingleShot => "single_shot",
		}
	}
}
