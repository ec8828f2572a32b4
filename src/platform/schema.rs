//! Response schema descriptors: where each platform puts records, errors, and paging hints.
//!
//! Both platform families answer HTTP 200 for business errors, so every page goes through
//! [`ResponseSchema::interpret`] which separates error payloads, empty pages, and pages
//! with records before the cursor is advanced.

// self
use crate::_prelude::*;

/// Dotted path into a JSON document (`data.products`).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<String>);
impl FieldPath {
	/// Parses a dotted path. Empty segments are ignored.
	pub fn new(path: &str) -> Self {
		Self(path.split('.').filter(|segment| !segment.is_empty()).map(str::to_owned).collect())
	}

	/// Resolves the path against `value`.
	pub fn resolve<'a>(&self, value: &'a Value) -> Option<&'a Value> {
		self.0.iter().try_fold(value, |node, segment| node.get(segment))
	}

	/// Returns `true` when the path has no segments.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl From<&str> for FieldPath {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}
impl Debug for FieldPath {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "FieldPath({})", self.0.join("."))
	}
}
impl Display for FieldPath {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0.join("."))
	}
}

/// Business error carried inside an HTTP success.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiErrorPayload {
	/// Platform error code.
	pub code: String,
	/// Platform message, or `Unknown error`.
	pub message: String,
	/// Request id echoed by the platform, when present.
	pub request_id: Option<String>,
}

/// Paging hints extracted from one page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PaginationState {
	/// Total item count reported by the platform.
	pub total: Option<u64>,
	/// "More pages" flag reported by the platform.
	pub has_next: Option<bool>,
	/// Next cursor value echoed by the platform.
	pub next_cursor: Option<u64>,
}

/// Typed interpretation of one response body.
#[derive(Clone, Debug, PartialEq)]
pub enum PageOutcome {
	/// Page with at least one record.
	Records {
		/// Raw records in response order.
		records: Vec<Value>,
		/// Paging hints.
		state: PaginationState,
	},
	/// Well-formed page without records.
	Empty {
		/// Paging hints.
		state: PaginationState,
	},
	/// Platform business error.
	ApiError(ApiErrorPayload),
}

/// Shape violations that make a body uninterpretable.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ShapeError {
	/// The top-level JSON value is not an object.
	#[error("Response body is not a JSON object.")]
	NotAnObject,
	/// The records location holds a scalar.
	#[error("Records at `{path}` are neither an array nor an object.")]
	UnexpectedRecords {
		/// Records path.
		path: String,
	},
}

/// Capability interface implemented once per platform family.
pub trait ResponseShape {
	/// Returns the business error carried by `body`, if any.
	fn extract_error(&self, body: &Value) -> Option<ApiErrorPayload>;

	/// Returns the raw records in `body`.
	fn extract_records(&self, body: &Value) -> Result<Vec<Value>, ShapeError>;

	/// Returns the paging hints in `body`.
	fn extract_pagination_state(&self, body: &Value) -> PaginationState;
}

/// Lazada Open Platform shape: `code` is `"0"` on success.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LopSchema {
	/// Records location.
	pub records: FieldPath,
	/// Total item count location.
	pub total: Option<FieldPath>,
}
impl ResponseShape for LopSchema {
	fn extract_error(&self, body: &Value) -> Option<ApiErrorPayload> {
		let code = body.get("code")?;
		let code = match code {
			Value::String(text) => text.clone(),
			Value::Number(number) => number.to_string(),
			Value::Null => return None,
			other => other.to_string(),
		};

		if code == "0" {
			return None;
		}

		Some(error_payload(body, code))
	}

	fn extract_records(&self, body: &Value) -> Result<Vec<Value>, ShapeError> {
		records_at(&self.records, body)
	}

	fn extract_pagination_state(&self, body: &Value) -> PaginationState {
		PaginationState {
			total: self.total.as_ref().and_then(|path| path.resolve(body)).and_then(as_u64),
			..Default::default()
		}
	}
}

/// Shopee Open Platform shape: a non-empty `error` field marks failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShopeeSchema {
	/// Records location.
	pub records: FieldPath,
	/// "More pages" flag location.
	pub has_next: Option<FieldPath>,
	/// Echoed next-offset location.
	pub next_offset: Option<FieldPath>,
	/// Total item count location.
	pub total: Option<FieldPath>,
}
impl ResponseShape for ShopeeSchema {
	fn extract_error(&self, body: &Value) -> Option<ApiErrorPayload> {
		let code = match body.get("error")? {
			Value::Null | Value::Bool(false) => return None,
			Value::String(text) if text.is_empty() => return None,
			Value::String(text) => text.clone(),
			other => other.to_string(),
		};

		Some(error_payload(body, code))
	}

	fn extract_records(&self, body: &Value) -> Result<Vec<Value>, ShapeError> {
		records_at(&self.records, body)
	}

	fn extract_pagination_state(&self, body: &Value) -> PaginationState {
		let field = |path: &Option<FieldPath>| path.as_ref().and_then(|path| path.resolve(body));

		PaginationState {
			total: field(&self.total).and_then(as_u64),
			has_next: field(&self.has_next).and_then(as_bool),
			next_cursor: field(&self.next_offset).and_then(as_u64),
		}
	}
}

/// Per-platform response schema, dispatched by variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResponseSchema {
	/// Lazada Open Platform family (Lazada, Redmart).
	Lop(LopSchema),
	/// Shopee Open Platform family.
	Shopee(ShopeeSchema),
}
impl ResponseSchema {
	/// Lazada Open Platform schema with records at `records` and an optional total.
	pub fn lop(records: &str, total: Option<&str>) -> Self {
		Self::Lop(LopSchema { records: records.into(), total: total.map(FieldPath::new) })
	}

	/// Shopee schema for a listing that echoes `has_next_page` and `next_offset`.
	pub fn shopee_listing(root: &str, records: &str) -> Self {
		let at = |field: &str| FieldPath::new(&format!("{root}.{field}"));

		Self::Shopee(ShopeeSchema {
			records: at(records),
			has_next: Some(at("has_next_page")),
			next_offset: Some(at("next_offset")),
			total: Some(at("total_count")),
		})
	}

	/// Shopee schema for a single-shot call with records at `records`.
	pub fn shopee_single(records: &str) -> Self {
		Self::Shopee(ShopeeSchema {
			records: records.into(),
			has_next: None,
			next_offset: None,
			total: None,
		})
	}

	/// Separates business errors, empty pages, and record pages.
	pub fn interpret(&self, body: &Value) -> Result<PageOutcome, ShapeError> {
		if !body.is_object() {
			return Err(ShapeError::NotAnObject);
		}
		if let Some(error) = self.extract_error(body) {
			return Ok(PageOutcome::ApiError(error));
		}

		let records = self.extract_records(body)?;
		let state = self.extract_pagination_state(body);

		if records.is_empty() {
			Ok(PageOutcome::Empty { state })
		} else {
			Ok(PageOutcome::Records { records, state })
		}
	}

	fn shape(&self) -> &dyn ResponseShape {
		match self {
			Self::Lop(schema) => schema,
			Self::Shopee(schema) => schema,
		}
	}
}
impl ResponseShape for ResponseSchema {
	fn extract_error(&self, body: &Value) -> Option<ApiErrorPayload> {
		self.shape().extract_error(body)
	}

	fn extract_records(&self, body: &Value) -> Result<Vec<Value>, ShapeError> {
		self.shape().extract_records(body)
	}

	fn extract_pagination_state(&self, body: &Value) -> PaginationState {
		self.shape().extract_pagination_state(body)
	}
}

fn error_payload(body: &Value, code: String) -> ApiErrorPayload {
	ApiErrorPayload {
		code,
		message: body
			.get("message")
			.and_then(Value::as_str)
			.filter(|message| !message.is_empty())
			.unwrap_or("Unknown error")
			.to_owned(),
		request_id: body.get("request_id").and_then(Value::as_str).map(str::to_owned),
	}
}

fn records_at(path: &FieldPath, body: &Value) -> Result<Vec<Value>, ShapeError> {
	match path.resolve(body) {
		None | Some(Value::Null) => Ok(Vec::new()),
		Some(Value::Array(items)) => Ok(items.clone()),
		Some(object @ Value::Object(_)) => Ok(vec![object.clone()]),
		Some(_) => Err(ShapeError::UnexpectedRecords { path: path.to_string() }),
	}
}

fn as_u64(value: &Value) -> Option<u64> {
	match value {
		Value::Number(number) => number.as_u64(),
		Value::String(text) => text.trim().parse().ok(),
		_ => None,
	}
}

fn as_bool(value: &Value) -> Option<bool> {
	match value {
		Value::Bool(flag) => Some(*flag),
		Value::Number(number) => number.as_u64().map(|n| n != 0),
		Value::String(text) => match text.as_str() {
			"true" | "1" => Some(true),
			"false" | "0" => Some(false),
			_ => None,
		},
		_ => None,
	}
}
