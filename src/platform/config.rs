// std
use std::net::IpAddr;
// self
use crate::{
	_prelude::*,
	auth::PlatformName,
	http::HttpMethod,
	paginate::CursorKind,
	platform::ResponseSchema,
	sign::{HexCase, SignatureScheme},
};

/// Errors raised while constructing or validating platform configurations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum PlatformConfigError {
	/// A required builder field was never set.
	#[error("Platform configuration is missing `{field}`.")]
	Missing {
		/// Builder field name.
		field: &'static str,
	},
	/// Endpoints must use HTTPS (loopback hosts excepted).
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Endpoint paths must be non-empty and start with `/`.
	#[error("The {endpoint} path `{path}` must start with `/`.")]
	InvalidPath {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Offending path.
		path: String,
	},
	/// Token lifetimes must be positive.
	#[error("The {field} must be positive.")]
	NonPositiveLifetime {
		/// Offending field.
		field: &'static str,
	},
	/// Page and batch sizes must be positive.
	#[error("The {endpoint} endpoint declares a zero page or batch size.")]
	ZeroSize {
		/// Which endpoint failed validation.
		endpoint: &'static str,
	},
	/// Cursor and id parameter names must be non-empty.
	#[error("The {endpoint} endpoint declares an empty parameter name.")]
	EmptyParam {
		/// Which endpoint failed validation.
		endpoint: &'static str,
	},
	/// Detail calls are single-shot per batch.
	#[error("The detail endpoint must not declare a cursor.")]
	DetailCursor,
	/// A preset URL could not be parsed.
	#[error("Endpoint URL `{url}` is invalid.")]
	InvalidUrl {
		/// Offending URL text.
		url: String,
	},
}

/// One API call shape: path, verb, static parameters, cursor and response schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointSpec {
	/// Path appended to the API base URL.
	pub path: String,
	/// HTTP verb.
	pub method: HttpMethod,
	/// Static parameters sent on every call.
	pub params: BTreeMap<String, String>,
	/// Cursor strategy.
	pub cursor: CursorKind,
	/// Where records, errors and paging hints live.
	pub schema: ResponseSchema,
}
impl EndpointSpec {
	/// GET endpoint without static parameters.
	pub fn get(path: impl Into<String>, cursor: CursorKind, schema: ResponseSchema) -> Self {
		Self { path: path.into(), method: HttpMethod::Get, params: BTreeMap::new(), cursor, schema }
	}

	/// Adds a static parameter.
	pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.params.insert(key.into(), value.into());

		self
	}

	fn validate(&self, endpoint: &'static str) -> Result<(), PlatformConfigError> {
		validate_path(endpoint, &self.path)?;

		match &self.cursor {
			CursorKind::Single => Ok(()),
			CursorKind::Offset { page_size: 0, .. }
			| CursorKind::ServerCursor { page_size: 0, .. } =>
				Err(PlatformConfigError::ZeroSize { endpoint }),
			CursorKind::Offset { param, limit_param, .. } =>
				if param.is_empty() || limit_param.as_deref().is_some_and(str::is_empty) {
					Err(PlatformConfigError::EmptyParam { endpoint })
				} else {
					Ok(())
				},
			CursorKind::PageNumber { param, .. } | CursorKind::ServerCursor { param, .. } =>
				if param.is_empty() {
					Err(PlatformConfigError::EmptyParam { endpoint })
				} else {
					Ok(())
				},
		}
	}
}

/// Batched single-shot detail calls over ids collected from the listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetailSpec {
	/// Detail endpoint; its cursor must be [`CursorKind::Single`].
	pub endpoint: EndpointSpec,
	/// Field of each listing record holding the id (`item_id`).
	pub id_field: String,
	/// Parameter receiving the comma-joined ids (`item_id_list`).
	pub id_param: String,
	/// Ids per call.
	pub batch_size: usize,
}

/// Static description of one marketplace. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlatformConfig {
	/// Name the token record is persisted under.
	pub name: PlatformName,
	/// Base URL of data endpoints (`https://api.lazada.sg/rest`).
	pub api_base: Url,
	/// Base URL of the auth endpoint.
	pub auth_base: Url,
	/// Refresh path relative to `auth_base`.
	pub refresh_path: String,
	/// Signature canonicalization.
	pub signature: SignatureScheme,
	/// Digest hex case.
	pub hex_case: HexCase,
	/// Lifetime assumed for a caller-supplied token without an explicit lifetime.
	pub assumed_token_lifetime: Duration,
	/// Lifetime applied when a refresh response omits the expiry field.
	pub refreshed_token_lifetime: Duration,
	/// Paginated listing endpoint.
	pub listing: EndpointSpec,
	/// Optional detail fan-out.
	pub detail: Option<DetailSpec>,
}
impl PlatformConfig {
	/// Creates a new builder for the provided platform name.
	pub fn builder(name: PlatformName) -> PlatformConfigBuilder {
		PlatformConfigBuilder::new(name)
	}

	/// Credential family this platform signs with.
	pub const fn credential_family(&self) -> &'static str {
		match self.signature {
			SignatureScheme::SortedParams => "app-key",
			SignatureScheme::FixedTuple => "partner",
		}
	}

	/// Path that goes into a sorted-params signature for `url`: the URL path relative to
	/// `base`. Fixed-tuple signatures use the absolute path.
	pub fn signing_path(&self, base: &Url, url: &Url) -> String {
		match self.signature {
			SignatureScheme::FixedTuple => url.path().to_owned(),
			SignatureScheme::SortedParams => {
				let prefix = base.path().trim_end_matches('/');

				match url.path().strip_prefix(prefix) {
					Some(relative) if relative.starts_with('/') => relative.to_owned(),
					_ => url.path().to_owned(),
				}
			},
		}
	}
}

/// Builder for [`PlatformConfig`] values.
#[derive(Debug)]
pub struct PlatformConfigBuilder {
	name: PlatformName,
	api_base: Option<Url>,
	auth_base: Option<Url>,
	refresh_path: Option<String>,
	signature: SignatureScheme,
	hex_case: HexCase,
	assumed_token_lifetime: Duration,
	refreshed_token_lifetime: Duration,
	listing: Option<EndpointSpec>,
	detail: Option<DetailSpec>,
}
impl PlatformConfigBuilder {
	/// Creates a builder with sorted-params signing and one-hour lifetimes.
	pub fn new(name: PlatformName) -> Self {
		Self {
			name,
			api_base: None,
			auth_base: None,
			refresh_path: None,
			signature: SignatureScheme::SortedParams,
			hex_case: HexCase::Upper,
			assumed_token_lifetime: Duration::hours(1),
			refreshed_token_lifetime: Duration::hours(1),
			listing: None,
			detail: None,
		}
	}

	/// Sets the data API base URL.
	pub fn api_base(mut self, url: Url) -> Self {
		self.api_base = Some(url);

		self
	}

	/// Sets the auth base URL and the refresh path below it.
	pub fn refresh_endpoint(mut self, auth_base: Url, path: impl Into<String>) -> Self {
		self.auth_base = Some(auth_base);
		self.refresh_path = Some(path.into());

		self
	}

	/// Sets signature canonicalization and digest case.
	pub fn signature(mut self, scheme: SignatureScheme, case: HexCase) -> Self {
		self.signature = scheme;
		self.hex_case = case;

		self
	}

	/// Sets the assumed and refreshed token lifetimes.
	pub fn token_lifetimes(mut self, assumed: Duration, refreshed: Duration) -> Self {
		self.assumed_token_lifetime = assumed;
		self.refreshed_token_lifetime = refreshed;

		self
	}

	/// Sets the listing endpoint.
	pub fn listing(mut self, endpoint: EndpointSpec) -> Self {
		self.listing = Some(endpoint);

		self
	}

	/// Sets the detail fan-out.
	pub fn detail(mut self, detail: DetailSpec) -> Self {
		self.detail = Some(detail);

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<PlatformConfig, PlatformConfigError> {
		let api_base = self.api_base.ok_or(PlatformConfigError::Missing { field: "api_base" })?;
		let auth_base = self.auth_base.ok_or(PlatformConfigError::Missing { field: "auth_base" })?;
		let refresh_path =
			self.refresh_path.ok_or(PlatformConfigError::Missing { field: "refresh_path" })?;
		let listing = self.listing.ok_or(PlatformConfigError::Missing { field: "listing" })?;
		let config = PlatformConfig {
			name: self.name,
			api_base,
			auth_base,
			refresh_path,
			signature: self.signature,
			hex_case: self.hex_case,
			assumed_token_lifetime: self.assumed_token_lifetime,
			refreshed_token_lifetime: self.refreshed_token_lifetime,
			listing,
			detail: self.detail,
		};

		validate(&config)?;

		Ok(config)
	}
}

fn validate(config: &PlatformConfig) -> Result<(), PlatformConfigError> {
	validate_endpoint_url("api", &config.api_base)?;
	validate_endpoint_url("auth", &config.auth_base)?;
	validate_path("refresh", &config.refresh_path)?;

	if !config.assumed_token_lifetime.is_positive() {
		return Err(PlatformConfigError::NonPositiveLifetime { field: "assumed token lifetime" });
	}
	if !config.refreshed_token_lifetime.is_positive() {
		return Err(PlatformConfigError::NonPositiveLifetime {
			field: "refreshed token lifetime",
		});
	}

	config.listing.validate("listing")?;

	if let Some(detail) = &config.detail {
		detail.endpoint.validate("detail")?;

		if detail.endpoint.cursor != CursorKind::Single {
			return Err(PlatformConfigError::DetailCursor);
		}
		if detail.batch_size == 0 {
			return Err(PlatformConfigError::ZeroSize { endpoint: "detail" });
		}
		if detail.id_field.is_empty() || detail.id_param.is_empty() {
			return Err(PlatformConfigError::EmptyParam { endpoint: "detail" });
		}
	}

	Ok(())
}

fn validate_endpoint_url(endpoint: &'static str, url: &Url) -> Result<(), PlatformConfigError> {
	if url.scheme() == "https" || (url.scheme() == "http" && is_loopback(url)) {
		Ok(())
	} else {
		Err(PlatformConfigError::InsecureEndpoint { endpoint, url: url.to_string() })
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
		Some(url::Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
		None => false,
	}
}

fn validate_path(endpoint: &'static str, path: &str) -> Result<(), PlatformConfigError> {
	if path.len() > 1 && path.starts_with('/') {
		Ok(())
	} else {
		Err(PlatformConfigError::InvalidPath { endpoint, path: path.to_owned() })
	}
}
