//! Built-in configurations for Lazada (six regions), Redmart and Shopee.

// self
use crate::{
	_prelude::*,
	auth::PlatformName,
	http::HttpMethod,
	paginate::CursorKind,
	platform::{DetailSpec, EndpointSpec, PlatformConfig, PlatformConfigError, ResponseSchema},
	sign::{HexCase, SignatureScheme},
};

const LAZADA_AUTH_BASE: &str = "https://auth.lazada.com/rest";
const LAZADA_REFRESH_PATH: &str = "/auth/token/refresh";
const REDMART_API_BASE: &str = "https://api.lazada.sg/rest";
const SHOPEE_HOST: &str = "https://partner.shopeemobile.com";
const SHOPEE_REFRESH_PATH: &str = "/api/v2/auth/access_token/get";
const SHOPEE_PAGE_SIZE: u64 = 50;

/// Lazada seller-center regions and their API hosts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LazadaRegion {
	/// Vietnam.
	Vn,
	/// Singapore.
	#[default]
	Sg,
	/// Malaysia.
	My,
	/// Thailand.
	Th,
	/// Philippines.
	Ph,
	/// Indonesia.
	Id,
}
impl LazadaRegion {
	/// Data API base URL for the region.
	pub const fn api_base(self) -> &'static str {
		match self {
			Self::Vn => "https://api.lazada.vn/rest",
			Self::Sg => "https://api.lazada.sg/rest",
			Self::My => "https://api.lazada.com.my/rest",
			Self::Th => "https://api.lazada.co.th/rest",
			Self::Ph => "https://api.lazada.com.ph/rest",
			Self::Id => "https://api.lazada.co.id/rest",
		}
	}
}

impl PlatformConfig {
	/// Lazada product listing for `region`.
	pub fn lazada(region: LazadaRegion) -> Result<Self> {
		Self::lazada_with_hosts(parse(region.api_base())?, parse(LAZADA_AUTH_BASE)?)
	}

	/// Lazada product listing against caller-supplied hosts.
	pub fn lazada_with_hosts(api_base: Url, auth_base: Url) -> Result<Self> {
		let listing = EndpointSpec::get(
			"/products/get",
			CursorKind::offset("offset", "limit", 100),
			ResponseSchema::lop("data.products", Some("data.total_products")),
		);

		Ok(lop_builder("lazada", api_base, auth_base)?.listing(listing).build()?)
	}

	/// Redmart product listing for `store_id`.
	pub fn redmart(store_id: impl Into<String>) -> Result<Self> {
		Self::redmart_with_hosts(store_id, parse(REDMART_API_BASE)?, parse(LAZADA_AUTH_BASE)?)
	}

	/// Redmart product listing against caller-supplied hosts.
	pub fn redmart_with_hosts(
		store_id: impl Into<String>,
		api_base: Url,
		auth_base: Url,
	) -> Result<Self> {
		let listing = EndpointSpec::get(
			"/rss/products/get",
			CursorKind::page_number("page", 1),
			ResponseSchema::lop("result.data", Some("result.total")),
		)
		.param("storeId", store_id)
		.param("pageSize", "100");

		Ok(lop_builder("redmart", api_base, auth_base)?.listing(listing).build()?)
	}

	/// Shopee item-id listing plus base-info detail fan-out.
	pub fn shopee() -> Result<Self> {
		Self::shopee_with_hosts(parse(SHOPEE_HOST)?, parse(SHOPEE_HOST)?)
	}

	/// Shopee configuration against caller-supplied hosts.
	pub fn shopee_with_hosts(api_base: Url, auth_base: Url) -> Result<Self> {
		let listing = EndpointSpec::get(
			"/api/v2/product/get_item_list",
			CursorKind::server_cursor("offset", SHOPEE_PAGE_SIZE),
			ResponseSchema::shopee_listing("response", "item"),
		)
		.param("page_size", SHOPEE_PAGE_SIZE.to_string())
		.param("item_status", "NORMAL");
		let detail = DetailSpec {
			endpoint: EndpointSpec {
				path: "/api/v2/product/get_item_base_info".into(),
				method: HttpMethod::Get,
				params: BTreeMap::new(),
				cursor: CursorKind::Single,
				schema: ResponseSchema::shopee_single("response.item_list"),
			}
			.param("need_tax_info", "false")
			.param("need_complaint_policy", "false"),
			id_field: "item_id".into(),
			id_param: "item_id_list".into(),
			batch_size: 50,
		};

		Ok(PlatformConfig::builder(name("shopee")?)
			.api_base(api_base)
			.refresh_endpoint(auth_base, SHOPEE_REFRESH_PATH)
			.signature(SignatureScheme::FixedTuple, HexCase::Lower)
			.token_lifetimes(Duration::hours(1), Duration::hours(4))
			.listing(listing)
			.detail(detail)
			.build()?)
	}
}

fn lop_builder(
	platform: &str,
	api_base: Url,
	auth_base: Url,
) -> Result<crate::platform::PlatformConfigBuilder> {
	Ok(PlatformConfig::builder(name(platform)?)
		.api_base(api_base)
		.refresh_endpoint(auth_base, LAZADA_REFRESH_PATH)
		.signature(SignatureScheme::SortedParams, HexCase::Upper)
		.token_lifetimes(Duration::hours(6), Duration::days(7)))
}

fn name(raw: &str) -> Result<PlatformName> {
	Ok(PlatformName::new(raw)?)
}

fn parse(raw: &str) -> Result<Url> {
	Ok(Url::parse(raw).map_err(|_| PlatformConfigError::InvalidUrl { url: raw.to_owned() })?)
}
