//! JSON run settings for one sync run.
//!
//! ```json
//! {
//!   "platform": { "kind": "lazada", "region": "vn" },
//!   "credentials": { "kind": "app_key", "app_key": "K", "app_secret": "S" },
//!   "access_token": "...",
//!   "refresh_token": "...",
//!   "token_file": "state/tokens.json"
//! }
//! ```

// std
use std::path::PathBuf;
// self
use crate::{
	_prelude::*,
	auth::{Credentials, Secret},
	error::ConfigError,
	http::ApiHttpClient,
	platform::{LazadaRegion, PlatformConfig},
	store::FileStore,
	token::{DEFAULT_SAFETY_BUFFER, TokenManager},
};

/// Built-in platform selection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlatformPreset {
	/// Lazada product listing.
	Lazada {
		/// Seller-center region.
		#[serde(default)]
		region: LazadaRegion,
	},
	/// Redmart product listing.
	Redmart {
		/// Redmart store id.
		store_id: String,
	},
	/// Shopee item listing plus detail fan-out.
	Shopee,
}

/// Host overrides for sandboxes and tests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostOverrides {
	/// Data API base URL.
	pub api_base: String,
	/// Auth base URL.
	pub auth_base: String,
}

/// Settings for one sync run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
	/// Platform preset.
	pub platform: PlatformPreset,
	/// Application identity.
	pub credentials: Credentials,
	/// Optional host overrides.
	#[serde(default)]
	pub hosts: Option<HostOverrides>,
	/// Seed access token.
	#[serde(default)]
	pub access_token: Option<Secret>,
	/// Seed refresh token.
	#[serde(default)]
	pub refresh_token: Option<Secret>,
	/// Remaining lifetime of the seed access token, in seconds.
	#[serde(default)]
	pub token_lifetime_secs: Option<u64>,
	/// Safety buffer before expiry, in seconds.
	#[serde(default = "default_safety_buffer_secs")]
	pub safety_buffer_secs: u64,
	/// Automatic refresh switch.
	#[serde(default = "default_auto_refresh")]
	pub auto_refresh: bool,
	/// Token file backing a [`FileStore`].
	#[serde(default)]
	pub token_file: Option<PathBuf>,
}
impl SyncSettings {
	/// Decodes settings from JSON, reporting the failing field path on error.
	pub fn from_json(bytes: &[u8]) -> Result<Self> {
		let mut deserializer = serde_json::Deserializer::from_slice(bytes);

		serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
			let path = e.path().to_string();

			ConfigError::InvalidSettings { path, source: e.into_inner() }.into()
		})
	}

	/// Builds the platform configuration selected by these settings.
	pub fn platform_config(&self) -> Result<PlatformConfig> {
		let Some(hosts) = &self.hosts else {
			return match &self.platform {
				PlatformPreset::Lazada { region } => PlatformConfig::lazada(*region),
				PlatformPreset::Redmart { store_id } => PlatformConfig::redmart(store_id.clone()),
				PlatformPreset::Shopee => PlatformConfig::shopee(),
			};
		};
		let api_base = parse_url(&hosts.api_base)?;
		let auth_base = parse_url(&hosts.auth_base)?;

		match &self.platform {
			PlatformPreset::Lazada { .. } => PlatformConfig::lazada_with_hosts(api_base, auth_base),
			PlatformPreset::Redmart { store_id } =>
				PlatformConfig::redmart_with_hosts(store_id.clone(), api_base, auth_base),
			PlatformPreset::Shopee => PlatformConfig::shopee_with_hosts(api_base, auth_base),
		}
	}

	/// Builds a token manager over `http_client`, opening the token file when configured.
	pub fn build_manager<C>(&self, http_client: impl Into<Arc<C>>) -> Result<TokenManager<C>>
	where
		C: ?Sized + ApiHttpClient,
	{
		let mut builder =
			TokenManager::builder(self.platform_config()?, self.credentials.clone(), http_client)
				.safety_buffer(Duration::seconds(clamp_secs(self.safety_buffer_secs)))
				.auto_refresh(self.auto_refresh);

		if let Some(token) = &self.access_token {
			builder = builder.access_token(token.clone());
		}
		if let Some(token) = &self.refresh_token {
			builder = builder.refresh_token(token.clone());
		}
		if let Some(secs) = self.token_lifetime_secs {
			builder = builder.token_lifetime(Duration::seconds(clamp_secs(secs)));
		}
		if let Some(path) = &self.token_file {
			builder = builder.store(Arc::new(FileStore::open(path)?));
		}

		builder.build()
	}
}

fn default_safety_buffer_secs() -> u64 {
	DEFAULT_SAFETY_BUFFER.whole_seconds().unsigned_abs()
}

fn default_auto_refresh() -> bool {
	true
}

fn clamp_secs(secs: u64) -> i64 {
	i64::try_from(secs).unwrap_or(i64::MAX)
}

fn parse_url(raw: &str) -> Result<Url> {
	Url::parse(raw).map_err(|e| ConfigError::invalid_url(raw, e).into())
}
