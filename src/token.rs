//! Token lifecycle management: expiry tracking, store reconciliation, refresh, and request
//! signing.
//!
//! A [`TokenManager`] owns the access/refresh token for one platform instance. The first
//! authenticated call consults the [`TokenStore`] once for a fresher persisted record.
//! Tokens inside the safety buffer of their expiry are refreshed before use; a failed
//! refresh is logged and the stale token is used anyway, so the resulting API error
//! reaches the caller through the normal request path.

mod metrics;
mod refresh;
mod state;

pub use metrics::RefreshMetrics;
pub use refresh::RefreshError;
pub use state::{Reconciled, StoreLookup, TokenState};

// self
use crate::{
	_prelude::*,
	auth::{Credentials, PlatformName, Secret, TokenRecord},
	error::ConfigError,
	http::{ApiHttpClient, HttpMethod},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	platform::PlatformConfig,
	sign::Signer,
	store::TokenStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;
use state::TokenSlot;

/// Default window before expiry in which a token counts as expired.
pub const DEFAULT_SAFETY_BUFFER: Duration = Duration::minutes(5);

pub(crate) const SIGN_METHOD: &str = "sha256";

#[cfg(feature = "reqwest")]
/// Manager specialized for the crate's default reqwest transport.
pub type ReqwestTokenManager = TokenManager<ReqwestHttpClient>;

/// Owns one platform instance's token and signs every request made with it.
pub struct TokenManager<C>
where
	C: ?Sized + ApiHttpClient,
{
	config: Arc<PlatformConfig>,
	credentials: Credentials,
	http_client: Arc<C>,
	store: Option<Arc<dyn TokenStore>>,
	safety_buffer: Duration,
	auto_refresh: bool,
	slot: Mutex<TokenSlot>,
	refresh_guard: AsyncMutex<()>,
	metrics: Arc<RefreshMetrics>,
}
impl<C> TokenManager<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Starts a builder for `config` + `credentials` over `http_client`.
	pub fn builder(
		config: impl Into<Arc<PlatformConfig>>,
		credentials: Credentials,
		http_client: impl Into<Arc<C>>,
	) -> TokenManagerBuilder<C> {
		TokenManagerBuilder::new(config.into(), credentials, http_client.into())
	}

	/// Platform configuration this manager signs for.
	pub fn config(&self) -> &Arc<PlatformConfig> {
		&self.config
	}

	/// Platform name the token is persisted under.
	pub fn platform(&self) -> &PlatformName {
		&self.config.name
	}

	/// Application identity.
	pub fn credentials(&self) -> &Credentials {
		&self.credentials
	}

	/// Shared HTTP transport.
	pub fn http_client(&self) -> &Arc<C> {
		&self.http_client
	}

	/// Refresh counters.
	pub fn metrics(&self) -> &Arc<RefreshMetrics> {
		&self.metrics
	}

	/// Window before expiry in which the token counts as expired.
	pub fn safety_buffer(&self) -> Duration {
		self.safety_buffer
	}

	/// Current state at the wall-clock time.
	pub fn state(&self) -> TokenState {
		self.slot.lock().state_at(OffsetDateTime::now_utc(), self.safety_buffer)
	}

	/// Whether the persisted record has been consulted.
	pub fn store_lookup(&self) -> StoreLookup {
		self.slot.lock().lookup
	}

	/// Snapshot of the in-memory record.
	pub fn current_record(&self) -> Option<TokenRecord> {
		self.slot.lock().record.clone()
	}

	/// Returns an access token, refreshing first when it is expired and refreshable.
	///
	/// A failed refresh is logged and the stale token is returned. Fails only when no
	/// access token is known at all.
	pub async fn ensure_valid_token(&self) -> Result<Secret> {
		self.lookup_store_once().await;

		let state = self.state();

		if matches!(state, TokenState::Expired | TokenState::NoToken | TokenState::Refreshing)
			&& self.auto_refresh
		{
			let refreshable = self.slot.lock().refresh_token().is_some();

			if refreshable {
				if let Err(e) = self.refresh_if_stale().await {
					tracing::warn!(
						platform = %self.config.name,
						error = %e,
						"Token refresh failed; continuing with the current access token."
					);
				}
			} else if state == TokenState::Expired {
				tracing::warn!(
					platform = %self.config.name,
					"Access token is expired and no refresh token is available."
				);
			}
		}

		self.slot.lock().access_token().ok_or_else(|| {
			ConfigError::MissingAccessToken { platform: self.config.name.to_string() }.into()
		})
	}

	/// Refreshes unconditionally and returns the new record. Errors are returned, not
	/// swallowed.
	pub async fn refresh_now(&self) -> Result<TokenRecord> {
		self.lookup_store_once().await;

		let _singleflight = self.refresh_guard.lock().await;

		self.refresh_locked().await
	}

	/// Signs `existing` for a call to `url`.
	///
	/// System parameters (identity, timestamp, access token, signature) override
	/// caller-supplied parameters of the same name. A caller-supplied `sign` is discarded.
	pub async fn sign_request(
		&self,
		method: HttpMethod,
		url: &Url,
		existing: &BTreeMap<String, String>,
	) -> Result<BTreeMap<String, String>> {
		let access_token = self.ensure_valid_token().await?;
		let now = OffsetDateTime::now_utc();
		let signer = Signer::new(self.config.hex_case);
		let mut params = existing.clone();

		params.remove("sign");

		let sign = match &self.credentials {
			Credentials::AppKey { app_key, app_secret } => {
				params.insert("app_key".into(), app_key.clone());
				params.insert("sign_method".into(), SIGN_METHOD.into());
				params.insert("timestamp".into(), timestamp_millis(now));
				params.insert("access_token".into(), access_token.expose().to_owned());

				let path = self.config.signing_path(&self.config.api_base, url);

				signer.sign(app_secret.expose(), &path, &params)
			},
			Credentials::Partner { partner_id, partner_key, shop_id } => {
				let partner = partner_id.to_string();
				let shop = shop_id.to_string();
				let timestamp = timestamp_secs(now);
				let sign = signer.sign_fields(
					partner_key.expose(),
					[
						partner.as_str(),
						url.path(),
						timestamp.as_str(),
						access_token.expose(),
						shop.as_str(),
					],
				);

				params.insert("partner_id".into(), partner);
				params.insert("shop_id".into(), shop);
				params.insert("timestamp".into(), timestamp);
				params.insert("access_token".into(), access_token.expose().to_owned());

				sign
			},
		};

		params.insert("sign".into(), sign);

		tracing::trace!(
			platform = %self.config.name,
			method = %method,
			path = url.path(),
			params = params.len(),
			"Signed request."
		);

		Ok(params)
	}

	async fn lookup_store_once(&self) {
		if self.slot.lock().lookup == StoreLookup::Done {
			return;
		}

		let _singleflight = self.refresh_guard.lock().await;

		if self.slot.lock().lookup == StoreLookup::Done {
			return;
		}

		let stored = match &self.store {
			Some(store) => match store.load(&self.config.name).await {
				Ok(stored) => stored,
				Err(e) => {
					tracing::warn!(
						platform = %self.config.name,
						error = %e,
						"Token store unavailable; using the in-memory token."
					);

					None
				},
			},
			None => None,
		};
		let outcome =
			self.slot.lock().reconcile(stored, OffsetDateTime::now_utc(), self.safety_buffer);

		match outcome {
			Reconciled::Adopted => {
				self.metrics.record_store_adoption();

				tracing::info!(platform = %self.config.name, "Adopted fresher persisted token.");
			},
			Reconciled::RefreshTokenAdopted => {
				tracing::info!(
					platform = %self.config.name,
					"Adopted refresh token from expired persisted record."
				);
			},
			Reconciled::Kept => {},
		}
	}

	async fn refresh_if_stale(&self) -> Result<()> {
		let _singleflight = self.refresh_guard.lock().await;

		// Another caller may have refreshed while this one waited on the guard.
		if self.state() == TokenState::Valid {
			return Ok(());
		}

		self.refresh_locked().await.map(|_| ())
	}

	/// Runs one refresh call. Callers hold `refresh_guard`.
	async fn refresh_locked(&self) -> Result<TokenRecord> {
		const KIND: FlowKind = FlowKind::TokenRefresh;

		let span = FlowSpan::new(KIND, "refresh", self.config.name.as_str());

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				let refresh_token = self.slot.lock().refresh_token().ok_or_else(|| {
					Error::from(ConfigError::MissingRefreshToken {
						platform: self.config.name.to_string(),
					})
				})?;

				self.metrics.record_attempt();
				self.slot.lock().begin_refresh();

				let refreshed = self.call_refresh_endpoint(refresh_token).await;

				match refreshed {
					Ok(record) => {
						self.slot.lock().finish_refresh(Some(record.clone()));
						self.metrics.record_success();

						tracing::info!(
							platform = %self.config.name,
							expires_at = %record.expires_at,
							"Access token refreshed."
						);

						self.persist(&record).await;

						Ok(record)
					},
					Err(e) => {
						self.slot.lock().finish_refresh(None);
						self.metrics.record_failure();

						Err(e)
					},
				}
			})
			.await;

		obs::record_flow_result(KIND, &result);

		result
	}

	async fn call_refresh_endpoint(&self, refresh_token: Secret) -> Result<TokenRecord> {
		let now = OffsetDateTime::now_utc();
		let request = refresh::build_request(&self.config, &self.credentials, &refresh_token, now)?;
		let response = self.http_client.execute(request).await.map_err(RefreshError::from)?;

		Ok(refresh::parse_response(&self.config, &response, refresh_token, now)?)
	}

	async fn persist(&self, record: &TokenRecord) {
		let Some(store) = &self.store else {
			return;
		};

		if let Err(e) = store.save(&self.config.name, record.clone()).await {
			tracing::warn!(
				platform = %self.config.name,
				error = %e,
				"Failed to persist refreshed token; continuing with the in-memory token."
			);
		}
	}
}
impl<C> Debug for TokenManager<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("platform", &self.config.name)
			.field("credentials", &self.credentials)
			.field("safety_buffer", &self.safety_buffer)
			.field("auto_refresh", &self.auto_refresh)
			.field("has_store", &self.store.is_some())
			.finish()
	}
}

/// Builder for [`TokenManager`].
pub struct TokenManagerBuilder<C>
where
	C: ?Sized + ApiHttpClient,
{
	config: Arc<PlatformConfig>,
	credentials: Credentials,
	http_client: Arc<C>,
	access_token: Option<Secret>,
	refresh_token: Option<Secret>,
	token_lifetime: Option<Duration>,
	expires_at: Option<OffsetDateTime>,
	safety_buffer: Duration,
	auto_refresh: bool,
	store: Option<Arc<dyn TokenStore>>,
}
impl<C> TokenManagerBuilder<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn new(config: Arc<PlatformConfig>, credentials: Credentials, http_client: Arc<C>) -> Self {
		Self {
			config,
			credentials,
			http_client,
			access_token: None,
			refresh_token: None,
			token_lifetime: None,
			expires_at: None,
			safety_buffer: DEFAULT_SAFETY_BUFFER,
			auto_refresh: true,
			store: None,
		}
	}

	/// Seeds the access token.
	pub fn access_token(mut self, token: impl Into<Secret>) -> Self {
		self.access_token = Some(token.into());

		self
	}

	/// Seeds the refresh token.
	pub fn refresh_token(mut self, token: impl Into<Secret>) -> Self {
		self.refresh_token = Some(token.into());

		self
	}

	/// Remaining lifetime of the seeded access token. Defaults to the platform's assumed
	/// lifetime.
	pub fn token_lifetime(mut self, lifetime: Duration) -> Self {
		self.token_lifetime = Some(lifetime);

		self
	}

	/// Absolute expiry of the seeded access token. Takes precedence over
	/// [`Self::token_lifetime`].
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Overrides the safety buffer (default five minutes). Negative values clamp to zero.
	pub fn safety_buffer(mut self, buffer: Duration) -> Self {
		self.safety_buffer = if buffer.is_negative() { Duration::ZERO } else { buffer };

		self
	}

	/// Enables or disables automatic refresh (default on).
	pub fn auto_refresh(mut self, enabled: bool) -> Self {
		self.auto_refresh = enabled;

		self
	}

	/// Persists refreshed tokens to `store` and consults it once before first use.
	pub fn store(mut self, store: Arc<dyn TokenStore>) -> Self {
		self.store = Some(store);

		self
	}

	/// Validates the inputs and produces the manager.
	pub fn build(self) -> Result<TokenManager<C>> {
		if self.credentials.scheme() != self.config.signature {
			return Err(ConfigError::CredentialsMismatch {
				platform: self.config.name.to_string(),
				expected: self.config.credential_family(),
			}
			.into());
		}

		let record = match self.access_token.filter(|token| !token.is_empty()) {
			Some(access_token) => {
				let builder = TokenRecord::builder()
					.access_token(access_token)
					.maybe_refresh_token(self.refresh_token.clone());
				let builder = match self.expires_at {
					Some(instant) => builder.expires_at(instant),
					None => builder.expires_in(
						self.token_lifetime.unwrap_or(self.config.assumed_token_lifetime),
					),
				};

				Some(builder.build().map_err(ConfigError::from)?)
			},
			None => None,
		};
		let seed_refresh = if record.is_none() { self.refresh_token } else { None };
		let lookup_done = self.store.is_none();
		let mut slot = TokenSlot::new(record, seed_refresh);

		if lookup_done {
			slot.lookup = StoreLookup::Done;
		}

		Ok(TokenManager {
			config: self.config,
			credentials: self.credentials,
			http_client: self.http_client,
			store: self.store,
			safety_buffer: self.safety_buffer,
			auto_refresh: self.auto_refresh,
			slot: Mutex::new(slot),
			refresh_guard: AsyncMutex::new(()),
			metrics: Arc::new(RefreshMetrics::default()),
		})
	}
}

pub(crate) fn timestamp_millis(now: OffsetDateTime) -> String {
	(now.unix_timestamp_nanos() / 1_000_000).to_string()
}

pub(crate) fn timestamp_secs(now: OffsetDateTime) -> String {
	now.unix_timestamp().to_string()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		http::{ApiRequest, HttpFuture},
		platform::LazadaRegion,
	};

	struct Offline;
	impl ApiHttpClient for Offline {
		fn execute(&self, _: ApiRequest) -> HttpFuture<'_> {
			Box::pin(async { Err(std::io::Error::other("offline").into()) })
		}
	}

	fn lazada() -> TokenManagerBuilder<Offline> {
		TokenManager::<Offline>::builder(
			PlatformConfig::lazada(LazadaRegion::Sg).expect("Preset should build."),
			Credentials::app_key("K", "S"),
			Offline,
		)
	}

	#[test]
	fn credentials_must_match_signing_family() {
		let err = TokenManager::<Offline>::builder(
			PlatformConfig::shopee().expect("Preset should build."),
			Credentials::app_key("K", "S"),
			Offline,
		)
		.build()
		.expect_err("App-key credentials cannot sign for Shopee.");

		assert!(matches!(
			err,
			Error::Config(ConfigError::CredentialsMismatch { expected: "partner", .. })
		));
	}

	#[test]
	fn seeded_token_uses_assumed_lifetime() {
		let manager = lazada().access_token("a").build().expect("Manager should build.");
		let record = manager.current_record().expect("Seeded record should exist.");

		assert_eq!(record.expires_at - record.issued_at, Duration::hours(6));
		assert_eq!(manager.state(), TokenState::Valid);
		assert_eq!(manager.store_lookup(), StoreLookup::Done);
	}

	#[tokio::test]
	async fn failed_refresh_degrades_to_stale_token() {
		let manager = lazada()
			.access_token("stale")
			.refresh_token("r")
			.token_lifetime(Duration::minutes(1))
			.build()
			.expect("Manager should build.");
		let token = manager.ensure_valid_token().await.expect("Stale token should be returned.");

		assert_eq!(token.expose(), "stale");
		assert_eq!(manager.state(), TokenState::Expired);
		assert_eq!(manager.metrics().attempts(), 1);
		assert_eq!(manager.metrics().failures(), 1);
		assert!(matches!(manager.refresh_now().await, Err(Error::Refresh(_))));
	}

	#[tokio::test]
	async fn missing_token_is_a_config_error() {
		let manager = lazada().build().expect("Manager should build.");

		assert_eq!(manager.state(), TokenState::NoToken);
		assert!(matches!(
			manager.ensure_valid_token().await,
			Err(Error::Config(ConfigError::MissingAccessToken { .. }))
		));
	}

	#[tokio::test]
	async fn sorted_params_signature_matches_signer() {
		let manager = lazada().access_token("a").build().expect("Manager should build.");
		let url = Url::parse("https://api.lazada.sg/rest/products/get")
			.expect("Fixture URL should parse.");
		let existing = BTreeMap::from([
			("offset".to_owned(), "0".to_owned()),
			("app_key".to_owned(), "caller".to_owned()),
			("sign".to_owned(), "forged".to_owned()),
		]);
		let mut signed = manager
			.sign_request(HttpMethod::Get, &url, &existing)
			.await
			.expect("Signing should succeed.");

		assert_eq!(signed.get("app_key").map(String::as_str), Some("K"));
		assert_eq!(signed.get("access_token").map(String::as_str), Some("a"));

		let sign = signed.remove("sign").expect("Signature should be present.");

		assert_ne!(sign, "forged");
		assert_eq!(sign, Signer::new(manager.config().hex_case).sign("S", "/products/get", &signed));
	}
}
