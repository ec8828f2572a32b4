//! Per-platform application identity used to sign requests.

// self
use crate::{_prelude::*, auth::Secret, sign::SignatureScheme};

/// Immutable application identity for one sync run.
///
/// The Lazada Open Platform (Lazada, Redmart) identifies apps by key + secret; the Shopee
/// Open Platform identifies partners by numeric id + key and scopes every call to a shop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Credentials {
	/// App key + app secret pair.
	AppKey {
		/// Public application key sent as `app_key`.
		app_key: String,
		/// Application secret used as the HMAC key.
		app_secret: Secret,
	},
	/// Partner id + partner key pair scoped to one shop.
	Partner {
		/// Partner identifier sent as `partner_id`.
		partner_id: u64,
		/// Partner key used as the HMAC key.
		partner_key: Secret,
		/// Shop identifier sent as `shop_id`.
		shop_id: u64,
	},
}
impl Credentials {
	/// Builds app-key credentials.
	pub fn app_key(app_key: impl Into<String>, app_secret: impl Into<Secret>) -> Self {
		Self::AppKey { app_key: app_key.into(), app_secret: app_secret.into() }
	}

	/// Builds partner credentials.
	pub fn partner(partner_id: u64, partner_key: impl Into<Secret>, shop_id: u64) -> Self {
		Self::Partner { partner_id, partner_key: partner_key.into(), shop_id }
	}

	/// Returns the HMAC key for this identity.
	pub fn signing_key(&self) -> &Secret {
		match self {
			Self::AppKey { app_secret, .. } => app_secret,
			Self::Partner { partner_key, .. } => partner_key,
		}
	}

	/// Signature scheme this identity signs with.
	pub fn scheme(&self) -> SignatureScheme {
		match self {
			Self::AppKey { .. } => SignatureScheme::SortedParams,
			Self::Partner { .. } => SignatureScheme::FixedTuple,
		}
	}

	/// Human-readable family label.
	pub const fn family(&self) -> &'static str {
		match self {
			Self::AppKey { .. } => "app-key",
			Self::Partner { .. } => "partner",
		}
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::AppKey { app_key, .. } => f
				.debug_struct("Credentials::AppKey")
				.field("app_key", app_key)
				.field("app_secret", &"<redacted>")
				.finish(),
			Self::Partner { partner_id, shop_id, .. } => f
				.debug_struct("Credentials::Partner")
				.field("partner_id", partner_id)
				.field("partner_key", &"<redacted>")
				.field("shop_id", shop_id)
				.finish(),
		}
	}
}
