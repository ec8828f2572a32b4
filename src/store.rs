//! Token persistence contract and built-in store implementations.
//!
//! Records are keyed by platform name. The crate never locks across processes: two runs
//! for the same platform name must be serialized by whoever schedules them.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{PlatformName, TokenRecord},
};

/// Boxed future returned by [`TokenStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Key-value backend holding one [`TokenRecord`] per platform name.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Fetches the record persisted under `platform`, if present.
	fn load<'a>(&'a self, platform: &'a PlatformName) -> StoreFuture<'a, Option<TokenRecord>>;

	/// Persists or replaces the record for `platform`.
	fn save<'a>(&'a self, platform: &'a PlatformName, record: TokenRecord)
	-> StoreFuture<'a, ()>;
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// State key a platform's record lives under (`<platform>_oauth_tokens`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreKey(String);
impl StoreKey {
	/// Builds the key for `platform`.
	pub fn for_platform(platform: &PlatformName) -> Self {
		Self(format!("{platform}_oauth_tokens"))
	}

	/// Returns the key text.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;

	#[test]
	fn store_error_converts_into_crate_error_with_source() {
		let store_error = StoreError::Backend { message: "state backend unreachable".into() };
		let error: Error = store_error.clone().into();

		assert!(matches!(error, Error::Storage(_)));
		assert!(error.to_string().contains("state backend unreachable"));

		let source = StdError::source(&error)
			.expect("Crate error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn store_key_is_derived_from_platform_name() {
		let platform = PlatformName::new("shopee").expect("Platform fixture should be valid.");

		assert_eq!(StoreKey::for_platform(&platform).as_str(), "shopee_oauth_tokens");
	}
}
