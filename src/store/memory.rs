//! Thread-safe in-memory [`TokenStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{PlatformName, TokenRecord},
	store::{StoreError, StoreFuture, StoreKey, TokenStore},
};

type StoreMap = Arc<RwLock<HashMap<StoreKey, TokenRecord>>>;

/// Storage backend that keeps records in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Returns the number of persisted records.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing has been persisted.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	/// Synchronous lookup used by tests and diagnostics.
	pub fn get(&self, platform: &PlatformName) -> Option<TokenRecord> {
		self.0.read().get(&StoreKey::for_platform(platform)).cloned()
	}

	fn save_now(map: StoreMap, key: StoreKey, record: TokenRecord) -> Result<(), StoreError> {
		map.write().insert(key, record);

		Ok(())
	}
}
impl TokenStore for MemoryStore {
	fn load<'a>(&'a self, platform: &'a PlatformName) -> StoreFuture<'a, Option<TokenRecord>> {
		let map = self.0.clone();
		let key = StoreKey::for_platform(platform);

		Box::pin(async move { Ok(map.read().get(&key).cloned()) })
	}

	fn save<'a>(
		&'a self,
		platform: &'a PlatformName,
		record: TokenRecord,
	) -> StoreFuture<'a, ()> {
		let map = self.0.clone();
		let key = StoreKey::for_platform(platform);

		Box::pin(async move { Self::save_now(map, key, record) })
	}
}
