//! Simple file-backed [`TokenStore`] for scheduled runs that outlive the process.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{PlatformName, TokenRecord},
	store::{StoreError, StoreFuture, StoreKey, TokenStore},
};

/// Persists records to a JSON object (`{"<platform>_oauth_tokens": record}`) after each save.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<BTreeMap<StoreKey, TokenRecord>>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<BTreeMap<StoreKey, TokenRecord>, StoreError> {
		if !path.exists() {
			return Ok(BTreeMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok(BTreeMap::new());
		}

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &BTreeMap<StoreKey, TokenRecord>) -> Result<(), StoreError> {
		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize token snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl TokenStore for FileStore {
	fn load<'a>(&'a self, platform: &'a PlatformName) -> StoreFuture<'a, Option<TokenRecord>> {
		Box::pin(async move { Ok(self.inner.read().get(&StoreKey::for_platform(platform)).cloned()) })
	}

	fn save<'a>(
		&'a self,
		platform: &'a PlatformName,
		record: TokenRecord,
	) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			guard.insert(StoreKey::for_platform(platform), record);
			self.persist_locked(&guard)
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;

	fn temp_path() -> PathBuf {
		let unique = format!(
			"marketplace_catalog_file_store_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[tokio::test]
	async fn save_and_reload_round_trip() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let platform = PlatformName::new("lazada").expect("Platform fixture should be valid.");
		let record = TokenRecord::builder()
			.access_token("access-token")
			.refresh_token("refresh-token")
			.expires_in(Duration::days(7))
			.build()
			.expect("Failed to build file-store test record.");

		store.save(&platform, record.clone()).await.expect("Failed to save fixture record.");
		drop(store);

		let raw = fs::read_to_string(&path).expect("Snapshot should be readable.");

		assert!(raw.contains("lazada_oauth_tokens"));

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let fetched = reopened
			.load(&platform)
			.await
			.expect("Failed to load fixture record.")
			.expect("File store lost record after reopen.");

		assert_eq!(fetched, record);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn corrupt_snapshot_is_a_serialization_error() {
		let path = temp_path();

		fs::write(&path, b"not json").expect("Fixture file should be writable.");

		let err = FileStore::open(&path).expect_err("Corrupt snapshot must be rejected.");

		assert!(matches!(err, StoreError::Serialization { .. }));

		fs::remove_file(&path).ok();
	}
}
